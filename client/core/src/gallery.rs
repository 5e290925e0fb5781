//! In-memory gallery kept in step with the image store.
//!
//! `Gallery` owns the ordered image list and is the only thing that mutates
//! it. Every mutation follows a confirmed server response: a refresh
//! replaces the list wholesale, a successful upload appends at the tail, a
//! successful delete removes one entry. Failed operations never touch the
//! list, and every operation that completes (or faults) sends exactly one
//! notice to the notifier.

use crate::api::{ApiEnvelope, Image, ImageApi, ImageFile};
use crate::codec::Codec;
use crate::error::{ApiError, GalleryError};
use crate::notify::{Notice, Notifier};
use crate::scope::Scope;
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Camera capture: base64 image data plus its format (`jpeg`, `png`, ...).
#[derive(Debug, Clone)]
pub struct Capture {
    pub base64: String,
    pub format: String,
}

impl Capture {
    pub fn new(base64: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            base64: base64.into(),
            format: format.into(),
        }
    }
}

pub struct Gallery<A> {
    api: A,
    codec: Codec,
    notifier: Arc<dyn Notifier>,
    scope: Scope,
    images: Mutex<Vec<Image>>,
    deleting: Mutex<HashSet<i64>>,
    refresh_ticket: AtomicU64,
    refresh_applied: AtomicU64,
}

impl<A: ImageApi> Gallery<A> {
    pub fn new(api: A, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            codec: Codec::default(),
            notifier,
            scope: Scope::new(),
            images: Mutex::new(Vec::new()),
            deleting: Mutex::new(HashSet::new()),
            refresh_ticket: AtomicU64::new(0),
            refresh_applied: AtomicU64::new(0),
        }
    }

    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Snapshot of the list in display order.
    pub fn images(&self) -> Vec<Image> {
        self.list().clone()
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.list().is_empty()
    }

    /// Tear down: cancel everything in flight and refuse new work.
    pub fn close(&self) -> bool {
        self.scope.close()
    }

    /// Replace the list with the server's. The payload is applied whatever
    /// the status code; a response older than one already applied is dropped.
    pub async fn refresh(&self) -> Result<Notice, GalleryError> {
        let ticket = self.refresh_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let envelope = self.call("list-images", self.api.list_images()).await?;

        match &envelope.payload {
            Some(images) => {
                let mut list = self.list();
                // Only a newer refresh that actually landed makes this one stale
                if self.refresh_applied.fetch_max(ticket, Ordering::SeqCst) < ticket {
                    tracing::info!("Gallery refreshed: {} image(s)", images.len());
                    *list = images.clone();
                } else {
                    tracing::debug!("Dropping superseded refresh #{}", ticket);
                }
            }
            None => tracing::debug!(
                "List response without payload (status {})",
                envelope.status_code
            ),
        }
        Ok(self.report(&envelope))
    }

    /// Decode a camera capture and upload it. Bad base64 fails before any
    /// request is made.
    pub async fn add_from_capture(&self, capture: &Capture) -> Result<Notice, GalleryError> {
        let decoded = self
            .scope
            .run("decode", self.codec.decode(&capture.base64, &capture.format))
            .await?;
        let payload = decoded.map_err(|e| self.fail(e.into()))?;

        let envelope = self
            .call("upload-image", self.api.upload_binary(payload))
            .await?;
        Ok(self.apply_upload(&envelope))
    }

    pub async fn add_from_file(&self, file: ImageFile) -> Result<Notice, GalleryError> {
        let envelope = self
            .call("upload-image", self.api.upload_file(file))
            .await?;
        Ok(self.apply_upload(&envelope))
    }

    /// Delete `image` on the server, then drop the first entry equal to it.
    /// Confirmation is the caller's business.
    pub async fn remove(&self, image: &Image) -> Result<Notice, GalleryError> {
        let _claim = self.claim_delete(image.id)?;
        let envelope = self
            .call("delete-image", self.api.delete_image(image.id))
            .await?;

        if envelope.is_success() {
            let mut list = self.list();
            match list.iter().position(|listed| listed == image) {
                Some(index) => {
                    list.remove(index);
                    tracing::info!("Removed image {} ({})", image.id, image.file_name);
                }
                None => tracing::debug!("Image {} was no longer listed", image.id),
            }
        }
        Ok(self.report(&envelope))
    }

    // --- Helpers ---

    fn list(&self) -> MutexGuard<'_, Vec<Image>> {
        self.images.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a remote call in the scope. Faults are reported once;
    /// cancellations stay silent.
    async fn call<T, F>(&self, label: &str, request: F) -> Result<ApiEnvelope<T>, GalleryError>
    where
        F: Future<Output = Result<ApiEnvelope<T>, ApiError>>,
    {
        self.scope
            .run(label, request)
            .await?
            .map_err(|e| self.fail(e.into()))
    }

    fn apply_upload(&self, envelope: &ApiEnvelope<Image>) -> Notice {
        if envelope.is_success() {
            match &envelope.payload {
                Some(image) => {
                    let mut list = self.list();
                    if list.iter().any(|listed| listed.id == image.id) {
                        tracing::debug!("Image {} already listed, not appending", image.id);
                    } else {
                        tracing::info!("Added image {} ({})", image.id, image.file_name);
                        list.push(image.clone());
                    }
                }
                None => tracing::warn!("Upload succeeded without an image payload"),
            }
        }
        self.report(envelope)
    }

    fn report<T>(&self, envelope: &ApiEnvelope<T>) -> Notice {
        let notice = if envelope.is_success() {
            Notice::success(&envelope.message)
        } else {
            tracing::warn!(
                "Server rejected request ({}): {}",
                envelope.status_code,
                envelope.message
            );
            Notice::failure(&envelope.message)
        };
        self.notifier.notify(&notice);
        notice
    }

    fn fail(&self, err: GalleryError) -> GalleryError {
        tracing::warn!("{}", err);
        self.notifier.notify(&Notice::failure(err.to_string()));
        err
    }

    fn claim_delete(&self, id: i64) -> Result<DeleteClaim<'_>, GalleryError> {
        let mut deleting = self.deleting.lock().unwrap_or_else(PoisonError::into_inner);
        if !deleting.insert(id) {
            return Err(GalleryError::Busy(id));
        }
        Ok(DeleteClaim {
            deleting: &self.deleting,
            id,
        })
    }
}

impl<A> Drop for Gallery<A> {
    fn drop(&mut self) {
        self.scope.close();
    }
}

/// Marks an id as having a delete in flight until dropped.
struct DeleteClaim<'a> {
    deleting: &'a Mutex<HashSet<i64>>,
    id: i64,
}

impl Drop for DeleteClaim<'_> {
    fn drop(&mut self) {
        self.deleting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}
