//! Cancellation scope for in-flight requests.
//!
//! A `Scope` lives as long as the controller that owns it. Every remote call
//! goes through [`Scope::run`]; closing the scope drops whatever is still
//! pending. Work that already reached the server is not rolled back.

use crate::error::GalleryError;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Identifies one registered operation in log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationId(Uuid);

impl OperationId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is plenty to correlate log lines
        write!(f, "{}", &self.0.simple().to_string()[..8])
    }
}

#[derive(Debug, Default)]
pub struct Scope {
    token: CancellationToken,
    closed: AtomicBool,
    pending: AtomicUsize,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of registered operations that have not finished yet.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Cancel everything still pending and reject later work.
    /// Returns `true` only for the call that actually closed the scope.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        let pending = self.pending();
        self.token.cancel();
        tracing::debug!("Scope closed, cancelled {} pending operation(s)", pending);
        true
    }

    /// Run `fut` as an operation of this scope. Resolves to
    /// `GalleryError::Cancelled` if the scope is (or becomes) closed first.
    pub async fn run<F, T>(&self, label: &str, fut: F) -> Result<T, GalleryError>
    where
        F: Future<Output = T>,
    {
        if self.is_closed() {
            tracing::debug!("Rejected {}: scope closed", label);
            return Err(GalleryError::Cancelled);
        }

        let id = OperationId::new();
        let _pending = PendingGuard::register(&self.pending);
        tracing::debug!("[{}] {} started", id, label);

        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                tracing::debug!("[{}] {} cancelled", id, label);
                Err(GalleryError::Cancelled)
            }
            out = fut => {
                tracing::debug!("[{}] {} finished", id, label);
                Ok(out)
            }
        }
    }
}

struct PendingGuard<'a>(&'a AtomicUsize);

impl<'a> PendingGuard<'a> {
    fn register(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
