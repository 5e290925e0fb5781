//! Picshelf core: image-store client, capture codec and the in-memory
//! gallery that mirrors the server.

pub mod actions;
pub mod api;
pub mod codec;
pub mod config;
pub mod error;
pub mod gallery;
pub mod notify;
pub mod scope;

pub use api::{ApiEnvelope, HttpImageApi, Image, ImageApi, ImageFile};
pub use codec::{BinaryPayload, Codec};
pub use config::ApiConfig;
pub use error::{ApiError, DecodeError, GalleryError};
pub use gallery::{Capture, Gallery};
pub use notify::{Notice, NoticeLevel, Notifier, TracingNotifier};
pub use scope::Scope;
