//! Error types shared by the codec, the API client and the gallery.

/// Base64 capture payload could not be decoded.
#[derive(thiserror::Error, Debug)]
#[error("Invalid base64 image data: {0}")]
pub struct DecodeError(#[from] base64::DecodeError);

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    /// Connection, DNS or timeout failure before any response arrived.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    /// Non-success HTTP status whose body was not an envelope.
    #[error("API error ({status}): {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },
    /// Success HTTP status but the body was not an envelope.
    #[error("Malformed response: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("File name has no extension: {0}")]
    MissingExtension(String),
    /// Image format that does not make a valid content type.
    #[error("Unsupported image type: {0}")]
    InvalidMimeType(String),
}

#[derive(thiserror::Error, Debug)]
pub enum GalleryError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Image {0} already has a delete in flight")]
    Busy(i64),
}
