use crate::api::Image;
use std::time::Duration;

/// Immutable client configuration, handed to the API client at construction.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    base_url: String,
    pub timeout: Option<Duration>,
    pub yield_between_chunks: bool,
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: None,
            yield_between_chunks: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_yield_between_chunks(mut self, enabled: bool) -> Self {
        self.yield_between_chunks = enabled;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Endpoint URL for an `/api/...` path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Displayable URL for an image: absolute paths pass through, relative
    /// ones are joined to the base URL.
    pub fn image_url(&self, image: &Image) -> String {
        let path = image.file_path.as_str();
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }
}
