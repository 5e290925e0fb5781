use crate::codec::BinaryPayload;
use crate::config::ApiConfig;
use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

// --- Wire types ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    pub file_name: String,
    pub file_path: String,
}

/// Uniform wrapper around every response from the image store.
///
/// `status_code` is the business status; 200 means success no matter what
/// the HTTP status or `is_error` say.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(rename = "status")]
    pub status_code: i64,
    #[serde(rename = "error", default)]
    pub is_error: bool,
    #[serde(rename = "messages", default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(rename = "data")]
    pub payload: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// --- Upload sources ---

/// A named file picked for upload.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub async fn open(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self { name, bytes })
    }

    /// Text after the last `.` of the name, if there is any.
    pub fn extension(&self) -> Option<&str> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }
}

// --- Client ---

#[async_trait]
pub trait ImageApi: Send + Sync {
    async fn list_images(&self) -> Result<ApiEnvelope<Vec<Image>>, ApiError>;

    async fn upload_binary(&self, payload: BinaryPayload) -> Result<ApiEnvelope<Image>, ApiError>;

    async fn upload_file(&self, file: ImageFile) -> Result<ApiEnvelope<Image>, ApiError>;

    async fn delete_image(&self, id: i64) -> Result<ApiEnvelope<bool>, ApiError>;
}

pub struct HttpImageApi {
    config: ApiConfig,
    client: reqwest::Client,
}

impl HttpImageApi {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Parse the body as an envelope whatever the HTTP status. The status
    /// only matters when the body isn't an envelope.
    async fn read_envelope<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<ApiEnvelope<T>, ApiError> {
        let status = resp.status();
        let body = resp.text().await?;
        match serde_json::from_str::<ApiEnvelope<T>>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(ApiError::Http { status, body }),
            Err(e) => Err(ApiError::Malformed(e)),
        }
    }

    async fn post_image(&self, part: Part) -> Result<ApiEnvelope<Image>, ApiError> {
        let form = Form::new().part("image", part);
        let resp = self
            .client
            .post(self.config.endpoint("upload-image"))
            .multipart(form)
            .send()
            .await?;
        Self::read_envelope(resp).await
    }
}

#[async_trait]
impl ImageApi for HttpImageApi {
    async fn list_images(&self) -> Result<ApiEnvelope<Vec<Image>>, ApiError> {
        tracing::debug!("GET list-images");
        let resp = self
            .client
            .get(self.config.endpoint("list-images"))
            .send()
            .await?;
        Self::read_envelope(resp).await
    }

    async fn upload_binary(&self, payload: BinaryPayload) -> Result<ApiEnvelope<Image>, ApiError> {
        let file_name = format!("myimage.{}", payload.subtype());
        let mime = payload.mime_type().to_string();
        let len = payload.len() as u64;
        tracing::debug!(
            "POST upload-image {} ({} bytes, {} chunks)",
            file_name,
            len,
            payload.chunks().len()
        );

        let part = Part::stream_with_length(payload.into_body(), len)
            .file_name(file_name)
            .mime_str(&mime)
            .map_err(|_| ApiError::InvalidMimeType(mime.clone()))?;
        self.post_image(part).await
    }

    async fn upload_file(&self, file: ImageFile) -> Result<ApiEnvelope<Image>, ApiError> {
        let ext = file
            .extension()
            .ok_or_else(|| ApiError::MissingExtension(file.name.clone()))?
            .to_string();
        let mime = mime_guess::from_ext(&ext).first_or_octet_stream();
        tracing::debug!("POST upload-image {} as myimage.{} ({})", file.name, ext, mime);

        let part = Part::bytes(file.bytes)
            .file_name(format!("myimage.{}", ext))
            .mime_str(mime.essence_str())
            .map_err(|_| ApiError::InvalidMimeType(mime.to_string()))?;
        self.post_image(part).await
    }

    async fn delete_image(&self, id: i64) -> Result<ApiEnvelope<bool>, ApiError> {
        tracing::debug!("DELETE delete-image/{}", id);
        let resp = self
            .client
            .delete(self.config.endpoint(&format!("delete-image/{}", id)))
            .send()
            .await?;
        Self::read_envelope(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client_for(server: &Server) -> HttpImageApi {
        HttpImageApi::new(ApiConfig::new(&server.url())).unwrap()
    }

    #[test]
    fn test_envelope_defaults() {
        let env: ApiEnvelope<bool> = serde_json::from_str(r#"{"status":200}"#).unwrap();
        assert!(env.is_success());
        assert!(!env.is_error);
        assert_eq!(env.message, "");
        assert!(env.payload.is_none());

        let env: ApiEnvelope<bool> = serde_json::from_str(
            r#"{"status":404,"error":true,"messages":null,"data":null}"#,
        )
        .unwrap();
        assert!(!env.is_success());
        assert!(env.is_error);
        assert_eq!(env.message, "");
    }

    #[test]
    fn test_status_code_is_source_of_truth() {
        // error flag set but status 200 is still a success
        let env: ApiEnvelope<bool> =
            serde_json::from_str(r#"{"status":200,"error":true,"messages":"ok"}"#).unwrap();
        assert!(env.is_success());
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(ImageFile::new("photo.jpg", vec![]).extension(), Some("jpg"));
        assert_eq!(ImageFile::new("archive.tar.png", vec![]).extension(), Some("png"));
        assert_eq!(ImageFile::new("photo", vec![]).extension(), None);
        assert_eq!(ImageFile::new("photo.", vec![]).extension(), None);
    }

    #[tokio::test]
    async fn test_list_images() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/list-images")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":200,"error":false,"messages":"","data":[
                    {"id":1,"file_name":"a.png","file_path":"/img/1.png"},
                    {"id":2,"file_name":"b.jpg","file_path":"/img/2.jpg"}]}"#,
            )
            .create_async()
            .await;

        let env = client_for(&server).list_images().await.unwrap();

        mock.assert_async().await;
        let images = env.payload.unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].id, 1);
        assert_eq!(images[1].file_name, "b.jpg");
    }

    #[tokio::test]
    async fn test_upload_binary_multipart_shape() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/upload-image")
            .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="image"; filename="myimage.png""#.into()),
                Matcher::Regex("(?i)content-type: image/png".into()),
                Matcher::Regex("hello".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"status":200,"error":false,"messages":"Image uploaded",
                    "data":{"id":7,"file_name":"myimage.png","file_path":"/img/7.png"}}"#,
            )
            .create_async()
            .await;

        let payload = crate::codec::decode("aGVsbG8=", "png").unwrap();
        let env = client_for(&server).upload_binary(payload).await.unwrap();

        mock.assert_async().await;
        assert_eq!(env.message, "Image uploaded");
        assert_eq!(env.payload.unwrap().id, 7);
    }

    #[tokio::test]
    async fn test_upload_file_uses_extension() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/upload-image")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"filename="myimage.jpg""#.into()),
                Matcher::Regex("(?i)content-type: image/jpeg".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"status":200,"messages":"ok",
                    "data":{"id":3,"file_name":"myimage.jpg","file_path":"/img/3.jpg"}}"#,
            )
            .create_async()
            .await;

        let file = ImageFile::new("holiday.jpg", b"jpegbytes".to_vec());
        let env = client_for(&server).upload_file(file).await.unwrap();

        mock.assert_async().await;
        assert_eq!(env.payload.unwrap().file_name, "myimage.jpg");
    }

    #[tokio::test]
    async fn test_upload_file_without_extension_is_rejected() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/upload-image")
            .expect(0)
            .create_async()
            .await;

        let file = ImageFile::new("README", b"data".to_vec());
        let err = client_for(&server).upload_file(file).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, ApiError::MissingExtension(name) if name == "README"));
    }

    #[tokio::test]
    async fn test_unusable_capture_format_is_not_a_transport_fault() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/upload-image")
            .expect(0)
            .create_async()
            .await;

        let payload = crate::codec::decode("aGVsbG8=", "jp@eg").unwrap();
        let err = client_for(&server).upload_binary(payload).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, ApiError::InvalidMimeType(mime) if mime == "image/jp@eg"));
    }

    #[test]
    fn test_status_outside_http_range_still_parses() {
        let env: ApiEnvelope<bool> =
            serde_json::from_str(r#"{"status":70000,"messages":"odd"}"#).unwrap();
        assert_eq!(env.status_code, 70000);
        assert!(!env.is_success());

        let env: ApiEnvelope<bool> = serde_json::from_str(r#"{"status":-1}"#).unwrap();
        assert!(!env.is_success());
    }

    #[tokio::test]
    async fn test_envelope_wins_over_http_status() {
        let mut server = Server::new_async().await;
        server
            .mock("DELETE", "/api/delete-image/1")
            .with_status(500)
            .with_body(r#"{"status":500,"error":true,"messages":"not found"}"#)
            .create_async()
            .await;

        let env = client_for(&server).delete_image(1).await.unwrap();
        assert_eq!(env.status_code, 500);
        assert_eq!(env.message, "not found");
    }

    #[tokio::test]
    async fn test_non_envelope_error_body() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/list-images")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let err = client_for(&server).list_images().await.unwrap_err();
        match err {
            ApiError::Http { status, body } => {
                assert_eq!(status.as_u16(), 502);
                assert_eq!(body, "Bad Gateway");
            }
            other => panic!("expected Http error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_success_body() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/list-images")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let err = client_for(&server).list_images().await.unwrap_err();
        assert!(matches!(err, ApiError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_transport_fault() {
        // Nothing listens on port 1
        let api = HttpImageApi::new(ApiConfig::new("http://127.0.0.1:1")).unwrap();
        let err = api.list_images().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}
