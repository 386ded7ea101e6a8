use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use spdlog::info;

pub const DEFAULT_UPLOAD_URL: &str = "https://api.imgbb.com/1/upload";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Image host API key is not configured")]
    MissingApiKey,
    #[error("Invalid image data: {0}")]
    InvalidImage(String),
    #[error("Upload request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Upload failed: {0}")]
    Rejected(String),
}

/// External image host. Returns a public URL for the uploaded bytes.
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, image: &[u8]) -> Result<String, UploadError>;
}

lazy_static! {
    static ref DATA_URL: Regex = Regex::new(r"^data:image/(png|jpeg|gif|webp);base64,").unwrap();
}

/// Decodes an image sent by the admin form. Accepts a `data:` URL of one of the
/// allowed image types or a bare base64 payload.
pub fn decode_image_data(buf: &str) -> Result<Vec<u8>, UploadError> {
    let buf = buf.trim();
    let payload = if buf.starts_with("data:") {
        match DATA_URL.find(buf) {
            Some(prefix) => &buf[prefix.end()..],
            None => return Err(UploadError::InvalidImage("Only png, jpeg, gif and webp are accepted".to_string())),
        }
    } else {
        buf
    };

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| UploadError::InvalidImage(e.to_string()))?;
    if bytes.is_empty() {
        return Err(UploadError::InvalidImage("Empty image".to_string()));
    }
    Ok(bytes)
}

#[derive(Deserialize)]
struct ImgbbResponse {
    success: bool,
    data: Option<ImgbbData>,
    error: Option<ImgbbErrorBody>,
}

#[derive(Deserialize)]
struct ImgbbData {
    url: String,
}

#[derive(Deserialize)]
struct ImgbbErrorBody {
    message: Option<String>,
}

impl ImgbbResponse {
    fn into_url(self) -> Result<String, UploadError> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data.url),
            _ => {
                let message = self.error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "Upload failed".to_string());
                Err(UploadError::Rejected(message))
            }
        }
    }
}

/// ImgBB compatible uploader: the image goes as a base64 form field
pub struct ImgbbUploader {
    api_url: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl ImgbbUploader {
    pub fn new(api_url: Option<&str>, api_key: Option<&str>) -> Self {
        Self {
            api_url: api_url.unwrap_or(DEFAULT_UPLOAD_URL).to_string(),
            api_key: api_key.filter(|k| !k.is_empty()).map(|k| k.to_string()),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl ImageUploader for ImgbbUploader {
    async fn upload(&self, image: &[u8]) -> Result<String, UploadError> {
        let api_key = self.api_key.as_ref().ok_or(UploadError::MissingApiKey)?;
        let encoded = STANDARD.encode(image);

        let response = self.http_client
            .post(&self.api_url)
            .query(&[("key", api_key.as_str())])
            .form(&[("image", encoded.as_str())])
            .send()
            .await?;

        let body: ImgbbResponse = response.json().await?;
        let url = body.into_url()?;
        info!("Uploaded image of {} bytes to {}", image.len(), url);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_url() {
        let bytes = decode_image_data("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_decode_bare_base64() {
        assert_eq!(decode_image_data("R0lGODlh").unwrap(), b"GIF89a".to_vec());
    }

    #[test]
    fn test_decode_rejects() {
        assert!(matches!(decode_image_data("data:text/plain;base64,aGk="), Err(UploadError::InvalidImage(_))));
        assert!(matches!(decode_image_data("not base64 !!"), Err(UploadError::InvalidImage(_))));
        assert!(matches!(decode_image_data(""), Err(UploadError::InvalidImage(_))));
    }

    #[test]
    fn test_response_parsing() {
        let ok: ImgbbResponse = serde_json::from_str(
            r#"{"success":true,"status":200,"data":{"id":"x","url":"https://i.ibb.co/x/a.png"}}"#).unwrap();
        assert_eq!(ok.into_url().unwrap(), "https://i.ibb.co/x/a.png");

        let failed: ImgbbResponse = serde_json::from_str(
            r#"{"success":false,"status_code":400,"error":{"message":"Invalid API v1 key.","code":100}}"#).unwrap();
        match failed.into_url() {
            Err(UploadError::Rejected(msg)) => assert_eq!(msg, "Invalid API v1 key."),
            _ => panic!("expected rejection"),
        }
    }

    #[tokio::test]
    async fn test_missing_key() {
        let uploader = ImgbbUploader::new(None, Some(""));
        assert!(!uploader.is_configured());
        assert!(matches!(uploader.upload(b"img").await, Err(UploadError::MissingApiKey)));
    }
}
