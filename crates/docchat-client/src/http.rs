//! HTTP client for the document listing and upload endpoints.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use docchat_core::DocumentInfo;

use crate::error::ClientError;

/// Upper bound for plain JSON requests. Uploads are not bounded.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Size of the slices an upload body is streamed in.
const UPLOAD_CHUNK_SIZE: usize = 16 * 1024;

/// File types the backend ingests, by extension.
const ACCEPTED_TYPES: [(&str, &str); 3] = [
    ("pdf", "application/pdf"),
    ("md", "text/markdown"),
    ("txt", "text/plain"),
];

/// Progress of an upload body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub sent: u64,
    pub total: u64,
}

impl UploadProgress {
    /// Rounded percentage, 0 to 100.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.sent.min(self.total) * 100 + self.total / 2) / self.total) as u8
    }
}

/// What the backend reports after ingesting an upload.
///
/// Every field is optional: the success payload is not part of the
/// backend's stable interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub chunks: Option<u64>,
    #[serde(default)]
    pub file_saved: Option<String>,
}

/// Error body returned by the backend on failures.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// HTTP client for REST API endpoints.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get JSON from an endpoint.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET request");

        let response =
            check_status(self.inner.get(&url).timeout(REQUEST_TIMEOUT).send().await?).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::Serialization(e.to_string()))
    }

    /// List the documents known to the backend.
    pub async fn list_documents(&self) -> Result<Vec<DocumentInfo>, ClientError> {
        let documents: Vec<DocumentInfo> = self.get_json("/api/documents").await?;
        debug!(count = documents.len(), "Fetched documents");
        Ok(documents)
    }

    /// Upload a single document as multipart field `file`.
    ///
    /// `on_progress` is called as the body is streamed to the server.
    pub async fn upload_document<F>(
        &self,
        path: &Path,
        on_progress: F,
    ) -> Result<UploadReceipt, ClientError>
    where
        F: Fn(UploadProgress) + Send + Sync + 'static,
    {
        let mime = accepted_mime(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ClientError::UnsupportedFile(path.display().to_string()))?;

        let bytes = tokio::fs::read(path).await?;
        let total = bytes.len() as u64;
        info!(file = %file_name, bytes = total, "Uploading document");

        let chunks: Vec<Result<Vec<u8>, std::io::Error>> = bytes
            .chunks(UPLOAD_CHUNK_SIZE)
            .map(|chunk| Ok(chunk.to_vec()))
            .collect();
        let mut sent = 0u64;
        let body = futures_util::stream::iter(chunks).inspect(move |chunk| {
            if let Ok(chunk) = chunk {
                sent += chunk.len() as u64;
                on_progress(UploadProgress { sent, total });
            }
        });

        let part = Part::stream_with_length(Body::wrap_stream(body), total)
            .file_name(file_name.clone())
            .mime_str(mime)?;
        let form = Form::new().part("file", part);

        let url = format!("{}/api/upload", self.base_url);
        let response = check_status(self.inner.post(&url).multipart(form).send().await?).await?;

        let text = response.text().await?;
        let receipt = serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!(error = %e, "Upload succeeded with an unexpected body");
            UploadReceipt::default()
        });
        info!(file = %file_name, "Upload complete");
        Ok(receipt)
    }
}

/// MIME type for an accepted document, by extension.
pub fn accepted_mime(path: &Path) -> Result<&'static str, ClientError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    ACCEPTED_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
        .ok_or_else(|| ClientError::UnsupportedFile(path.display().to_string()))
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };

    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}
