//! Mock conversion service for testing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::gateway::{ApiResponse, DownloadRef, GatewayError, RemoteGateway, UploadRequest};

const MOCK_BASE_URL: &str = "http://mock.convertino.test";

/// Mock implementation of the RemoteGateway trait.
///
/// Uploads answer with a scripted [`ApiResponse`] per endpoint, falling back
/// to a single link named after the uploaded file. Failures are scripted per
/// file name and go through the same response normalisation as the real
/// service. Fetches of unscripted URLs return the URL itself as bytes.
///
/// # Example
///
/// ```rust,ignore
/// use convertino_core::testing::MockGateway;
///
/// let gateway = MockGateway::new();
/// gateway.fail_file("b.pdf", "bad format").await;
/// gateway.set_download("/d/a.docx", b"docx".to_vec()).await;
/// ```
#[derive(Debug)]
pub struct MockGateway {
    base_url: String,
    responses: Arc<RwLock<HashMap<String, ApiResponse>>>,
    file_responses: Arc<RwLock<HashMap<String, ApiResponse>>>,
    requests: Arc<RwLock<Vec<UploadRequest>>>,
    downloads: Arc<RwLock<HashMap<String, Bytes>>>,
    failing_downloads: Arc<RwLock<HashSet<String>>>,
    fetches: Arc<RwLock<Vec<String>>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    /// Create a new mock gateway.
    pub fn new() -> Self {
        Self::with_base_url(MOCK_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            responses: Arc::new(RwLock::new(HashMap::new())),
            file_responses: Arc::new(RwLock::new(HashMap::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            downloads: Arc::new(RwLock::new(HashMap::new())),
            failing_downloads: Arc::new(RwLock::new(HashSet::new())),
            fetches: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Answer every upload to `endpoint` with these links.
    pub async fn respond(&self, endpoint: &str, download: DownloadRef) {
        let response = match download {
            DownloadRef::Single(url) => ApiResponse {
                success: true,
                download_url: Some(url),
                ..Default::default()
            },
            DownloadRef::Multi(urls) => ApiResponse {
                success: true,
                download_urls: Some(urls),
                ..Default::default()
            },
        };
        self.respond_raw(endpoint, response).await;
    }

    /// Answer every upload to `endpoint` with a raw response body.
    pub async fn respond_raw(&self, endpoint: &str, response: ApiResponse) {
        self.responses
            .write()
            .await
            .insert(endpoint.to_string(), response);
    }

    /// Answer uploads of `file_name` with `success: false` and `error`.
    pub async fn fail_file(&self, file_name: &str, error: &str) {
        self.file_responses.write().await.insert(
            file_name.to_string(),
            ApiResponse {
                success: false,
                error: Some(error.to_string()),
                ..Default::default()
            },
        );
    }

    /// Bytes returned when `url` is fetched.
    pub async fn set_download(&self, url: &str, data: impl Into<Bytes>) {
        self.downloads
            .write()
            .await
            .insert(url.to_string(), data.into());
    }

    /// Make fetches of `url` fail with a 404.
    pub async fn fail_download(&self, url: &str) {
        self.failing_downloads.write().await.insert(url.to_string());
    }

    /// Get all recorded uploads.
    pub async fn requests(&self) -> Vec<UploadRequest> {
        self.requests.read().await.clone()
    }

    /// Get the number of fetches performed.
    pub async fn fetch_count(&self) -> usize {
        self.fetches.read().await.len()
    }
}

#[async_trait]
impl RemoteGateway for MockGateway {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn upload(&self, request: UploadRequest) -> Result<DownloadRef, GatewayError> {
        let file_response = self
            .file_responses
            .read()
            .await
            .get(&request.file.name)
            .cloned();
        let endpoint_response = self.responses.read().await.get(&request.endpoint).cloned();

        let response = file_response.or(endpoint_response).unwrap_or_else(|| ApiResponse {
            success: true,
            download_url: Some(format!("/api/download/mock/{}", request.file.name)),
            ..Default::default()
        });

        self.requests.write().await.push(request);
        response.into_download_ref()
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, GatewayError> {
        self.fetches.write().await.push(url.to_string());

        if self.failing_downloads.read().await.contains(url) {
            return Err(GatewayError::Status {
                status: 404,
                message: "Download failed: 404".to_string(),
            });
        }

        Ok(self
            .downloads
            .read()
            .await
            .get(url)
            .cloned()
            .unwrap_or_else(|| Bytes::copy_from_slice(url.as_bytes())))
    }
}
