//! Boundary to the remote conversion service.
//!
//! The service accepts one multipart upload per conversion and answers with
//! JSON naming one or more download paths. Response shapes are normalised
//! into [`DownloadRef`] here so nothing downstream inspects optional fields.

mod http;
mod types;
mod url;
mod warmup;

pub use http::HttpGateway;
pub use types::{ApiResponse, DownloadRef, UploadRequest, FILE_FIELD};
pub use url::{filename_from_url, resolve_download_url};
pub use warmup::{Warmup, WarmupOutcome};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Errors from the remote service.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport-level failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// 2xx response with `success: false`.
    #[error("{0}")]
    Rejected(String),

    /// Body was not the expected JSON.
    #[error("Invalid response from conversion service: {0}")]
    InvalidResponse(String),

    /// `success: true` but no download path.
    #[error("Conversion service returned no download link")]
    EmptyResponse,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Client for the remote conversion service.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Base URL relative paths are resolved against.
    fn base_url(&self) -> &str;

    /// Makes a possibly-relative download path absolute.
    fn resolve_url(&self, url: &str) -> String {
        resolve_download_url(self.base_url(), url)
    }

    /// Uploads one file and returns where the result can be fetched.
    async fn upload(&self, request: UploadRequest) -> Result<DownloadRef, GatewayError>;

    /// Fetches the bytes behind a download path.
    async fn fetch(&self, url: &str) -> Result<Bytes, GatewayError>;
}
