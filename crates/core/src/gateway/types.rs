//! Wire types for the conversion service.

use serde::{Deserialize, Serialize};

use super::GatewayError;
use crate::fileset::RawFile;

/// Multipart field carrying the uploaded file.
pub const FILE_FIELD: &str = "file";

/// One upload to a conversion endpoint.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Endpoint path relative to the service base, e.g. `/api/convert/video`.
    pub endpoint: String,
    pub file: RawFile,
    /// Extra string fields such as `format` or `level`.
    pub fields: Vec<(String, String)>,
}

impl UploadRequest {
    pub fn new(endpoint: impl Into<String>, file: RawFile) -> Self {
        Self {
            endpoint: endpoint.into(),
            file,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

/// JSON body returned by every conversion endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    /// Normalises the response. A non-empty `download_urls` wins over `download_url`.
    pub fn into_download_ref(self) -> Result<DownloadRef, GatewayError> {
        if !self.success {
            return Err(GatewayError::Rejected(
                self.error
                    .or(self.message)
                    .unwrap_or_else(|| "Conversion failed".to_string()),
            ));
        }

        match (self.download_urls, self.download_url) {
            (Some(urls), _) if !urls.is_empty() => Ok(DownloadRef::Multi(urls)),
            (_, Some(url)) if !url.is_empty() => Ok(DownloadRef::Single(url)),
            _ => Err(GatewayError::EmptyResponse),
        }
    }
}

/// Where a conversion result lives on the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadRef {
    Single(String),
    /// Fan-out results, in the order the service listed them.
    Multi(Vec<String>),
}

impl DownloadRef {
    pub fn into_urls(self) -> Vec<String> {
        match self {
            Self::Single(url) => vec![url],
            Self::Multi(urls) => urls,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Multi(urls) => urls.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
