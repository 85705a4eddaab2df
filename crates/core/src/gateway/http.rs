//! reqwest-backed gateway.

use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use tracing::{debug, warn};

use super::types::{ApiResponse, DownloadRef, UploadRequest, FILE_FIELD};
use super::{GatewayError, RemoteGateway};
use crate::config::ServiceConfig;
use crate::metrics;

/// Gateway talking to the conversion service over HTTP.
///
/// Conversion uploads carry no client-side timeout: heavy server work such
/// as video transcoding is bounded by the service itself.
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: &ServiceConfig) -> Result<Self, GatewayError> {
        let client = Client::builder().user_agent(&config.user_agent).build()?;
        Ok(Self::with_client(client, &config.base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn build_form(request: UploadRequest) -> Result<Form, GatewayError> {
        let file = request.file;
        let part = Part::bytes(file.data.to_vec())
            .file_name(file.name)
            .mime_str(&file.mime_type)
            .map_err(|e| GatewayError::InvalidResponse(format!("invalid MIME type: {}", e)))?;

        let mut form = Form::new().part(FILE_FIELD, part);
        for (name, value) in request.fields {
            form = form.text(name, value);
        }
        Ok(form)
    }

    async fn parse_response(response: Response) -> Result<DownloadRef, GatewayError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_else(|| format!("Server error: {}", status.as_u16()));
            return Err(GatewayError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ApiResponse = serde_json::from_str(&body).map_err(|e| {
            let snippet: String = body.chars().take(200).collect();
            GatewayError::InvalidResponse(format!("{} (body: {})", e, snippet))
        })?;
        parsed.into_download_ref()
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn upload(&self, request: UploadRequest) -> Result<DownloadRef, GatewayError> {
        let url = self.resolve_url(&request.endpoint);
        let endpoint = request.endpoint.clone();
        debug!(
            "Uploading {} ({} bytes) to {}",
            request.file.name,
            request.file.size(),
            url
        );

        let started = Instant::now();
        let form = Self::build_form(request)?;
        let result = match self.client.post(&url).multipart(form).send().await {
            Ok(response) => Self::parse_response(response).await,
            Err(e) => Err(GatewayError::Http(e)),
        };

        let label = if result.is_ok() { "success" } else { "failed" };
        metrics::GATEWAY_REQUESTS
            .with_label_values(&[endpoint.as_str(), label])
            .inc();

        match &result {
            Ok(download) => debug!(
                "{} answered with {} download(s) in {:?}",
                endpoint,
                download.len(),
                started.elapsed()
            ),
            Err(e) => warn!("{} failed after {:?}: {}", endpoint, started.elapsed(), e),
        }
        result
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, GatewayError> {
        let url = self.resolve_url(url);
        debug!("Fetching {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                message: format!("Download failed: {}", status.as_u16()),
            });
        }
        Ok(response.bytes().await?)
    }
}
