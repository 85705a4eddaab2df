//! Converter backed by the remote conversion service.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::error::ConverterError;
use super::raster::shrink_to_limit;
use super::traits::Converter;
use crate::artifact::Artifact;
use crate::fileset::RawFile;
use crate::gateway::{RemoteGateway, UploadRequest};

/// Where a target is uploaded, and whether the target is sent along as a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEndpoint {
    pub path: String,
    /// When set, the requested target is sent in this multipart field.
    pub target_field: Option<String>,
}

impl RemoteEndpoint {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            target_field: None,
        }
    }

    /// Sends the target value in the named field (e.g. `format`).
    pub fn with_target_field(mut self, field: impl Into<String>) -> Self {
        self.target_field = Some(field.into());
        self
    }
}

/// Uploads each file to a service endpoint and returns one remote artifact
/// per download link, in the order the service listed them.
pub struct RemoteConverter {
    name: String,
    gateway: Arc<dyn RemoteGateway>,
    endpoint: RemoteEndpoint,
    overrides: Vec<(String, RemoteEndpoint)>,
    fields: Vec<(String, String)>,
    upload_limit: Option<u64>,
}

impl RemoteConverter {
    pub fn new(
        name: impl Into<String>,
        gateway: Arc<dyn RemoteGateway>,
        endpoint: RemoteEndpoint,
    ) -> Self {
        Self {
            name: name.into(),
            gateway,
            endpoint,
            overrides: Vec::new(),
            fields: Vec::new(),
            upload_limit: None,
        }
    }

    /// Uses a different endpoint for one target.
    pub fn for_target(mut self, target: impl Into<String>, endpoint: RemoteEndpoint) -> Self {
        self.overrides.push((target.into(), endpoint));
        self
    }

    /// Adds a fixed field sent with every upload.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Re-encodes images larger than `max_bytes` before upload.
    pub fn with_upload_limit(mut self, max_bytes: u64) -> Self {
        self.upload_limit = Some(max_bytes);
        self
    }

    fn endpoint_for(&self, target: &str) -> &RemoteEndpoint {
        self.overrides
            .iter()
            .find(|(t, _)| t == target)
            .map(|(_, e)| e)
            .unwrap_or(&self.endpoint)
    }

    async fn prepare(&self, file: &RawFile) -> Result<RawFile, ConverterError> {
        match self.upload_limit {
            Some(limit) if file.is_image() && file.size() > limit => {
                info!(
                    "Shrinking {} ({} bytes) below the {} byte upload limit",
                    file.name,
                    file.size(),
                    limit
                );
                let owned = file.clone();
                tokio::task::spawn_blocking(move || shrink_to_limit(&owned, limit)).await?
            }
            _ => Ok(file.clone()),
        }
    }
}

#[async_trait]
impl Converter for RemoteConverter {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_local(&self, _target: &str) -> bool {
        false
    }

    async fn convert(&self, file: &RawFile, target: &str) -> Result<Vec<Artifact>, ConverterError> {
        let endpoint = self.endpoint_for(target);
        let upload = self.prepare(file).await?;

        let mut request = UploadRequest::new(endpoint.path.clone(), upload);
        for (name, value) in &self.fields {
            request = request.with_field(name.clone(), value.clone());
        }
        if let Some(field) = &endpoint.target_field {
            request = request.with_field(field.clone(), target);
        }

        debug!("Uploading {} to {}", file.name, endpoint.path);
        let download = self.gateway.upload(request).await?;

        Ok(download.into_urls().into_iter().map(Artifact::remote).collect())
    }
}
