//! In-memory artifact sink for testing.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::bundler::{ArtifactSink, DownloadError, SavedFile};

/// Keeps every saved file in memory, in save order.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: Arc<RwLock<Vec<(String, Bytes)>>>,
    fail_saves: Arc<RwLock<bool>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following save fail.
    pub async fn set_failing(&self, failing: bool) {
        *self.fail_saves.write().await = failing;
    }

    /// Get all saved files.
    pub async fn saved(&self) -> Vec<(String, Bytes)> {
        self.files.read().await.clone()
    }

    /// Get the last file saved under `name`.
    pub async fn get(&self, name: &str) -> Option<Bytes> {
        self.files
            .read()
            .await
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.clone())
    }
}

#[async_trait]
impl ArtifactSink for MemorySink {
    async fn save(&self, filename: &str, data: Bytes) -> Result<SavedFile, DownloadError> {
        if *self.fail_saves.read().await {
            return Err(DownloadError::Sink {
                name: filename.to_string(),
                reason: "sink is failing".to_string(),
            });
        }

        let size_bytes = data.len() as u64;
        self.files.write().await.push((filename.to_string(), data));
        Ok(SavedFile {
            filename: filename.to_string(),
            location: format!("memory://{}", filename),
            size_bytes,
        })
    }
}
