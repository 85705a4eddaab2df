//! Artifact download and archiving.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use super::archive::build_zip;
use super::sink::{ArtifactSink, SavedFile};
use super::DownloadError;
use crate::artifact::Artifact;
use crate::gateway::RemoteGateway;
use crate::metrics;
use crate::object_url::ObjectUrlPool;

const DEFAULT_ARCHIVE_NAME: &str = "converted_files.zip";

/// Saves artifacts through a sink, fetching remote bytes as needed.
pub struct ArtifactBundler {
    gateway: Arc<dyn RemoteGateway>,
    sink: Arc<dyn ArtifactSink>,
    urls: ObjectUrlPool,
    archive_name: String,
}

impl ArtifactBundler {
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        sink: Arc<dyn ArtifactSink>,
        urls: ObjectUrlPool,
    ) -> Self {
        Self {
            gateway,
            sink,
            urls,
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }

    pub fn with_archive_name(mut self, name: impl Into<String>) -> Self {
        self.archive_name = name.into();
        self
    }

    /// A link the user could follow: the object URL of a local artifact,
    /// or the absolute URL of a remote one.
    pub fn link_for(&self, artifact: &Artifact) -> Option<String> {
        match artifact {
            Artifact::Local(_) => artifact.object_url().map(str::to_string),
            Artifact::Remote(remote) => Some(self.gateway.resolve_url(&remote.url)),
        }
    }

    /// Saves one artifact under its suggested name.
    ///
    /// A local artifact's object URL is revoked afterwards whether or not the
    /// save succeeded; calling this again allocates a fresh one. Remote bytes
    /// are cached on the artifact after the first fetch.
    pub async fn download_one(&self, artifact: &mut Artifact) -> Result<SavedFile, DownloadError> {
        let kind = artifact.kind();
        let result = self.save_artifact(artifact).await;
        artifact.release_url();

        let label = if result.is_ok() { "success" } else { "failed" };
        metrics::DOWNLOADS_TOTAL
            .with_label_values(&[kind.as_str(), label])
            .inc();
        result
    }

    async fn save_artifact(&self, artifact: &mut Artifact) -> Result<SavedFile, DownloadError> {
        artifact.ensure_url(&self.urls);
        let data = self.bytes_for(artifact).await?;
        self.sink.save(artifact.suggested_filename(), data).await
    }

    /// Saves every artifact in one ZIP archive. An empty list is a no-op.
    ///
    /// If any remote artifact can't be fetched, nothing is saved and the
    /// error names that artifact; the others stay available for individual
    /// download.
    pub async fn download_all_as_archive<'a, I>(
        &self,
        artifacts: I,
    ) -> Result<Option<SavedFile>, DownloadError>
    where
        I: IntoIterator<Item = &'a mut Artifact>,
    {
        let mut artifacts: Vec<&mut Artifact> = artifacts.into_iter().collect();
        if artifacts.is_empty() {
            return Ok(None);
        }

        let mut entries = Vec::with_capacity(artifacts.len());
        for artifact in artifacts.iter_mut() {
            let data = self.bytes_for(*artifact).await.map_err(|e| {
                warn!("Archive aborted: {}", e);
                e
            })?;
            entries.push((artifact.suggested_filename().to_string(), data));
        }

        let archive = tokio::task::spawn_blocking(move || build_zip(&entries))
            .await
            .map_err(|e| DownloadError::Archive(e.to_string()))??;

        let saved = self
            .sink
            .save(&self.archive_name, Bytes::from(archive))
            .await?;
        metrics::ARCHIVES_BUILT.inc();
        info!(
            "Saved {} artifact(s) to {}",
            artifacts.len(),
            saved.location
        );

        for artifact in artifacts.iter_mut() {
            artifact.release_url();
        }
        Ok(Some(saved))
    }

    async fn bytes_for(&self, artifact: &mut Artifact) -> Result<Bytes, DownloadError> {
        if let Some(data) = artifact.bytes_in_memory() {
            return Ok(data.clone());
        }

        match artifact {
            Artifact::Local(local) => Ok(local.data.clone()),
            Artifact::Remote(remote) => {
                let data = self.gateway.fetch(&remote.url).await.map_err(|source| {
                    DownloadError::Fetch {
                        name: remote.suggested_filename.clone(),
                        source,
                    }
                })?;
                remote.store_fetched(data.clone());
                Ok(data)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemorySink, MockGateway};

    fn bundler(gateway: Arc<MockGateway>, sink: Arc<MemorySink>, urls: &ObjectUrlPool) -> ArtifactBundler {
        ArtifactBundler::new(gateway, sink, urls.clone())
    }

    #[tokio::test]
    async fn test_local_download_revokes_url() {
        let urls = ObjectUrlPool::new();
        let sink = Arc::new(MemorySink::new());
        let bundler = bundler(Arc::new(MockGateway::new()), sink.clone(), &urls);

        let mut artifact = Artifact::local("a.png", "image/png", vec![1, 2]);
        artifact.ensure_url(&urls);
        assert_eq!(urls.live_count(), 1);

        let saved = bundler.download_one(&mut artifact).await.unwrap();
        assert_eq!(saved.filename, "a.png");
        assert_eq!(saved.size_bytes, 2);
        assert!(artifact.object_url().is_none());
        assert_eq!(urls.live_count(), 0);
    }

    #[tokio::test]
    async fn test_remote_fetched_once() {
        let urls = ObjectUrlPool::new();
        let gateway = Arc::new(MockGateway::new());
        gateway.set_download("/d/out.pdf", b"pdf-bytes".to_vec()).await;
        let sink = Arc::new(MemorySink::new());
        let bundler = bundler(gateway.clone(), sink.clone(), &urls);

        let mut artifact = Artifact::remote("/d/out.pdf");
        bundler.download_one(&mut artifact).await.unwrap();
        bundler.download_one(&mut artifact).await.unwrap();

        assert_eq!(gateway.fetch_count().await, 1);
        assert_eq!(sink.saved().await.len(), 2);
    }

    #[tokio::test]
    async fn test_link_for_remote_is_absolute() {
        let urls = ObjectUrlPool::new();
        let gateway = Arc::new(MockGateway::with_base_url("https://svc.example"));
        let bundler = bundler(gateway, Arc::new(MemorySink::new()), &urls);

        let artifact = Artifact::remote("/api/download/x/out.docx");
        assert_eq!(
            bundler.link_for(&artifact).unwrap(),
            "https://svc.example/api/download/x/out.docx"
        );
    }
}
