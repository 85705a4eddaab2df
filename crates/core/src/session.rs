//! One user's conversion session.
//!
//! Owns the selected source route, the file set, the last batch and the
//! bundler. Starting a new batch or clearing results discards the previous
//! batch, which revokes every object URL its artifacts still hold.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::batch::{BatchControl, BatchJob, BatchOrchestrator};
use crate::bundler::{ArtifactBundler, ArtifactSink, DownloadError, SavedFile};
use crate::config::Config;
use crate::fileset::{FileSet, FileSetLimits, IntakeReport, RawFile};
use crate::gateway::{RemoteGateway, Warmup, WarmupOutcome};
use crate::object_url::ObjectUrlPool;
use crate::route::{ConversionRoute, RouteError, RouteRegistry};

/// Errors from session actions.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("No source format selected")]
    NoSource,

    #[error("No files selected")]
    NoFiles,

    #[error("No conversion results")]
    NoResults,

    #[error("No result at index {index} ({len} available)")]
    ResultIndex { index: usize, len: usize },

    #[error(transparent)]
    Download(#[from] DownloadError),
}

pub struct Session {
    registry: RouteRegistry,
    urls: ObjectUrlPool,
    files: FileSet,
    source: Option<String>,
    orchestrator: BatchOrchestrator,
    bundler: ArtifactBundler,
    warmup: Arc<Warmup>,
    last_job: Option<BatchJob>,
}

impl Session {
    pub fn new(
        config: &Config,
        registry: RouteRegistry,
        gateway: Arc<dyn RemoteGateway>,
        sink: Arc<dyn ArtifactSink>,
    ) -> Self {
        let urls = ObjectUrlPool::new();
        Self {
            registry,
            files: FileSet::new(FileSetLimits::from(&config.intake), urls.clone()),
            source: None,
            orchestrator: BatchOrchestrator::new(urls.clone()),
            bundler: ArtifactBundler::new(gateway, sink, urls.clone())
                .with_archive_name(config.output.archive_name.clone()),
            warmup: Arc::new(Warmup::new(&config.service)),
            last_job: None,
            urls,
        }
    }

    /// Sends the warm-up ping in the background. Only the first call pings.
    pub fn spawn_warmup(&self) -> tokio::task::JoinHandle<WarmupOutcome> {
        let warmup = self.warmup.clone();
        tokio::spawn(async move { warmup.ping_once().await })
    }

    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    /// Binds the session to a source format. Files and results are cleared
    /// and future intake is limited to the route's accept filter.
    pub fn select_source(&mut self, key: &str) -> Result<&ConversionRoute, SessionError> {
        let route = self
            .registry
            .lookup(key)
            .ok_or_else(|| RouteError::UnknownRoute(key.to_string()))?;

        self.files.clear();
        self.files.set_accept(Some(route.accept.clone()));
        self.last_job = None;
        self.source = Some(key.to_string());
        Ok(route)
    }

    pub fn source(&self) -> Option<&ConversionRoute> {
        self.source
            .as_deref()
            .and_then(|key| self.registry.lookup(key))
    }

    pub fn add_files(&mut self, files: impl IntoIterator<Item = RawFile>) -> IntakeReport {
        self.files.add(files)
    }

    pub fn remove_file(&mut self, id: &str) -> bool {
        self.files.remove(id)
    }

    pub fn files(&self) -> &FileSet {
        &self.files
    }

    /// Drops the file set and any results.
    pub fn clear(&mut self) {
        self.files.clear();
        self.last_job = None;
    }

    pub async fn convert(&mut self, target_format: &str) -> Result<&BatchJob, SessionError> {
        self.convert_with(target_format, BatchControl::default())
            .await
    }

    /// Runs a batch over the current files. The previous batch is discarded first.
    pub async fn convert_with(
        &mut self,
        target_format: &str,
        control: BatchControl,
    ) -> Result<&BatchJob, SessionError> {
        let key = self.source.as_deref().ok_or(SessionError::NoSource)?;
        let route = self
            .registry
            .lookup(key)
            .ok_or_else(|| RouteError::UnknownRoute(key.to_string()))?;
        if self.files.is_empty() {
            return Err(SessionError::NoFiles);
        }

        self.last_job = None;
        let job = self
            .orchestrator
            .run_with(self.files.items(), route, target_format, control)
            .await?;
        Ok(self.last_job.insert(job))
    }

    pub fn last_job(&self) -> Option<&BatchJob> {
        self.last_job.as_ref()
    }

    /// Discards the last batch and its artifacts.
    pub fn clear_results(&mut self) {
        if let Some(job) = self.last_job.take() {
            info!("Discarding results of batch {}", job.id);
        }
    }

    /// Link for the `index`-th produced artifact.
    pub fn link(&self, index: usize) -> Option<String> {
        self.last_job
            .as_ref()?
            .artifacts()
            .nth(index)
            .and_then(|artifact| self.bundler.link_for(artifact))
    }

    /// Saves the `index`-th produced artifact (counting successes only).
    pub async fn download(&mut self, index: usize) -> Result<SavedFile, SessionError> {
        let job = self.last_job.as_mut().ok_or(SessionError::NoResults)?;
        let len = job.successes().count();
        let artifact = job
            .artifacts_mut()
            .nth(index)
            .ok_or(SessionError::ResultIndex { index, len })?;
        Ok(self.bundler.download_one(artifact).await?)
    }

    /// Saves every produced artifact as one archive. `None` if nothing was produced.
    pub async fn download_all(&mut self) -> Result<Option<SavedFile>, SessionError> {
        let job = self.last_job.as_mut().ok_or(SessionError::NoResults)?;
        Ok(self
            .bundler
            .download_all_as_archive(job.artifacts_mut())
            .await?)
    }

    pub fn urls(&self) -> &ObjectUrlPool {
        &self.urls
    }
}
