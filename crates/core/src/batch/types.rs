//! Types for batch runs.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::artifact::Artifact;

/// Lifecycle of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Idle,
    Running,
    /// Every item succeeded.
    Done,
    /// At least one item failed; the others were still attempted.
    PartialFailure,
    /// Stopped before all items were attempted.
    Cancelled,
}

impl BatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::PartialFailure | Self::Cancelled)
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Done => "done",
            Self::PartialFailure => "partial_failure",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Result for one produced file, or for one failed input item.
#[derive(Debug)]
pub enum Outcome {
    Success {
        artifact: Artifact,
        produced_name: String,
        source_item_id: String,
        source_item_name: String,
    },
    Failure {
        source_item_id: String,
        source_item_name: String,
        reason: String,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn source_item_id(&self) -> &str {
        match self {
            Self::Success { source_item_id, .. } | Self::Failure { source_item_id, .. } => {
                source_item_id
            }
        }
    }

    pub fn source_item_name(&self) -> &str {
        match self {
            Self::Success {
                source_item_name, ..
            }
            | Self::Failure {
                source_item_name, ..
            } => source_item_name,
        }
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            Self::Success { artifact, .. } => Some(artifact),
            Self::Failure { .. } => None,
        }
    }

    pub fn artifact_mut(&mut self) -> Option<&mut Artifact> {
        match self {
            Self::Success { artifact, .. } => Some(artifact),
            Self::Failure { .. } => None,
        }
    }

    /// Failure reason, if this outcome is a failure.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Failure { reason, .. } => Some(reason),
            Self::Success { .. } => None,
        }
    }
}

/// One run of a route over a list of items.
#[derive(Debug)]
pub struct BatchJob {
    pub id: String,
    pub route_id: String,
    pub target_format: String,
    pub state: BatchState,
    /// In input order; a fan-out item contributes several successes.
    pub outcomes: Vec<Outcome>,
    /// Items attempted so far.
    pub processed: usize,
    pub total: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchJob {
    pub fn new(route_id: impl Into<String>, target_format: impl Into<String>, total: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            route_id: route_id.into(),
            target_format: target_format.into(),
            state: BatchState::Idle,
            outcomes: Vec::new(),
            processed: 0,
            total,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn successes(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.outcomes.iter().filter_map(Outcome::artifact)
    }

    pub fn artifacts_mut(&mut self) -> impl Iterator<Item = &mut Artifact> {
        self.outcomes.iter_mut().filter_map(Outcome::artifact_mut)
    }

    /// Takes the artifacts, dropping failure records.
    pub fn into_artifacts(self) -> Vec<Artifact> {
        self.outcomes
            .into_iter()
            .filter_map(|o| match o {
                Outcome::Success { artifact, .. } => Some(artifact),
                Outcome::Failure { .. } => None,
            })
            .collect()
    }
}

/// Progress events, in the order they happen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchProgress {
    Started {
        batch_id: String,
        total: usize,
    },
    ItemStarted {
        index: usize,
        total: usize,
        name: String,
    },
    ItemFinished {
        processed: usize,
        total: usize,
        success: bool,
    },
    Finished {
        state: BatchState,
        successes: usize,
        failures: usize,
    },
}

/// Shared flag for stopping a batch between items.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Optional hooks for a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchControl {
    pub progress: Option<mpsc::Sender<BatchProgress>>,
    pub cancel: Option<CancelHandle>,
}

impl BatchControl {
    pub fn with_progress(mut self, progress: mpsc::Sender<BatchProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub(super) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelHandle::is_cancelled)
    }

    /// A closed receiver is ignored.
    pub(super) async fn report(&self, event: BatchProgress) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(event).await;
        }
    }
}
