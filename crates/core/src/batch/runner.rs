//! Batch runner.

use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::types::{BatchControl, BatchJob, BatchProgress, BatchState, Outcome};
use crate::fileset::UploadedItem;
use crate::metrics;
use crate::object_url::ObjectUrlPool;
use crate::route::{ConversionRoute, RouteError};

const NO_OUTPUT: &str = "Conversion produced no output";

/// Runs routes over uploaded items, one item at a time.
///
/// Local artifacts get an object URL from the shared pool as they are
/// produced; the URL is revoked when the artifact is saved or dropped.
#[derive(Debug, Clone, Default)]
pub struct BatchOrchestrator {
    urls: ObjectUrlPool,
}

impl BatchOrchestrator {
    pub fn new(urls: ObjectUrlPool) -> Self {
        Self { urls }
    }

    pub async fn run(
        &self,
        items: &[UploadedItem],
        route: &ConversionRoute,
        target_format: &str,
    ) -> Result<BatchJob, RouteError> {
        self.run_with(items, route, target_format, BatchControl::default())
            .await
    }

    /// Runs a batch with progress reporting and cancellation.
    ///
    /// Cancellation is checked between items: the item in flight always
    /// finishes and its outcome is kept.
    pub async fn run_with(
        &self,
        items: &[UploadedItem],
        route: &ConversionRoute,
        target_format: &str,
        control: BatchControl,
    ) -> Result<BatchJob, RouteError> {
        if !route.supports(target_format) {
            return Err(RouteError::UnsupportedTarget {
                route: route.route_id.clone(),
                target: target_format.to_string(),
            });
        }

        let total = items.len();
        let mut job = BatchJob::new(route.route_id.clone(), target_format, total);
        job.state = BatchState::Running;
        job.started_at = Some(Utc::now());

        info!(
            "Starting batch {}: {} item(s) via {} to {}",
            job.id, total, route.route_id, target_format
        );
        control
            .report(BatchProgress::Started {
                batch_id: job.id.clone(),
                total,
            })
            .await;

        let mut cancelled = false;
        for (index, item) in items.iter().enumerate() {
            if control.is_cancelled() {
                info!(
                    "Batch {} cancelled after {} of {} item(s)",
                    job.id, job.processed, total
                );
                cancelled = true;
                break;
            }

            control
                .report(BatchProgress::ItemStarted {
                    index,
                    total,
                    name: item.file.name.clone(),
                })
                .await;

            let success = self.convert_item(&mut job, item, route, target_format).await;
            job.processed += 1;

            control
                .report(BatchProgress::ItemFinished {
                    processed: job.processed,
                    total,
                    success,
                })
                .await;
        }

        job.state = if cancelled {
            BatchState::Cancelled
        } else if job.failures().next().is_some() {
            BatchState::PartialFailure
        } else {
            BatchState::Done
        };
        job.finished_at = Some(Utc::now());

        let successes = job.successes().count();
        let failures = job.failures().count();
        info!(
            "Batch {} finished as {}: {} produced, {} failed",
            job.id, job.state, successes, failures
        );
        control
            .report(BatchProgress::Finished {
                state: job.state,
                successes,
                failures,
            })
            .await;

        Ok(job)
    }

    /// Converts one item and appends its outcomes. Returns whether it succeeded.
    async fn convert_item(
        &self,
        job: &mut BatchJob,
        item: &UploadedItem,
        route: &ConversionRoute,
        target_format: &str,
    ) -> bool {
        let started = Instant::now();
        let result = route.invoke(&item.file, target_format).await;
        metrics::CONVERSION_DURATION
            .with_label_values(&[route.route_id.as_str()])
            .observe(started.elapsed().as_secs_f64());

        let reason = match result {
            Ok(artifacts) if !artifacts.is_empty() => {
                debug!(
                    "{} produced {} artifact(s)",
                    item.file.name,
                    artifacts.len()
                );
                for mut artifact in artifacts {
                    artifact.ensure_url(&self.urls);
                    job.outcomes.push(Outcome::Success {
                        produced_name: artifact.suggested_filename().to_string(),
                        artifact,
                        source_item_id: item.id.clone(),
                        source_item_name: item.file.name.clone(),
                    });
                }
                metrics::CONVERSIONS_TOTAL
                    .with_label_values(&[route.route_id.as_str(), "success"])
                    .inc();
                return true;
            }
            Ok(_) => NO_OUTPUT.to_string(),
            Err(e) => e.to_string(),
        };

        warn!("Failed to convert {}: {}", item.file.name, reason);
        metrics::CONVERSIONS_TOTAL
            .with_label_values(&[route.route_id.as_str(), "failed"])
            .inc();
        job.outcomes.push(Outcome::Failure {
            source_item_id: item.id.clone(),
            source_item_name: item.file.name.clone(),
            reason,
        });
        false
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::*;
    use crate::batch::CancelHandle;
    use crate::fileset::{FileSet, FileSetLimits, RawFile};
    use crate::testing::MockConverter;

    fn items(urls: &ObjectUrlPool, names: &[&str]) -> FileSet {
        let mut set = FileSet::new(FileSetLimits::default(), urls.clone());
        set.add(
            names
                .iter()
                .map(|n| RawFile::new(*n, "application/octet-stream", vec![1, 2, 3])),
        );
        set
    }

    fn route(converter: Arc<MockConverter>) -> ConversionRoute {
        ConversionRoute::new("mock", "Mock", "*", converter).target("pdf", "PDF")
    }

    #[tokio::test]
    async fn test_all_succeed() {
        let urls = ObjectUrlPool::new();
        let set = items(&urls, &["a.doc", "b.doc"]);
        let converter = Arc::new(MockConverter::new().local());

        let job = BatchOrchestrator::new(urls.clone())
            .run(set.items(), &route(converter), "pdf")
            .await
            .unwrap();

        assert_eq!(job.state, BatchState::Done);
        assert_eq!(job.processed, 2);
        assert_eq!(job.outcomes.len(), 2);
        assert!(job.started_at.is_some() && job.finished_at.is_some());
        assert!(job.artifacts().all(|a| a.object_url().is_some()));
        assert_eq!(urls.live_count(), 2);

        drop(job);
        assert_eq!(urls.live_count(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_target_rejected_up_front() {
        let urls = ObjectUrlPool::new();
        let set = items(&urls, &["a.doc"]);
        let converter = Arc::new(MockConverter::new());

        let err = BatchOrchestrator::new(urls)
            .run(set.items(), &route(converter.clone()), "mp3")
            .await
            .unwrap_err();

        assert!(matches!(err, RouteError::UnsupportedTarget { .. }));
        assert_eq!(converter.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_empty_output_is_failure() {
        let urls = ObjectUrlPool::new();
        let set = items(&urls, &["a.doc"]);
        let converter = Arc::new(MockConverter::new());
        converter.set_output_count(0).await;

        let job = BatchOrchestrator::new(urls)
            .run(set.items(), &route(converter), "pdf")
            .await
            .unwrap();

        assert_eq!(job.state, BatchState::PartialFailure);
        assert_eq!(job.outcomes[0].reason(), Some(NO_OUTPUT));
    }

    #[tokio::test]
    async fn test_progress_events_in_order() {
        let urls = ObjectUrlPool::new();
        let set = items(&urls, &["a.doc", "b.doc"]);
        let converter = Arc::new(MockConverter::new());
        converter.fail_on("b.doc", "corrupt").await;
        let (tx, mut rx) = mpsc::channel(32);

        BatchOrchestrator::new(urls)
            .run_with(
                set.items(),
                &route(converter),
                "pdf",
                BatchControl::default().with_progress(tx),
            )
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(events.len(), 6);
        assert!(matches!(events[0], BatchProgress::Started { total: 2, .. }));
        assert!(matches!(events[1], BatchProgress::ItemStarted { index: 0, .. }));
        assert_eq!(
            events[4],
            BatchProgress::ItemFinished {
                processed: 2,
                total: 2,
                success: false
            }
        );
        assert_eq!(
            events[5],
            BatchProgress::Finished {
                state: BatchState::PartialFailure,
                successes: 1,
                failures: 1
            }
        );
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_stop_batch() {
        let urls = ObjectUrlPool::new();
        let set = items(&urls, &["a.doc", "b.doc", "c.doc"]);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let job = BatchOrchestrator::new(urls)
            .run_with(
                set.items(),
                &route(Arc::new(MockConverter::new())),
                "pdf",
                BatchControl::default().with_progress(tx),
            )
            .await
            .unwrap();

        assert_eq!(job.state, BatchState::Done);
        assert_eq!(job.processed, 3);
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let urls = ObjectUrlPool::new();
        let set = items(&urls, &["a.doc", "b.doc"]);
        let cancel = CancelHandle::new();
        cancel.cancel();

        let converter = Arc::new(MockConverter::new());
        let job = BatchOrchestrator::new(urls)
            .run_with(
                set.items(),
                &route(converter.clone()),
                "pdf",
                BatchControl::default().with_cancel(cancel),
            )
            .await
            .unwrap();

        assert_eq!(job.state, BatchState::Cancelled);
        assert!(job.outcomes.is_empty());
        assert_eq!(converter.call_count().await, 0);
    }
}
