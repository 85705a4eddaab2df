//! Mock converter for testing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::artifact::Artifact;
use crate::converter::{Converter, ConverterError};
use crate::fileset::RawFile;
use crate::gateway::GatewayError;

type ConvertHook = Arc<dyn Fn(&RawFile) + Send + Sync>;

/// A recorded conversion call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub file_name: String,
    pub target: String,
}

/// Mock implementation of the Converter trait.
///
/// Provides controllable behavior for testing:
/// - Track calls for assertions
/// - Fail specific files with a service-style message
/// - Produce several artifacts per file (fan-out)
/// - Run a hook or sleep while "converting"
///
/// Every produced artifact is local and carries the input bytes.
///
/// # Example
///
/// ```rust,ignore
/// use convertino_core::testing::MockConverter;
///
/// let converter = MockConverter::new();
/// converter.fail_on("b.pdf", "bad format").await;
/// converter.set_output_count(4).await;
///
/// let calls = converter.recorded_calls().await;
/// ```
pub struct MockConverter {
    local: bool,
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    failures: Arc<RwLock<HashMap<String, String>>>,
    output_count: Arc<RwLock<usize>>,
    delay: Arc<RwLock<Duration>>,
    hook: Arc<RwLock<Option<ConvertHook>>>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConverter {
    /// Create a new mock converter that reports itself as remote.
    pub fn new() -> Self {
        Self {
            local: false,
            calls: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            output_count: Arc::new(RwLock::new(1)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            hook: Arc::new(RwLock::new(None)),
        }
    }

    /// Report as an in-process converter.
    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }

    /// Make conversions of `file_name` fail with `message`.
    pub async fn fail_on(&self, file_name: &str, message: &str) {
        self.failures
            .write()
            .await
            .insert(file_name.to_string(), message.to_string());
    }

    /// Set how many artifacts each successful conversion yields.
    pub async fn set_output_count(&self, count: usize) {
        *self.output_count.write().await = count;
    }

    /// Simulated conversion time.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Run `hook` at the start of every conversion.
    pub async fn on_convert(&self, hook: impl Fn(&RawFile) + Send + Sync + 'static) {
        *self.hook.write().await = Some(Arc::new(hook));
    }

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Get the number of conversions attempted.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_local(&self, _target: &str) -> bool {
        self.local
    }

    async fn convert(&self, file: &RawFile, target: &str) -> Result<Vec<Artifact>, ConverterError> {
        self.calls.write().await.push(RecordedCall {
            file_name: file.name.clone(),
            target: target.to_string(),
        });

        let hook = self.hook.read().await.clone();
        if let Some(hook) = hook {
            hook(file);
        }

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self.failures.read().await.get(&file.name) {
            return Err(GatewayError::Rejected(message.clone()).into());
        }

        let count = *self.output_count.read().await;
        let artifacts = (1..=count)
            .map(|i| {
                let name = if count == 1 {
                    format!("{}.{}", file.stem(), target)
                } else {
                    format!("{}_{}.{}", file.stem(), i, target)
                };
                Artifact::local(name, "application/octet-stream", file.data.clone())
            })
            .collect();
        Ok(artifacts)
    }
}
