//! Best-effort warm-up ping for a cold-starting service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;

/// What the warm-up attempt observed. Never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarmupOutcome {
    /// An endpoint answered with a non-5xx status.
    Awake { endpoint: String },
    /// No ping endpoint answered; a final HEAD on the base URL was sent.
    Unconfirmed,
    /// A ping was already sent in this session, or warm-up is disabled.
    Skipped,
}

/// Sends at most one warm-up sequence per instance.
pub struct Warmup {
    client: Client,
    base_url: String,
    ping_paths: Vec<String>,
    timeout: Duration,
    enabled: bool,
    started: AtomicBool,
}

impl Warmup {
    /// Uses the configured user agent, like [`HttpGateway::new`](super::HttpGateway::new).
    pub fn new(config: &ServiceConfig) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .build()
            .unwrap_or_else(|e| {
                warn!("Warm-up client setup failed, using defaults: {}", e);
                Client::new()
            });
        Self::with_client(client, config)
    }

    pub fn with_client(client: Client, config: &ServiceConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ping_paths: config.ping_paths.clone(),
            timeout: Duration::from_secs(config.warmup_timeout_secs),
            enabled: config.warmup_enabled,
            started: AtomicBool::new(false),
        }
    }

    /// Tries each ping path in order; the first non-5xx answer wins.
    pub async fn ping_once(&self) -> WarmupOutcome {
        if !self.enabled || self.started.swap(true, Ordering::SeqCst) {
            return WarmupOutcome::Skipped;
        }

        for path in &self.ping_paths {
            let endpoint = format!("{}{}", self.base_url, path);
            match self.client.get(&endpoint).timeout(self.timeout).send().await {
                Ok(response) if response.status().as_u16() < 500 => {
                    info!("Conversion service is awake ({})", endpoint);
                    return WarmupOutcome::Awake { endpoint };
                }
                Ok(response) => debug!("Warm-up {} answered {}", endpoint, response.status()),
                Err(e) => debug!("Warm-up {} failed: {}", endpoint, e),
            }
        }

        if let Err(e) = self
            .client
            .head(&self.base_url)
            .timeout(self.timeout)
            .send()
            .await
        {
            debug!("Warm-up HEAD {} failed: {}", self.base_url, e);
        }
        WarmupOutcome::Unconfirmed
    }
}
