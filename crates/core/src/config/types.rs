use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub intake: IntakeConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub image: ImageConfig,
}

/// Remote conversion service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Base URL every endpoint and relative download path is resolved against.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Send a best-effort ping once per session before the first conversion.
    #[serde(default = "default_true")]
    pub warmup_enabled: bool,
    /// Per-request timeout for the warm-up ping, in seconds.
    #[serde(default = "default_warmup_timeout")]
    pub warmup_timeout_secs: u64,
    /// Paths tried in order by the warm-up ping.
    #[serde(default = "default_ping_paths")]
    pub ping_paths: Vec<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            warmup_enabled: true,
            warmup_timeout_secs: default_warmup_timeout(),
            ping_paths: default_ping_paths(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    "https://fileconverterbackend-production.up.railway.app".to_string()
}

fn default_true() -> bool {
    true
}

fn default_warmup_timeout() -> u64 {
    8
}

fn default_ping_paths() -> Vec<String> {
    ["/health", "/ping", "/api/health", "/"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn default_user_agent() -> String {
    format!("convertino/{}", env!("CARGO_PKG_VERSION"))
}

/// File intake limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntakeConfig {
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_size_mb: default_max_size_mb(),
        }
    }
}

impl IntakeConfig {
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb * 1024 * 1024
    }
}

fn default_max_files() -> usize {
    10
}

fn default_max_size_mb() -> u64 {
    50
}

/// Where produced artifacts are saved
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_archive_name")]
    pub archive_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            archive_name: default_archive_name(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("converted")
}

fn default_archive_name() -> String {
    "converted_files.zip".to_string()
}

/// Local image encoding settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageConfig {
    /// Lossy encoder quality in (0, 1].
    #[serde(default = "default_quality")]
    pub quality: f32,
    /// Images above this size are shrunk before upload to size-limited endpoints.
    #[serde(default = "default_upload_limit_mb")]
    pub upload_limit_mb: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            upload_limit_mb: default_upload_limit_mb(),
        }
    }
}

impl ImageConfig {
    pub fn upload_limit_bytes(&self) -> u64 {
        self.upload_limit_mb * 1024 * 1024
    }
}

fn default_quality() -> f32 {
    0.92
}

fn default_upload_limit_mb() -> u64 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.intake.max_files, 10);
        assert_eq!(config.intake.max_size_bytes(), 50 * 1024 * 1024);
        assert_eq!(config.service.warmup_timeout_secs, 8);
        assert_eq!(config.service.ping_paths.len(), 4);
        assert_eq!(config.output.archive_name, "converted_files.zip");
        assert_eq!(config.image.upload_limit_bytes(), 2 * 1024 * 1024);
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[intake]
max_files = 3
"#,
        )
        .unwrap();
        assert_eq!(config.intake.max_files, 3);
        assert_eq!(config.intake.max_size_mb, 50);
        assert!(config.service.warmup_enabled);
    }
}
