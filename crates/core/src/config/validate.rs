use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Service base URL is an absolute http(s) URL
/// - Intake limits are non-zero
/// - Image quality is in (0, 1]
/// - Archive name ends in `.zip`
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let base_url = config.service.base_url.as_str();
    match reqwest::Url::parse(base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => {
            return Err(ConfigError::ValidationError(format!(
                "service.base_url must be an http(s) URL, got '{}'",
                base_url
            )))
        }
    }

    if config.intake.max_files == 0 {
        return Err(ConfigError::ValidationError(
            "intake.max_files cannot be 0".to_string(),
        ));
    }

    if config.intake.max_size_mb == 0 {
        return Err(ConfigError::ValidationError(
            "intake.max_size_mb cannot be 0".to_string(),
        ));
    }

    if !(config.image.quality > 0.0 && config.image.quality <= 1.0) {
        return Err(ConfigError::ValidationError(format!(
            "image.quality must be in (0, 1], got {}",
            config.image.quality
        )));
    }

    if !config.output.archive_name.ends_with(".zip") {
        return Err(ConfigError::ValidationError(
            "output.archive_name must end in .zip".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_rejects_relative_base_url() {
        let mut config = Config::default();
        config.service.base_url = "/api".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_rejects_zero_max_files() {
        let mut config = Config::default();
        config.intake.max_files = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_quality() {
        let mut config = Config::default();
        config.image.quality = 1.5;
        assert!(validate_config(&config).is_err());
        config.image.quality = 0.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_non_zip_archive_name() {
        let mut config = Config::default();
        config.output.archive_name = "bundle.tar".to_string();
        assert!(validate_config(&config).is_err());
    }
}
