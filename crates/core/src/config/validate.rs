use url::Url;

use super::{types::Config, ConfigError};
use crate::orchestrator::RELEASE_ID_PLACEHOLDER;

/// Validate configuration
/// Currently validates:
/// - Catalog base URL is an http(s) URL and the provider host is set
/// - Catalog timeout and page limit are not 0
/// - Submit concurrency is not 0
/// - Callback template, when set, contains the release ID placeholder
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Catalog validation
    match Url::parse(&config.catalog.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => {
            return Err(ConfigError::ValidationError(format!(
                "catalog.base_url must be an http(s) URL, got '{}'",
                config.catalog.base_url
            )));
        }
    }

    if config.catalog.provider_host.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "catalog.provider_host cannot be empty".to_string(),
        ));
    }

    if config.catalog.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "catalog.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.catalog.max_pages == 0 {
        return Err(ConfigError::ValidationError(
            "catalog.max_pages cannot be 0".to_string(),
        ));
    }

    // Orchestrator validation
    if config.orchestrator.submit_concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.submit_concurrency cannot be 0".to_string(),
        ));
    }

    if let Some(template) = &config.orchestrator.callback_url_template {
        if !template.contains(RELEASE_ID_PLACEHOLDER) {
            return Err(ConfigError::ValidationError(format!(
                "orchestrator.callback_url_template must contain {}",
                RELEASE_ID_PLACEHOLDER
            )));
        }
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
    fn test_validate_bad_base_url_fails() {
        let mut config = Config::default();
        config.catalog.base_url = "ftp://catalog.example".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));

        config.catalog.base_url = "not a url".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_provider_host_fails() {
        let mut config = Config::default();
        config.catalog.provider_host = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_limits_fail() {
        let mut config = Config::default();
        config.orchestrator.submit_concurrency = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("submit_concurrency"));

        let mut config = Config::default();
        config.catalog.max_pages = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_callback_template() {
        let mut config = Config::default();
        config.orchestrator.callback_url_template = Some("http://localhost/album".to_string());
        assert!(validate_config(&config).is_err());

        config.orchestrator.callback_url_template =
            Some("http://localhost/album/{release_id}".to_string());
        assert!(validate_config(&config).is_ok());
    }
}
