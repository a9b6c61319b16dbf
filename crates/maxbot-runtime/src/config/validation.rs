//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ApiConfig, MaxbotConfig, PollingConfig};

/// Upper bound the platform accepts for `limit`.
const MAX_LIMIT: u32 = 1000;

/// Upper bound the platform accepts for the long-poll timeout.
const MAX_POLL_TIMEOUT_SECS: u32 = 90;

/// Validates the entire configuration.
pub fn validate_config(config: &MaxbotConfig) -> ConfigResult<()> {
    validate_api_config(&config.api)?;
    validate_polling_config(&config.polling)?;
    Ok(())
}

fn validate_api_config(api: &ApiConfig) -> ConfigResult<()> {
    if api.token.trim().is_empty() {
        return Err(ConfigError::missing_field("api.token"));
    }

    validate_url(&api.base_url)?;

    if api.request_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "Request timeout must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_polling_config(polling: &PollingConfig) -> ConfigResult<()> {
    if !(1..=MAX_LIMIT).contains(&polling.limit) {
        return Err(ConfigError::validation(format!(
            "Polling limit must be between 1 and {MAX_LIMIT}, got {}",
            polling.limit
        )));
    }

    if polling.timeout_secs > MAX_POLL_TIMEOUT_SECS {
        return Err(ConfigError::validation(format!(
            "Polling timeout must be at most {MAX_POLL_TIMEOUT_SECS} seconds, got {}",
            polling.timeout_secs
        )));
    }

    Ok(())
}

/// Validates a URL.
fn validate_url(url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing_field("api.base_url"));
    }

    let valid_schemes = ["http://", "https://"];
    if !valid_schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {:?}", valid_schemes),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> MaxbotConfig {
        let mut config = MaxbotConfig::default();
        config.api.token = "secret".to_string();
        config
    }

    #[test]
    fn test_validate_default_with_token() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_validate_missing_token() {
        let result = validate_config(&MaxbotConfig::default());
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn test_validate_base_url_scheme() {
        let mut config = valid();
        config.api.base_url = "ftp://example.com".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_validate_polling_bounds() {
        let mut config = valid();
        config.polling.limit = 0;
        assert!(validate_config(&config).is_err());

        let mut config = valid();
        config.polling.limit = 1001;
        assert!(validate_config(&config).is_err());

        let mut config = valid();
        config.polling.timeout_secs = 91;
        assert!(validate_config(&config).is_err());

        let mut config = valid();
        config.polling.timeout_secs = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_request_timeout() {
        let mut config = valid();
        config.api.request_timeout_secs = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }
}
