use crate::config::types::{Config, FetchConfig, HeaderConfig, SearchConfig, StorageConfig};
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_search_config(&config.search)?;
    validate_fetch_config(&config.fetch)?;
    validate_headers(&config.headers)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates the search section
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            config.base_url
        )));
    }

    if config.default_query.trim().is_empty() {
        return Err(ConfigError::Validation(
            "default-query cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates request pacing and retry settings
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.min_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "min-delay-ms ({}) must not exceed max-delay-ms ({})",
            config.min_delay_ms, config.max_delay_ms
        )));
    }

    if config.min_backoff_ms > config.max_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "min-backoff-ms ({}) must not exceed max-backoff-ms ({})",
            config.min_backoff_ms, config.max_backoff_ms
        )));
    }

    if config.anomaly_markers.iter().any(|m| m.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "anomaly-markers cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates that every header is sendable as-is
fn validate_headers(headers: &HeaderConfig) -> Result<(), ConfigError> {
    for (name, value) in &headers.0 {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(format!("invalid header name '{}'", name)))?;
        HeaderValue::from_str(value).map_err(|_| {
            ConfigError::InvalidHeader(format!("invalid value for header '{}'", name))
        })?;
    }
    Ok(())
}

/// Validates storage settings
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.keep < 1 {
        return Err(ConfigError::Validation(
            "keep must be >= 1, otherwise the snapshot just written would be deleted".to_string(),
        ));
    }

    if config.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "data-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}
