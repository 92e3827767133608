use url::Url;

use super::{ConfigError, ServerConfig};

/// Check the merged configuration before the server starts.
pub(super) fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    validate_url("soniox_api_url", &config.soniox_api_url, &["http", "https"])?;
    validate_url("soniox_ws_url", &config.soniox_ws_url, &["ws", "wss"])?;

    if config.async_model.trim().is_empty() {
        return Err(invalid("async_model", "must not be empty"));
    }
    if config.realtime_model.trim().is_empty() {
        return Err(invalid("realtime_model", "must not be empty"));
    }
    if config.max_chunk_duration_secs == 0 {
        return Err(invalid("max_chunk_duration_secs", "must be greater than 0"));
    }
    if config.max_retries == 0 {
        return Err(invalid("max_retries", "must be at least 1"));
    }
    if config.poll_interval_ms == 0 {
        return Err(invalid("poll_interval_ms", "must be greater than 0"));
    }
    if config.request_timeout_secs == 0 {
        return Err(invalid("request_timeout_secs", "must be greater than 0"));
    }
    if config.max_upload_bytes == 0 {
        return Err(invalid("max_upload_bytes", "must be greater than 0"));
    }
    if config.rate_limit_requests_per_second == 0 {
        return Err(invalid(
            "rate_limit_requests_per_second",
            "must be greater than 0",
        ));
    }
    if config.rate_limit_burst_size == 0 {
        return Err(invalid("rate_limit_burst_size", "must be greater than 0"));
    }
    if config.max_connections_per_ip == 0 {
        return Err(invalid("max_connections_per_ip", "must be greater than 0"));
    }

    Ok(())
}

fn validate_url(key: &'static str, value: &str, schemes: &[&str]) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| invalid(key, &format!("{value:?}: {e}")))?;
    if !schemes.contains(&url.scheme()) {
        return Err(invalid(
            key,
            &format!("scheme must be one of {}", schemes.join(", ")),
        ));
    }
    Ok(())
}

fn invalid(key: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        reason: reason.to_string(),
    }
}
