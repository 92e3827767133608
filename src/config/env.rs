//! Environment variable loading
//!
//! Unset or blank variables leave the current value untouched, so the
//! defaults from `ServerConfig::default()` survive.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::{ConfigError, ServerConfig, TlsConfig};

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parsed<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key,
                reason: format!("{raw:?}: {e}"),
            }),
        None => Ok(None),
    }
}

/// Apply environment variables on top of `config`.
pub(super) fn apply_env(config: &mut ServerConfig) -> Result<(), ConfigError> {
    if let Some(host) = var("HOST") {
        config.host = host;
    }
    if let Some(port) = parsed("PORT")? {
        config.port = port;
    }

    match (var("TLS_CERT_PATH"), var("TLS_KEY_PATH")) {
        (Some(cert), Some(key)) => {
            config.tls = Some(TlsConfig {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            });
        }
        (None, None) => {}
        _ => {
            return Err(ConfigError::Invalid(
                "TLS requires both TLS_CERT_PATH and TLS_KEY_PATH".to_string(),
            ));
        }
    }

    if let Some(url) = var("SONIOX_API_URL") {
        config.soniox_api_url = url;
    }
    if let Some(url) = var("SONIOX_WS_URL") {
        config.soniox_ws_url = url;
    }
    if let Some(model) = var("SONIOX_ASYNC_MODEL") {
        config.async_model = model;
    }
    if let Some(model) = var("SONIOX_REALTIME_MODEL") {
        config.realtime_model = model;
    }

    if let Some(secs) = parsed("MAX_CHUNK_DURATION_SECS")? {
        config.max_chunk_duration_secs = secs;
    }
    if let Some(retries) = parsed("MAX_RETRIES")? {
        config.max_retries = retries;
    }
    if let Some(ms) = parsed("POLL_INTERVAL_MS")? {
        config.poll_interval_ms = ms;
    }
    if let Some(secs) = parsed("MAX_POLL_WAIT_SECS")? {
        config.max_poll_wait_secs = Some(secs);
    }
    if let Some(secs) = parsed("REQUEST_TIMEOUT_SECS")? {
        config.request_timeout_secs = secs;
    }
    if let Some(bytes) = parsed("MAX_UPLOAD_BYTES")? {
        config.max_upload_bytes = bytes;
    }

    if let Some(origins) = var("CORS_ALLOWED_ORIGINS") {
        config.cors_allowed_origins = Some(origins);
    }
    if let Some(rps) = parsed("RATE_LIMIT_REQUESTS_PER_SECOND")? {
        config.rate_limit_requests_per_second = rps;
    }
    if let Some(burst) = parsed("RATE_LIMIT_BURST_SIZE")? {
        config.rate_limit_burst_size = burst;
    }
    if let Some(max) = parsed("MAX_WEBSOCKET_CONNECTIONS")? {
        config.max_websocket_connections = Some(max);
    }
    if let Some(max) = parsed("MAX_CONNECTIONS_PER_IP")? {
        config.max_connections_per_ip = max;
    }

    Ok(())
}
