use serde::Deserialize;
use std::path::PathBuf;

use super::{ConfigError, ServerConfig, TlsConfig};

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present
/// here override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8001
///   tls:
///     enabled: true
///     cert_path: "/etc/certs/cert.pem"
///     key_path: "/etc/certs/key.pem"
///
/// soniox:
///   api_url: "https://api.soniox.com/v1"
///   ws_url: "wss://stt-rt.soniox.com/transcribe-websocket"
///   async_model: "stt-async-v3"
///   realtime_model: "stt-rt-v3"
///   request_timeout_secs: 300
///
/// transcription:
///   max_chunk_duration_secs: 3600
///   max_retries: 3
///   poll_interval_ms: 1000
///   max_poll_wait_secs: 1800
///   max_upload_bytes: 2147483648
///
/// security:
///   cors_allowed_origins: "https://example.com"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
///   max_websocket_connections: 1000
///   max_connections_per_ip: 100
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub soniox: Option<SonioxYaml>,
    pub transcription: Option<TranscriptionYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Provider endpoints and models from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SonioxYaml {
    pub api_url: Option<String>,
    pub ws_url: Option<String>,
    pub async_model: Option<String>,
    pub realtime_model: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

/// File transcription tuning from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TranscriptionYaml {
    pub max_chunk_duration_secs: Option<u64>,
    pub max_retries: Option<usize>,
    pub poll_interval_ms: Option<u64>,
    pub max_poll_wait_secs: Option<u64>,
    pub max_upload_bytes: Option<usize>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
    pub max_websocket_connections: Option<usize>,
    pub max_connections_per_ip: Option<u32>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Override `config` with every value present in this file.
    ///
    /// A `tls` block with `enabled: false` removes TLS set from the
    /// environment; otherwise it needs both paths.
    pub fn apply(self, config: &mut ServerConfig) -> Result<(), ConfigError> {
        if let Some(server) = self.server {
            if let Some(host) = server.host {
                config.host = host;
            }
            if let Some(port) = server.port {
                config.port = port;
            }
            if let Some(tls) = server.tls {
                config.tls = match (tls.enabled.unwrap_or(true), tls.cert_path, tls.key_path) {
                    (false, _, _) => None,
                    (true, Some(cert), Some(key)) => Some(TlsConfig {
                        cert_path: PathBuf::from(cert),
                        key_path: PathBuf::from(key),
                    }),
                    _ => {
                        return Err(ConfigError::Invalid(
                            "TLS requires both cert_path and key_path".to_string(),
                        ));
                    }
                };
            }
        }

        if let Some(soniox) = self.soniox {
            if let Some(url) = soniox.api_url {
                config.soniox_api_url = url;
            }
            if let Some(url) = soniox.ws_url {
                config.soniox_ws_url = url;
            }
            if let Some(model) = soniox.async_model {
                config.async_model = model;
            }
            if let Some(model) = soniox.realtime_model {
                config.realtime_model = model;
            }
            if let Some(secs) = soniox.request_timeout_secs {
                config.request_timeout_secs = secs;
            }
        }

        if let Some(transcription) = self.transcription {
            if let Some(secs) = transcription.max_chunk_duration_secs {
                config.max_chunk_duration_secs = secs;
            }
            if let Some(retries) = transcription.max_retries {
                config.max_retries = retries;
            }
            if let Some(ms) = transcription.poll_interval_ms {
                config.poll_interval_ms = ms;
            }
            if let Some(secs) = transcription.max_poll_wait_secs {
                config.max_poll_wait_secs = Some(secs);
            }
            if let Some(bytes) = transcription.max_upload_bytes {
                config.max_upload_bytes = bytes;
            }
        }

        if let Some(security) = self.security {
            if let Some(origins) = security.cors_allowed_origins {
                config.cors_allowed_origins = Some(origins);
            }
            if let Some(rps) = security.rate_limit_requests_per_second {
                config.rate_limit_requests_per_second = rps;
            }
            if let Some(burst) = security.rate_limit_burst_size {
                config.rate_limit_burst_size = burst;
            }
            if let Some(max) = security.max_websocket_connections {
                config.max_websocket_connections = Some(max);
            }
            if let Some(max) = security.max_connections_per_ip {
                config.max_connections_per_ip = max;
            }
        }

        Ok(())
    }
}
