//! Configuration module for the Soniox gateway
//!
//! Server configuration comes from environment variables (a `.env` file is
//! loaded in `main`) and, optionally, a YAML file whose values override the
//! environment. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use soniox_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config = ServerConfig::from_file(&PathBuf::from("config.yaml"))?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::JobOptions;
use crate::core::soniox::{
    DEFAULT_ASYNC_MODEL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REALTIME_MODEL, SONIOX_API_URL,
    SONIOX_WS_URL, SonioxConfig,
};

mod env;
mod validation;
mod yaml;

pub const DEFAULT_PORT: u16 = 8001;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to parse YAML config: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("{0}")]
    Invalid(String),
}

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone, PartialEq)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains everything needed to run the gateway:
/// - Server settings (host, port, TLS)
/// - Provider endpoints and default models
/// - File transcription tuning (chunking, retries, polling)
/// - Security settings (CORS, rate limiting, connection limits)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Provider settings
    /// REST API root for file transcription
    pub soniox_api_url: String,
    /// WebSocket endpoint for realtime sessions
    pub soniox_ws_url: String,
    /// Model used for file transcription when the request does not name one
    pub async_model: String,
    /// Model used for relay sessions when the client does not name one
    pub realtime_model: String,

    // File transcription
    /// Audio longer than this is split into chunks
    pub max_chunk_duration_secs: u64,
    /// Maximum credential attempts per chunk
    pub max_retries: usize,
    pub poll_interval_ms: u64,
    /// Give up on a job after this many seconds of polling. None waits forever.
    pub max_poll_wait_secs: Option<u64>,
    /// Timeout of each provider HTTP request
    pub request_timeout_secs: u64,
    /// Maximum multipart body size for uploads
    pub max_upload_bytes: usize,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: "*"
    pub cors_allowed_origins: Option<String>,

    // Rate limiting configuration
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,

    // Connection limits
    /// Maximum concurrent relay sessions
    /// Default: None (unlimited)
    pub max_websocket_connections: Option<usize>,
    /// Maximum relay sessions per IP address
    /// Default: 100
    pub max_connections_per_ip: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            tls: None,
            soniox_api_url: SONIOX_API_URL.to_string(),
            soniox_ws_url: SONIOX_WS_URL.to_string(),
            async_model: DEFAULT_ASYNC_MODEL.to_string(),
            realtime_model: DEFAULT_REALTIME_MODEL.to_string(),
            max_chunk_duration_secs: 3600,
            max_retries: 3,
            poll_interval_ms: 1000,
            max_poll_wait_secs: None,
            request_timeout_secs: 300,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cors_allowed_origins: Some("*".to_string()),
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
            max_websocket_connections: None,
            max_connections_per_ip: 100,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables only
    ///
    /// Unset variables fall back to defaults. The result is validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        env::apply_env(&mut config)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Environment variables (and `.env` values loaded by `main`) form the
    /// base; any value present in the YAML file overrides them. The merged
    /// configuration is validated.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;

        let mut config = Self::default();
        env::apply_env(&mut config)?;
        yaml_config.apply(&mut config)?;

        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    ///
    /// Returns true if TLS configuration is present
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_poll_wait(&self) -> Option<Duration> {
        self.max_poll_wait_secs.map(Duration::from_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// REST client settings derived from this configuration
    pub fn soniox_config(&self) -> SonioxConfig {
        SonioxConfig {
            api_url: self.soniox_api_url.clone(),
            request_timeout: self.request_timeout(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Job options for a request, before per-request overrides
    pub fn job_options(&self) -> JobOptions {
        JobOptions {
            max_retries: self.max_retries,
            poll_interval: self.poll_interval(),
            max_poll_wait: self.max_poll_wait(),
            ..JobOptions::new(self.async_model.clone())
        }
    }
}
