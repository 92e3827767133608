//! Realtime duplex relay between a client WebSocket and the provider.
//!
//! The first client message is a JSON configuration carrying the provider key.
//! Once the upstream socket accepts that configuration, audio frames flow
//! client to upstream and result events flow back verbatim. A zero-length
//! binary frame marks end of audio; an event with `"finished": true` ends the
//! session.

mod config;
mod session;

use serde_json::{Value, json};
use thiserror::Error;

pub use config::{ClientConfig, DEFAULT_AUDIO_FORMAT, UpstreamConfig};
pub use session::{
    RealtimeRelay, SessionState, SessionSummary, pump_session, read_client_config,
};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration must include a non-empty api_key")]
    MissingApiKey,

    #[error("Invalid configuration message: {0}")]
    InvalidConfig(String),

    #[error("Expected a JSON configuration message, got a {0} frame")]
    UnexpectedFrame(&'static str),

    #[error("No configuration received within {0} seconds")]
    ConfigTimeout(u64),

    #[error("Client disconnected")]
    ClientGone,

    #[error("Client connection error: {0}")]
    Client(String),

    #[error("Failed to connect to transcription service: {0}")]
    UpstreamConnect(String),

    #[error("Transcription service error: {0}")]
    Upstream(String),

    #[error("Transcription service closed the connection before finishing")]
    UpstreamClosed,
}

impl RelayError {
    /// Numeric code carried in the client-facing error event.
    pub fn code(&self) -> u16 {
        match self {
            RelayError::MissingApiKey
            | RelayError::InvalidConfig(_)
            | RelayError::UnexpectedFrame(_) => 400,
            RelayError::ConfigTimeout(_) => 408,
            RelayError::ClientGone | RelayError::Client(_) => 499,
            RelayError::UpstreamConnect(_)
            | RelayError::Upstream(_)
            | RelayError::UpstreamClosed => 502,
        }
    }

    /// `{"error": ..., "error_code": ...}` event sent to the client.
    pub fn to_event(&self) -> Value {
        json!({
            "error": self.to_string(),
            "error_code": self.code(),
        })
    }
}

/// Whether an upstream event marks the end of the session.
pub fn is_finished_event(text: &str) -> bool {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|event| event.get("finished").and_then(Value::as_bool))
        .unwrap_or(false)
}
