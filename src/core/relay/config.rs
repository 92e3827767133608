use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::RelayError;

/// Default audio format: let the provider detect the container.
pub const DEFAULT_AUDIO_FORMAT: &str = "auto";

/// First message a relay client sends. Only `api_key` is mandatory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub audio_format: Option<String>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub num_channels: Option<u16>,
    #[serde(default)]
    pub enable_speaker_diarization: Option<bool>,
    #[serde(default)]
    pub enable_language_identification: Option<bool>,
    #[serde(default)]
    pub enable_endpoint_detection: Option<bool>,
    #[serde(default)]
    pub language_hints: Option<Vec<String>>,
    #[serde(default)]
    pub context: Option<Value>,
    #[serde(default)]
    pub translation: Option<Value>,
    /// Provider options this gateway does not model, forwarded untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClientConfig {
    pub fn from_text(text: &str) -> Result<Self, RelayError> {
        serde_json::from_str(text).map_err(|e| RelayError::InvalidConfig(e.to_string()))
    }

    /// Validate and fill defaults for the upstream handshake.
    pub fn into_upstream(self, default_model: &str) -> Result<UpstreamConfig, RelayError> {
        let api_key = self
            .api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(RelayError::MissingApiKey)?;

        Ok(UpstreamConfig {
            api_key,
            model: self
                .model
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| default_model.to_string()),
            audio_format: self
                .audio_format
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| DEFAULT_AUDIO_FORMAT.to_string()),
            sample_rate: self.sample_rate,
            num_channels: self.num_channels,
            enable_speaker_diarization: self.enable_speaker_diarization,
            enable_language_identification: self.enable_language_identification,
            enable_endpoint_detection: self.enable_endpoint_detection,
            language_hints: self.language_hints,
            context: self.context,
            translation: self.translation,
            extra: self.extra,
        })
    }
}

/// Handshake sent as the first upstream text frame.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamConfig {
    pub api_key: String,
    pub model: String,
    pub audio_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_channels: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_speaker_diarization: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_language_identification: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_endpoint_detection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_hints: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
