use std::time::Duration;

/// Default REST base URL.
pub const SONIOX_API_URL: &str = "https://api.soniox.com/v1";

/// Default realtime WebSocket endpoint.
pub const SONIOX_WS_URL: &str = "wss://stt-rt.soniox.com/transcribe-websocket";

pub const DEFAULT_ASYNC_MODEL: &str = "stt-async-v3";
pub const DEFAULT_REALTIME_MODEL: &str = "stt-rt-v3";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the REST client.
#[derive(Debug, Clone)]
pub struct SonioxConfig {
    pub api_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for SonioxConfig {
    fn default() -> Self {
        Self {
            api_url: SONIOX_API_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl SonioxConfig {
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Absolute URL for a path relative to the API root.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
