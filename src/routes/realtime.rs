//! Realtime relay route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::relay::relay_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the relay WebSocket router
///
/// # Endpoint
///
/// `GET /ws/transcribe` - WebSocket upgrade into one relay session
///
/// # Protocol
///
/// After the upgrade, clients send:
/// 1. A JSON configuration text frame carrying `api_key` and provider options
/// 2. Binary audio frames, then an empty binary frame to end the stream
///
/// The gateway forwards provider result events verbatim until one carries
/// `"finished": true`. Failures produce a single
/// `{"error": "...", "error_code": N}` event before the socket closes.
///
/// # Example
///
/// ```json
/// // Client sends config
/// {"api_key": "...", "model": "stt-rt-v3", "audio_format": "auto", "enable_speaker_diarization": true}
///
/// // Client sends audio as binary frames, then an empty frame
/// // Server forwards events
/// {"tokens": [{"text": "Hello", "is_final": true}], "final_audio_proc_ms": 480}
/// {"tokens": [], "finished": true}
/// ```
pub fn create_realtime_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws/transcribe", get(relay_handler))
        .layer(TraceLayer::new_for_http())
}
