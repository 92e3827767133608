//! Realtime relay WebSocket handler
//!
//! Each upgraded connection becomes one relay session against the provider's
//! streaming endpoint. The connection-limit slot reserved by the middleware
//! is held until the session ends.

use axum::{
    Extension,
    extract::{State, ws::WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::middleware::ClientIp;
use crate::state::{AppState, ConnectionGuard};

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Relay WebSocket handler
///
/// Upgrades the HTTP connection and hands the socket to the realtime relay.
pub async fn relay_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
) -> Response {
    debug!(ip = %ip, "Relay WebSocket upgrade requested");
    let guard = ConnectionGuard::new(state.clone(), ip);

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| async move {
            let summary = state.relay.run(socket).await;
            info!(
                ip = %ip,
                frames = summary.frames_forwarded,
                events = summary.events_forwarded,
                finished = summary.finished,
                "Relay connection closed"
            );
            drop(guard);
        })
}
