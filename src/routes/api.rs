use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{remote, transcribe};
use crate::state::AppState;
use std::sync::Arc;

/// Create the REST API router
///
/// Uploads can be far larger than axum's default body limit, so the
/// transcription route carries its own limit from configuration.
pub fn create_api_router(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/transcribe",
            post(transcribe::transcribe_handler).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        // Provider-side objects
        .route("/api/files", get(remote::list_files))
        .route("/api/files/{file_id}", delete(remote::delete_file))
        .route("/api/transcriptions", get(remote::list_transcriptions))
        .route(
            "/api/transcriptions/{transcription_id}",
            delete(remote::delete_transcription),
        )
        .route("/api/models", get(remote::list_models))
        .layer(TraceLayer::new_for_http())
}
