use axum::response::Json;
use serde_json::{Value, json};

/// Health check handler
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "service": "soniox-gateway",
    }))
}
