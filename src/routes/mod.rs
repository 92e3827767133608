//! Router assembly
//!
//! `create_app` combines every route group with the middleware shared by
//! all of them. Rate limiting is layered on by `main` since it depends on
//! the real peer address.

pub mod api;
pub mod realtime;

use axum::{Router, middleware, routing::get};
use http::{HeaderName, HeaderValue, Method, header::CONTENT_TYPE};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use crate::handlers::api::health_check;
use crate::middleware::connection_limit_middleware;
use crate::state::AppState;

/// Build the complete application router.
pub fn create_app(state: Arc<AppState>) -> Router {
    let api_routes = api::create_api_router(state.config.max_upload_bytes);

    let realtime_routes = realtime::create_realtime_router().layer(
        middleware::from_fn_with_state(state.clone(), connection_limit_middleware),
    );

    let public_routes = Router::new().route("/", get(health_check));

    // Security headers
    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ));

    let cors = cors_layer(state.config.cors_allowed_origins.as_deref());

    public_routes
        .merge(api_routes)
        .merge(realtime_routes)
        .with_state(state)
        .layer(cors)
        .layer(security_headers)
}

/// Configure CORS from a comma-separated origin list or `*`.
pub fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    let headers = [CONTENT_TYPE, HeaderName::from_static("x-request-id")];

    match origins {
        Some("*") => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(false),
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(methods)
                .allow_headers(headers)
                .allow_credentials(true)
        }
        None => {
            // Same-origin only: no allow_origin means browsers block cross-origin calls
            info!(
                "CORS not configured, defaulting to same-origin only. \
                 Set CORS_ALLOWED_ORIGINS to enable cross-origin access."
            );
            CorsLayer::new()
                .allow_methods(methods)
                .allow_headers(headers)
                .allow_credentials(false)
        }
    }
}
