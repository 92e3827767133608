//! REST surface tests: health check, shared middleware and the remote
//! object proxy.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::util::ServiceExt;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use soniox_gateway::{ServerConfig, routes, state::AppState};

fn test_config(api_url: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        soniox_api_url: api_url.to_string(),
        rate_limit_requests_per_second: 100000, // Disable for tests
        ..Default::default()
    }
}

async fn send(config: ServerConfig, request: Request<Body>) -> (StatusCode, Value) {
    let app = routes::create_app(AppState::new(config).unwrap());
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = routes::create_app(AppState::new(ServerConfig::default()).unwrap());
    let response = app.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, json!({"status": "OK", "service": "soniox-gateway"}));
}

#[tokio::test]
async fn test_cors_preflight_allows_any_origin() {
    let app = routes::create_app(AppState::new(ServerConfig::default()).unwrap());
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/transcribe")
        .header("origin", "https://app.example.com")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_list_files_passes_through() {
    let server = MockServer::start().await;
    let listing = json!({"files": [{"id": "file-1", "filename": "a.wav"}], "next_page_cursor": null});
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("limit", "5"))
        .and(header("authorization", "Bearer sk-ops"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = send(
        test_config(&server.uri()),
        get("/api/files?api_key=sk-ops&limit=5"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, listing);
}

#[tokio::test]
async fn test_list_transcriptions_default_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transcriptions"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"transcriptions": []})))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = send(
        test_config(&server.uri()),
        get("/api/transcriptions?api_key=sk-ops"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transcriptions"], json!([]));
}

#[tokio::test]
async fn test_list_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"models": [{"id": "stt-async-v3"}, {"id": "stt-rt-v3"}]})),
        )
        .mount(&server)
        .await;

    let (status, body) = send(test_config(&server.uri()), get("/api/models?api_key=sk-ops")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["models"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/files/file-9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/transcriptions/tr-9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let delete = |uri: &str| {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = send(
        test_config(&server.uri()),
        delete("/api/files/file-9?api_key=sk-ops"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "id": "file-9"}));

    let (status, body) = send(
        test_config(&server.uri()),
        delete("/api/transcriptions/tr-9?api_key=sk-ops"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "tr-9");
}

#[tokio::test]
async fn test_proxy_requires_api_key() {
    let server = MockServer::start().await;

    let (status, body) = send(test_config(&server.uri()), get("/api/files")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_proxy_keeps_provider_client_errors() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/files/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "not found"})))
        .mount(&server)
        .await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/files/missing?api_key=sk-ops")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(test_config(&server.uri()), request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("404"));
}
