//! wiremock mounts for the provider REST API.

use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Uploads with `key` are rejected with 401.
pub async fn mount_rejected_key(server: &MockServer, key: &str) {
    Mock::given(method("POST"))
        .and(path("/files"))
        .and(header("authorization", format!("Bearer {key}").as_str()))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid API key"})),
        )
        .mount(server)
        .await;
}

/// A complete successful job for `key`: upload, create, completed status,
/// transcript and both deletes.
pub async fn mount_job(server: &MockServer, key: &str, job: &str, transcript: Value) {
    let auth = format!("Bearer {key}");
    let file_id = format!("file-{job}");
    let transcription_id = format!("tr-{job}");

    Mock::given(method("POST"))
        .and(path("/files"))
        .and(header("authorization", auth.as_str()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": file_id})))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/transcriptions"))
        .and(header("authorization", auth.as_str()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": transcription_id})))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/transcriptions/{transcription_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": transcription_id,
            "status": "completed",
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/transcriptions/{transcription_id}/transcript")))
        .respond_with(ResponseTemplate::new(200).set_body_json(transcript))
        .mount(server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("/transcriptions/{transcription_id}")))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("/files/{file_id}")))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

/// Transcript payload with two speakers.
pub fn two_speaker_transcript() -> Value {
    json!({
        "id": "tr",
        "text": "Hello there. Hi.",
        "tokens": [
            {"text": "Hello", "start_ms": 0, "end_ms": 400, "confidence": 0.98, "speaker": "1"},
            {"text": " there.", "start_ms": 400, "end_ms": 900, "confidence": 0.97, "speaker": "1"},
            {"text": "Hi.", "start_ms": 1000, "end_ms": 1300, "confidence": 0.95, "speaker": "2"}
        ]
    })
}

/// Number of requests the server received for `method` + `path`.
pub async fn request_count(server: &MockServer, method_name: &str, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| {
            request.method.as_str() == method_name && request.url.path() == request_path
        })
        .count()
}
