//! File transcription endpoint
//!
//! `POST /transcribe` accepts a multipart form:
//! - `file`: the audio bytes (any container the decoder can probe)
//! - `api_keys`: comma-separated provider keys, tried in shuffled order
//! - `enable_diarization`: label speakers in the text (default false)
//! - `enable_language_identification`: optional, default false
//! - `model`: optional override of the configured async model
//! - `language_hints`: optional comma-separated language codes

use axum::{
    extract::{Multipart, State, multipart::MultipartError},
    response::Json,
};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::core::{AudioBlob, CredentialPool, MergedTranscript, measure_duration};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Parsed multipart fields of a transcription request.
#[derive(Debug, Default)]
pub struct TranscribeForm {
    pub file: Option<Bytes>,
    pub file_name: Option<String>,
    pub api_keys: Option<String>,
    pub enable_diarization: bool,
    pub enable_language_identification: bool,
    pub model: Option<String>,
    pub language_hints: Option<Vec<String>>,
}

impl TranscribeForm {
    /// Read every field of the form. Unknown fields are ignored.
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match name.as_str() {
                "file" => {
                    form.file_name = field.file_name().map(str::to_string);
                    form.file = Some(field.bytes().await.map_err(bad_multipart)?);
                }
                "api_keys" => form.api_keys = Some(field.text().await.map_err(bad_multipart)?),
                "enable_diarization" => {
                    let value = field.text().await.map_err(bad_multipart)?;
                    form.enable_diarization = parse_bool(&name, &value)?;
                }
                "enable_language_identification" => {
                    let value = field.text().await.map_err(bad_multipart)?;
                    form.enable_language_identification = parse_bool(&name, &value)?;
                }
                "model" => {
                    let value = field.text().await.map_err(bad_multipart)?;
                    form.model = Some(value.trim().to_string()).filter(|m| !m.is_empty());
                }
                "language_hints" => {
                    let value = field.text().await.map_err(bad_multipart)?;
                    let hints: Vec<String> = value
                        .split(',')
                        .map(str::trim)
                        .filter(|hint| !hint.is_empty())
                        .map(str::to_string)
                        .collect();
                    form.language_hints = Some(hints).filter(|h| !h.is_empty());
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

fn bad_multipart(err: MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid multipart form: {err}"))
}

/// Parse a form boolean the way HTML forms and HTTP clients send them.
pub fn parse_bool(field: &str, value: &str) -> AppResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::BadRequest(format!(
            "Invalid boolean for {field}: {other:?}"
        ))),
    }
}

/// Transcribe an uploaded audio file.
pub async fn transcribe_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<MergedTranscript>> {
    let request_id = Uuid::new_v4();
    let span = info_span!("transcribe_request", request_id = %request_id);

    async move {
        let form = TranscribeForm::read(multipart).await?;

        let pool = CredentialPool::parse(form.api_keys.as_deref().unwrap_or_default())?;

        let data = form
            .file
            .ok_or_else(|| AppError::BadRequest("Missing audio file".to_string()))?;

        let probe = data.clone();
        let duration = tokio::task::spawn_blocking(move || measure_duration(&probe))
            .await
            .map_err(|e| AppError::Internal(format!("duration probe failed: {e}")))?;
        if duration <= 0.0 {
            return Err(AppError::BadRequest("Unable to read audio file".to_string()));
        }

        let mut blob = AudioBlob::new(data, duration);
        if let Some(name) = form.file_name {
            blob = blob.with_file_name(name);
        }

        let mut options = state.config.job_options();
        options.enable_diarization = form.enable_diarization;
        options.enable_language_identification = form.enable_language_identification;
        options.language_hints = form.language_hints;
        if let Some(model) = form.model {
            options.model = model;
        }

        info!(
            bytes = blob.data.len(),
            duration,
            diarization = options.enable_diarization,
            model = %options.model,
            "Transcription request accepted"
        );

        let merged = state.aggregator(options).transcribe(blob, &pool).await?;

        info!(
            chunks = merged.total_chunks,
            total_secs = merged.processing_time.total,
            "Transcription request completed"
        );
        Ok(Json(merged))
    }
    .instrument(span)
    .await
}
