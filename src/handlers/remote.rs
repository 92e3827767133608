//! Provider-side object management
//!
//! Thin pass-through over the provider's listing and deletion endpoints so
//! operators can inspect and clean up files and jobs left behind by
//! interrupted requests. The provider key travels as the `api_key` query
//! parameter.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

use crate::core::{Credential, TranscriptionBackend};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

pub const DEFAULT_LIST_LIMIT: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct RemoteQuery {
    pub api_key: Option<String>,
    pub limit: Option<u32>,
}

impl RemoteQuery {
    fn credential(&self) -> AppResult<Credential> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(Credential::new)
            .ok_or_else(|| AppError::BadRequest("api_key query parameter is required".to_string()))
    }

    fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT)
    }
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RemoteQuery>,
) -> AppResult<Json<Value>> {
    let credential = query.credential()?;
    Ok(Json(state.soniox.list_files(&credential, query.limit()).await?))
}

pub async fn list_transcriptions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RemoteQuery>,
) -> AppResult<Json<Value>> {
    let credential = query.credential()?;
    Ok(Json(
        state
            .soniox
            .list_transcriptions(&credential, query.limit())
            .await?,
    ))
}

pub async fn list_models(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RemoteQuery>,
) -> AppResult<Json<Value>> {
    let credential = query.credential()?;
    Ok(Json(state.soniox.list_models(&credential).await?))
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
    Query(query): Query<RemoteQuery>,
) -> AppResult<Json<Value>> {
    let credential = query.credential()?;
    state.soniox.delete_file(&credential, &file_id).await?;
    info!(file_id = %file_id, credential = %credential.masked(), "Deleted remote file");
    Ok(Json(json!({"success": true, "id": file_id})))
}

pub async fn delete_transcription(
    State(state): State<Arc<AppState>>,
    Path(transcription_id): Path<String>,
    Query(query): Query<RemoteQuery>,
) -> AppResult<Json<Value>> {
    let credential = query.credential()?;
    state
        .soniox
        .delete_transcription(&credential, &transcription_id)
        .await?;
    info!(
        transcription_id = %transcription_id,
        credential = %credential.masked(),
        "Deleted remote transcription"
    );
    Ok(Json(json!({"success": true, "id": transcription_id})))
}
