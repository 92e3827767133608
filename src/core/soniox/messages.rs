//! REST payloads exchanged with the provider.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct FileUploadResponse {
    pub id: String,
}

/// Body of `POST /transcriptions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateTranscriptionRequest {
    pub file_id: String,
    pub model: String,
    pub enable_speaker_diarization: bool,
    pub enable_language_identification: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_hints: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTranscriptionResponse {
    pub id: String,
}

/// Remote job status.
///
/// `failed` is accepted as a synonym for `error`; anything unrecognized is
/// treated as still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    #[serde(alias = "failed")]
    Error,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// Body of `GET /transcriptions/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionStatus {
    pub status: JobStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl TranscriptionStatus {
    pub fn new(status: JobStatus) -> Self {
        Self {
            status,
            error_message: None,
        }
    }
}
