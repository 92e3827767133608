//! Soniox REST backend.
//!
//! [`TranscriptionBackend`] is the seam the job runner drives. The production
//! implementation is [`SonioxClient`]; tests substitute scripted fakes.

mod client;
mod config;
mod messages;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

pub use client::SonioxClient;
pub use config::{
    DEFAULT_ASYNC_MODEL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REALTIME_MODEL,
    DEFAULT_REQUEST_TIMEOUT, SONIOX_API_URL, SONIOX_WS_URL, SonioxConfig,
};
pub use messages::{
    CreateTranscriptionRequest, CreateTranscriptionResponse, FileUploadResponse, JobStatus,
    TranscriptionStatus,
};

use super::credentials::Credential;
use super::error::AttemptError;

/// Async file transcription API, one call per lifecycle step.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Upload audio and return the remote file id.
    async fn upload_file(
        &self,
        credential: &Credential,
        audio: Bytes,
        file_name: &str,
        content_type: &str,
    ) -> Result<String, AttemptError>;

    /// Create a transcription job and return its id.
    async fn create_transcription(
        &self,
        credential: &Credential,
        request: &CreateTranscriptionRequest,
    ) -> Result<String, AttemptError>;

    async fn transcription_status(
        &self,
        credential: &Credential,
        transcription_id: &str,
    ) -> Result<TranscriptionStatus, AttemptError>;

    /// Raw transcript payload, parsed by the caller.
    async fn fetch_transcript(
        &self,
        credential: &Credential,
        transcription_id: &str,
    ) -> Result<Value, AttemptError>;

    async fn delete_transcription(
        &self,
        credential: &Credential,
        transcription_id: &str,
    ) -> Result<(), AttemptError>;

    async fn delete_file(&self, credential: &Credential, file_id: &str)
    -> Result<(), AttemptError>;
}
