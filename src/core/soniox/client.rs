use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::config::SonioxConfig;
use super::messages::{
    CreateTranscriptionRequest, CreateTranscriptionResponse, FileUploadResponse,
    TranscriptionStatus,
};
use super::TranscriptionBackend;
use crate::core::credentials::Credential;
use crate::core::error::{ApiStep, AttemptError};

const USER_AGENT: &str = concat!("soniox-gateway/", env!("CARGO_PKG_VERSION"));

/// Error bodies are truncated to this many characters before being logged.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// reqwest-based client for the provider's REST API.
///
/// Holds no credentials; every call is authorized with the key passed in.
#[derive(Debug, Clone)]
pub struct SonioxClient {
    http: Client,
    config: SonioxConfig,
}

impl SonioxClient {
    pub fn new(config: SonioxConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &SonioxConfig {
        &self.config
    }

    async fn execute(&self, step: ApiStep, request: RequestBuilder) -> Result<Response, AttemptError> {
        let response = request.send().await.map_err(|e| AttemptError::Transport {
            step,
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(AttemptError::Status {
                step,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(step: ApiStep, response: Response) -> Result<T, AttemptError> {
        response.json::<T>().await.map_err(|e| AttemptError::Decode {
            step,
            message: e.to_string(),
        })
    }

    async fn get_json(
        &self,
        credential: &Credential,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, AttemptError> {
        let request = self
            .http
            .get(self.config.endpoint(path))
            .bearer_auth(credential.expose())
            .query(query);
        let response = self.execute(ApiStep::List, request).await?;
        Self::decode(ApiStep::List, response).await
    }

    /// `GET /files`, passed through verbatim.
    pub async fn list_files(&self, credential: &Credential, limit: u32) -> Result<Value, AttemptError> {
        self.get_json(credential, "files", &[("limit", limit.to_string())])
            .await
    }

    /// `GET /transcriptions`, passed through verbatim.
    pub async fn list_transcriptions(
        &self,
        credential: &Credential,
        limit: u32,
    ) -> Result<Value, AttemptError> {
        self.get_json(credential, "transcriptions", &[("limit", limit.to_string())])
            .await
    }

    /// `GET /models`, passed through verbatim.
    pub async fn list_models(&self, credential: &Credential) -> Result<Value, AttemptError> {
        self.get_json(credential, "models", &[]).await
    }
}

#[async_trait]
impl TranscriptionBackend for SonioxClient {
    async fn upload_file(
        &self,
        credential: &Credential,
        audio: Bytes,
        file_name: &str,
        content_type: &str,
    ) -> Result<String, AttemptError> {
        let size = audio.len();
        let part = Part::bytes(audio.to_vec())
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| AttemptError::Transport {
                step: ApiStep::Upload,
                message: format!("invalid content type {content_type}: {e}"),
            })?;
        let form = Form::new().part("file", part);

        let request = self
            .http
            .post(self.config.endpoint("files"))
            .bearer_auth(credential.expose())
            .multipart(form);
        let response = self.execute(ApiStep::Upload, request).await?;
        let uploaded: FileUploadResponse = Self::decode(ApiStep::Upload, response).await?;

        debug!(file_id = %uploaded.id, bytes = size, "Uploaded audio");
        Ok(uploaded.id)
    }

    async fn create_transcription(
        &self,
        credential: &Credential,
        request: &CreateTranscriptionRequest,
    ) -> Result<String, AttemptError> {
        let http_request = self
            .http
            .post(self.config.endpoint("transcriptions"))
            .bearer_auth(credential.expose())
            .json(request);
        let response = self.execute(ApiStep::Create, http_request).await?;
        let created: CreateTranscriptionResponse = Self::decode(ApiStep::Create, response).await?;

        debug!(transcription_id = %created.id, file_id = %request.file_id, "Created transcription");
        Ok(created.id)
    }

    async fn transcription_status(
        &self,
        credential: &Credential,
        transcription_id: &str,
    ) -> Result<TranscriptionStatus, AttemptError> {
        let request = self
            .http
            .get(self.config.endpoint(&format!("transcriptions/{transcription_id}")))
            .bearer_auth(credential.expose());
        let response = self.execute(ApiStep::Poll, request).await?;
        Self::decode(ApiStep::Poll, response).await
    }

    async fn fetch_transcript(
        &self,
        credential: &Credential,
        transcription_id: &str,
    ) -> Result<Value, AttemptError> {
        let request = self
            .http
            .get(self.config.endpoint(&format!(
                "transcriptions/{transcription_id}/transcript"
            )))
            .bearer_auth(credential.expose());
        let response = self.execute(ApiStep::Fetch, request).await?;
        Self::decode(ApiStep::Fetch, response).await
    }

    async fn delete_transcription(
        &self,
        credential: &Credential,
        transcription_id: &str,
    ) -> Result<(), AttemptError> {
        let request = self
            .http
            .delete(self.config.endpoint(&format!("transcriptions/{transcription_id}")))
            .bearer_auth(credential.expose());
        self.execute(ApiStep::Delete, request).await.map(|_| ())
    }

    async fn delete_file(&self, credential: &Credential, file_id: &str) -> Result<(), AttemptError> {
        let request = self
            .http
            .delete(self.config.endpoint(&format!("files/{file_id}")))
            .bearer_auth(credential.expose());
        self.execute(ApiStep::Delete, request).await.map(|_| ())
    }
}
