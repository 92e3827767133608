//! Per-chunk job lifecycle: upload, create, poll, fetch, then cleanup.
//!
//! A [`JobRunner`] drives one chunk through the remote API with credential
//! rotation. Remote objects are deleted in a detached task once an attempt
//! ends, whether it succeeded or not; cleanup failures are logged only.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{Instrument, debug, info, info_span};

use super::audio::Chunk;
use super::credentials::{Credential, CredentialQueue, run_with_rotation};
use super::error::{AttemptError, CleanupError, CleanupReport, RemoteResource, TranscriptionError};
use super::soniox::{CreateTranscriptionRequest, JobStatus, TranscriptionBackend};
use super::transcript::{ParsedTranscript, TranscriptResult, parse_payload};

pub const DEFAULT_MAX_RETRIES: usize = 3;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Knobs shared by every chunk of a request.
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub model: String,
    pub enable_diarization: bool,
    pub enable_language_identification: bool,
    pub language_hints: Option<Vec<String>>,
    pub max_retries: usize,
    pub poll_interval: Duration,
    /// Give up polling after this long. `None` polls until a terminal status.
    pub max_poll_wait: Option<Duration>,
}

impl JobOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            enable_diarization: true,
            enable_language_identification: true,
            language_hints: None,
            max_retries: DEFAULT_MAX_RETRIES,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_wait: None,
        }
    }
}

/// Local lifecycle of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Uploading,
    Creating,
    Polling,
    Fetching,
    Done,
    Error,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Error)
    }
}

/// Remote identifiers and state accumulated during one attempt.
#[derive(Debug, Clone)]
pub struct Job {
    pub chunk_index: usize,
    pub state: JobState,
    pub file_id: Option<String>,
    pub transcription_id: Option<String>,
    pub remote_status: Option<JobStatus>,
}

impl Job {
    pub fn new(chunk_index: usize) -> Self {
        Self {
            chunk_index,
            state: JobState::Uploading,
            file_id: None,
            transcription_id: None,
            remote_status: None,
        }
    }

    /// Move to `next` unless already terminal. Returns the resulting state.
    pub fn transition(&mut self, next: JobState) -> JobState {
        if !self.state.is_terminal() {
            debug!(chunk = self.chunk_index, from = ?self.state, to = ?next, "Job transition");
            self.state = next;
        }
        self.state
    }

    /// Record a polled status. Terminal remote statuses never revert.
    pub fn observe(&mut self, status: JobStatus) -> JobStatus {
        match self.remote_status {
            Some(current) if current.is_terminal() => current,
            _ => {
                self.remote_status = Some(status);
                status
            }
        }
    }
}

/// Runs chunks through the remote transcription lifecycle.
#[derive(Clone)]
pub struct JobRunner {
    backend: Arc<dyn TranscriptionBackend>,
    options: Arc<JobOptions>,
}

impl JobRunner {
    pub fn new(backend: Arc<dyn TranscriptionBackend>, options: JobOptions) -> Self {
        Self {
            backend,
            options: Arc::new(options),
        }
    }

    pub fn options(&self) -> &JobOptions {
        &self.options
    }

    /// Transcribe one chunk, rotating through `queue` on failure.
    pub async fn run(
        &self,
        chunk: Chunk,
        queue: CredentialQueue,
    ) -> Result<TranscriptResult, TranscriptionError> {
        let span = info_span!("chunk_job", chunk = chunk.index);
        let chunk = &chunk;
        run_with_rotation(queue, self.options.max_retries, move |credential, attempt| {
            self.attempt(chunk, credential, attempt)
        })
        .instrument(span)
        .await
    }

    async fn attempt(
        &self,
        chunk: &Chunk,
        credential: Credential,
        attempt: usize,
    ) -> Result<TranscriptResult, AttemptError> {
        let started = Instant::now();
        let mut job = Job::new(chunk.index);

        let outcome = self.drive(chunk, &credential, &mut job).await;
        let elapsed = started.elapsed();

        match &outcome {
            Ok(_) => {
                job.transition(JobState::Done);
            }
            Err(_) => {
                job.transition(JobState::Error);
            }
        }
        self.spawn_cleanup(credential.clone(), &job);

        let parsed = outcome?;
        info!(
            chunk = chunk.index,
            attempt,
            credential = %credential.masked(),
            elapsed_ms = elapsed.as_millis() as u64,
            chars = parsed.text.len(),
            "Chunk transcribed"
        );

        Ok(TranscriptResult {
            chunk_index: chunk.index,
            text: parsed.text,
            words: parsed.words,
            elapsed,
            credential: credential.masked(),
        })
    }

    async fn drive(
        &self,
        chunk: &Chunk,
        credential: &Credential,
        job: &mut Job,
    ) -> Result<ParsedTranscript, AttemptError> {
        let options = &self.options;

        job.transition(JobState::Uploading);
        let file_id = self
            .backend
            .upload_file(credential, chunk.data.clone(), &chunk.file_name, chunk.content_type)
            .await?;
        job.file_id = Some(file_id.clone());

        job.transition(JobState::Creating);
        let request = CreateTranscriptionRequest {
            file_id,
            model: options.model.clone(),
            enable_speaker_diarization: options.enable_diarization,
            enable_language_identification: options.enable_language_identification,
            language_hints: options.language_hints.clone(),
        };
        let transcription_id = self.backend.create_transcription(credential, &request).await?;
        job.transcription_id = Some(transcription_id.clone());

        job.transition(JobState::Polling);
        self.wait_for_completion(credential, &transcription_id, job).await?;

        job.transition(JobState::Fetching);
        let payload = self
            .backend
            .fetch_transcript(credential, &transcription_id)
            .await?;

        Ok(parse_payload(&payload, options.enable_diarization))
    }

    async fn wait_for_completion(
        &self,
        credential: &Credential,
        transcription_id: &str,
        job: &mut Job,
    ) -> Result<(), AttemptError> {
        let started = Instant::now();
        let mut polls: u64 = 0;

        loop {
            let status = self
                .backend
                .transcription_status(credential, transcription_id)
                .await?;
            polls += 1;

            match job.observe(status.status) {
                JobStatus::Completed => {
                    debug!(transcription_id, polls, "Transcription completed");
                    return Ok(());
                }
                JobStatus::Error => {
                    return Err(AttemptError::JobFailed {
                        id: transcription_id.to_string(),
                        message: status
                            .error_message
                            .unwrap_or_else(|| "unknown error".to_string()),
                    });
                }
                JobStatus::Queued | JobStatus::Processing | JobStatus::Unknown => {}
            }

            if let Some(max_wait) = self.options.max_poll_wait
                && started.elapsed() >= max_wait
            {
                return Err(AttemptError::PollTimeout {
                    id: transcription_id.to_string(),
                    waited_secs: started.elapsed().as_secs(),
                });
            }

            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    fn spawn_cleanup(&self, credential: Credential, job: &Job) {
        let transcription_id = job.transcription_id.clone();
        let file_id = job.file_id.clone();
        if transcription_id.is_none() && file_id.is_none() {
            return;
        }

        let backend = Arc::clone(&self.backend);
        tokio::spawn(
            async move {
                let report = cleanup(
                    backend.as_ref(),
                    &credential,
                    transcription_id.as_deref(),
                    file_id.as_deref(),
                )
                .await;
                report.log();
            }
            .in_current_span(),
        );
    }
}

/// Delete whatever remote objects an attempt created.
///
/// The transcription goes first because it references the file.
pub async fn cleanup(
    backend: &dyn TranscriptionBackend,
    credential: &Credential,
    transcription_id: Option<&str>,
    file_id: Option<&str>,
) -> CleanupReport {
    let mut report = CleanupReport::default();

    let targets = [
        (RemoteResource::Transcription, transcription_id),
        (RemoteResource::File, file_id),
    ];
    for (resource, id) in targets {
        let Some(id) = id else { continue };
        let result = match resource {
            RemoteResource::Transcription => backend.delete_transcription(credential, id).await,
            RemoteResource::File => backend.delete_file(credential, id).await,
        };
        match result {
            Ok(()) => report.deleted.push((resource, id.to_string())),
            Err(e) => report.failures.push(CleanupError {
                resource,
                id: id.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    report
}
