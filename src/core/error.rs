//! Error types shared by the transcription engine.
//!
//! The taxonomy follows how failures travel through a request:
//!
//! - [`AttemptError`] is produced by a single provider call and only ever
//!   consumed by the retry driver, which rotates to the next credential.
//! - [`CleanupError`] is produced by best-effort deletes and never leaves the
//!   [`CleanupReport`] it is collected into.
//! - [`TranscriptionError`] is what a request handler finally sees.

use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

/// Provider call that produced an [`AttemptError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStep {
    Upload,
    Create,
    Poll,
    Fetch,
    Delete,
    List,
}

impl fmt::Display for ApiStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApiStep::Upload => "upload",
            ApiStep::Create => "create",
            ApiStep::Poll => "poll",
            ApiStep::Fetch => "fetch",
            ApiStep::Delete => "delete",
            ApiStep::List => "list",
        };
        f.write_str(name)
    }
}

/// A single failed step of one credential's attempt.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AttemptError {
    /// The request never produced a response (DNS, TLS, timeout, reset).
    #[error("{step} request failed: {message}")]
    Transport { step: ApiStep, message: String },

    /// The provider answered with a non-success status code.
    #[error("{step} returned HTTP {status}: {body}")]
    Status {
        step: ApiStep,
        status: u16,
        body: String,
    },

    /// The provider answered but the body was not what we expected.
    #[error("{step} response could not be decoded: {message}")]
    Decode { step: ApiStep, message: String },

    /// The job reached the terminal `error` status.
    #[error("transcription {id} failed upstream: {message}")]
    JobFailed { id: String, message: String },

    /// The configured maximum poll wait elapsed before a terminal status.
    #[error("transcription {id} did not finish within {waited_secs}s")]
    PollTimeout { id: String, waited_secs: u64 },
}

impl AttemptError {
    pub fn step(&self) -> Option<ApiStep> {
        match self {
            AttemptError::Transport { step, .. }
            | AttemptError::Status { step, .. }
            | AttemptError::Decode { step, .. } => Some(*step),
            AttemptError::JobFailed { .. } | AttemptError::PollTimeout { .. } => None,
        }
    }
}

/// Remote object kinds touched by cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteResource {
    Transcription,
    File,
}

impl fmt::Display for RemoteResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteResource::Transcription => f.write_str("transcription"),
            RemoteResource::File => f.write_str("file"),
        }
    }
}

/// Failure to delete a remote object. Always swallowed.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("failed to delete {resource} {id}: {reason}")]
pub struct CleanupError {
    pub resource: RemoteResource,
    pub id: String,
    pub reason: String,
}

/// Outcome of a best-effort cleanup pass.
///
/// Deliberately not a `Result`: nothing in the request path can propagate it.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub deleted: Vec<(RemoteResource, String)>,
    pub failures: Vec<CleanupError>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn log(&self) {
        for (resource, id) in &self.deleted {
            debug!(%resource, id = %id, "Deleted remote object");
        }
        for failure in &self.failures {
            warn!("Cleanup skipped: {}", failure);
        }
    }
}

/// Errors surfaced to the caller of a file transcription.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// Bad request data: unreadable audio, empty credential list.
    #[error("{0}")]
    InvalidInput(String),

    /// Every credential in the attempt sequence failed.
    #[error(
        "transcription failed after {attempts} attempt(s): {}",
        .last_error.as_deref().unwrap_or("no credential available")
    )]
    Exhausted {
        attempts: usize,
        last_error: Option<String>,
    },

    /// One chunk of a split request failed; `chunk` is 1-based.
    #[error("chunk {chunk} failed: {source}")]
    ChunkFailed {
        chunk: usize,
        #[source]
        source: Box<TranscriptionError>,
    },

    #[error("audio error: {0}")]
    Audio(#[from] crate::core::audio::AudioError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl TranscriptionError {
    /// Whether the error was caused by the request itself.
    pub fn is_input_error(&self) -> bool {
        match self {
            TranscriptionError::InvalidInput(_) => true,
            TranscriptionError::Audio(e) => e.is_unreadable(),
            TranscriptionError::ChunkFailed { source, .. } => source.is_input_error(),
            _ => false,
        }
    }
}
