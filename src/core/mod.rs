pub mod aggregator;
pub mod audio;
pub mod credentials;
pub mod error;
pub mod job;
pub mod relay;
pub mod soniox;
pub mod transcript;

// Re-export commonly used types for convenience
pub use aggregator::{ChunkAggregator, ChunkTiming, MergedTranscript, ProcessingTime};
pub use audio::{AudioBlob, AudioError, Chunk, measure_duration, split};
pub use credentials::{Credential, CredentialPool, CredentialQueue, run_with_rotation};
pub use error::{ApiStep, AttemptError, CleanupError, CleanupReport, TranscriptionError};
pub use job::{Job, JobOptions, JobRunner, JobState};
pub use relay::{RealtimeRelay, RelayError, SessionSummary};
pub use soniox::{
    JobStatus, SonioxClient, SonioxConfig, TranscriptionBackend, TranscriptionStatus,
};
pub use transcript::{ParsedTranscript, Token, TranscriptResult, Word, parse_payload, parse_tokens};
