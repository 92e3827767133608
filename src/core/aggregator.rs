//! Fan-out of chunk jobs and merging of their results.
//!
//! Every chunk runs in its own task with its own shuffled credential queue.
//! The aggregator waits for all of them before deciding: the first failure in
//! chunk order fails the whole request and no partial result is returned.

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task::JoinError;
use tracing::{Instrument, error, info};

use super::audio::{AudioBlob, Chunk, split};
use super::credentials::CredentialPool;
use super::error::TranscriptionError;
use super::job::JobRunner;
use super::transcript::{TranscriptResult, Word};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkTiming {
    /// 1-based chunk number.
    pub chunk: usize,
    /// Seconds.
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingTime {
    pub total: f64,
    pub chunks: Vec<ChunkTiming>,
}

/// Final transcript of a request, serialized as the success response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedTranscript {
    pub success: bool,
    pub text: String,
    pub words: Vec<Word>,
    pub audio_duration: f64,
    pub total_chunks: usize,
    pub processing_time: ProcessingTime,
}

/// Splits audio, runs one job per chunk and merges the outcome.
#[derive(Clone)]
pub struct ChunkAggregator {
    runner: JobRunner,
    max_chunk_secs: f64,
}

impl ChunkAggregator {
    pub fn new(runner: JobRunner, max_chunk_secs: f64) -> Self {
        Self {
            runner,
            max_chunk_secs,
        }
    }

    /// Segment `blob` and transcribe every piece.
    pub async fn transcribe(
        &self,
        blob: AudioBlob,
        pool: &CredentialPool,
    ) -> Result<MergedTranscript, TranscriptionError> {
        let started = Instant::now();
        let audio_duration = blob.duration_secs;
        let max_chunk_secs = self.max_chunk_secs;

        let chunks = tokio::task::spawn_blocking(move || split(&blob, max_chunk_secs))
            .await
            .map_err(|e| TranscriptionError::Internal(format!("segmentation task failed: {e}")))??;

        info!(
            audio_duration,
            chunks = chunks.len(),
            credentials = pool.len(),
            "Transcribing audio"
        );

        let results = self.run_chunks(chunks, pool).await?;
        Ok(merge(results, audio_duration, started.elapsed()))
    }

    /// Run every chunk to completion and return results in chunk order.
    pub async fn run_chunks(
        &self,
        chunks: Vec<Chunk>,
        pool: &CredentialPool,
    ) -> Result<Vec<TranscriptResult>, TranscriptionError> {
        // Spawned so a caller going away does not cancel in-flight jobs.
        let handles: Vec<_> = chunks
            .into_iter()
            .map(|chunk| {
                let runner = self.runner.clone();
                let queue = pool.attempt_queue();
                tokio::spawn(async move { runner.run(chunk, queue).await }.in_current_span())
            })
            .collect();

        let outcomes = futures::future::join_all(handles).await;
        collect_in_order(outcomes)
    }
}

/// Pick the verdict from a complete set of chunk outcomes.
///
/// The first failure in index order wins. A single-chunk request reports its
/// error unwrapped; multi-chunk failures name the 1-based chunk.
pub fn collect_in_order(
    outcomes: Vec<Result<Result<TranscriptResult, TranscriptionError>, JoinError>>,
) -> Result<Vec<TranscriptResult>, TranscriptionError> {
    let total = outcomes.len();
    let mut results = Vec::with_capacity(total);

    for (index, outcome) in outcomes.into_iter().enumerate() {
        let failure = match outcome {
            Ok(Ok(result)) => {
                results.push(result);
                continue;
            }
            Ok(Err(e)) => e,
            Err(join_error) => {
                TranscriptionError::Internal(format!("chunk task aborted: {join_error}"))
            }
        };

        error!(chunk = index + 1, total, "Chunk failed: {}", failure);
        if total == 1 {
            return Err(failure);
        }
        return Err(TranscriptionError::ChunkFailed {
            chunk: index + 1,
            source: Box::new(failure),
        });
    }

    Ok(results)
}

/// Combine ordered chunk results into the response body.
///
/// Word timestamps stay relative to their own chunk.
pub fn merge(results: Vec<TranscriptResult>, audio_duration: f64, total: Duration) -> MergedTranscript {
    let total_chunks = results.len();
    let mut texts = Vec::with_capacity(total_chunks);
    let mut words = Vec::new();
    let mut chunks = Vec::with_capacity(total_chunks);

    for (index, result) in results.into_iter().enumerate() {
        chunks.push(ChunkTiming {
            chunk: index + 1,
            duration: result.elapsed.as_secs_f64(),
        });
        texts.push(result.text);
        words.extend(result.words);
    }

    MergedTranscript {
        success: true,
        text: texts.join(" "),
        words,
        audio_duration,
        total_chunks,
        processing_time: ProcessingTime {
            total: total.as_secs_f64(),
            chunks,
        },
    }
}
