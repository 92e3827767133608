//! Audio measurement and duration-bounded segmentation.
//!
//! Uploaded audio is measured once. Anything longer than the configured
//! maximum is decoded to 16-bit PCM, cut into near-equal pieces and each piece
//! is re-encoded as WAV so the provider sees an independently valid file.

mod decode;
mod segmenter;

use bytes::Bytes;
use thiserror::Error;

pub use decode::{DecodedAudio, decode, probe_duration};
pub use segmenter::{measure_duration, segment_ranges, split};

/// Default maximum chunk length: one hour.
pub const DEFAULT_MAX_CHUNK_SECS: f64 = 3600.0;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Unreadable audio: {0}")]
    Unreadable(String),

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Failed to encode chunk: {0}")]
    Encode(String),
}

impl AudioError {
    pub fn is_unreadable(&self) -> bool {
        matches!(self, AudioError::Unreadable(_))
    }
}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        AudioError::Encode(err.to_string())
    }
}

/// An uploaded file together with its measured duration.
#[derive(Debug, Clone)]
pub struct AudioBlob {
    pub data: Bytes,
    pub duration_secs: f64,
    /// Client-supplied file name, forwarded on single-chunk uploads.
    pub file_name: Option<String>,
}

impl AudioBlob {
    pub fn new(data: Bytes, duration_secs: f64) -> Self {
        Self {
            data,
            duration_secs,
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

/// Contiguous piece of an [`AudioBlob`], uploaded as its own provider file.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// 0-based position within the parent request.
    pub index: usize,
    pub data: Bytes,
    pub file_name: String,
    pub content_type: &'static str,
}

impl Chunk {
    /// The whole original file as the only chunk.
    pub fn whole(blob: &AudioBlob) -> Self {
        Self {
            index: 0,
            data: blob.data.clone(),
            file_name: blob.file_name.clone().unwrap_or_else(|| "audio".to_string()),
            content_type: "application/octet-stream",
        }
    }

    /// A re-encoded WAV piece.
    pub fn wav(index: usize, data: Bytes) -> Self {
        Self {
            index,
            data,
            file_name: "audio.wav".to_string(),
            content_type: "audio/wav",
        }
    }
}

/// Number of chunks for a given duration: `floor(duration / max) + 1`.
///
/// Durations at or below `max_secs` always produce one chunk.
pub fn chunk_count(duration_secs: f64, max_secs: f64) -> usize {
    if duration_secs <= max_secs || max_secs <= 0.0 {
        return 1;
    }
    (duration_secs / max_secs).floor() as usize + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_count() {
        assert_eq!(chunk_count(0.0, 3600.0), 1);
        assert_eq!(chunk_count(3600.0, 3600.0), 1);
        assert_eq!(chunk_count(3600.5, 3600.0), 2);
        assert_eq!(chunk_count(7200.0, 3600.0), 3);
        assert_eq!(chunk_count(9000.0, 3600.0), 3);
    }

    #[test]
    fn test_whole_chunk_keeps_name() {
        let blob = AudioBlob::new(Bytes::from_static(b"abc"), 1.0).with_file_name("talk.mp3");
        let chunk = Chunk::whole(&blob);
        assert_eq!(chunk.index, 0);
        assert_eq!(chunk.file_name, "talk.mp3");
        assert_eq!(chunk.data, blob.data);
    }
}
