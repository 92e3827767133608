use std::io::Cursor;
use std::ops::Range;

use bytes::Bytes;
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::{debug, info, warn};

use super::decode::{DecodedAudio, decode, probe_duration};
use super::{AudioBlob, AudioError, Chunk, chunk_count};

/// Duration in seconds, or `0.0` when the container cannot be parsed.
///
/// Callers treat `0.0` as "unreadable" and reject the request.
pub fn measure_duration(data: &Bytes) -> f64 {
    match probe_duration(data) {
        Ok(duration) if duration.is_finite() && duration > 0.0 => duration,
        Ok(_) => 0.0,
        Err(e) => {
            debug!("Could not measure audio duration: {}", e);
            0.0
        }
    }
}

/// Split `total_len` into `count` contiguous ranges aligned to `align`.
///
/// All ranges but the last have the same length; the last absorbs the
/// remainder so the lengths always sum to `total_len`.
pub fn segment_ranges(total_len: usize, count: usize, align: usize) -> Vec<Range<usize>> {
    let count = count.max(1);
    let align = align.max(1);
    let base = (total_len / count) / align * align;

    let mut ranges = Vec::with_capacity(count);
    for i in 0..count {
        let start = i * base;
        let end = if i + 1 == count {
            total_len
        } else {
            (i + 1) * base
        };
        ranges.push(start..end);
    }
    ranges
}

/// Decoded audio shorter than this share of the container's claimed
/// duration is treated as a corrupt or truncated file.
const MIN_DECODED_SHARE: f64 = 0.5;

/// Cut a blob into chunks no longer than `max_duration_secs` (approximately).
///
/// Audio at or below the limit is returned untouched as a single chunk. Above
/// it, the chunk count is taken from the decoded samples rather than the
/// container header, and every emitted chunk carries at least one frame.
pub fn split(blob: &AudioBlob, max_duration_secs: f64) -> Result<Vec<Chunk>, AudioError> {
    if chunk_count(blob.duration_secs, max_duration_secs) == 1 {
        return Ok(vec![Chunk::whole(blob)]);
    }

    let audio = decode(&blob.data)?;
    let decoded_secs = audio.duration_secs();
    if decoded_secs < blob.duration_secs * MIN_DECODED_SHARE {
        warn!(
            claimed_secs = blob.duration_secs,
            decoded_secs, "Audio stream is much shorter than its header"
        );
        return Err(AudioError::Unreadable(format!(
            "header claims {:.1}s but only {:.1}s of audio could be decoded",
            blob.duration_secs, decoded_secs
        )));
    }

    let count = chunk_count(decoded_secs, max_duration_secs).min(audio.frames().max(1));
    if count == 1 {
        return Ok(vec![Chunk::whole(blob)]);
    }

    let channels = audio.channels as usize;
    let ranges = segment_ranges(audio.samples.len(), count, channels);

    info!(
        duration_secs = decoded_secs,
        chunks = count,
        sample_rate = audio.sample_rate,
        channels = audio.channels,
        "Splitting audio"
    );

    ranges
        .into_iter()
        .filter(|range| !range.is_empty())
        .enumerate()
        .map(|(index, range)| {
            let wav = encode_wav(&audio, &audio.samples[range])?;
            Ok(Chunk::wav(index, wav))
        })
        .collect()
}

fn encode_wav(audio: &DecodedAudio, samples: &[i16]) -> Result<Bytes, AudioError> {
    let spec = WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(samples.len() * 2 + 44));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(Bytes::from(cursor.into_inner()))
}
