use std::io::{Cursor, ErrorKind};

use bytes::Bytes;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, CodecParameters, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use super::AudioError;

/// Interleaved 16-bit PCM.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}

fn open(data: &Bytes) -> Result<(Box<dyn FormatReader>, u32, CodecParameters), AudioError> {
    let source = MediaSourceStream::new(
        Box::new(Cursor::new(data.clone())),
        MediaSourceStreamOptions::default(),
    );
    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::Unreadable(e.to_string()))?;

    let format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::Unreadable("no audio track".to_string()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();
    Ok((format, track_id, params))
}

/// Duration from container metadata, decoding the stream when the container
/// does not carry a frame count.
pub fn probe_duration(data: &Bytes) -> Result<f64, AudioError> {
    let (format, track_id, params) = open(data)?;

    if let (Some(frames), Some(time_base)) = (params.n_frames, params.time_base) {
        let time = time_base.calc_time(frames);
        return Ok(time.seconds as f64 + time.frac);
    }
    if let (Some(frames), Some(rate)) = (params.n_frames, params.sample_rate)
        && rate > 0
    {
        return Ok(frames as f64 / rate as f64);
    }

    debug!("Container has no frame count, decoding to measure duration");
    let decoded = decode_track(format, track_id, &params)?;
    Ok(decoded.duration_secs())
}

/// Decode the first audio track to interleaved i16 PCM.
pub fn decode(data: &Bytes) -> Result<DecodedAudio, AudioError> {
    let (format, track_id, params) = open(data)?;
    decode_track(format, track_id, &params)
}

fn decode_track(
    mut format: Box<dyn FormatReader>,
    track_id: u32,
    params: &CodecParameters,
) -> Result<DecodedAudio, AudioError> {
    let mut decoder = symphonia::default::get_codecs()
        .make(params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode(e.to_string()))?;

    let mut sample_rate = params.sample_rate.unwrap_or(0);
    let mut channels = params.channels.map(|c| c.count() as u16).unwrap_or(0);
    let mut samples: Vec<i16> = Vec::new();
    let mut buffer: Option<SampleBuffer<i16>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                debug!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        channels = spec.channels.count() as u16;

        let frames = decoded.capacity() as u64;
        let required = frames * spec.channels.count() as u64;
        if buffer
            .as_ref()
            .is_none_or(|buf| (buf.capacity() as u64) < required)
        {
            buffer = Some(SampleBuffer::<i16>::new(frames, spec));
        }
        if let Some(buf) = buffer.as_mut() {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    if samples.is_empty() || sample_rate == 0 || channels == 0 {
        return Err(AudioError::Unreadable("stream contains no samples".to_string()));
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}
