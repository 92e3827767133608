//! Audio Test Fixtures
//!
//! Generated WAV data keeps the tests free of binary files and gives exact
//! control over duration.
//!
//! Audio formats:
//! - Sample rate: 16kHz (16000 Hz)
//! - Bit depth: 16-bit signed PCM

use std::f32::consts::PI;
use std::io::Cursor;

/// Standard sample rate for STT (16kHz)
pub const SAMPLE_RATE: u32 = 16000;

/// Generate a sine wave tone
pub fn generate_sine_wave(duration_samples: usize, frequency: f32, amplitude: f32) -> Vec<i16> {
    let max_amplitude = amplitude * i16::MAX as f32;
    let angular_freq = 2.0 * PI * frequency / SAMPLE_RATE as f32;

    (0..duration_samples)
        .map(|i| {
            let sample = (angular_freq * i as f32).sin() * max_amplitude;
            sample as i16
        })
        .collect()
}

/// Encode interleaved samples as a WAV file.
pub fn wav_bytes(samples: &[i16], channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Mono 440 Hz tone lasting `seconds`.
pub fn tone_wav(seconds: f32) -> Vec<u8> {
    let samples = generate_sine_wave((seconds * SAMPLE_RATE as f32) as usize, 440.0, 0.5);
    wav_bytes(&samples, 1)
}

/// Bytes no decoder recognises.
pub fn garbage_audio() -> Vec<u8> {
    b"this is definitely not an audio container".repeat(16)
}
