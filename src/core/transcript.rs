//! Transcript tokens and their conversion to text plus word timings.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Separator inserted before each new speaker when diarization is enabled.
const SPEAKER_BREAK: &str = "\n\n";

/// One recognized unit as returned by the provider.
///
/// Every field is optional and read on its own: a mistyped field is dropped
/// without discarding the rest of the token. A token without text contributes
/// nothing and a token without timestamps is not reported as a word.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Token {
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "speaker_label")]
    pub speaker: Option<String>,
    #[serde(default, deserialize_with = "lenient_millis")]
    pub start_ms: Option<u64>,
    #[serde(default, deserialize_with = "lenient_millis")]
    pub end_ms: Option<u64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub language: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?
        .as_str()
        .map(str::to_string))
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_f64())
}

/// Millisecond offsets; fractional values are rounded, negative ones dropped.
fn lenient_millis<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
            .map(|ms| ms.round() as u64)
    }))
}

/// Speaker labels arrive as strings or integers depending on the model.
fn speaker_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(label) => Some(label),
        Value::Number(n) => n.as_i64().map(|n| n.to_string()),
        _ => None,
    })
}

/// A timestamped piece of text, times in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start_time: u64,
    pub end_time: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTranscript {
    pub text: String,
    pub words: Vec<Word>,
}

/// Outcome of one successful chunk job.
#[derive(Debug, Clone)]
pub struct TranscriptResult {
    pub chunk_index: usize,
    pub text: String,
    pub words: Vec<Word>,
    /// Wall-clock time from credential selection to transcript fetch.
    pub elapsed: Duration,
    /// Masked form of the credential that produced this result.
    pub credential: String,
}

/// Concatenate token text, inserting a speaker header whenever the speaker
/// label changes, and collect timestamped words.
pub fn parse_tokens(tokens: &[Token], diarization: bool) -> ParsedTranscript {
    let mut text = String::new();
    let mut words = Vec::new();
    let mut current_speaker: Option<&str> = None;

    for token in tokens {
        let fragment = token.text.as_deref().unwrap_or("");

        if diarization
            && let Some(speaker) = token.speaker.as_deref()
            && current_speaker != Some(speaker)
        {
            current_speaker = Some(speaker);
            text.push_str(SPEAKER_BREAK);
            text.push_str("Speaker ");
            text.push_str(speaker);
            text.push_str(": ");
        }

        text.push_str(fragment);

        if let (Some(start), Some(end)) = (token.start_ms, token.end_ms) {
            words.push(Word {
                text: fragment.to_string(),
                start_time: start,
                end_time: end,
            });
        }
    }

    ParsedTranscript {
        text: text.trim().to_string(),
        words,
    }
}

/// Parse a raw transcript payload.
///
/// Accepts `{"tokens": [...]}`, `{"text": "..."}` or a bare string. Entries
/// of `tokens` that are not objects are treated as empty.
pub fn parse_payload(payload: &Value, diarization: bool) -> ParsedTranscript {
    if let Some(tokens) = payload.get("tokens").and_then(Value::as_array) {
        let tokens: Vec<Token> = tokens
            .iter()
            .map(|raw| serde_json::from_value(raw.clone()).unwrap_or_default())
            .collect();
        return parse_tokens(&tokens, diarization);
    }

    let text = payload
        .as_str()
        .or_else(|| payload.get("text").and_then(Value::as_str))
        .unwrap_or("");
    ParsedTranscript {
        text: text.trim().to_string(),
        words: Vec::new(),
    }
}
