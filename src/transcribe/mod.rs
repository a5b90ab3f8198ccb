// Transcription architecture
//
// This module provides different transcription implementations through a factory pattern:
// - WhisperCpp: whisper.cpp command line tool
// - OpenAI: OpenAI-compatible HTTP transcription endpoint
//
// Implementations report tool or transport failures as `Service` errors and
// audio without recognizable speech as `Recognition` errors.

pub mod whisper_cpp;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{TranscriberConfig, TranscriptionMode};
use crate::error::{Result, RevoiceError};
use crate::language::LanguageCode;

/// Recognized speech of one audio file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    /// Language reported by the recognizer, when it detects one
    pub language: Option<LanguageCode>,
}

impl Transcript {
    /// Build a transcript from recognizer segments, failing when nothing intelligible remains
    pub fn from_segments<I, S>(segments: I, language: Option<LanguageCode>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text = segments
            .into_iter()
            .map(|s| strip_non_speech(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if text.is_empty() {
            return Err(RevoiceError::Recognition(
                "No intelligible speech found in audio".to_string(),
            ));
        }

        Ok(Self { text, language })
    }
}

/// Remove recognizer annotations such as "[BLANK_AUDIO]" or "(music)".
///
/// A bracketed span is dropped only when it is closed and stands as its own
/// words; brackets inside speech or left unclosed are kept.
fn strip_non_speech(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let close = match chars[i] {
            '[' => Some(']'),
            '(' => Some(')'),
            _ => None,
        };
        let starts_word = i == 0 || chars[i - 1].is_whitespace();

        if let (Some(close), true) = (close, starts_word) {
            if let Some(offset) = chars[i + 1..].iter().position(|&c| c == close) {
                let end = i + 1 + offset;
                if chars.get(end + 1).is_none_or(|c| c.is_whitespace()) {
                    i = end + 1;
                    continue;
                }
            }
        }

        result.push(chars[i]);
        i += 1;
    }

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Main trait for transcription operations
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a mono PCM16 WAV file to text
    async fn transcribe(&self, audio_path: &Path, language: Option<&LanguageCode>) -> Result<Transcript>;

    /// Short implementation name for logs
    fn name(&self) -> &'static str;
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    /// Create a transcriber based on the configured mode
    pub fn create_transcriber(config: TranscriberConfig) -> Result<Box<dyn Transcriber>> {
        match config.mode {
            TranscriptionMode::WhisperCpp => {
                Ok(Box::new(whisper_cpp::WhisperCppTranscriber::new(config)))
            }
            TranscriptionMode::OpenAi => {
                Ok(Box::new(openai::OpenAITranscriber::new(config)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_non_speech() {
        assert_eq!(strip_non_speech(" [BLANK_AUDIO] "), "");
        assert_eq!(strip_non_speech(" Hello (laughs) there  [Music]"), "Hello there");
        assert_eq!(strip_non_speech("(upbeat music playing)"), "");
    }

    #[test]
    fn test_strip_keeps_brackets_in_speech() {
        assert_eq!(strip_non_speech("I said (hello and goodbye"), "I said (hello and goodbye");
        assert_eq!(strip_non_speech("call f(x) twice"), "call f(x) twice");
        assert_eq!(strip_non_speech("the [draft]s are ready"), "the [draft]s are ready");
        assert_eq!(strip_non_speech("unmatched ] and ) stay"), "unmatched ] and ) stay");
    }

    #[test]
    fn test_from_segments_joins_text() {
        let transcript = Transcript::from_segments([" Hello", " world.", "[BLANK_AUDIO]"], None).unwrap();
        assert_eq!(transcript.text, "Hello world.");
    }

    #[test]
    fn test_from_segments_without_speech_is_recognition_error() {
        let result = Transcript::from_segments(["[BLANK_AUDIO]", "  "], None);
        assert!(matches!(result, Err(RevoiceError::Recognition(_))));

        let result = Transcript::from_segments(Vec::<String>::new(), None);
        assert!(matches!(result, Err(RevoiceError::Recognition(_))));
    }
}
