// OpenAI-compatible transcription endpoint
// Works with the hosted API as well as local servers exposing /v1/audio/transcriptions

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

use crate::config::TranscriberConfig;
use crate::error::{Result, RevoiceError};
use crate::language::LanguageCode;
use super::{Transcriber, Transcript};

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
    language: Option<String>,
}

impl TranscriptionResponse {
    /// verbose_json reports the language by English name ("english")
    fn into_transcript(self) -> Result<Transcript> {
        let detected = self.language.as_deref().and_then(LanguageCode::from_detected);
        Transcript::from_segments([self.text], detected)
    }
}

pub struct OpenAITranscriber {
    client: Client,
    config: TranscriberConfig,
    api_key: Option<String>,
}

impl OpenAITranscriber {
    pub fn new(config: TranscriberConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("revoice/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());

        Ok(Self { client, config, api_key })
    }

    fn endpoint_url(&self) -> String {
        format!("{}/v1/audio/transcriptions", self.config.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl Transcriber for OpenAITranscriber {
    async fn transcribe(&self, audio_path: &Path, language: Option<&LanguageCode>) -> Result<Transcript> {
        info!("Transcribing {} via {}", audio_path.display(), self.config.endpoint);

        let audio = tokio::fs::read(audio_path).await
            .map_err(|e| RevoiceError::Service(format!("Failed to read audio {}: {}", audio_path.display(), e)))?;

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.wav".to_string());
        let part = Part::bytes(audio)
            .file_name(file_name)
            .mime_str("audio/wav")
            .map_err(|e| RevoiceError::Service(format!("Invalid upload part: {}", e)))?;

        let mut form = Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json");
        if let Some(lang) = language {
            form = form.text("language", lang.primary().to_string());
        }

        let mut request = self.client.post(self.endpoint_url()).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await
            .map_err(|e| RevoiceError::Service(format!("Transcription request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RevoiceError::Service(format!(
                "Transcription API error {}: {}", status, error_text
            )));
        }

        let body: TranscriptionResponse = response.json().await
            .map_err(|e| RevoiceError::Service(format!("Failed to parse transcription response: {}", e)))?;

        debug!("Transcription response language: {:?}", body.language);

        body.into_transcript()
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_trims_trailing_slash() {
        let transcriber = OpenAITranscriber::new(TranscriberConfig {
            endpoint: "http://localhost:8000/".to_string(),
            ..TranscriberConfig::default()
        })
        .unwrap();

        assert_eq!(transcriber.endpoint_url(), "http://localhost:8000/v1/audio/transcriptions");
    }

    #[test]
    fn test_verbose_json_language_name_becomes_code() {
        let body: TranscriptionResponse =
            serde_json::from_str(r#"{"task":"transcribe","language":"english","duration":2.0,"text":"Hello there"}"#)
                .unwrap();

        let transcript = body.into_transcript().unwrap();
        assert_eq!(transcript.text, "Hello there");
        assert_eq!(transcript.language.map(|l| l.to_string()).as_deref(), Some("en"));
    }

    #[test]
    fn test_unknown_language_name_is_dropped() {
        let body: TranscriptionResponse =
            serde_json::from_str(r#"{"language":"klingon","text":"Qapla"}"#).unwrap();
        assert_eq!(body.into_transcript().unwrap().language, None);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_service_error() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("audio.wav");
        std::fs::write(&audio, b"RIFF").unwrap();

        let transcriber = OpenAITranscriber::new(TranscriberConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            ..TranscriberConfig::default()
        })
        .unwrap();

        let result = transcriber.transcribe(&audio, None).await;
        assert!(matches!(result, Err(RevoiceError::Service(_))));
    }
}
