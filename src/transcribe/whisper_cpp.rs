use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::TranscriberConfig;
use crate::error::{Result, RevoiceError};
use crate::language::LanguageCode;
use super::{Transcriber, Transcript};

/// whisper.cpp `-oj` output (fields the pipeline reads)
#[derive(Debug, Deserialize)]
pub struct WhisperCppOutput {
    pub result: Option<WhisperCppResult>,
    #[serde(default)]
    pub transcription: Vec<WhisperCppSegment>,
}

#[derive(Debug, Deserialize)]
pub struct WhisperCppResult {
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WhisperCppSegment {
    pub text: String,
}

impl WhisperCppOutput {
    pub fn into_transcript(self) -> Result<Transcript> {
        let language = self
            .result
            .and_then(|r| r.language)
            .and_then(|code| LanguageCode::from_detected(&code));

        Transcript::from_segments(self.transcription.into_iter().map(|s| s.text), language)
    }
}

/// Transcriber running the whisper.cpp command line tool
pub struct WhisperCppTranscriber {
    config: TranscriberConfig,
}

impl WhisperCppTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Transcriber for WhisperCppTranscriber {
    async fn transcribe(&self, audio_path: &Path, language: Option<&LanguageCode>) -> Result<Transcript> {
        info!("Transcribing {} with whisper.cpp", audio_path.display());

        let temp_dir = tempfile::tempdir()
            .map_err(|e| RevoiceError::Service(format!("Failed to create temp directory: {}", e)))?;
        let output_prefix = temp_dir.path().join("transcript");

        let mut cmd = Command::new(&self.config.binary_path);
        cmd.arg("-m").arg(&self.config.model)
            .arg("-f").arg(audio_path)
            .arg("-oj")
            .arg("-of").arg(&output_prefix)
            .arg("-np")
            .arg("-l").arg(language.map(|l| l.primary()).unwrap_or("auto"));

        debug!("Executing whisper.cpp command: {:?}", cmd);

        let output = cmd.output().await
            .map_err(|e| RevoiceError::Service(format!("Failed to execute {}: {}", self.config.binary_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RevoiceError::Service(format!("whisper.cpp failed: {}", stderr.trim())));
        }

        let json_file = output_prefix.with_extension("json");
        let json_content = tokio::fs::read(&json_file).await
            .map_err(|e| RevoiceError::Service(format!("Failed to read whisper.cpp output: {}", e)))?;

        // whisper.cpp may emit invalid UTF-8 when a multibyte character spans tokens
        let json_content = String::from_utf8_lossy(&json_content);
        let whisper_output: WhisperCppOutput = serde_json::from_str(&json_content)
            .map_err(|e| RevoiceError::Service(format!("Failed to parse whisper.cpp JSON: {}", e)))?;

        let transcript = whisper_output.into_transcript()?;
        info!(
            "Transcription completed ({} chars, language: {})",
            transcript.text.len(),
            transcript.language.as_ref().map(|l| l.as_str()).unwrap_or("unknown")
        );
        Ok(transcript)
    }

    fn name(&self) -> &'static str {
        "whisper.cpp"
    }
}
