use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::SynthesizerConfig;
use crate::error::{Result, RevoiceError};
use crate::language::LanguageCode;
use super::Synthesizer;

const OUTPUT_FILE: &str = "synthesized_audio.wav";

/// Synthesizer running the piper command line tool with one voice model per language
pub struct PiperSynthesizer {
    config: SynthesizerConfig,
}

impl PiperSynthesizer {
    pub fn new(config: SynthesizerConfig) -> Self {
        Self { config }
    }

    /// Voice for the exact code first, then for the primary language
    fn voice_for(&self, language: &LanguageCode) -> Result<&Path> {
        self.config
            .piper_voices
            .get(language.as_str())
            .or_else(|| self.config.piper_voices.get(language.primary()))
            .map(PathBuf::as_path)
            .ok_or_else(|| {
                RevoiceError::Synthesis(format!(
                    "No piper voice configured for language '{}'",
                    language
                ))
            })
    }
}

#[async_trait]
impl Synthesizer for PiperSynthesizer {
    async fn synthesize(&self, text: &str, language: &LanguageCode, output_dir: &Path) -> Result<PathBuf> {
        if text.trim().is_empty() {
            return Err(RevoiceError::Synthesis("Nothing to synthesize".to_string()));
        }

        let voice = self.voice_for(language)?;
        let output_path = output_dir.join(OUTPUT_FILE);
        info!("Synthesizing speech in {} with piper voice {}", language, voice.display());

        let mut cmd = Command::new(&self.config.piper_binary_path);
        cmd.arg("--model").arg(voice)
            .arg("--output_file").arg(&output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!("Executing piper command: {:?}", cmd);

        let mut child = cmd.spawn()
            .map_err(|e| RevoiceError::Synthesis(format!("Failed to execute {}: {}", self.config.piper_binary_path, e)))?;

        let mut stdin = child.stdin.take()
            .ok_or_else(|| RevoiceError::Synthesis("piper stdin is not available".to_string()))?;
        let input = text.to_string();
        // piper logs while it reads, so stdin is fed while the output pipes drain
        let writer = tokio::spawn(async move {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await
        });

        let output = child.wait_with_output().await
            .map_err(|e| RevoiceError::Synthesis(format!("piper did not finish: {}", e)))?;
        let written = writer.await
            .map_err(|e| RevoiceError::Synthesis(format!("piper input task failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RevoiceError::Synthesis(format!("piper failed: {}", stderr.trim())));
        }
        written.map_err(|e| RevoiceError::Synthesis(format!("Failed to send text to piper: {}", e)))?;

        if !output_path.exists() {
            return Err(RevoiceError::Synthesis("piper produced no audio".to_string()));
        }

        Ok(output_path)
    }

    fn name(&self) -> &'static str {
        "piper"
    }
}
