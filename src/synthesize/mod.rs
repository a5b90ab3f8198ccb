// Speech synthesis architecture
//
// - Google: Google Translate TTS endpoint, MP3 output
// - Piper: local piper voices, WAV output
//
// Synthesizers write audio in whatever format their engine produces; the
// pipeline normalizes it to PCM16 WAV before synchronization.

pub mod google;
pub mod piper;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::config::{SynthesisMode, SynthesizerConfig};
use crate::error::Result;
use crate::language::LanguageCode;

/// Main trait for text-to-speech operations
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Speak `text` in `language`, writing the audio into `output_dir`.
    /// Returns the path of the written file.
    async fn synthesize(&self, text: &str, language: &LanguageCode, output_dir: &Path) -> Result<PathBuf>;

    /// Short implementation name for logs
    fn name(&self) -> &'static str;
}

/// Factory for creating synthesizer instances
pub struct SynthesizerFactory;

impl SynthesizerFactory {
    pub fn create_synthesizer(config: SynthesizerConfig) -> Result<Box<dyn Synthesizer>> {
        match config.mode {
            SynthesisMode::Google => Ok(Box::new(google::GoogleTtsSynthesizer::new(config)?)),
            SynthesisMode::Piper => Ok(Box::new(piper::PiperSynthesizer::new(config))),
        }
    }
}
