// Translation architecture
//
// - Ollama: local LLM translation through the /api/generate endpoint
//
// Every failure of the underlying service is reported as a `Translation` error.

pub mod ollama;

use async_trait::async_trait;

use crate::config::TranslateConfig;
use crate::error::Result;
use crate::language::LanguageCode;

/// Main trait for translation operations
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into `target`. `source` is a hint; `None` lets the service detect it.
    async fn translate(
        &self,
        text: &str,
        source: Option<&LanguageCode>,
        target: &LanguageCode,
    ) -> Result<String>;

    /// Check that the service is reachable and ready
    async fn check_availability(&self) -> Result<()>;
}

/// Factory for creating translator instances
pub struct TranslatorFactory;

impl TranslatorFactory {
    pub fn create_translator(config: TranslateConfig) -> Result<Box<dyn Translator>> {
        Ok(Box::new(ollama::OllamaTranslator::new(config)?))
    }
}
