use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::TranslateConfig;
use crate::error::{Result, RevoiceError};
use crate::language::LanguageCode;
use super::Translator;

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    format: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TranslationResult {
    text: String,
}

/// Translator backed by an Ollama server
pub struct OllamaTranslator {
    client: Client,
    config: TranslateConfig,
}

impl OllamaTranslator {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn build_prompt(text: &str, source: Option<&LanguageCode>, target: &LanguageCode) -> String {
        let source_line = match source {
            Some(code) => format!("The source language is: {} (language code: {})\n", code.name(), code),
            None => "Detect the source language yourself.\n".to_string(),
        };

        format!(
            "You are a professional translator preparing a voice-over script.\n\
             \n\
             CRITICAL: You must translate the text to {name} ONLY. Do not translate to any other language.\n\
             The target language is: {name} (language code: {code})\n\
             {source_line}\
             \n\
             Keep the meaning and tone. The result will be read aloud, so do not add notes, \
             alternatives, or formatting.\n\
             Return ONLY the translation in JSON format as {{\"text\":\"your {name} translation here\"}}.\n\
             \n\
             [Text to translate]\n\
             {text}\n",
            name = target.name(),
            code = target,
            source_line = source_line,
            text = text,
        )
    }
}

/// Pull the translation out of a model response that should be `{"text": ...}`
fn extract_translation(raw: &str) -> Option<String> {
    let raw = raw.trim();

    if let Ok(result) = serde_json::from_str::<TranslationResult>(raw) {
        return Some(result.text.trim().to_string()).filter(|t| !t.is_empty());
    }

    // JSON wrapped in prose or code fences
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            if let Ok(result) = serde_json::from_str::<TranslationResult>(&raw[start..=end]) {
                return Some(result.text.trim().to_string()).filter(|t| !t.is_empty());
            }
        }
    }

    let cleaned = raw
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with("```")
                && !line.starts_with("Here is")
                && !line.starts_with("Here's")
                && !line.starts_with("Translation:")
        })
        .collect::<Vec<_>>()
        .join("\n");

    Some(cleaned).filter(|t| !t.is_empty())
}

#[async_trait]
impl Translator for OllamaTranslator {
    async fn translate(
        &self,
        text: &str,
        source: Option<&LanguageCode>,
        target: &LanguageCode,
    ) -> Result<String> {
        if text.trim().is_empty() {
            return Err(RevoiceError::Translation("Nothing to translate".to_string()));
        }

        info!("Translating {} chars to {} with {}", text.len(), target, self.config.model);

        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: Self::build_prompt(text, source, target),
            stream: false,
            format: "json".to_string(),
        };

        let url = format!("{}/api/generate", self.config.endpoint.trim_end_matches('/'));
        debug!("Sending translation request to: {}", url);

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RevoiceError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RevoiceError::Translation(format!(
                "Ollama API error {}: {}", status, error_text
            )));
        }

        let generated: GenerateResponse = response.json().await
            .map_err(|e| RevoiceError::Translation(format!("Failed to parse response: {}", e)))?;

        debug!("Raw Ollama response: {}", generated.response);

        extract_translation(&generated.response)
            .ok_or_else(|| RevoiceError::Translation("Empty translation received".to_string()))
    }

    async fn check_availability(&self) -> Result<()> {
        let url = format!("{}/api/show", self.config.endpoint.trim_end_matches('/'));

        let response = self.client
            .post(&url)
            .json(&json!({ "name": self.config.model }))
            .send()
            .await
            .map_err(|e| RevoiceError::Translation(format!("Failed to connect to Ollama: {}", e)))?;

        if response.status().is_success() {
            info!("Ollama model '{}' is available", self.config.model);
            Ok(())
        } else {
            Err(RevoiceError::Translation(format!(
                "Ollama model '{}' not found. Please pull the model first: ollama pull {}",
                self.config.model, self.config.model
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_json() {
        assert_eq!(
            extract_translation(r#"{"text": " नमस्ते दुनिया "}"#).as_deref(),
            Some("नमस्ते दुनिया")
        );
    }

    #[test]
    fn test_extract_fenced_json() {
        let raw = "Here is the translation:\n```json\n{\"text\": \"Bonjour\"}\n```";
        assert_eq!(extract_translation(raw).as_deref(), Some("Bonjour"));
    }

    #[test]
    fn test_extract_prose_keeps_all_lines() {
        let raw = "Translation:\nPremière phrase.\nDeuxième phrase.";
        assert_eq!(
            extract_translation(raw).as_deref(),
            Some("Première phrase.\nDeuxième phrase.")
        );
    }

    #[test]
    fn test_extract_empty() {
        assert_eq!(extract_translation("   "), None);
        assert_eq!(extract_translation(r#"{"text": ""}"#), None);
    }

    #[test]
    fn test_prompt_names_languages() {
        let target = LanguageCode::parse("hi").unwrap();
        let source = LanguageCode::parse("en").unwrap();

        let prompt = OllamaTranslator::build_prompt("Hello", Some(&source), &target);
        assert!(prompt.contains("The target language is: Hindi (language code: hi)"));
        assert!(prompt.contains("The source language is: English"));

        let prompt = OllamaTranslator::build_prompt("Hello", None, &target);
        assert!(prompt.contains("Detect the source language"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_translation_error() {
        let translator = OllamaTranslator::new(TranslateConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            ..TranslateConfig::default()
        })
        .unwrap();
        let target = LanguageCode::parse("fr").unwrap();

        let result = translator.translate("Hello", None, &target).await;
        assert!(matches!(result, Err(RevoiceError::Translation(_))));
    }
}
