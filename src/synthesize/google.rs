use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::SynthesizerConfig;
use crate::error::{Result, RevoiceError};
use crate::language::LanguageCode;
use super::Synthesizer;

const OUTPUT_FILE: &str = "synthesized_audio.mp3";

/// Synthesizer using the Google Translate TTS endpoint.
///
/// The endpoint only accepts short texts, so the input is split into chunks at
/// sentence and word boundaries and the returned MP3 streams are concatenated.
pub struct GoogleTtsSynthesizer {
    client: Client,
    config: SynthesizerConfig,
}

impl GoogleTtsSynthesizer {
    pub fn new(config: SynthesizerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent("Mozilla/5.0")
            .build()?;

        Ok(Self { client, config })
    }

    async fn fetch_chunk(&self, chunk: &str, idx: usize, total: usize, language: &LanguageCode) -> Result<Vec<u8>> {
        let total_str = total.to_string();
        let idx_str = idx.to_string();
        let len_str = chunk.chars().count().to_string();

        let response = self.client
            .get(&self.config.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("q", chunk),
                ("tl", language.as_str()),
                ("client", "tw-ob"),
                ("total", total_str.as_str()),
                ("idx", idx_str.as_str()),
                ("textlen", len_str.as_str()),
            ])
            .send()
            .await
            .map_err(|e| RevoiceError::Synthesis(format!("TTS request failed: {}", e)))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(RevoiceError::Synthesis(format!(
                "TTS request rejected ({}); language '{}' may not be supported",
                status, language
            )));
        }
        if !status.is_success() {
            return Err(RevoiceError::Synthesis(format!("TTS service error {}", status)));
        }

        let bytes = response.bytes().await
            .map_err(|e| RevoiceError::Synthesis(format!("Failed to read TTS audio: {}", e)))?;
        if bytes.is_empty() {
            return Err(RevoiceError::Synthesis(format!("TTS returned no audio for chunk {}", idx)));
        }

        Ok(bytes.to_vec())
    }
}

/// Split `text` into pieces of at most `max_chars` characters.
///
/// Sentences are kept together when they fit, then words, and only words longer
/// than the limit are cut mid-word.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(text) {
        if sentence.chars().count() <= max_chars {
            push_piece(&sentence, max_chars, &mut chunks, &mut current);
        } else {
            for word in sentence.split_whitespace() {
                push_piece(word, max_chars, &mut chunks, &mut current);
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn push_piece(piece: &str, max_chars: usize, chunks: &mut Vec<String>, current: &mut String) {
    let piece_len = piece.chars().count();
    let current_len = current.chars().count();
    let sep = usize::from(!current.is_empty());

    if current_len + sep + piece_len <= max_chars {
        if sep == 1 {
            current.push(' ');
        }
        current.push_str(piece);
        return;
    }

    if !current.is_empty() {
        chunks.push(std::mem::take(current));
    }

    if piece_len <= max_chars {
        current.push_str(piece);
    } else {
        let chars: Vec<char> = piece.chars().collect();
        for part in chars.chunks(max_chars) {
            chunks.push(part.iter().collect());
        }
    }
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if c == '\n' {
            flush_sentence(&mut current, &mut sentences);
            continue;
        }
        current.push(c);
        if matches!(c, '.' | '!' | '?' | ';' | '।' | '。' | '！' | '？') {
            flush_sentence(&mut current, &mut sentences);
        }
    }
    flush_sentence(&mut current, &mut sentences);
    sentences
}

fn flush_sentence(current: &mut String, sentences: &mut Vec<String>) {
    let normalized = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !normalized.is_empty() {
        sentences.push(normalized);
    }
    current.clear();
}

#[async_trait]
impl Synthesizer for GoogleTtsSynthesizer {
    async fn synthesize(&self, text: &str, language: &LanguageCode, output_dir: &Path) -> Result<PathBuf> {
        let chunks = split_text(text, self.config.chunk_chars);
        if chunks.is_empty() {
            return Err(RevoiceError::Synthesis("Nothing to synthesize".to_string()));
        }

        info!("Synthesizing {} chunk(s) in {} with Google TTS", chunks.len(), language);

        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            debug!("TTS chunk {}/{}: {}", idx + 1, chunks.len(), chunk);
            audio.extend(self.fetch_chunk(chunk, idx, chunks.len(), language).await?);
        }

        let output_path = output_dir.join(OUTPUT_FILE);
        tokio::fs::write(&output_path, &audio).await
            .map_err(|e| RevoiceError::Synthesis(format!("Failed to write {}: {}", output_path.display(), e)))?;

        info!("Synthesized {} bytes of audio to {}", audio.len(), output_path.display());
        Ok(output_path)
    }

    fn name(&self) -> &'static str {
        "google"
    }
}
