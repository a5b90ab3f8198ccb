use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use crate::error::{Result, RevoiceError};
use crate::sync::MAX_TOLERANCE_FRAMES;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub media: MediaConfig,
    pub sync: SyncConfig,
    pub transcriber: TranscriberConfig,
    pub translate: TranslateConfig,
    pub synthesizer: SynthesizerConfig,
    pub download: DownloadConfig,
    pub upload: UploadConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Inputs and per-job intermediates live here, one directory per job
    pub upload_dir: PathBuf,
    /// Final translated videos, one directory per job
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Path to ffprobe binary
    pub probe_binary_path: String,
    /// Sample rate of the waveform handed to the transcriber
    pub extract_sample_rate: u32,
    /// Sample rate of the reconciled audio track handed to the muxer
    pub sync_sample_rate: u32,
    /// Channel count of the reconciled audio track
    pub sync_channels: u16,
    /// Video codec for the output container ("copy" keeps the source stream)
    pub video_codec: String,
    /// Audio codec for the output container
    pub audio_codec: String,
    /// Additional encoding options for muxing
    /// Common options: ["-preset", "medium", "-crf", "23", "-movflags", "+faststart"]
    pub mux_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Duration difference, in sample frames, treated as an exact match
    pub tolerance_frames: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionMode {
    /// whisper.cpp command line tool
    WhisperCpp,
    /// OpenAI-compatible /v1/audio/transcriptions endpoint
    #[serde(rename = "openai")]
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriberConfig {
    pub mode: TranscriptionMode,
    /// Path to whisper.cpp binary (e.g., whisper-cli)
    pub binary_path: String,
    /// Model file for whisper.cpp, model name for the HTTP endpoint
    pub model: String,
    /// Base URL of the OpenAI-compatible endpoint
    pub endpoint: String,
    /// Environment variable holding the API key for the HTTP endpoint
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Ollama endpoint URL
    pub endpoint: String,
    /// LLM model to use for translation
    pub model: String,
    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisMode {
    /// Google Translate TTS endpoint (MP3 output)
    Google,
    /// Local piper binary with one voice model per language
    Piper,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesizerConfig {
    pub mode: SynthesisMode,
    /// Google TTS endpoint URL
    pub endpoint: String,
    /// Maximum characters per TTS request
    pub chunk_chars: usize,
    /// Path to piper binary
    pub piper_binary_path: String,
    /// Piper voice model per language code, e.g. { hi = "voices/hi_IN-pratham-medium.onnx" }
    pub piper_voices: HashMap<String, PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadMode {
    /// Fetch the URL directly
    Http,
    /// Resolve the URL with yt-dlp (video pages, not just direct file links)
    YtDlp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub mode: DownloadMode,
    /// Path to yt-dlp binary
    pub ytdlp_binary_path: String,
    /// Abort downloads larger than this
    pub max_bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub allowed_extensions: Vec<String>,
    pub max_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            probe_binary_path: "ffprobe".to_string(),
            extract_sample_rate: 16000,
            sync_sample_rate: 44100,
            sync_channels: 1,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            mux_options: vec![
                // "-preset".to_string(), "medium".to_string(),
                // "-movflags".to_string(), "+faststart".to_string(),
            ],
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { tolerance_frames: 1 }
    }
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            mode: TranscriptionMode::WhisperCpp,
            binary_path: "whisper-cli".to_string(),
            model: ".revoice/models/ggml-base.bin".to_string(),
            endpoint: "https://api.openai.com".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            timeout_secs: 300,
        }
    }
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            mode: SynthesisMode::Google,
            endpoint: "https://translate.google.com/translate_tts".to_string(),
            chunk_chars: 100,
            piper_binary_path: "piper".to_string(),
            piper_voices: HashMap::new(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            mode: DownloadMode::Http,
            ytdlp_binary_path: "yt-dlp".to_string(),
            max_bytes: Some(100 * 1024 * 1024),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: ["mp4", "avi", "mov", "wmv"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_bytes: 100 * 1024 * 1024,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5000".to_string(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RevoiceError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| RevoiceError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.sync.tolerance_frames > MAX_TOLERANCE_FRAMES {
            return Err(RevoiceError::Config(format!(
                "sync.tolerance_frames is {}, the maximum is {} (one audio block)",
                self.sync.tolerance_frames, MAX_TOLERANCE_FRAMES
            )));
        }
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RevoiceError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| RevoiceError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}
