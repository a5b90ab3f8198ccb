// Media processing architecture
//
// This module wraps the codec tools behind one trait so the pipeline never
// talks to ffmpeg directly:
// - Commands: ffmpeg/ffprobe command builders
// - Probe: ffprobe JSON parsing
// - Processor: ffmpeg-based implementation of the trait

pub mod commands;
pub mod probe;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;

pub use commands::*;
pub use probe::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Demuxing, probing and muxing operations the pipeline delegates to a codec tool
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Probe container and stream information
    async fn probe(&self, path: &Path) -> Result<MediaInfo>;

    /// Extract a mono PCM16 WAV at the transcription sample rate
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()>;

    /// Convert any audio file into PCM16 WAV at the sync sample rate and channel layout
    async fn normalize_audio(&self, input_path: &Path, output_path: &Path) -> Result<()>;

    /// Combine the video stream of `video_path` with the audio of `audio_path`
    async fn mux(&self, video_path: &Path, audio_path: &Path, output_path: &Path) -> Result<()>;

    /// Check if the codec tools are available
    async fn check_availability(&self) -> Result<()>;

    /// Get codec tool version information
    async fn get_version_info(&self) -> Result<String>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessorTrait> {
        Box::new(processor::MediaProcessorImpl::new(config))
    }
}
