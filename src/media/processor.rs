use async_trait::async_trait;
use std::path::Path;
use tracing::{info, debug};

use crate::config::MediaConfig;
use crate::error::{Result, RevoiceError};
use super::{MediaProcessorTrait, MediaCommandBuilder, MediaInfo, parse_probe_json};

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    /// Create a new media processor implementation
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path, &config.probe_binary_path);

        Self {
            config,
            command_builder,
        }
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        if !path.exists() {
            return Err(RevoiceError::FileNotFound(path.display().to_string()));
        }

        debug!("Probing {}", path.display());
        let stdout = self.command_builder.probe(path).execute_with_output().await?;
        let info = parse_probe_json(&stdout, path)?;

        debug!(
            "Probed {}: container={}, duration={:?}, video={:?}, audio={:?}",
            path.display(),
            info.container,
            info.duration,
            info.video,
            info.audio
        );
        Ok(info)
    }

    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        info!("Extracting audio from {} to {}", video_path.display(), audio_path.display());

        self.command_builder
            .extract_audio(video_path, audio_path, self.config.extract_sample_rate)
            .execute()
            .await?;

        info!("Audio extraction completed");
        Ok(())
    }

    async fn normalize_audio(&self, input_path: &Path, output_path: &Path) -> Result<()> {
        info!(
            "Normalizing {} to {} Hz, {} channel(s)",
            input_path.display(),
            self.config.sync_sample_rate,
            self.config.sync_channels
        );

        self.command_builder
            .normalize_audio(
                input_path,
                output_path,
                self.config.sync_sample_rate,
                self.config.sync_channels,
            )
            .execute()
            .await
    }

    async fn mux(&self, video_path: &Path, audio_path: &Path, output_path: &Path) -> Result<()> {
        info!(
            "Muxing video {} with audio {} -> {}",
            video_path.display(),
            audio_path.display(),
            output_path.display()
        );

        self.command_builder
            .mux(
                video_path,
                audio_path,
                output_path,
                &self.config.video_codec,
                &self.config.audio_codec,
                &self.config.mux_options,
            )
            .execute()
            .await?;

        info!("Muxing completed successfully");
        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        self.command_builder
            .version_check()
            .execute()
            .await
            .map_err(|e| RevoiceError::Media(format!("ffmpeg not available: {}", e)))?;
        self.command_builder
            .probe_version_check()
            .execute()
            .await
            .map_err(|e| RevoiceError::Media(format!("ffprobe not available: {}", e)))?;

        info!("Media processor is available");
        Ok(())
    }

    async fn get_version_info(&self) -> Result<String> {
        debug!("Getting media processor version information");

        let stdout = self.command_builder.version_check().execute_with_output().await?;
        let version_info = String::from_utf8_lossy(&stdout);
        // The first line carries the version
        let first_line = version_info.lines().next().unwrap_or("Unknown version");
        Ok(first_line.to_string())
    }
}
