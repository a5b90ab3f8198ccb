use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, RevoiceError};

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Select a stream for the output
    pub fn map<S: Into<String>>(self, specifier: S) -> Self {
        self.arg("-map").arg(specifier)
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Disable video
    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    /// Set audio sample rate
    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.arg("-ar").arg(rate.to_string())
    }

    /// Set audio channels
    pub fn audio_channels(self, channels: u16) -> Self {
        self.arg("-ac").arg(channels.to_string())
    }

    /// Execute the command, discarding its output
    pub async fn execute(&self) -> Result<()> {
        self.execute_with_output().await.map(|_| ())
    }

    /// Execute the command and return its stdout
    pub async fn execute_with_output(&self) -> Result<Vec<u8>> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| RevoiceError::Media(format!("Failed to execute {}: {}", self.binary_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RevoiceError::Media(format!(
                "{} failed: {}",
                self.description,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

/// Builder for the ffmpeg/ffprobe invocations the pipeline needs
#[derive(Debug, Clone)]
pub struct MediaCommandBuilder {
    binary_path: String,
    probe_binary_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, probe_binary_path: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            probe_binary_path: probe_binary_path.into(),
        }
    }

    /// Build audio extraction command (mono PCM16 for speech recognition)
    pub fn extract_audio<P: AsRef<Path>>(
        &self,
        video_path: P,
        audio_path: P,
        sample_rate: u32,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio extraction")
            .input(video_path)
            .no_video()
            .audio_codec("pcm_s16le")
            .audio_sample_rate(sample_rate)
            .audio_channels(1)
            .overwrite()
            .output(audio_path)
    }

    /// Build a conversion of arbitrary audio into PCM16 WAV with a fixed layout
    pub fn normalize_audio<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: P,
        sample_rate: u32,
        channels: u16,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio normalization")
            .input(input_path)
            .no_video()
            .audio_codec("pcm_s16le")
            .audio_sample_rate(sample_rate)
            .audio_channels(channels)
            .arg("-f")
            .arg("wav")
            .overwrite()
            .output(output_path)
    }

    /// Build the mux command: video stream of the first input, audio of the second.
    ///
    /// The source video's own audio is never mapped, and no option that re-times
    /// frames (`-shortest`, `-r`, `-vsync`) is added.
    pub fn mux<P: AsRef<Path>>(
        &self,
        video_path: P,
        audio_path: P,
        output_path: P,
        video_codec: &str,
        audio_codec: &str,
        additional_options: &[String],
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Muxing")
            .overwrite()
            .input(video_path)
            .input(audio_path)
            .map("0:v:0")
            .map("1:a:0")
            .video_codec(video_codec)
            .audio_codec(audio_codec)
            .args(additional_options.iter().cloned())
            .output(output_path)
    }

    /// Build an ffprobe command printing format and stream information as JSON
    pub fn probe<P: AsRef<Path>>(&self, path: P) -> MediaCommand {
        MediaCommand::new(&self.probe_binary_path, "Media probe")
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .output(path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }

    /// Build probe version check command
    pub fn probe_version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.probe_binary_path, "Probe version check").arg("-version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> MediaCommandBuilder {
        MediaCommandBuilder::new("ffmpeg", "ffprobe")
    }

    #[test]
    fn test_extract_audio_args() {
        let cmd = builder().extract_audio("in.mp4", "out.wav", 16000);
        assert_eq!(
            cmd.args,
            vec!["-i", "in.mp4", "-vn", "-c:a", "pcm_s16le", "-ar", "16000", "-ac", "1", "-y", "out.wav"]
        );
    }

    #[test]
    fn test_mux_maps_only_source_video() {
        let options = vec!["-movflags".to_string(), "+faststart".to_string()];
        let cmd = builder().mux("in.mp4", "voice.wav", "out.mp4", "libx264", "aac", &options);

        assert_eq!(cmd.binary_path, "ffmpeg");
        assert_eq!(
            cmd.args,
            vec![
                "-y", "-i", "in.mp4", "-i", "voice.wav", "-map", "0:v:0", "-map", "1:a:0",
                "-c:v", "libx264", "-c:a", "aac", "-movflags", "+faststart", "out.mp4"
            ]
        );
        assert!(!cmd.args.iter().any(|a| a == "-shortest"));
    }

    #[test]
    fn test_probe_uses_probe_binary() {
        let cmd = builder().probe("clip.mov");
        assert_eq!(cmd.binary_path, "ffprobe");
        assert_eq!(cmd.args.last().map(String::as_str), Some("clip.mov"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_media_error() {
        let cmd = MediaCommand::new("/nonexistent/revoice-ffmpeg", "Version check").arg("-version");
        assert!(matches!(cmd.execute().await, Err(RevoiceError::Media(_))));
    }
}
