//! Parsing of `ffprobe -print_format json -show_format -show_streams` output.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, RevoiceError};

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    duration: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u16>,
    avg_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoStreamInfo {
    pub codec: String,
    pub duration: Option<f64>,
    pub frame_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioStreamInfo {
    pub codec: String,
    pub duration: Option<f64>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

/// What the pipeline needs to know about a media asset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub container: String,
    pub duration: Option<f64>,
    pub video: Option<VideoStreamInfo>,
    pub audio: Option<AudioStreamInfo>,
}

impl MediaInfo {
    /// Duration of the video track, falling back to the container duration
    pub fn video_duration(&self) -> Result<f64> {
        let video = self.video.as_ref().ok_or_else(|| {
            RevoiceError::Media(format!("No video stream in {}", self.path.display()))
        })?;

        video
            .duration
            .or(self.duration)
            .filter(|d| d.is_finite() && *d > 0.0)
            .ok_or_else(|| {
                RevoiceError::Media(format!(
                    "Could not determine video duration of {}",
                    self.path.display()
                ))
            })
    }
}

pub fn parse_probe_json(json: &[u8], path: &Path) -> Result<MediaInfo> {
    let output: FfprobeOutput = serde_json::from_slice(json).map_err(|e| {
        RevoiceError::Media(format!("Failed to parse probe output for {}: {}", path.display(), e))
    })?;

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .map(|s| VideoStreamInfo {
            codec: s.codec_name.clone().unwrap_or_else(|| "unknown".to_string()),
            duration: parse_seconds(s.duration.as_deref()),
            frame_rate: s.avg_frame_rate.as_deref().and_then(parse_rational),
        });

    let audio = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .map(|s| AudioStreamInfo {
            codec: s.codec_name.clone().unwrap_or_else(|| "unknown".to_string()),
            duration: parse_seconds(s.duration.as_deref()),
            sample_rate: s.sample_rate.as_deref().and_then(|r| r.parse().ok()),
            channels: s.channels,
        });

    let (container, duration) = match output.format {
        Some(format) => (
            format.format_name.unwrap_or_else(|| "unknown".to_string()),
            parse_seconds(format.duration.as_deref()),
        ),
        None => ("unknown".to_string(), None),
    };

    Ok(MediaInfo {
        path: path.to_path_buf(),
        container,
        duration,
        video,
        audio,
    })
}

fn parse_seconds(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// Parse ffprobe rationals such as "30000/1001"
fn parse_rational(value: &str) -> Option<f64> {
    let (num, den) = value.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"index": 0, "codec_name": "h264", "codec_type": "video", "avg_frame_rate": "30000/1001", "duration": "10.010000"},
            {"index": 1, "codec_name": "aac", "codec_type": "audio", "sample_rate": "44100", "channels": 2, "duration": "10.030000"}
        ],
        "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "10.030000"}
    }"#;

    #[test]
    fn test_parse_streams_and_format() {
        let info = parse_probe_json(SAMPLE.as_bytes(), Path::new("clip.mp4")).unwrap();

        let video = info.video.as_ref().unwrap();
        assert_eq!(video.codec, "h264");
        assert!((video.frame_rate.unwrap() - 29.97).abs() < 0.01);

        let audio = info.audio.as_ref().unwrap();
        assert_eq!(audio.sample_rate, Some(44100));
        assert_eq!(audio.channels, Some(2));

        assert_eq!(info.container, "mov,mp4,m4a,3gp,3g2,mj2");
        assert!((info.video_duration().unwrap() - 10.01).abs() < 1e-9);
    }

    #[test]
    fn test_video_duration_falls_back_to_container() {
        let json = r#"{
            "streams": [{"codec_name": "wmv2", "codec_type": "video", "avg_frame_rate": "0/0", "duration": "N/A"}],
            "format": {"format_name": "asf", "duration": "42.5"}
        }"#;
        let info = parse_probe_json(json.as_bytes(), Path::new("clip.wmv")).unwrap();

        assert_eq!(info.video.as_ref().unwrap().frame_rate, None);
        assert_eq!(info.video_duration().unwrap(), 42.5);
    }

    #[test]
    fn test_missing_duration_is_media_error() {
        let json = r#"{"streams": [{"codec_name": "h264", "codec_type": "video"}], "format": {}}"#;
        let info = parse_probe_json(json.as_bytes(), Path::new("clip.mp4")).unwrap();
        assert!(matches!(info.video_duration(), Err(RevoiceError::Media(_))));

        let audio_only = r#"{"streams": [{"codec_name": "mp3", "codec_type": "audio"}], "format": {"duration": "3.0"}}"#;
        let info = parse_probe_json(audio_only.as_bytes(), Path::new("voice.mp3")).unwrap();
        assert!(info.video_duration().is_err());
        assert_eq!(info.duration, Some(3.0));
    }

    #[test]
    fn test_garbage_is_media_error() {
        assert!(matches!(
            parse_probe_json(b"not json", Path::new("x")),
            Err(RevoiceError::Media(_))
        ));
    }
}
