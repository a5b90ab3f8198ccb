//! Duration reconciliation between a synthesized voice track and a fixed video timeline.
//!
//! The synthesized track is padded with trailing silence when it is shorter than
//! the video and cut at the video's end when it is longer. Pitch and tempo are
//! never altered, so speech that overruns the video is dropped.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::audio::Waveform;
use crate::error::{Result, RevoiceError};

/// What reconciliation did to the synthesized track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SyncAction {
    /// Durations already matched within tolerance
    Passthrough,
    /// Silence appended to reach the video duration
    Padded { silence_seconds: f64 },
    /// Trailing speech removed to fit the video duration
    Truncated { dropped_seconds: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub video_duration: f64,
    pub synth_duration: f64,
    pub output_duration: f64,
    pub sample_rate: u32,
    pub channels: u16,
    #[serde(flatten)]
    pub action: SyncAction,
}

impl SyncReport {
    /// Seconds of translated speech that did not make it into the output
    pub fn dropped_seconds(&self) -> f64 {
        match self.action {
            SyncAction::Truncated { dropped_seconds } => dropped_seconds,
            _ => 0.0,
        }
    }
}

/// Largest accepted tolerance: one AAC frame, the block the muxed audio is coded in
pub const MAX_TOLERANCE_FRAMES: usize = 1024;

/// Number of frames a track at `sample_rate` needs to last `video_duration` seconds
pub fn target_frames(video_duration: f64, sample_rate: u32) -> Result<usize> {
    if !video_duration.is_finite() || video_duration <= 0.0 {
        return Err(RevoiceError::Media(format!(
            "Video duration could not be determined (got {})",
            video_duration
        )));
    }

    let frames = (video_duration * sample_rate as f64).round();
    if frames < 1.0 {
        return Err(RevoiceError::Media(format!(
            "Video duration {}s is shorter than one audio frame",
            video_duration
        )));
    }

    Ok(frames as usize)
}

/// Reconcile `synth` to last exactly `video_duration` seconds.
pub fn reconcile(
    video_duration: f64,
    mut synth: Waveform,
    tolerance_frames: usize,
) -> Result<(Waveform, SyncAction)> {
    if synth.is_empty() {
        return Err(RevoiceError::Media(
            "Synthesized audio is empty".to_string(),
        ));
    }

    let target = target_frames(video_duration, synth.sample_rate())?;
    let current = synth.frames();
    let rate = synth.sample_rate() as f64;

    let action = if current.abs_diff(target) <= tolerance_frames.min(MAX_TOLERANCE_FRAMES) {
        SyncAction::Passthrough
    } else if current < target {
        let missing = target - current;
        synth.pad_frames(missing);
        SyncAction::Padded {
            silence_seconds: missing as f64 / rate,
        }
    } else {
        let excess = current - target;
        synth.truncate_frames(target);
        SyncAction::Truncated {
            dropped_seconds: excess as f64 / rate,
        }
    };

    Ok((synth, action))
}

/// Reads a synthesized PCM16 WAV, reconciles it and writes the result
#[derive(Debug, Clone)]
pub struct SyncEngine {
    tolerance_frames: usize,
}

impl SyncEngine {
    pub fn new(tolerance_frames: usize) -> Self {
        if tolerance_frames > MAX_TOLERANCE_FRAMES {
            warn!(
                "Sync tolerance of {} frames exceeds one block; using {}",
                tolerance_frames, MAX_TOLERANCE_FRAMES
            );
        }
        Self {
            tolerance_frames: tolerance_frames.min(MAX_TOLERANCE_FRAMES),
        }
    }

    pub fn synchronize(
        &self,
        video_duration: f64,
        synth_path: &Path,
        output_path: &Path,
    ) -> Result<SyncReport> {
        info!(
            "Synchronizing {} to video duration {:.3}s",
            synth_path.display(),
            video_duration
        );

        let synth = Waveform::read_wav(synth_path)?;
        let synth_duration = synth.duration();
        let (reconciled, action) = reconcile(video_duration, synth, self.tolerance_frames)?;

        match action {
            SyncAction::Passthrough => {
                info!("Synthesized audio already matches the video ({:.3}s)", synth_duration);
            }
            SyncAction::Padded { silence_seconds } => {
                info!("Padded synthesized audio with {:.3}s of silence", silence_seconds);
            }
            SyncAction::Truncated { dropped_seconds } => {
                warn!(
                    "Synthesized speech runs {:.3}s past the end of the video; trailing speech is dropped",
                    dropped_seconds
                );
            }
        }

        reconciled.write_wav(output_path)?;

        Ok(SyncReport {
            video_duration,
            synth_duration,
            output_duration: reconciled.duration(),
            sample_rate: reconciled.sample_rate(),
            channels: reconciled.channels(),
            action,
        })
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16000;

    fn speech(seconds: f64, channels: u16) -> Waveform {
        let frames = (seconds * RATE as f64).round() as usize;
        let samples = (0..frames * channels as usize)
            .map(|i| ((i * 37) % 20000) as i16 - 10000 + 1)
            .collect();
        Waveform::new(samples, RATE, channels).unwrap()
    }

    #[test]
    fn test_short_speech_is_padded_with_silence() {
        let synth = speech(7.0, 1);
        let original = synth.samples().to_vec();

        let (out, action) = reconcile(10.0, synth, 1).unwrap();

        assert_eq!(out.frames(), 10 * RATE as usize);
        assert!((out.duration() - 10.0).abs() < 1.0 / RATE as f64);
        assert_eq!(&out.samples()[..original.len()], &original[..]);
        assert!(out.samples()[original.len()..].iter().all(|&s| s == 0));
        match action {
            SyncAction::Padded { silence_seconds } => assert!((silence_seconds - 3.0).abs() < 1e-9),
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_long_speech_is_truncated() {
        let synth = speech(8.2, 1);
        let original = synth.samples().to_vec();

        let (out, action) = reconcile(5.0, synth, 1).unwrap();

        assert_eq!(out.frames(), 5 * RATE as usize);
        assert_eq!(out.samples(), &original[..5 * RATE as usize]);
        match action {
            SyncAction::Truncated { dropped_seconds } => assert!((dropped_seconds - 3.2).abs() < 1e-6),
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_stereo_truncation_keeps_whole_frames() {
        let synth = speech(2.0, 2);
        let (out, _) = reconcile(1.5, synth, 0).unwrap();
        assert_eq!(out.frames(), 24000);
        assert_eq!(out.samples().len(), 48000);
    }

    #[test]
    fn test_equal_duration_within_tolerance_passes_through() {
        let synth = speech(4.0, 1);
        let mut one_frame_longer = synth.samples().to_vec();
        one_frame_longer.push(123);
        let synth_long = Waveform::new(one_frame_longer, RATE, 1).unwrap();

        let (out, action) = reconcile(4.0, synth.clone(), 1).unwrap();
        assert_eq!(action, SyncAction::Passthrough);
        assert_eq!(out, synth);

        let (out, action) = reconcile(4.0, synth_long.clone(), 1).unwrap();
        assert_eq!(action, SyncAction::Passthrough);
        assert_eq!(out, synth_long);
    }

    #[test]
    fn test_oversized_tolerance_is_capped() {
        // Half a second apart: far more than one block
        let (out, action) = reconcile(1.0, speech(1.5, 1), 44100).unwrap();
        assert!(matches!(action, SyncAction::Truncated { .. }));
        assert_eq!(out.frames(), RATE as usize);

        let engine = SyncEngine::new(44100);
        assert_eq!(engine.tolerance_frames, MAX_TOLERANCE_FRAMES);
    }

    #[test]
    fn test_empty_or_unknown_durations_fail() {
        let empty = Waveform::new(vec![], RATE, 1).unwrap();
        assert!(matches!(reconcile(3.0, empty, 1), Err(RevoiceError::Media(_))));

        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(reconcile(bad, speech(1.0, 1), 1), Err(RevoiceError::Media(_))));
        }
    }

    #[test]
    fn test_engine_output_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let synth_path = dir.path().join("synth.wav");
        speech(3.3, 1).write_wav(&synth_path).unwrap();

        let engine = SyncEngine::new(1);
        let first = dir.path().join("first.wav");
        let second = dir.path().join("second.wav");
        let report = engine.synchronize(5.0, &synth_path, &first).unwrap();
        engine.synchronize(5.0, &synth_path, &second).unwrap();

        assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
        assert!((report.output_duration - 5.0).abs() < 1e-9);
        assert_eq!(report.dropped_seconds(), 0.0);
    }

    #[test]
    fn test_engine_reports_dropped_speech() {
        let dir = tempfile::tempdir().unwrap();
        let synth_path = dir.path().join("synth.wav");
        speech(8.2, 1).write_wav(&synth_path).unwrap();

        let report = SyncEngine::default()
            .synchronize(5.0, &synth_path, &dir.path().join("out.wav"))
            .unwrap();

        assert!((report.dropped_seconds() - 3.2).abs() < 1e-6);
        assert!((report.synth_duration - 8.2).abs() < 1e-6);
    }

    #[test]
    fn test_engine_writes_nothing_on_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let synth_path = dir.path().join("empty.wav");
        Waveform::new(vec![], RATE, 1).unwrap().write_wav(&synth_path).unwrap();
        let output = dir.path().join("out.wav");

        let result = SyncEngine::default().synchronize(10.0, &synth_path, &output);

        assert!(matches!(result, Err(RevoiceError::Media(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_engine_rejects_unreadable_audio() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.wav");
        let result = SyncEngine::default().synchronize(10.0, &dir.path().join("missing.wav"), &output);

        assert!(matches!(result, Err(RevoiceError::Media(_))));
        assert!(!output.exists());
    }
}
