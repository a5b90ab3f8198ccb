use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;
use tracing::debug;

use crate::error::{Result, RevoiceError};

/// Decoded PCM16 audio with interleaved channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waveform {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
}

impl Waveform {
    pub fn new(samples: Vec<i16>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(RevoiceError::Media(format!(
                "Invalid audio layout: {} Hz, {} channels",
                sample_rate, channels
            )));
        }
        if samples.len() % channels as usize != 0 {
            return Err(RevoiceError::Media(format!(
                "Sample count {} is not a multiple of {} channels",
                samples.len(),
                channels
            )));
        }

        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    pub fn silence(frames: usize, sample_rate: u32, channels: u16) -> Result<Self> {
        Self::new(vec![0; frames * channels as usize], sample_rate, channels)
    }

    /// Read a 16-bit integer PCM WAV file
    pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = WavReader::open(path).map_err(|e| {
            RevoiceError::Media(format!("Failed to open audio {}: {}", path.display(), e))
        })?;

        let spec = reader.spec();
        if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(RevoiceError::Media(format!(
                "Unsupported audio format in {}: {} bit {:?}, expected 16 bit PCM",
                path.display(),
                spec.bits_per_sample,
                spec.sample_format
            )));
        }

        let samples = reader
            .samples::<i16>()
            .collect::<std::result::Result<Vec<i16>, _>>()
            .map_err(|e| {
                RevoiceError::Media(format!("Failed to decode audio {}: {}", path.display(), e))
            })?;

        debug!(
            "Read {} samples ({} Hz, {} ch) from {}",
            samples.len(),
            spec.sample_rate,
            spec.channels,
            path.display()
        );

        Self::new(samples, spec.sample_rate, spec.channels)
    }

    pub fn write_wav<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let spec = WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let map_err = |e: hound::Error| {
            RevoiceError::Media(format!("Failed to write audio {}: {}", path.display(), e))
        };

        let mut writer = WavWriter::create(path, spec).map_err(map_err)?;
        for &sample in &self.samples {
            writer.write_sample(sample).map_err(map_err)?;
        }
        writer.finalize().map_err(map_err)?;

        Ok(())
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of sample frames (one sample per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Keep only the first `frames` frames
    pub fn truncate_frames(&mut self, frames: usize) {
        self.samples.truncate(frames * self.channels as usize);
    }

    /// Append `frames` frames of digital silence
    pub fn pad_frames(&mut self, frames: usize) {
        let new_len = self.samples.len() + frames * self.channels as usize;
        self.samples.resize(new_len, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize, sample_rate: u32, channels: u16) -> Waveform {
        let samples = (0..frames * channels as usize)
            .map(|i| (i % 2000) as i16 - 1000)
            .collect();
        Waveform::new(samples, sample_rate, channels).unwrap()
    }

    #[test]
    fn test_duration_counts_frames_not_samples() {
        let wave = ramp(8000, 16000, 2);
        assert_eq!(wave.frames(), 8000);
        assert!((wave.duration() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_partial_frames() {
        assert!(Waveform::new(vec![1, 2, 3], 16000, 2).is_err());
        assert!(Waveform::new(vec![], 0, 1).is_err());
    }

    #[test]
    fn test_wav_file_preserves_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ramp.wav");
        let wave = ramp(4410, 44100, 1);

        wave.write_wav(&path).unwrap();
        let loaded = Waveform::read_wav(&path).unwrap();

        assert_eq!(loaded, wave);
    }

    #[test]
    fn test_rejects_float_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0.5f32).unwrap();
        writer.finalize().unwrap();

        assert!(matches!(Waveform::read_wav(&path), Err(RevoiceError::Media(_))));
    }

    #[test]
    fn test_unreadable_file_is_media_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"not a wav file").unwrap();

        assert!(matches!(Waveform::read_wav(&path), Err(RevoiceError::Media(_))));
    }

    #[test]
    fn test_pad_and_truncate() {
        let mut wave = ramp(100, 1000, 2);
        wave.pad_frames(50);
        assert_eq!(wave.frames(), 150);
        assert!(wave.samples()[200..].iter().all(|&s| s == 0));

        wave.truncate_frames(10);
        assert_eq!(wave.frames(), 10);
    }
}
