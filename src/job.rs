//! Job identity, stage tracking and the per-job working area.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{Result, RevoiceError};
use crate::language::LanguageCode;
use crate::sync::SyncReport;
use crate::transcribe::Transcript;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

/// Pipeline position of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Created,
    Extracting,
    Transcribing,
    Translating,
    Synthesizing,
    Syncing,
    Muxing,
    Done,
    Failed,
}

impl JobState {
    /// The only state a job may move to on success
    pub fn next(self) -> Option<JobState> {
        match self {
            Self::Created => Some(Self::Extracting),
            Self::Extracting => Some(Self::Transcribing),
            Self::Transcribing => Some(Self::Translating),
            Self::Translating => Some(Self::Synthesizing),
            Self::Synthesizing => Some(Self::Syncing),
            Self::Syncing => Some(Self::Muxing),
            Self::Muxing => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Extracting => "extracting",
            Self::Transcribing => "transcribing",
            Self::Translating => "translating",
            Self::Synthesizing => "synthesizing",
            Self::Syncing => "syncing",
            Self::Muxing => "muxing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One end-to-end translation request and the outputs of its stages
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub created_at: DateTime<Utc>,
    pub target_language: LanguageCode,
    pub source_language: Option<LanguageCode>,
    state: JobState,
    /// Stage the job was in when it failed
    failed_in: Option<JobState>,
    pub source_video: Option<PathBuf>,
    pub extracted_audio: Option<PathBuf>,
    pub transcript: Option<Transcript>,
    pub translated_text: Option<String>,
    pub synthesized_audio: Option<PathBuf>,
    pub reconciled_audio: Option<PathBuf>,
    pub sync_report: Option<SyncReport>,
    pub final_video: Option<PathBuf>,
}

impl Job {
    pub fn new(target_language: LanguageCode, source_language: Option<LanguageCode>) -> Self {
        Self {
            id: JobId::new(),
            created_at: Utc::now(),
            target_language,
            source_language,
            state: JobState::Created,
            failed_in: None,
            source_video: None,
            extracted_audio: None,
            transcript: None,
            translated_text: None,
            synthesized_audio: None,
            reconciled_audio: None,
            sync_report: None,
            final_video: None,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn failed_in(&self) -> Option<JobState> {
        self.failed_in
    }

    /// Move to `next`, which must directly follow the current state
    pub fn advance(&mut self, next: JobState) -> Result<()> {
        if self.state.next() != Some(next) {
            return Err(RevoiceError::State(format!(
                "job {} cannot move from {} to {}",
                self.id, self.state, next
            )));
        }
        debug!("Job {}: {} -> {}", self.id, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Enter the absorbing failure state, remembering where the job stopped
    pub fn fail(&mut self) -> Result<()> {
        if self.state.is_terminal() {
            return Err(RevoiceError::State(format!(
                "job {} is already {}",
                self.id, self.state
            )));
        }
        self.failed_in = Some(self.state);
        self.state = JobState::Failed;
        Ok(())
    }

    /// Source language as declared, or as detected by the transcriber
    pub fn effective_source_language(&self) -> Option<&LanguageCode> {
        self.source_language
            .as_ref()
            .or_else(|| self.transcript.as_ref().and_then(|t| t.language.as_ref()))
    }

    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.created_at
    }
}

/// Per-job directories under the configured storage roots.
///
/// `input_dir` (`<upload_dir>/<job id>`) receives the source video and holds a
/// scratch directory for every intermediate file. Dropping the workspace deletes
/// the scratch directory. Unless [`JobWorkspace::publish`] succeeded, it also
/// deletes the input directory and any partial output directory.
#[derive(Debug)]
pub struct JobWorkspace {
    input_dir: PathBuf,
    output_dir: PathBuf,
    scratch: Option<TempDir>,
    committed: bool,
}

impl JobWorkspace {
    pub fn create(storage: &StorageConfig, id: &JobId) -> Result<Self> {
        let input_dir = storage.upload_dir.join(id.to_string());
        let output_dir = storage.output_dir.join(id.to_string());

        std::fs::create_dir_all(&input_dir)?;
        let scratch = tempfile::Builder::new()
            .prefix("scratch-")
            .tempdir_in(&input_dir)?;

        debug!("Created workspace {} (scratch {})", input_dir.display(), scratch.path().display());

        Ok(Self {
            input_dir,
            output_dir,
            scratch: Some(scratch),
            committed: false,
        })
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch
            .as_ref()
            .map(TempDir::path)
            .unwrap_or(self.input_dir.as_path())
    }

    /// Path for a fixed per-stage file name inside the scratch directory
    pub fn scratch_file(&self, name: &str) -> PathBuf {
        self.scratch_dir().join(name)
    }

    /// Move a finished file into the job's output directory and keep the workspace's inputs
    pub fn publish(&mut self, produced: &Path, file_name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let destination = self.output_dir.join(file_name);

        if let Err(e) = std::fs::rename(produced, &destination) {
            // Storage roots may sit on different filesystems
            debug!("Rename failed ({}), copying {} instead", e, produced.display());
            std::fs::copy(produced, &destination)?;
            std::fs::remove_file(produced)?;
        }

        self.committed = true;
        Ok(destination)
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if let Some(scratch) = self.scratch.take() {
            let path = scratch.path().to_path_buf();
            if let Err(e) = scratch.close() {
                warn!("Failed to remove scratch directory {}: {}", path.display(), e);
            }
        }

        if self.committed {
            // Nothing was stored for local-file sources
            let _ = std::fs::remove_dir(&self.input_dir);
            return;
        }

        for dir in [&self.input_dir, &self.output_dir] {
            if dir.exists() {
                if let Err(e) = std::fs::remove_dir_all(dir) {
                    warn!("Failed to remove {}: {}", dir.display(), e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir as AssertDir;

    fn storage(root: &Path) -> StorageConfig {
        StorageConfig {
            upload_dir: root.join("uploads"),
            output_dir: root.join("output"),
        }
    }

    fn job() -> Job {
        Job::new(LanguageCode::parse("hi").unwrap(), None)
    }

    #[test]
    fn test_states_advance_in_order() {
        let mut job = job();
        let order = [
            JobState::Extracting,
            JobState::Transcribing,
            JobState::Translating,
            JobState::Synthesizing,
            JobState::Syncing,
            JobState::Muxing,
            JobState::Done,
        ];
        for state in order {
            job.advance(state).unwrap();
        }
        assert_eq!(job.state(), JobState::Done);
        assert!(job.fail().is_err());
    }

    #[test]
    fn test_skipping_a_stage_is_rejected() {
        let mut job = job();
        assert!(matches!(job.advance(JobState::Translating), Err(RevoiceError::State(_))));
        assert_eq!(job.state(), JobState::Created);
    }

    #[test]
    fn test_failed_is_absorbing() {
        let mut job = job();
        job.advance(JobState::Extracting).unwrap();
        job.advance(JobState::Transcribing).unwrap();
        job.fail().unwrap();

        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(job.failed_in(), Some(JobState::Transcribing));
        assert!(job.advance(JobState::Translating).is_err());
        assert!(job.fail().is_err());
    }

    #[test]
    fn test_source_language_falls_back_to_detected() {
        let mut job = job();
        assert!(job.effective_source_language().is_none());

        job.transcript = Some(Transcript {
            text: "hello".to_string(),
            language: Some(LanguageCode::parse("en").unwrap()),
        });
        assert_eq!(job.effective_source_language().map(|l| l.as_str()), Some("en"));

        job.source_language = Some(LanguageCode::parse("fr").unwrap());
        assert_eq!(job.effective_source_language().map(|l| l.as_str()), Some("fr"));
    }

    #[test]
    fn test_job_ids_are_unique() {
        assert_ne!(JobId::new().to_string(), JobId::new().to_string());
    }

    #[test]
    fn test_dropped_workspace_removes_everything() {
        let root = AssertDir::new().unwrap();
        let storage = storage(root.path());
        let id = JobId::new();

        let (input, scratch) = {
            let ws = JobWorkspace::create(&storage, &id).unwrap();
            std::fs::write(ws.input_dir().join("video.mp4"), b"v").unwrap();
            std::fs::write(ws.scratch_file("extracted_audio.wav"), b"a").unwrap();
            (ws.input_dir().to_path_buf(), ws.scratch_dir().to_path_buf())
        };

        assert!(!scratch.exists());
        assert!(!input.exists());
        assert!(!storage.output_dir.join(id.to_string()).exists());
    }

    #[test]
    fn test_published_workspace_keeps_input_and_output() {
        let root = AssertDir::new().unwrap();
        let storage = storage(root.path());
        let id = JobId::new();

        let (input, scratch, published) = {
            let mut ws = JobWorkspace::create(&storage, &id).unwrap();
            std::fs::write(ws.input_dir().join("video.mp4"), b"v").unwrap();
            let produced = ws.scratch_file("translated_video.mp4");
            std::fs::write(&produced, b"out").unwrap();
            let published = ws.publish(&produced, "translated_video.mp4").unwrap();
            (ws.input_dir().to_path_buf(), ws.scratch_dir().to_path_buf(), published)
        };

        assert!(!scratch.exists());
        assert!(input.join("video.mp4").exists());
        assert_eq!(published, storage.output_dir.join(id.to_string()).join("translated_video.mp4"));
        assert_eq!(std::fs::read(&published).unwrap(), b"out");
    }

    #[test]
    fn test_published_workspace_without_inputs_leaves_no_directory() {
        let root = AssertDir::new().unwrap();
        let storage = storage(root.path());

        let input = {
            let mut ws = JobWorkspace::create(&storage, &JobId::new()).unwrap();
            let produced = ws.scratch_file("translated_video.mp4");
            std::fs::write(&produced, b"out").unwrap();
            ws.publish(&produced, "translated_video.mp4").unwrap();
            ws.input_dir().to_path_buf()
        };

        assert!(!input.exists());
    }
}
