use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{Result, RevoiceError};
use crate::job::{Job, JobId, JobState, JobWorkspace};
use crate::language::LanguageCode;
use crate::media::{MediaInfo, MediaProcessorFactory, MediaProcessorTrait};
use crate::source::{self, Downloader, DownloaderFactory, UploadPolicy, VideoSource};
use crate::synthesize::{Synthesizer, SynthesizerFactory};
use crate::sync::{SyncEngine, SyncReport};
use crate::transcribe::{Transcriber, TranscriberFactory};
use crate::translate::{Translator, TranslatorFactory};

const EXTRACTED_AUDIO: &str = "extracted_audio.wav";
const TRANSLATED_AUDIO: &str = "translated_audio.wav";
const RECONCILED_AUDIO: &str = "reconciled_audio.wav";
pub const TRANSLATED_VIDEO: &str = "translated_video.mp4";

/// Everything needed to start one job
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub source: VideoSource,
    pub source_language: Option<LanguageCode>,
    pub target_language: LanguageCode,
}

/// Outcome of a successful job
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub job_id: JobId,
    pub original_video: PathBuf,
    pub translated_video: PathBuf,
    pub transcript: String,
    /// Declared source language, or the one detected during transcription
    pub source_language: Option<LanguageCode>,
    pub target_language: LanguageCode,
    pub translated_text: String,
    pub sync: SyncReport,
    pub elapsed_seconds: f64,
}

/// A job that stopped before producing a video
#[derive(Debug, thiserror::Error)]
#[error("job {job_id} failed while {stage}: {error}")]
pub struct JobFailure {
    pub job_id: JobId,
    /// Stage the job was in when the error occurred
    pub stage: JobState,
    #[source]
    pub error: RevoiceError,
}

pub struct Workflow {
    config: Config,
    media: Box<dyn MediaProcessorTrait>,
    transcriber: Box<dyn Transcriber>,
    translator: Box<dyn Translator>,
    synthesizer: Box<dyn Synthesizer>,
    downloader: Box<dyn Downloader>,
    sync: SyncEngine,
    upload_policy: UploadPolicy,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        let media = MediaProcessorFactory::create_processor(config.media.clone());
        let transcriber = TranscriberFactory::create_transcriber(config.transcriber.clone())?;
        let translator = TranslatorFactory::create_translator(config.translate.clone())?;
        let synthesizer = SynthesizerFactory::create_synthesizer(config.synthesizer.clone())?;
        let downloader = DownloaderFactory::create_downloader(config.download.clone())?;

        Ok(Self::with_components(config, media, transcriber, translator, synthesizer, downloader))
    }

    /// Assemble a workflow from explicit collaborators
    pub fn with_components(
        config: Config,
        media: Box<dyn MediaProcessorTrait>,
        transcriber: Box<dyn Transcriber>,
        translator: Box<dyn Translator>,
        synthesizer: Box<dyn Synthesizer>,
        downloader: Box<dyn Downloader>,
    ) -> Self {
        let sync = SyncEngine::new(config.sync.tolerance_frames);
        let upload_policy = UploadPolicy::new(&config.upload);

        Self {
            config,
            media,
            transcriber,
            translator,
            synthesizer,
            downloader,
            sync,
            upload_policy,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Verify that the codec tools and the translation model are reachable
    pub async fn check_dependencies(&self) -> Result<()> {
        self.media.check_availability().await?;
        info!("Media tools: {}", self.media.get_version_info().await?);
        self.translator.check_availability().await?;
        info!(
            "Using transcriber '{}' and synthesizer '{}'",
            self.transcriber.name(),
            self.synthesizer.name()
        );
        Ok(())
    }

    /// Run one job from source acquisition to the published video.
    ///
    /// Every intermediate file lives in the job's scratch directory, which is
    /// removed when this returns. On failure nothing is left in the output
    /// directory and the job's input directory is removed too.
    pub async fn run(&self, request: JobRequest) -> std::result::Result<JobSummary, JobFailure> {
        let mut job = Job::new(request.target_language, request.source_language);
        info!(
            "Job {}: translating {} to {}",
            job.id,
            request.source.describe(),
            job.target_language
        );

        let mut workspace = match JobWorkspace::create(&self.config.storage, &job.id) {
            Ok(workspace) => workspace,
            Err(e) => return Err(Self::failure(&mut job, e)),
        };

        if let Err(e) = self.execute(&mut job, &mut workspace, &request.source).await {
            return Err(Self::failure(&mut job, e));
        }

        self.summarize(&job).map_err(|e| Self::failure(&mut job, e))
    }

    async fn execute(&self, job: &mut Job, workspace: &mut JobWorkspace, video_source: &VideoSource) -> Result<()> {
        let video = source::acquire(video_source, &self.upload_policy, self.downloader.as_ref(), workspace.input_dir()).await?;
        job.source_video = Some(video.clone());

        job.advance(JobState::Extracting)?;
        let extracted = workspace.scratch_file(EXTRACTED_AUDIO);
        self.media.extract_audio(&video, &extracted).await?;
        job.extracted_audio = Some(extracted.clone());

        job.advance(JobState::Transcribing)?;
        let transcript = self.transcriber.transcribe(&extracted, job.source_language.as_ref()).await?;
        info!("Job {}: transcribed {} chars", job.id, transcript.text.chars().count());
        job.transcript = Some(transcript.clone());

        job.advance(JobState::Translating)?;
        let source_language = job.effective_source_language().cloned();
        if source_language.as_ref().is_some_and(|s| s.same_language(&job.target_language)) {
            warn!("Job {}: source and target language are both {}", job.id, job.target_language);
        }
        let translated = self.translator
            .translate(&transcript.text, source_language.as_ref(), &job.target_language)
            .await?;
        job.translated_text = Some(translated.clone());

        job.advance(JobState::Synthesizing)?;
        let synthesized = self.synthesizer
            .synthesize(&translated, &job.target_language, workspace.scratch_dir())
            .await?;
        let normalized = workspace.scratch_file(TRANSLATED_AUDIO);
        self.media.normalize_audio(&synthesized, &normalized).await?;
        job.synthesized_audio = Some(normalized.clone());

        job.advance(JobState::Syncing)?;
        let video_duration = self.media.probe(&video).await?.video_duration()?;
        let reconciled = workspace.scratch_file(RECONCILED_AUDIO);
        let report = self.synchronize_blocking(video_duration, normalized, reconciled.clone()).await?;
        job.reconciled_audio = Some(reconciled.clone());
        job.sync_report = Some(report);

        job.advance(JobState::Muxing)?;
        let muxed = workspace.scratch_file(TRANSLATED_VIDEO);
        self.media.mux(&video, &reconciled, &muxed).await?;
        job.final_video = Some(workspace.publish(&muxed, TRANSLATED_VIDEO)?);

        job.advance(JobState::Done)?;
        info!("Job {} done in {:.1}s", job.id, job.elapsed().num_milliseconds() as f64 / 1000.0);
        Ok(())
    }

    async fn synchronize_blocking(&self, video_duration: f64, input: PathBuf, output: PathBuf) -> Result<SyncReport> {
        let engine = self.sync.clone();
        tokio::task::spawn_blocking(move || engine.synchronize(video_duration, &input, &output))
            .await
            .map_err(|e| RevoiceError::Media(format!("Synchronization task failed: {}", e)))?
    }

    fn summarize(&self, job: &Job) -> Result<JobSummary> {
        let missing = |what: &str| RevoiceError::State(format!("job {} finished without {}", job.id, what));

        Ok(JobSummary {
            job_id: job.id,
            original_video: job.source_video.clone().ok_or_else(|| missing("a source video"))?,
            translated_video: job.final_video.clone().ok_or_else(|| missing("an output video"))?,
            transcript: job.transcript.as_ref().map(|t| t.text.clone()).ok_or_else(|| missing("a transcript"))?,
            source_language: job.effective_source_language().cloned(),
            target_language: job.target_language.clone(),
            translated_text: job.translated_text.clone().ok_or_else(|| missing("a translation"))?,
            sync: job.sync_report.ok_or_else(|| missing("a sync report"))?,
            elapsed_seconds: job.elapsed().num_milliseconds() as f64 / 1000.0,
        })
    }

    fn failure(job: &mut Job, error: RevoiceError) -> JobFailure {
        let stage = job.state();
        if let Err(e) = job.fail() {
            warn!("{}", e);
        }
        error!("Job {} failed while {} ({}): {}", job.id, stage, error.kind(), error);
        JobFailure { job_id: job.id, stage, error }
    }

    pub async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        self.media.probe(path).await
    }

    pub async fn extract_audio(&self, video: &Path, output: &Path) -> Result<()> {
        self.media.extract_audio(video, output).await
    }

    /// Reconcile any audio file against a video's duration, outside of a job
    pub async fn synchronize(&self, video: &Path, audio: &Path, output: &Path) -> Result<SyncReport> {
        let video_duration = self.media.probe(video).await?.video_duration()?;
        let scratch = tempfile::tempdir()?;
        let normalized = scratch.path().join(TRANSLATED_AUDIO);
        self.media.normalize_audio(audio, &normalized).await?;
        self.synchronize_blocking(video_duration, normalized, output.to_path_buf()).await
    }

    pub async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        self.media.mux(video, audio, output).await
    }
}
