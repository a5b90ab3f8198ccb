//! revoice - replace the speech of a video with a translated voice track
//!
//! Entry point for the command line tool and the HTTP form server.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use revoice::cli::{Args, Commands};
use revoice::config::{Config, SynthesisMode, TranscriptionMode};
use revoice::error::RevoiceError;
use revoice::language::LanguageCode;
use revoice::server;
use revoice::source::VideoSource;
use revoice::workflow::{JobRequest, Workflow};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;
    info!("Starting revoice");

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Translate {
            video,
            url,
            target_language,
            source_language,
            transcription_mode,
            synthesis_mode,
            skip_checks,
        } => {
            if let Some(mode) = transcription_mode {
                config.transcriber.mode = parse_transcription_mode(&mode)?;
            }
            if let Some(mode) = synthesis_mode {
                config.synthesizer.mode = parse_synthesis_mode(&mode)?;
            }

            let source = match (video, url) {
                (Some(path), _) => VideoSource::LocalFile(path),
                (None, Some(url)) => VideoSource::Url(url),
                (None, None) => {
                    return Err(RevoiceError::Validation("Either --video or --url is required".to_string()).into());
                }
            };

            let request = JobRequest {
                source,
                source_language: source_language.as_deref().map(LanguageCode::parse).transpose()?,
                target_language: LanguageCode::parse(&target_language)?,
            };

            let workflow = Workflow::new(config)?;
            if !skip_checks {
                workflow.check_dependencies().await?;
            }

            let summary = workflow.run(request).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            let bind_address = config.server.bind_address.clone();

            let workflow = Workflow::new(config)?;
            workflow.check_dependencies().await?;
            server::serve(workflow, &bind_address).await?;
        }
        Commands::Probe { input } => {
            let workflow = Workflow::new(config)?;
            let media_info = workflow.probe(&input).await?;
            println!("{}", serde_json::to_string_pretty(&media_info)?);
        }
        Commands::Extract { input, output } => {
            info!("Extracting audio from: {}", input.display());
            let workflow = Workflow::new(config)?;
            workflow.extract_audio(&input, &output).await?;
        }
        Commands::Sync { video, audio, output } => {
            info!("Synchronizing {} with {}", audio.display(), video.display());
            let workflow = Workflow::new(config)?;
            let report = workflow.synchronize(&video, &audio, &output).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Mux { video, audio, output } => {
            info!("Muxing {} into {}", audio.display(), video.display());
            let workflow = Workflow::new(config)?;
            workflow.mux(&video, &audio, &output).await?;
        }
        Commands::InitConfig { output, force } => {
            if output.exists() && !force {
                return Err(RevoiceError::Config(format!(
                    "{} already exists, use --force to overwrite",
                    output.display()
                ))
                .into());
            }
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".revoice").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "revoice.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // The guard flushes on drop; logging lasts for the whole process
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("revoice.log").display()
    );

    Ok(())
}

fn parse_transcription_mode(mode: &str) -> Result<TranscriptionMode> {
    match mode.to_lowercase().replace('-', "_").as_str() {
        "whisper_cpp" | "whisper" => Ok(TranscriptionMode::WhisperCpp),
        "openai" => Ok(TranscriptionMode::OpenAi),
        _ => Err(RevoiceError::Config(format!(
            "Invalid transcription mode '{}'. Valid modes: whisper_cpp, openai",
            mode
        ))
        .into()),
    }
}

fn parse_synthesis_mode(mode: &str) -> Result<SynthesisMode> {
    match mode.to_lowercase().as_str() {
        "google" => Ok(SynthesisMode::Google),
        "piper" => Ok(SynthesisMode::Piper),
        _ => Err(RevoiceError::Config(format!(
            "Invalid synthesis mode '{}'. Valid modes: google, piper",
            mode
        ))
        .into()),
    }
}
