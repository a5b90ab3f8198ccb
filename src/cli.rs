use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replace the speech of one video with a translated voice track
    #[command(group(ArgGroup::new("input").required(true).args(["video", "url"])))]
    Translate {
        /// Local video file
        #[arg(short, long)]
        video: Option<PathBuf>,

        /// Video URL to download
        #[arg(short, long)]
        url: Option<String>,

        /// Target language code (e.g. hi, es, zh-CN)
        #[arg(short, long)]
        target_language: String,

        /// Source language code; detected from speech when omitted
        #[arg(short, long)]
        source_language: Option<String>,

        /// Transcription backend (whisper_cpp or openai)
        #[arg(long)]
        transcription_mode: Option<String>,

        /// Speech synthesis backend (google or piper)
        #[arg(long)]
        synthesis_mode: Option<String>,

        /// Skip the ffmpeg and ollama availability checks
        #[arg(long)]
        skip_checks: bool,
    },

    /// Serve the upload form over HTTP
    Serve {
        /// Address to bind, overrides the configuration
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Print container and stream information as JSON
    Probe {
        /// Media file to inspect
        input: PathBuf,
    },

    /// Extract the speech track as mono 16-bit WAV
    Extract {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output audio file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Pad or truncate an audio file to the duration of a video
    Sync {
        /// Video whose duration is the target
        #[arg(long)]
        video: PathBuf,

        /// Audio file to reconcile (any format ffmpeg reads)
        #[arg(short, long)]
        audio: PathBuf,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Combine the video stream of one file with an audio file
    Mux {
        /// Input video file
        #[arg(long)]
        video: PathBuf,

        /// Input audio file
        #[arg(short, long)]
        audio: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write the default configuration to a file
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
