//! revoice - Automated video dubbing
//!
//! Extracts the speech of a video, transcribes and translates it, synthesizes
//! the translation and muxes the new voice track back onto the original video
//! after fitting it to the video's duration.

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod job;
pub mod language;
pub mod media;
pub mod server;
pub mod source;
pub mod sync;
pub mod synthesize;
pub mod transcribe;
pub mod translate;
pub mod workflow;
