use thiserror::Error;

#[derive(Error, Debug)]
pub enum RevoiceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Bad input: missing target language, disallowed file type, empty URL
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Download failed: {0}")]
    Download(String),

    /// Extraction, probing, synchronization and muxing failures
    #[error("Media processing error: {0}")]
    Media(String),

    /// Speech could not be recognized in the extracted audio
    #[error("Speech recognition failed: {0}")]
    Recognition(String),

    /// The transcription tool or service itself failed
    #[error("Transcription service error: {0}")]
    Service(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A job was moved through its stages out of order
    #[error("Invalid job state: {0}")]
    State(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl RevoiceError {
    /// Short category name used in logs and user-facing error pages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) | Self::Json(_) | Self::Toml(_) | Self::Http(_) => "InternalError",
            Self::Validation(_) => "ValidationError",
            Self::Download(_) => "DownloadError",
            Self::Media(_) => "MediaError",
            Self::Recognition(_) => "RecognitionError",
            Self::Service(_) => "ServiceError",
            Self::Translation(_) => "TranslationError",
            Self::Synthesis(_) => "SynthesisError",
            Self::Config(_) => "ConfigError",
            Self::State(_) => "InternalError",
            Self::FileNotFound(_) => "FileNotFound",
        }
    }

    /// True for errors caused by the caller's input rather than a pipeline stage
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::FileNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, RevoiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_follow_taxonomy() {
        assert_eq!(RevoiceError::Media("x".into()).kind(), "MediaError");
        assert_eq!(RevoiceError::Recognition("x".into()).kind(), "RecognitionError");
        assert_eq!(RevoiceError::Synthesis("x".into()).kind(), "SynthesisError");
        assert!(RevoiceError::Validation("x".into()).is_client_error());
        assert!(!RevoiceError::Download("x".into()).is_client_error());
    }

    #[test]
    fn test_display_keeps_message() {
        let err = RevoiceError::Translation("Ollama API error 500".into());
        assert_eq!(err.to_string(), "Translation error: Ollama API error 500");
    }
}
