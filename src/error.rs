//! Error types for Lectern.

use crate::api::ApiError;
use thiserror::Error;

/// Library-level error type for Lectern operations.
#[derive(Error, Debug)]
pub enum LecternError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Request already in progress: {0}")]
    Busy(String),

    #[error("Book is not ready for questions: {0}")]
    BookNotReady(String),

    #[error("Backend request failed: {0}")]
    Api(#[from] ApiError),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Media playback error: {0}")]
    Media(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl LecternError {
    /// Message suitable for showing to the user, preferring the server's detail text.
    pub fn user_message(&self) -> String {
        match self {
            LecternError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for Lectern operations.
pub type Result<T> = std::result::Result<T, LecternError>;
