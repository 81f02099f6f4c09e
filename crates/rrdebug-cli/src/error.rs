use std::path::PathBuf;

use rrdebug_core::source::SourceError;
use rrdebug_core::versions::VersionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("failed to load remote events: {0}")]
    Source(#[from] SourceError),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("{path}: invalid JSON: {source}")]
    InvalidRecording {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl CliError {
    /// Usage and input errors exit with 2, everything else with 1.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } | Self::InvalidRecording { .. } => 2,
            _ => 1,
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
