//! Error types for the probe module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while probing a media file.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The file to probe does not exist.
    #[error("Media file not found: {path}")]
    NotFound { path: PathBuf },

    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {path}")]
    BinaryNotFound { path: PathBuf },

    /// Failed to parse FFprobe output.
    #[error("Failed to parse probe output: {reason}")]
    ParseError { reason: String },

    /// I/O error while running the probe.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    /// Creates a new parse error.
    pub fn parse_error(reason: impl Into<String>) -> Self {
        Self::ParseError {
            reason: reason.into(),
        }
    }
}
