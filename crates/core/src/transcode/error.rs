//! Error types for the transcode module.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::probe::ProbeError;

/// Number of output lines kept by [`TranscodeError::output_tail`].
pub const OUTPUT_TAIL_LINES: usize = 20;

/// A single reason a finished run was not accepted.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The encoder exited unsuccessfully (`None` when killed by a signal).
    #[error("ffmpeg returned non-zero exit code")]
    NonZeroExit { code: Option<i32> },

    #[error("no output file created")]
    MissingOutput,

    /// Re-probing the output did not yield a decodable file.
    #[error("encoded file is invalid")]
    InvalidOutput,

    #[error("encoded file duration differed from original/specified duration")]
    DurationMismatch {
        expected_secs: f64,
        actual_secs: f64,
        precision: f64,
    },
}

/// Errors that can occur while building or running a transcode.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// Options were given in an unsupported shape or with malformed values.
    #[error("Invalid options format: {reason}")]
    InvalidOptionsFormat { reason: String },

    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// The encoder stopped producing output and was killed.
    #[error("Process hung, no output for {timeout_secs} seconds")]
    ProcessHung {
        timeout_secs: u64,
        command: Vec<String>,
        output: String,
    },

    /// The run finished but was rejected.
    #[error("Failed encoding. Errors: {}", join_reasons(.reasons))]
    TranscodeFailed {
        reasons: Vec<FailureReason>,
        command: Vec<String>,
        output: String,
    },

    /// A transcoder only runs once.
    #[error("Transcoder has already been run")]
    AlreadyRun,

    /// The output could not be re-probed.
    #[error("Failed to probe output: {0}")]
    Probe(#[from] ProbeError),

    /// I/O error while supervising the encoder.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_reasons(reasons: &[FailureReason]) -> String {
    reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl TranscodeError {
    /// Creates a new invalid options error.
    pub fn invalid_options(reason: impl Into<String>) -> Self {
        Self::InvalidOptionsFormat {
            reason: reason.into(),
        }
    }

    /// Failure reasons, empty for anything but `TranscodeFailed`.
    pub fn reasons(&self) -> &[FailureReason] {
        match self {
            Self::TranscodeFailed { reasons, .. } => reasons,
            _ => &[],
        }
    }

    /// Full encoder output captured before the error, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::ProcessHung { output, .. } | Self::TranscodeFailed { output, .. } => {
                Some(output)
            }
            _ => None,
        }
    }

    /// Last lines of the captured encoder output.
    pub fn output_tail(&self) -> Option<String> {
        self.output().map(|output| {
            let lines: Vec<&str> = output.lines().collect();
            let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
            lines[start..].join("\n")
        })
    }

    /// The full command of the failed run, if any.
    pub fn command(&self) -> Option<&[String]> {
        match self {
            Self::ProcessHung { command, .. } | Self::TranscodeFailed { command, .. } => {
                Some(command)
            }
            _ => None,
        }
    }
}

/// Errors raised by the stream reader.
#[derive(Debug, Error)]
pub enum StreamReadError {
    /// No chunk arrived within the idle timeout. The process has been told to die.
    #[error("No output received for {idle_timeout:?}")]
    IdleTimeout {
        idle_timeout: Duration,
        output: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
