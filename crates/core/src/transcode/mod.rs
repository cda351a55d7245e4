//! Transcode module for supervising ffmpeg runs.
//!
//! This module provides:
//! - `OptionSet` and `EncodingOptions` for declaring encoder options
//! - Geometry derivations (aspect ratio preservation, autorotate)
//! - `StreamLineTimeoutReader` for reading encoder output with an idle timeout
//! - `ProgressTracker` for turning status lines into a progress fraction
//! - `OutputValidator` for post-run checks
//! - `Transcoder`, which ties these together for a single run

mod config;
mod error;
mod geometry;
mod options;
mod progress;
mod reader;
mod transcoder;
mod validator;

pub use config::{
    FfmpegConfig, InputOptions, PreserveAspectRatio, SupervisorOptions, DEFAULT_IDLE_TIMEOUT_SECS,
};
pub use error::{FailureReason, StreamReadError, TranscodeError, OUTPUT_TAIL_LINES};
pub use geometry::{evenize, rotation_filter, CLEAR_ROTATION_METADATA};
pub use options::{
    parse_resolution, EncodingOptions, OptionGroup, OptionName, OptionSet, OptionValue,
    WatermarkFilter, WatermarkPosition,
};
pub use progress::{
    parse_duration, parse_elapsed, reference_duration, ProgressTracker, TranscodeProgress,
    MAX_INTERMEDIATE_PROGRESS,
};
pub use reader::{decode_chunk, StreamLineTimeoutReader, Terminate};
pub use transcoder::{TranscodeRequest, TranscodeState, Transcoder};
pub use validator::{
    is_still_image_path, DurationTolerance, OutputValidator, ValidationExpectations,
    ValidationReport, REQUESTED_DURATION_PRECISION, SOURCE_DURATION_PRECISION,
    STILL_IMAGE_EXTENSIONS,
};
