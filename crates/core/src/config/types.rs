use serde::{Deserialize, Serialize};

use crate::transcode::{FfmpegConfig, SupervisorOptions};

/// Top-level configuration.
///
/// `supervisor` holds the defaults applied to every job; a job file may
/// replace them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ffmpeg: FfmpegConfig,
    #[serde(default)]
    pub supervisor: SupervisorOptions,
}
