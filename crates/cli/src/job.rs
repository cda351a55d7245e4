//! Job files: one transcode described in TOML.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use warden_core::{EncodingOptions, MediaDescriptor, SupervisorOptions, TranscodeRequest};

/// A single transcode.
///
/// ```toml
/// input = "/media/awesome.mov"
/// output = "/tmp/awesome.mp4"
/// options = { video_codec = "libx264", resolution = "320x240" }
///
/// [supervisor]
/// preserve_aspect_ratio = "width"
/// ```
///
/// `options` may also be a raw string or a token list. `supervisor`
/// replaces the configured defaults as a whole.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(default)]
    pub concat: Vec<PathBuf>,
    #[serde(default)]
    pub options: EncodingOptions,
    #[serde(default)]
    pub supervisor: Option<SupervisorOptions>,
}

impl Job {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid job file")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job file {:?}", path))?;
        Self::from_toml_str(&contents)
    }

    /// Builds the request from probed inputs, falling back to `defaults`.
    pub fn into_request(
        self,
        source: MediaDescriptor,
        concat: Vec<MediaDescriptor>,
        defaults: &SupervisorOptions,
    ) -> TranscodeRequest {
        let supervisor = self.supervisor.unwrap_or_else(|| defaults.clone());
        TranscodeRequest::new(source, self.output, self.options)
            .concat(concat)
            .with_supervisor(supervisor)
    }
}
