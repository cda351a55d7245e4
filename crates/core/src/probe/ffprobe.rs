//! FFprobe-based probe implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::error::ProbeError;
use super::traits::Probe;
use super::types::{Dimensions, MediaDescriptor, Rotation};

/// Warning printed when the duration had to be guessed from the bitrate.
const UNCERTAIN_DURATION_MARKER: &str = "Estimating duration from bitrate";

/// Probe that shells out to `ffprobe` and parses its JSON report.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: PathBuf,
}

impl FfprobeProber {
    /// Creates a prober using the given ffprobe binary.
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Creates a prober that looks up `ffprobe` on the PATH.
    pub fn with_defaults() -> Self {
        Self::new("ffprobe")
    }

    /// Parses ffprobe JSON output into a descriptor.
    pub(crate) fn parse_probe_output(
        path: &Path,
        output: &str,
        warnings: &str,
    ) -> Result<MediaDescriptor, ProbeError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            #[serde(default)]
            format: Option<ProbeFormat>,
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            format_name: Option<String>,
            duration: Option<String>,
            size: Option<String>,
            bit_rate: Option<String>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            codec_type: Option<String>,
            codec_name: Option<String>,
            width: Option<u32>,
            height: Option<u32>,
            avg_frame_rate: Option<String>,
            r_frame_rate: Option<String>,
            display_aspect_ratio: Option<String>,
            sample_rate: Option<String>,
            channels: Option<u32>,
            #[serde(default)]
            tags: HashMap<String, String>,
            #[serde(default)]
            side_data_list: Vec<SideData>,
        }

        #[derive(Deserialize)]
        struct SideData {
            rotation: Option<f64>,
        }

        let probe: ProbeOutput = serde_json::from_str(output).map_err(|e| {
            ProbeError::parse_error(format!("Failed to parse ffprobe output: {}", e))
        })?;

        if probe.streams.is_empty() {
            debug!(path = %path.display(), "ffprobe reported no streams");
            return Ok(MediaDescriptor::invalid(path));
        }

        let format = probe.format;
        let video = probe
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"));
        let audio = probe
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("audio"));

        let duration_secs = format
            .as_ref()
            .and_then(|f| f.duration.as_ref())
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);

        let dimensions = video.and_then(|v| match (v.width, v.height) {
            (Some(w), Some(h)) => Some(Dimensions::new(w, h)),
            _ => None,
        });

        // The rotate tag is the legacy form; newer muxers only write a display
        // matrix whose rotation is counter-clockwise.
        let rotation = video.and_then(|v| {
            v.tags
                .get("rotate")
                .and_then(|r| r.trim().parse::<i64>().ok())
                .or_else(|| {
                    v.side_data_list
                        .iter()
                        .find_map(|sd| sd.rotation)
                        .map(|r| -(r.round() as i64))
                })
                .and_then(Rotation::from_degrees)
        });

        Ok(MediaDescriptor {
            path: path.to_path_buf(),
            duration_secs,
            duration_uncertain: warnings.contains(UNCERTAIN_DURATION_MARKER),
            valid: true,
            dimensions,
            rotation,
            frame_rate: video.and_then(|v| {
                v.avg_frame_rate
                    .as_deref()
                    .and_then(parse_ratio)
                    .or_else(|| v.r_frame_rate.as_deref().and_then(parse_ratio))
            }),
            display_aspect_ratio: video
                .and_then(|v| v.display_aspect_ratio.as_deref())
                .and_then(|r| parse_ratio(&r.replace(':', "/"))),
            container: format
                .as_ref()
                .and_then(|f| f.format_name.as_deref())
                .and_then(|n| n.split(',').next())
                .map(str::to_string),
            video_codec: video.and_then(|v| v.codec_name.clone()),
            audio_codec: audio.and_then(|a| a.codec_name.clone()),
            audio_sample_rate: audio
                .and_then(|a| a.sample_rate.as_ref())
                .and_then(|r| r.parse::<u32>().ok()),
            audio_channels: audio.and_then(|a| a.channels),
            bitrate_kbps: format
                .as_ref()
                .and_then(|f| f.bit_rate.as_ref())
                .and_then(|b| b.parse::<u64>().ok())
                .map(|b| (b / 1000) as u32),
            size_bytes: format
                .as_ref()
                .and_then(|f| f.size.as_ref())
                .and_then(|s| s.parse::<u64>().ok()),
        })
    }
}

/// Parses a ratio like "24000/1001" or a plain number.
///
/// Zero or undefined ratios ("0/0", "0:1") yield `None`.
fn parse_ratio(value: &str) -> Option<f64> {
    let ratio = match value.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.trim().parse::<f64>().ok()?,
    };
    (ratio.is_finite() && ratio > 0.0).then_some(ratio)
}

#[async_trait]
impl Probe for FfprobeProber {
    fn name(&self) -> &str {
        "ffprobe"
    }

    async fn probe(&self, path: &Path) -> Result<MediaDescriptor, ProbeError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(ProbeError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "warning",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ProbeError::BinaryNotFound {
                        path: self.ffprobe_path.clone(),
                    }
                } else {
                    ProbeError::Io(e)
                }
            })?;

        let warnings = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            debug!(
                path = %path.display(),
                status = ?output.status.code(),
                stderr = %warnings.trim(),
                "ffprobe could not decode file"
            );
            return Ok(MediaDescriptor::invalid(path));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_probe_output(path, &stdout, &warnings)
    }
}
