//! Types describing a probed media file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Rotation recorded in a video stream's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    /// No rotation.
    Deg0,
    /// Quarter turn clockwise.
    Deg90,
    /// Half turn.
    Deg180,
    /// Three quarter turn clockwise.
    Deg270,
}

impl Rotation {
    /// Normalizes an arbitrary angle to one of the four right-angle rotations.
    ///
    /// Returns `None` for angles that are not a multiple of 90.
    pub fn from_degrees(degrees: i64) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    /// Returns the rotation in degrees.
    pub fn degrees(&self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Whether applying this rotation swaps width and height.
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::from_degrees(i64::from(value))
            .ok_or_else(|| format!("unsupported rotation: {} degrees", value))
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.degrees())
    }
}

/// Pixel dimensions of a video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height, `None` when height is zero.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.height == 0 {
            return None;
        }
        Some(f64::from(self.width) / f64::from(self.height))
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Read-only summary of a media file's geometry and timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    /// File path.
    pub path: PathBuf,
    /// Duration in seconds (0.0 when unknown).
    pub duration_secs: f64,
    /// Whether the duration is an estimate (e.g. derived from bitrate).
    #[serde(default)]
    pub duration_uncertain: bool,
    /// Whether the file could be decoded at all.
    pub valid: bool,
    /// Video dimensions (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    /// Rotation of the first video stream (if recorded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Rotation>,
    /// Video frame rate (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,
    /// Display aspect ratio reported by the container (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_aspect_ratio: Option<f64>,
    /// Container format (e.g., "mov", "matroska").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    /// Video codec (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    /// Audio codec (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    /// Audio sample rate in Hz (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_sample_rate: Option<u32>,
    /// Audio channel count (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_channels: Option<u32>,
    /// Overall bitrate in kbps (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
    /// File size in bytes (if known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

impl MediaDescriptor {
    /// Creates a valid descriptor with only a path and a duration.
    pub fn new(path: impl Into<PathBuf>, duration_secs: f64) -> Self {
        Self {
            path: path.into(),
            duration_secs,
            duration_uncertain: false,
            valid: true,
            dimensions: None,
            rotation: None,
            frame_rate: None,
            display_aspect_ratio: None,
            container: None,
            video_codec: None,
            audio_codec: None,
            audio_sample_rate: None,
            audio_channels: None,
            bitrate_kbps: None,
            size_bytes: None,
        }
    }

    /// Creates a descriptor for a file that could not be decoded.
    pub fn invalid(path: impl Into<PathBuf>) -> Self {
        Self {
            valid: false,
            ..Self::new(path, 0.0)
        }
    }

    /// Sets the video dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some(Dimensions::new(width, height));
        self
    }

    /// Sets the rotation.
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = Some(rotation);
        self
    }

    /// Marks the duration as an estimate.
    pub fn with_uncertain_duration(mut self) -> Self {
        self.duration_uncertain = true;
        self
    }

    pub fn width(&self) -> Option<u32> {
        self.dimensions.map(|d| d.width)
    }

    pub fn height(&self) -> Option<u32> {
        self.dimensions.map(|d| d.height)
    }

    /// Video resolution as `WxH` (if present).
    pub fn resolution(&self) -> Option<String> {
        self.dimensions.map(|d| d.to_string())
    }

    /// Aspect ratio of the picture as displayed.
    ///
    /// Prefers the container's display aspect ratio and falls back to the
    /// pixel dimensions. `None` when neither is usable.
    pub fn calculated_aspect_ratio(&self) -> Option<f64> {
        self.display_aspect_ratio
            .filter(|dar| dar.is_finite() && *dar > 0.0)
            .or_else(|| self.dimensions.and_then(|d| d.aspect_ratio()))
    }

    /// Rotation other than zero, if any.
    pub fn effective_rotation(&self) -> Option<Rotation> {
        self.rotation.filter(|r| *r != Rotation::Deg0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(Rotation::from_degrees(90), Some(Rotation::Deg90));
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::Deg270));
        assert_eq!(Rotation::from_degrees(450), Some(Rotation::Deg90));
        assert_eq!(Rotation::from_degrees(45), None);
    }

    #[test]
    fn test_rotation_serializes_as_degrees() {
        let json = serde_json::to_string(&Rotation::Deg180).unwrap();
        assert_eq!(json, "180");
        let parsed: Rotation = serde_json::from_str("270").unwrap();
        assert_eq!(parsed, Rotation::Deg270);
        assert!(serde_json::from_str::<Rotation>("45").is_err());
    }

    #[test]
    fn test_calculated_aspect_ratio_from_dimensions() {
        let media = MediaDescriptor::new("a.mov", 10.0).with_dimensions(640, 480);
        let ratio = media.calculated_aspect_ratio().unwrap();
        assert!((ratio - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_calculated_aspect_ratio_prefers_display_ratio() {
        let mut media = MediaDescriptor::new("a.mov", 10.0).with_dimensions(720, 480);
        media.display_aspect_ratio = Some(16.0 / 9.0);
        let ratio = media.calculated_aspect_ratio().unwrap();
        assert!((ratio - 16.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_calculated_aspect_ratio_unknown() {
        assert!(MediaDescriptor::new("a.mp3", 10.0)
            .calculated_aspect_ratio()
            .is_none());
        assert!(MediaDescriptor::new("a.mov", 10.0)
            .with_dimensions(640, 0)
            .calculated_aspect_ratio()
            .is_none());
    }

    #[test]
    fn test_effective_rotation_ignores_zero() {
        let media = MediaDescriptor::new("a.mov", 1.0).with_rotation(Rotation::Deg0);
        assert!(media.effective_rotation().is_none());
        let media = media.with_rotation(Rotation::Deg90);
        assert_eq!(media.effective_rotation(), Some(Rotation::Deg90));
    }
}
