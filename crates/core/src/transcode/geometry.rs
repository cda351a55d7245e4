//! Resolution and rotation derivations that depend on the source geometry.

use tracing::{debug, warn};

use super::config::PreserveAspectRatio;
use super::options::{OptionName, OptionSet, OptionValue};
use crate::probe::{MediaDescriptor, Rotation};

/// Metadata that clears the rotation flag of the first video stream.
pub const CLEAR_ROTATION_METADATA: &str = "s:v:0 rotate=0";

/// Rounds to a whole, even number of pixels.
///
/// Prefers the ceiling when it is even, otherwise the floor; a value that
/// is still odd (whole odd numbers) is bumped up by one.
pub fn evenize(value: f64) -> u32 {
    let ceil = value.ceil() as i64;
    let rounded = if ceil % 2 == 0 {
        ceil
    } else {
        value.floor() as i64
    };
    let even = if rounded % 2 != 0 { rounded + 1 } else { rounded };
    u32::try_from(even.max(0)).unwrap_or(u32::MAX)
}

/// The filter chain that turns a rotated picture upright.
pub fn rotation_filter(rotation: Rotation) -> Option<&'static str> {
    match rotation {
        Rotation::Deg0 => None,
        Rotation::Deg90 => Some("transpose=1"),
        Rotation::Deg180 => Some("hflip,vflip"),
        Rotation::Deg270 => Some("transpose=2"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Width,
    Height,
}

impl Side {
    fn inverted(self) -> Self {
        match self {
            Self::Width => Self::Height,
            Self::Height => Self::Width,
        }
    }
}

impl OptionSet {
    /// Injects the rotation filter and clears the rotation metadata.
    ///
    /// Returns whether the picture's orientation changes (90 or 270 degrees).
    pub fn apply_autorotate(&mut self, source: &MediaDescriptor) -> bool {
        let Some(rotation) = source.effective_rotation() else {
            return false;
        };
        let Some(filter) = rotation_filter(rotation) else {
            return false;
        };

        let combined = match self
            .get(OptionName::VideoFilter)
            .and_then(OptionValue::as_scalar)
            .filter(|f| !f.trim().is_empty())
        {
            Some(existing) => format!("{},{}", filter, existing),
            None => filter.to_string(),
        };
        debug!(rotation = %rotation, filter = %combined, "Applying autorotate");

        self.insert(OptionName::VideoFilter, combined);
        self.insert(OptionName::Metadata, CLEAR_ROTATION_METADATA);
        rotation.swaps_dimensions()
    }

    /// Recomputes `resolution` so one requested side is kept and the other
    /// follows the source's aspect ratio.
    ///
    /// `changes_orientation` inverts the kept side, because scaling happens
    /// before the rotation filter. Returns whether the resolution changed.
    pub fn apply_preserve_aspect_ratio(
        &mut self,
        mode: PreserveAspectRatio,
        source: &MediaDescriptor,
        allow_enlarge: bool,
        changes_orientation: bool,
    ) -> bool {
        if mode == PreserveAspectRatio::None {
            return false;
        }
        let Some(aspect_ratio) = source.calculated_aspect_ratio() else {
            warn!(path = %source.path.display(), "Source aspect ratio unknown, keeping resolution");
            return false;
        };

        let side = match mode {
            PreserveAspectRatio::None => return false,
            PreserveAspectRatio::Width => Side::Width,
            PreserveAspectRatio::Height => Side::Height,
            PreserveAspectRatio::Fit => {
                let Some(requested) = self.calculated_aspect_ratio() else {
                    debug!("No usable resolution to fit");
                    return false;
                };
                let displayed = if changes_orientation {
                    1.0 / aspect_ratio
                } else {
                    aspect_ratio
                };
                if displayed >= requested {
                    Side::Width
                } else {
                    Side::Height
                }
            }
        };

        let requested_size = match side {
            Side::Width => self.width(),
            Side::Height => self.height(),
        };
        let Some(mut size) = requested_size else {
            debug!("No usable resolution to preserve");
            return false;
        };

        let side = if changes_orientation {
            side.inverted()
        } else {
            side
        };

        if !allow_enlarge {
            let original = match side {
                Side::Width => source.width(),
                Side::Height => source.height(),
            };
            if let Some(original) = original.filter(|o| *o < size) {
                size = original;
            }
        }

        let resolution = match side {
            Side::Width => format!("{}x{}", size, evenize(f64::from(size) / aspect_ratio)),
            Side::Height => format!("{}x{}", evenize(f64::from(size) * aspect_ratio), size),
        };
        debug!(resolution = %resolution, "Preserving aspect ratio");
        self.insert(OptionName::Resolution, resolution);
        true
    }
}
