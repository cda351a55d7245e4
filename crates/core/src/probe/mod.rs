//! Probe module for describing media files.
//!
//! The transcoder only consumes what a probe reports: duration, geometry,
//! rotation and whether the file decodes at all. `FfprobeProber` is the
//! production implementation; tests use `testing::MockProbe`.

mod error;
mod ffprobe;
mod traits;
mod types;

pub use error::ProbeError;
pub use ffprobe::FfprobeProber;
pub use traits::Probe;
pub use types::{Dimensions, MediaDescriptor, Rotation};
