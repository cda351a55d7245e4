//! Trait definitions for the probe module.

use async_trait::async_trait;
use std::path::Path;

use super::error::ProbeError;
use super::types::MediaDescriptor;

/// Something that can inspect a media file and describe it.
///
/// Implementations return `Ok` with `valid == false` for files that exist
/// but cannot be decoded, and reserve errors for files that are missing or
/// a probe that cannot run at all.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Returns the name of this probe implementation.
    fn name(&self) -> &str;

    /// Probes a media file.
    async fn probe(&self, path: &Path) -> Result<MediaDescriptor, ProbeError>;
}
