//! Mock probe for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::probe::{MediaDescriptor, Probe, ProbeError};

/// Mock implementation of the Probe trait.
///
/// Provides controllable behavior for testing:
/// - Per-path results, with an optional default for any other path
/// - A one-shot error for the next call
/// - Recorded calls for assertions
///
/// # Example
///
/// ```rust,ignore
/// use warden_core::testing::MockProbe;
///
/// let probe = MockProbe::new();
/// probe.set_result("/tmp/out.mp4", MediaDescriptor::new("/tmp/out.mp4", 7.5)).await;
///
/// let media = probe.probe(Path::new("/tmp/out.mp4")).await?;
/// assert_eq!(probe.call_count().await, 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockProbe {
    /// Pre-configured results by path.
    results: Arc<RwLock<HashMap<PathBuf, MediaDescriptor>>>,
    /// Result for paths without an entry; its path is replaced by the probed one.
    default_result: Arc<RwLock<Option<MediaDescriptor>>>,
    /// If set, the next call will fail with this error.
    next_error: Arc<RwLock<Option<ProbeError>>>,
    /// Probed paths, in call order.
    calls: Arc<RwLock<Vec<PathBuf>>>,
}

impl Default for MockProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProbe {
    /// Create a new mock probe.
    pub fn new() -> Self {
        Self {
            results: Arc::new(RwLock::new(HashMap::new())),
            default_result: Arc::new(RwLock::new(None)),
            next_error: Arc::new(RwLock::new(None)),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Set the result for a specific path.
    pub async fn set_result(&self, path: impl AsRef<Path>, media: MediaDescriptor) {
        self.results
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), media);
    }

    /// Set the result for any path without its own entry.
    pub async fn set_default_result(&self, media: MediaDescriptor) {
        *self.default_result.write().await = Some(media);
    }

    /// Make the next call fail with the given error.
    pub async fn set_next_error(&self, error: ProbeError) {
        *self.next_error.write().await = Some(error);
    }

    /// Get the number of probe calls.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Get all probed paths.
    pub async fn recorded_calls(&self) -> Vec<PathBuf> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl Probe for MockProbe {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, path: &Path) -> Result<MediaDescriptor, ProbeError> {
        self.calls.write().await.push(path.to_path_buf());

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        if let Some(media) = self.results.read().await.get(path) {
            return Ok(media.clone());
        }

        match self.default_result.read().await.as_ref() {
            Some(media) => Ok(MediaDescriptor {
                path: path.to_path_buf(),
                ..media.clone()
            }),
            None => Err(ProbeError::NotFound {
                path: path.to_path_buf(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_configured_result() {
        let probe = MockProbe::new();
        probe
            .set_result("/media/clip.mov", MediaDescriptor::new("/media/clip.mov", 5.0))
            .await;

        let media = probe.probe(Path::new("/media/clip.mov")).await.unwrap();
        assert_eq!(media.duration_secs, 5.0);
        assert_eq!(probe.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let probe = MockProbe::new();
        let result = probe.probe(Path::new("/media/unknown.mov")).await;
        assert!(matches!(result, Err(ProbeError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_default_result_takes_probed_path() {
        let probe = MockProbe::new();
        probe
            .set_default_result(MediaDescriptor::new("/anything", 3.0))
            .await;

        let media = probe.probe(Path::new("/tmp/out.mp4")).await.unwrap();
        assert_eq!(media.path, PathBuf::from("/tmp/out.mp4"));
        assert_eq!(media.duration_secs, 3.0);
    }

    #[tokio::test]
    async fn test_next_error_is_consumed_once() {
        let probe = MockProbe::new();
        probe
            .set_default_result(MediaDescriptor::new("/anything", 3.0))
            .await;
        probe
            .set_next_error(ProbeError::parse_error("truncated json"))
            .await;

        assert!(probe.probe(Path::new("/a.mp4")).await.is_err());
        assert!(probe.probe(Path::new("/b.mp4")).await.is_ok());
        assert_eq!(
            probe.recorded_calls().await,
            vec![PathBuf::from("/a.mp4"), PathBuf::from("/b.mp4")]
        );
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let probe = MockProbe::new();
        let shared = probe.clone();
        let _ = shared.probe(Path::new("/a.mp4")).await;
        assert_eq!(probe.call_count().await, 1);
    }
}
