//! Post-run checks of the encoded artifact.

use std::path::Path;
use tracing::debug;

use super::error::FailureReason;
use super::progress::reference_duration;
use crate::probe::{MediaDescriptor, Probe, ProbeError};

/// Extensions whose outputs have no meaningful duration.
pub const STILL_IMAGE_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "bmp", "gif", "tif", "tiff", "webp"];

/// Precision when the caller asked for a specific output duration.
pub const REQUESTED_DURATION_PRECISION: f64 = 1.5;

/// Precision when the output should match the source.
pub const SOURCE_DURATION_PRECISION: f64 = 1.1;

/// Whether a path names a still image.
pub fn is_still_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            STILL_IMAGE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Accepted window for the output duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationTolerance {
    pub reference_secs: f64,
    pub precision: f64,
}

impl DurationTolerance {
    /// `duration_requested` widens the window even when the requested
    /// duration could not be read.
    pub fn new(
        source_duration_secs: f64,
        requested_secs: Option<f64>,
        duration_requested: bool,
    ) -> Self {
        Self {
            reference_secs: reference_duration(source_duration_secs, requested_secs),
            precision: if duration_requested || requested_secs.is_some() {
                REQUESTED_DURATION_PRECISION
            } else {
                SOURCE_DURATION_PRECISION
            },
        }
    }

    /// Inclusive lower and upper bounds.
    pub fn bounds(&self) -> (f64, f64) {
        (
            self.reference_secs / self.precision,
            self.reference_secs * self.precision,
        )
    }

    pub fn contains(&self, duration_secs: f64) -> bool {
        let (low, high) = self.bounds();
        low <= duration_secs && duration_secs <= high
    }
}

/// What the output is checked against.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationExpectations {
    pub source_duration_secs: f64,
    pub source_duration_uncertain: bool,
    pub requested_duration_secs: Option<f64>,
    /// Whether a `duration` option was given at all.
    pub duration_requested: bool,
    /// Screenshot or image sequence output.
    pub still_image: bool,
}

impl ValidationExpectations {
    fn checks_duration(&self) -> bool {
        !self.source_duration_uncertain && !self.still_image
    }
}

/// Outcome of validating one output.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// The re-probed output, when it exists.
    pub output: Option<MediaDescriptor>,
    pub reasons: Vec<FailureReason>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.reasons.is_empty()
    }
}

/// Checks existence, decodability and duration of an encoded file.
///
/// Every check runs; the report carries all reasons found.
pub struct OutputValidator<'a> {
    probe: &'a dyn Probe,
}

impl<'a> OutputValidator<'a> {
    pub fn new(probe: &'a dyn Probe) -> Self {
        Self { probe }
    }

    pub async fn validate(
        &self,
        output_path: &Path,
        expectations: &ValidationExpectations,
    ) -> Result<ValidationReport, ProbeError> {
        let mut reasons = Vec::new();

        let exists = tokio::fs::try_exists(output_path).await.unwrap_or(false);
        if !exists {
            reasons.push(FailureReason::MissingOutput);
        }

        let output = if exists {
            match self.probe.probe(output_path).await {
                Ok(media) => Some(media),
                Err(ProbeError::NotFound { .. }) => None,
                Err(e) => return Err(e),
            }
        } else {
            None
        };

        let decodable = output.as_ref().filter(|m| m.valid);
        if decodable.is_none() {
            reasons.push(FailureReason::InvalidOutput);
        }

        if let Some(media) = decodable {
            if expectations.checks_duration() {
                let tolerance = DurationTolerance::new(
                    expectations.source_duration_secs,
                    expectations.requested_duration_secs,
                    expectations.duration_requested,
                );
                if !tolerance.contains(media.duration_secs) {
                    reasons.push(FailureReason::DurationMismatch {
                        expected_secs: tolerance.reference_secs,
                        actual_secs: media.duration_secs,
                        precision: tolerance.precision,
                    });
                }
            } else {
                debug!(path = %output_path.display(), "Skipping duration check");
            }
        }

        Ok(ValidationReport { output, reasons })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProbe;
    use tempfile::TempDir;

    fn expectations(source: f64, requested: Option<f64>) -> ValidationExpectations {
        ValidationExpectations {
            source_duration_secs: source,
            source_duration_uncertain: false,
            requested_duration_secs: requested,
            duration_requested: requested.is_some(),
            still_image: false,
        }
    }

    fn touch(dir: &TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"encoded").unwrap();
        path
    }

    #[test]
    fn test_tolerance_window() {
        let tolerance = DurationTolerance::new(10.0, None, false);
        assert_eq!(tolerance.precision, SOURCE_DURATION_PRECISION);
        assert!(tolerance.contains(10.0));
        assert!(tolerance.contains(11.0));
        assert!(tolerance.contains(10.0 / 1.1));
        assert!(!tolerance.contains(11.5));
        assert!(!tolerance.contains(9.0));
    }

    #[test]
    fn test_tolerance_with_requested_duration() {
        let tolerance = DurationTolerance::new(7.56, Some(2.0), true);
        assert_eq!(tolerance.reference_secs, 2.0);
        assert_eq!(tolerance.precision, REQUESTED_DURATION_PRECISION);
        assert!(tolerance.contains(2.9));
        assert!(!tolerance.contains(3.1));

        let tolerance = DurationTolerance::new(7.56, Some(60.0), true);
        assert_eq!(tolerance.reference_secs, 7.56);
        assert_eq!(tolerance.precision, REQUESTED_DURATION_PRECISION);
    }

    #[test]
    fn test_unreadable_requested_duration_still_widens_window() {
        let tolerance = DurationTolerance::new(10.0, None, true);
        assert_eq!(tolerance.reference_secs, 10.0);
        assert_eq!(tolerance.precision, REQUESTED_DURATION_PRECISION);
        assert!(tolerance.contains(14.0));
        assert!(!tolerance.contains(16.0));
    }

    #[test]
    fn test_still_image_paths() {
        assert!(is_still_image_path(Path::new("/tmp/shot.JPG")));
        assert!(is_still_image_path(Path::new("thumb-%03d.png")));
        assert!(!is_still_image_path(Path::new("/tmp/out.mp4")));
        assert!(!is_still_image_path(Path::new("/tmp/noext")));
    }

    #[tokio::test]
    async fn test_valid_output() {
        let dir = TempDir::new().unwrap();
        let path = touch(&dir, "out.mp4");
        let probe = MockProbe::new();
        probe.set_result(&path, MediaDescriptor::new(&path, 7.5)).await;

        let report = OutputValidator::new(&probe)
            .validate(&path, &expectations(7.56, None))
            .await
            .unwrap();
        assert!(report.is_valid());
        assert_eq!(report.output.unwrap().duration_secs, 7.5);
    }

    #[tokio::test]
    async fn test_missing_output_accumulates_reasons() {
        let dir = TempDir::new().unwrap();
        let probe = MockProbe::new();

        let report = OutputValidator::new(&probe)
            .validate(&dir.path().join("gone.mp4"), &expectations(7.56, None))
            .await
            .unwrap();
        assert_eq!(
            report.reasons,
            vec![FailureReason::MissingOutput, FailureReason::InvalidOutput]
        );
        assert_eq!(probe.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_undecodable_output() {
        let dir = TempDir::new().unwrap();
        let path = touch(&dir, "out.mp4");
        let probe = MockProbe::new();
        probe.set_result(&path, MediaDescriptor::invalid(&path)).await;

        let report = OutputValidator::new(&probe)
            .validate(&path, &expectations(7.56, None))
            .await
            .unwrap();
        assert_eq!(report.reasons, vec![FailureReason::InvalidOutput]);
    }

    #[tokio::test]
    async fn test_duration_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = touch(&dir, "out.mp4");
        let probe = MockProbe::new();
        probe.set_result(&path, MediaDescriptor::new(&path, 3.0)).await;

        let report = OutputValidator::new(&probe)
            .validate(&path, &expectations(7.56, None))
            .await
            .unwrap();
        assert_eq!(
            report.reasons,
            vec![FailureReason::DurationMismatch {
                expected_secs: 7.56,
                actual_secs: 3.0,
                precision: SOURCE_DURATION_PRECISION,
            }]
        );
    }

    #[tokio::test]
    async fn test_duration_skipped_for_uncertain_source_and_stills() {
        let dir = TempDir::new().unwrap();
        let path = touch(&dir, "out.mp3");
        let probe = MockProbe::new();
        probe.set_result(&path, MediaDescriptor::new(&path, 1.0)).await;

        let mut expect = expectations(200.0, None);
        expect.source_duration_uncertain = true;
        let report = OutputValidator::new(&probe)
            .validate(&path, &expect)
            .await
            .unwrap();
        assert!(report.is_valid());

        let mut expect = expectations(200.0, None);
        expect.still_image = true;
        let report = OutputValidator::new(&probe)
            .validate(&path, &expect)
            .await
            .unwrap();
        assert!(report.is_valid());
    }

    #[tokio::test]
    async fn test_probe_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let path = touch(&dir, "out.mp4");
        let probe = MockProbe::new();
        probe.set_next_error(ProbeError::BinaryNotFound {
            path: "/missing/ffprobe".into(),
        })
        .await;

        let result = OutputValidator::new(&probe)
            .validate(&path, &expectations(7.56, None))
            .await;
        assert!(matches!(result, Err(ProbeError::BinaryNotFound { .. })));
    }
}
