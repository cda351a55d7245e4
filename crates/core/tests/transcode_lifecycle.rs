//! Transcode lifecycle integration tests.
//!
//! These tests run the transcoder against shell scripts that play the
//! encoder, with a mock probe for validation:
//! - Progress reporting from start to validated completion
//! - Idle timeout killing a hung encoder
//! - Failure reasons for bad exits and bad outputs
//! - Runs with validation disabled
//! - Encoders that close stderr without exiting

#![cfg(unix)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tokio::sync::mpsc;

use warden_core::{
    probe::ProbeError,
    testing::{fixtures, MockProbe},
    transcode::{
        EncodingOptions, FailureReason, OptionName, OptionSet, SupervisorOptions, TranscodeError,
        TranscodeProgress, TranscodeRequest, TranscodeState, Transcoder,
    },
};

/// Test helper wiring a fake encoder script to a transcoder.
struct TestHarness {
    probe: MockProbe,
    temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self {
            probe: MockProbe::new(),
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    fn output_path(&self) -> PathBuf {
        self.temp_dir.path().join("out.mp4")
    }

    fn transcoder(
        &self,
        script: &str,
        options: impl Into<EncodingOptions>,
        supervisor: SupervisorOptions,
    ) -> Transcoder {
        let config = fixtures::write_fake_encoder(self.temp_dir.path(), script)
            .expect("Failed to write fake encoder");
        let request = TranscodeRequest::new(
            fixtures::movie("/media/awesome.mov", 7.5),
            self.output_path(),
            options,
        )
        .with_supervisor(supervisor);
        Transcoder::build(request, &config, Arc::new(self.probe.clone()))
            .expect("Failed to build transcoder")
    }
}

fn drain(rx: &mut mpsc::Receiver<TranscodeProgress>) -> Vec<f64> {
    let mut fractions = Vec::new();
    while let Ok(progress) = rx.try_recv() {
        fractions.push(progress.fraction);
    }
    fractions
}

#[tokio::test]
async fn test_successful_run_reports_progress_to_completion() {
    let harness = TestHarness::new();
    harness
        .probe
        .set_default_result(fixtures::movie("/unused", 7.4))
        .await;
    let mut transcoder = harness.transcoder(
        fixtures::SUCCESS_SCRIPT,
        OptionSet::new(),
        SupervisorOptions::default(),
    );

    let (tx, mut rx) = mpsc::channel(32);
    let encoded = transcoder
        .run_with_progress(tx)
        .await
        .expect("Transcode should succeed")
        .expect("Validated run returns the output");

    assert_eq!(encoded.path, harness.output_path());
    assert_eq!(transcoder.state(), TranscodeState::Succeeded);
    assert!(transcoder.pid().is_some());
    assert!(harness.output_path().exists());

    let fractions = drain(&mut rx);
    assert_eq!(fractions.first(), Some(&0.0));
    assert_eq!(fractions.last(), Some(&1.0));
    assert!(fractions.len() >= 3, "{:?}", fractions);
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]), "{:?}", fractions);
    assert!(fractions[..fractions.len() - 1].iter().all(|f| *f < 1.0));

    assert_eq!(
        harness.probe.recorded_calls().await,
        vec![harness.output_path()]
    );
}

#[tokio::test]
async fn test_hung_encoder_is_killed() {
    let harness = TestHarness::new();
    let mut transcoder = harness.transcoder(
        fixtures::HANG_SCRIPT,
        OptionSet::new(),
        SupervisorOptions::default().with_idle_timeout(Some(1)),
    );

    let started = Instant::now();
    let result = transcoder.run().await;
    let elapsed = started.elapsed();
    assert!(elapsed < Duration::from_secs(5), "took {:?}", elapsed);
    match result {
        Err(TranscodeError::ProcessHung {
            timeout_secs,
            output,
            command,
        }) => {
            assert_eq!(timeout_secs, 1);
            assert!(output.contains("frame=    1"), "{}", output);
            assert_eq!(command.first().map(String::as_str), Some("/bin/sh"));
        }
        other => panic!("expected hung process, got {:?}", other),
    }
    assert_eq!(transcoder.state(), TranscodeState::Hung);

    assert_not_running(transcoder.pid().expect("Encoder was spawned"));
    assert_eq!(harness.probe.call_count().await, 0);
}

#[tokio::test]
async fn test_non_zero_exit_collects_all_reasons() {
    let harness = TestHarness::new();
    let mut transcoder = harness.transcoder(
        fixtures::FAIL_SCRIPT,
        OptionSet::new(),
        SupervisorOptions::default(),
    );

    let err = transcoder.run().await.expect_err("Transcode should fail");
    assert_eq!(
        err.reasons(),
        [
            FailureReason::NonZeroExit { code: Some(1) },
            FailureReason::MissingOutput,
            FailureReason::InvalidOutput,
        ]
    );
    assert!(err.to_string().starts_with("Failed encoding. Errors: "));
    assert!(err.output().is_some_and(|o| o.contains("Unknown encoder")));
    assert_eq!(transcoder.state(), TranscodeState::Failed);
    assert_eq!(harness.probe.call_count().await, 0);
}

#[tokio::test]
async fn test_validation_disabled_returns_nothing() {
    let harness = TestHarness::new();
    let mut transcoder = harness.transcoder(
        fixtures::SUCCESS_SCRIPT,
        OptionSet::new(),
        SupervisorOptions::default().with_validate_output(false),
    );

    let (tx, mut rx) = mpsc::channel(32);
    let encoded = transcoder
        .run_with_progress(tx)
        .await
        .expect("Transcode should succeed");

    assert!(encoded.is_none());
    assert_eq!(transcoder.state(), TranscodeState::Succeeded);
    let fractions = drain(&mut rx);
    assert!(!fractions.is_empty());
    assert!(fractions.iter().all(|f| *f < 1.0), "{:?}", fractions);
    assert_eq!(harness.probe.call_count().await, 0);
}

#[tokio::test]
async fn test_short_output_is_a_duration_mismatch() {
    let harness = TestHarness::new();
    harness
        .probe
        .set_default_result(fixtures::movie("/unused", 2.0))
        .await;
    let mut transcoder = harness.transcoder(
        fixtures::SUCCESS_SCRIPT,
        OptionSet::new(),
        SupervisorOptions::default(),
    );

    let err = transcoder.run().await.expect_err("Transcode should fail");
    assert_eq!(
        err.reasons(),
        [FailureReason::DurationMismatch {
            expected_secs: 7.5,
            actual_secs: 2.0,
            precision: 1.1,
        }]
    );
    assert_eq!(transcoder.state(), TranscodeState::Failed);
}

#[tokio::test]
async fn test_requested_duration_widens_tolerance() {
    let harness = TestHarness::new();
    harness
        .probe
        .set_default_result(fixtures::movie("/unused", 2.8))
        .await;
    let options = OptionSet::new().with(OptionName::Duration, "00:00:02");
    let mut transcoder =
        harness.transcoder(fixtures::SUCCESS_SCRIPT, options, SupervisorOptions::default());

    let encoded = transcoder
        .run()
        .await
        .expect("Transcode should succeed")
        .expect("Validated run returns the output");
    assert_eq!(encoded.duration_secs, 2.8);
}

#[tokio::test]
async fn test_transcoder_runs_once() {
    let harness = TestHarness::new();
    let mut transcoder = harness.transcoder(
        fixtures::SUCCESS_SCRIPT,
        OptionSet::new(),
        SupervisorOptions::default().with_validate_output(false),
    );

    transcoder.run().await.expect("First run should succeed");
    assert!(matches!(
        transcoder.run().await,
        Err(TranscodeError::AlreadyRun)
    ));
}

fn assert_not_running(pid: u32) {
    let alive = std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .status()
        .expect("Failed to run kill")
        .success();
    assert!(!alive, "Encoder {} still running", pid);
}

#[tokio::test]
async fn test_encoder_that_closes_stderr_is_killed() {
    let harness = TestHarness::new();
    let mut transcoder = harness.transcoder(
        fixtures::CLOSED_STDERR_SCRIPT,
        OptionSet::new(),
        SupervisorOptions::default().with_idle_timeout(Some(1)),
    );

    let started = Instant::now();
    let result = transcoder.run().await;
    let elapsed = started.elapsed();
    assert!(elapsed < Duration::from_secs(5), "took {:?}", elapsed);

    match result {
        Err(TranscodeError::ProcessHung { output, .. }) => {
            assert!(output.contains("frame=    1"), "{}", output);
        }
        other => panic!("expected hung process, got {:?}", other),
    }
    assert_eq!(transcoder.state(), TranscodeState::Hung);
    assert_not_running(transcoder.pid().expect("Encoder was spawned"));
}

#[tokio::test]
async fn test_validation_error_keeps_exit_failure() {
    let harness = TestHarness::new();
    harness
        .probe
        .set_next_error(ProbeError::BinaryNotFound {
            path: "/missing/ffprobe".into(),
        })
        .await;
    let mut transcoder = harness.transcoder(
        fixtures::FAIL_AFTER_WRITE_SCRIPT,
        OptionSet::new(),
        SupervisorOptions::default(),
    );

    let err = transcoder.run().await.expect_err("Transcode should fail");
    assert_eq!(err.reasons(), [FailureReason::NonZeroExit { code: Some(3) }]);
    assert!(err
        .output()
        .is_some_and(|o| o.contains("Error while flushing")));
    assert!(err.command().is_some());
    assert_eq!(transcoder.state(), TranscodeState::Failed);
    assert_eq!(harness.probe.call_count().await, 1);
}

#[tokio::test]
async fn test_validation_error_after_clean_exit_surfaces() {
    let harness = TestHarness::new();
    harness
        .probe
        .set_next_error(ProbeError::BinaryNotFound {
            path: "/missing/ffprobe".into(),
        })
        .await;
    let mut transcoder = harness.transcoder(
        fixtures::SUCCESS_SCRIPT,
        OptionSet::new(),
        SupervisorOptions::default(),
    );

    let result = transcoder.run().await;
    assert!(matches!(
        result,
        Err(TranscodeError::Probe(ProbeError::BinaryNotFound { .. }))
    ));
    assert_eq!(transcoder.state(), TranscodeState::Failed);
}

#[tokio::test]
async fn test_requested_duration_in_ffmpeg_syntax() {
    let harness = TestHarness::new();
    harness
        .probe
        .set_default_result(fixtures::movie("/unused", 4.0))
        .await;
    // 3 seconds of a 7.5 second source, written the way ffmpeg accepts it.
    let options = OptionSet::new().with(OptionName::Duration, "3000ms");
    let mut transcoder =
        harness.transcoder(fixtures::SUCCESS_SCRIPT, options, SupervisorOptions::default());

    let encoded = transcoder
        .run()
        .await
        .expect("Transcode should succeed")
        .expect("Validated run returns the output");
    assert_eq!(encoded.duration_secs, 4.0);
}
