//! The transcoder: builds the ffmpeg command, supervises the run and
//! validates the result.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::config::{FfmpegConfig, SupervisorOptions};
use super::error::{FailureReason, StreamReadError, TranscodeError};
use super::options::EncodingOptions;
use super::progress::{reference_duration, ProgressTracker, TranscodeProgress};
use super::reader::StreamLineTimeoutReader;
use super::validator::{is_still_image_path, OutputValidator, ValidationExpectations};
use crate::probe::{MediaDescriptor, Probe};

/// Everything needed to build one transcode.
#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    /// Primary input, as described by the probe.
    pub source: MediaDescriptor,
    /// Further inputs, each added as its own `-i`.
    pub concat: Vec<MediaDescriptor>,
    pub output_path: PathBuf,
    pub options: EncodingOptions,
    pub supervisor: SupervisorOptions,
}

impl TranscodeRequest {
    pub fn new(
        source: MediaDescriptor,
        output_path: impl Into<PathBuf>,
        options: impl Into<EncodingOptions>,
    ) -> Self {
        Self {
            source,
            concat: Vec::new(),
            output_path: output_path.into(),
            options: options.into(),
            supervisor: SupervisorOptions::default(),
        }
    }

    pub fn with_supervisor(mut self, supervisor: SupervisorOptions) -> Self {
        self.supervisor = supervisor;
        self
    }

    /// Appends inputs encoded after the primary source.
    pub fn concat(mut self, sources: impl IntoIterator<Item = MediaDescriptor>) -> Self {
        self.concat.extend(sources);
        self
    }
}

/// Lifecycle of a transcoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscodeState {
    Built,
    Running,
    Succeeded,
    Failed,
    Hung,
}

impl TranscodeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Hung)
    }
}

impl fmt::Display for TranscodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Built => "built",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Hung => "hung",
        };
        f.write_str(name)
    }
}

/// A single supervised ffmpeg run.
pub struct Transcoder {
    command: Vec<String>,
    input: String,
    output_path: PathBuf,
    supervisor: SupervisorOptions,
    expectations: ValidationExpectations,
    probe: Arc<dyn Probe>,
    state: TranscodeState,
    pid: Option<u32>,
}

impl fmt::Debug for Transcoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transcoder")
            .field("command", &self.command)
            .field("state", &self.state)
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

impl Transcoder {
    /// Derives the final options and assembles the command.
    ///
    /// Fails only with `InvalidOptionsFormat`.
    pub fn build(
        request: TranscodeRequest,
        config: &FfmpegConfig,
        probe: Arc<dyn Probe>,
    ) -> Result<Self, TranscodeError> {
        let TranscodeRequest {
            source,
            concat,
            output_path,
            options,
            supervisor,
        } = request;
        let mut input_options = supervisor.input_options.clone();

        let (option_tokens, requested_duration, duration_requested, screenshot) = match options {
            EncodingOptions::Set(mut set) => {
                set.validate()?;
                if let Some(seek) = set.take_screenshot_seek() {
                    input_options.set("-ss", seek);
                }
                let changes_orientation = supervisor.autorotate && set.apply_autorotate(&source);
                set.apply_preserve_aspect_ratio(
                    supervisor.preserve_aspect_ratio,
                    &source,
                    supervisor.allow_enlarge,
                    changes_orientation,
                );
                (
                    set.to_tokens(),
                    set.requested_duration(),
                    set.has_requested_duration(),
                    set.is_screenshot(),
                )
            }
            EncodingOptions::Raw(raw) => {
                if supervisor.wants_derivation() {
                    warn!("Raw options skip autorotate and aspect ratio preservation");
                }
                let tokens = raw.split_whitespace().map(String::from).collect();
                (tokens, None, false, false)
            }
            EncodingOptions::Tokens(tokens) => {
                if supervisor.wants_derivation() {
                    warn!("Token options skip autorotate and aspect ratio preservation");
                }
                (tokens, None, false, false)
            }
        };

        let input = supervisor
            .input
            .clone()
            .unwrap_or_else(|| path_arg(&source.path));

        let mut command = vec![path_arg(&config.ffmpeg_path)];
        command.extend(config.extra_args.iter().cloned());
        command.push("-y".to_string());
        command.extend(input_options.tokens().iter().cloned());
        command.push("-i".to_string());
        command.push(input.clone());
        for extra in &concat {
            command.push("-i".to_string());
            command.push(path_arg(&extra.path));
        }
        command.extend(option_tokens);
        command.push(path_arg(&output_path));

        let expectations = ValidationExpectations {
            source_duration_secs: std::iter::once(&source)
                .chain(&concat)
                .map(|m| m.duration_secs)
                .sum(),
            source_duration_uncertain: std::iter::once(&source)
                .chain(&concat)
                .any(|m| m.duration_uncertain),
            requested_duration_secs: requested_duration,
            duration_requested,
            still_image: screenshot || is_still_image_path(&output_path),
        };

        Ok(Self {
            command,
            input,
            output_path,
            supervisor,
            expectations,
            probe,
            state: TranscodeState::Built,
            pid: None,
        })
    }

    /// The full argument vector, program first.
    pub fn command_line(&self) -> &[String] {
        &self.command
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn state(&self) -> TranscodeState {
        self.state
    }

    /// Process id of the encoder once it has been spawned.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Runs without observing progress.
    pub async fn run(&mut self) -> Result<Option<MediaDescriptor>, TranscodeError> {
        self.run_with(|_| {}).await
    }

    /// Runs, forwarding progress to a channel without blocking.
    pub async fn run_with_progress(
        &mut self,
        progress_tx: mpsc::Sender<TranscodeProgress>,
    ) -> Result<Option<MediaDescriptor>, TranscodeError> {
        self.run_with(move |fraction| {
            // Non-blocking send
            let _ = progress_tx.try_send(TranscodeProgress { fraction });
        })
        .await
    }

    /// Runs the encoder, calling `on_progress` with fractions in `[0, 1]`.
    ///
    /// `0.0` is reported before the encoder starts; `1.0` only after the
    /// output has been validated. With validation disabled the result is
    /// `None` and `1.0` is never reported. The callback runs on the reading
    /// path and must not block.
    pub async fn run_with<F>(
        &mut self,
        mut on_progress: F,
    ) -> Result<Option<MediaDescriptor>, TranscodeError>
    where
        F: FnMut(f64),
    {
        if self.state != TranscodeState::Built {
            return Err(TranscodeError::AlreadyRun);
        }

        let command_text = self.command.join(" ");
        info!(command = %command_text, "Running transcoding");

        let program = self.command.first().cloned().unwrap_or_default();
        let mut child = Command::new(&program)
            .args(&self.command[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                self.state = TranscodeState::Failed;
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::FfmpegNotFound {
                        path: PathBuf::from(&program),
                    }
                } else {
                    TranscodeError::Io(e)
                }
            })?;

        self.pid = child.id();
        self.state = TranscodeState::Running;
        debug!(pid = ?self.pid, "Encoder started");
        on_progress(0.0);

        let Some(stderr) = child.stderr.take() else {
            self.state = TranscodeState::Failed;
            return Err(TranscodeError::Io(std::io::Error::other(
                "encoder stderr was not captured",
            )));
        };

        let mut reader = StreamLineTimeoutReader::new(stderr, self.supervisor.idle_timeout());
        let mut tracker = ProgressTracker::new(reference_duration(
            self.expectations.source_duration_secs,
            self.expectations.requested_duration_secs,
        ));

        let read = reader
            .for_each_chunk(&mut child, |chunk| {
                if let Some(fraction) = tracker.observe(chunk) {
                    on_progress(fraction);
                }
            })
            .await;

        match read {
            Ok(()) => {}
            Err(StreamReadError::IdleTimeout {
                idle_timeout,
                output,
            }) => {
                if let Err(e) = child.wait().await {
                    warn!(error = %e, "Failed to reap hung encoder");
                }
                self.state = TranscodeState::Hung;
                error!(
                    command = %command_text,
                    output = %output,
                    "Process hung"
                );
                return Err(TranscodeError::ProcessHung {
                    timeout_secs: idle_timeout.as_secs(),
                    command: self.command.clone(),
                    output,
                });
            }
            Err(StreamReadError::Io(e)) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                self.state = TranscodeState::Failed;
                return Err(TranscodeError::Io(e));
            }
        }

        // Closing stderr does not mean the encoder exits; the idle bound holds here too.
        let waited = match self.supervisor.idle_timeout() {
            Some(limit) => timeout(limit, child.wait()).await.map_err(|_| limit),
            None => Ok(child.wait().await),
        };
        let status = match waited {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                self.state = TranscodeState::Failed;
                return Err(TranscodeError::Io(e));
            }
            Err(idle_timeout) => {
                if let Err(e) = child.start_kill() {
                    warn!(error = %e, "Failed to kill hung process");
                }
                if let Err(e) = child.wait().await {
                    warn!(error = %e, "Failed to reap hung encoder");
                }
                self.state = TranscodeState::Hung;
                let output = reader.into_output();
                error!(
                    command = %command_text,
                    output = %output,
                    "Process hung after closing its output"
                );
                return Err(TranscodeError::ProcessHung {
                    timeout_secs: idle_timeout.as_secs(),
                    command: self.command.clone(),
                    output,
                });
            }
        };
        let output = reader.into_output();
        debug!(output = %output, "Encoder output");

        let mut reasons = Vec::new();
        if !status.success() {
            reasons.push(FailureReason::NonZeroExit {
                code: status.code(),
            });
        }

        let encoded = if self.supervisor.validate_output {
            let validator = OutputValidator::new(self.probe.as_ref());
            match validator
                .validate(&self.output_path, &self.expectations)
                .await
            {
                Ok(report) => {
                    reasons.extend(report.reasons);
                    report.output
                }
                // The encode already failed; report that with its output.
                Err(e) if !reasons.is_empty() => {
                    warn!(error = %e, "Could not validate output of failed encode");
                    None
                }
                Err(e) => {
                    self.state = TranscodeState::Failed;
                    error!(
                        command = %command_text,
                        output = %output,
                        error = %e,
                        "Could not validate output"
                    );
                    return Err(TranscodeError::Probe(e));
                }
            }
        } else {
            None
        };

        if !reasons.is_empty() {
            self.state = TranscodeState::Failed;
            let errors = reasons
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            error!(
                command = %command_text,
                output = %output,
                errors = %errors,
                "Failed encoding"
            );
            return Err(TranscodeError::TranscodeFailed {
                reasons,
                command: self.command.clone(),
                output,
            });
        }

        self.state = TranscodeState::Succeeded;
        if self.supervisor.validate_output {
            on_progress(1.0);
        }
        info!(
            input = %self.input,
            output = %self.output_path.display(),
            "Transcoding succeeded"
        );

        Ok(encoded)
    }
}
