//! Progress extraction from ffmpeg status lines.
//!
//! ffmpeg reports `time=00:02:42.28` (or `time=162.28` on very old builds)
//! in every status line. The tracker turns that into a fraction of the
//! expected output duration.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Serialize;

/// Highest fraction reported while the encoder is still running.
///
/// `1.0` is only emitted once the run has been accepted.
pub const MAX_INTERMEDIATE_PROGRESS: f64 = 0.999;

const TIME_MARKER: &str = "time=";

static CLOCK_REGEX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^(\d+):(\d{1,2}):(\d{1,2}(?:\.\d+)?)$").ok());

static SECONDS_REGEX: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)?$").ok());

static DURATION_CLOCK_REGEX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^(-)?(?:(\d+):)?(\d+):(\d+(?:\.\d*)?)$").ok());

static DURATION_UNITS_REGEX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^(-)?(\d+(?:\.\d*)?|\.\d+)(s|ms|us)?$").ok());

/// A progress update as delivered to channel observers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TranscodeProgress {
    /// Completed fraction in `[0, 1]`.
    pub fraction: f64,
}

impl TranscodeProgress {
    pub fn percent(&self) -> f32 {
        (self.fraction * 100.0) as f32
    }
}

/// Parses `HH:MM:SS(.ff)` or plain seconds.
fn parse_clock(text: &str) -> Option<f64> {
    let text = text.trim();

    if let Some(caps) = CLOCK_REGEX.as_ref().and_then(|re| re.captures(text)) {
        let hours = caps.get(1)?.as_str().parse::<f64>().ok()?;
        let minutes = caps.get(2)?.as_str().parse::<f64>().ok()?;
        let seconds = caps.get(3)?.as_str().parse::<f64>().ok()?;
        return Some(hours * 3600.0 + minutes * 60.0 + seconds);
    }

    if SECONDS_REGEX.as_ref().is_some_and(|re| re.is_match(text)) {
        return text.parse::<f64>().ok();
    }

    None
}

/// Parses an ffmpeg time duration: `[-][HH:]MM:SS[.m]` or `[-]S[.m][s|ms|us]`.
pub fn parse_duration(text: &str) -> Option<f64> {
    let text = text.trim();

    let (negative, secs) =
        if let Some(caps) = DURATION_CLOCK_REGEX.as_ref().and_then(|re| re.captures(text)) {
            let hours = match caps.get(2) {
                Some(h) => h.as_str().parse::<f64>().ok()?,
                None => 0.0,
            };
            let minutes = caps.get(3)?.as_str().parse::<f64>().ok()?;
            let seconds = caps.get(4)?.as_str().parse::<f64>().ok()?;
            (caps.get(1).is_some(), hours * 3600.0 + minutes * 60.0 + seconds)
        } else {
            let caps = DURATION_UNITS_REGEX.as_ref()?.captures(text)?;
            let value = caps.get(2)?.as_str().parse::<f64>().ok()?;
            let divisor = match caps.get(3).map(|u| u.as_str()) {
                Some("ms") => 1_000.0,
                Some("us") => 1_000_000.0,
                _ => 1.0,
            };
            (caps.get(1).is_some(), value / divisor)
        };

    Some(if negative { -secs } else { secs })
}

/// Elapsed encode time reported by a status line.
///
/// `None` when the line carries no `time=` marker; `Some(0.0)` when the
/// marker is present but its value cannot be read.
pub fn parse_elapsed(line: &str) -> Option<f64> {
    let start = line.find(TIME_MARKER)? + TIME_MARKER.len();
    let value = line[start..].split_whitespace().next().unwrap_or("");
    Some(parse_clock(value).unwrap_or(0.0))
}

/// Duration progress is measured against.
///
/// A requested output duration only counts when it is shorter than the source.
pub fn reference_duration(source_duration_secs: f64, requested_secs: Option<f64>) -> f64 {
    match requested_secs {
        Some(requested) if requested < source_duration_secs => requested,
        _ => source_duration_secs,
    }
}

/// Turns status lines into a non-decreasing progress fraction.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    reference_secs: f64,
    last: f64,
}

impl ProgressTracker {
    pub fn new(reference_secs: f64) -> Self {
        Self {
            reference_secs,
            last: 0.0,
        }
    }

    pub fn reference_secs(&self) -> f64 {
        self.reference_secs
    }

    /// Last reported fraction.
    pub fn last(&self) -> f64 {
        self.last
    }

    /// Feeds one line, returning the fraction to report, if any.
    ///
    /// Lines without a time marker produce nothing, and so does every line
    /// when the reference duration is unknown.
    pub fn observe(&mut self, line: &str) -> Option<f64> {
        let elapsed = parse_elapsed(line)?;
        if self.reference_secs.is_nan() || self.reference_secs <= 0.0 {
            return None;
        }
        let fraction = (elapsed / self.reference_secs).clamp(0.0, MAX_INTERMEDIATE_PROGRESS);
        self.last = self.last.max(fraction);
        Some(self.last)
    }
}
