//! Configuration for the transcode module.

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default liveness bound between two chunks of encoder output.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30;

/// Where the encoder binaries live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FfmpegConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Arguments placed right after the program, before `-y`.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            extra_args: Vec::new(),
        }
    }
}

impl FfmpegConfig {
    /// Creates a new config with custom ffmpeg/ffprobe paths.
    pub fn with_paths(ffmpeg_path: impl Into<PathBuf>, ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
            ..Default::default()
        }
    }

    /// Sets the extra leading arguments.
    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// Which resolution side is held fixed when resizing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreserveAspectRatio {
    /// Use the requested resolution as is.
    #[default]
    None,
    /// Keep the requested width, derive the height.
    Width,
    /// Keep the requested height, derive the width.
    Height,
    /// Pick whichever side keeps the output inside the requested box.
    Fit,
}

/// Input-side tokens placed before `-i`.
///
/// Deserializes from a token list (`["-ss", "5"]`) or a table
/// (`{ ss = "5" }`, rendered as `-ss 5`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputOptions {
    tokens: Vec<String>,
}

impl InputOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates input options from raw tokens.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Sets `flag value`, replacing the value that follows an existing `flag`.
    pub fn set(&mut self, flag: &str, value: impl Into<String>) {
        let value = value.into();
        match self.tokens.iter().position(|t| t == flag) {
            Some(i) if i + 1 < self.tokens.len() => self.tokens[i + 1] = value,
            Some(_) => self.tokens.push(value),
            None => {
                self.tokens.push(flag.to_string());
                self.tokens.push(value);
            }
        }
    }

    /// Value following `flag`, if present.
    pub fn get(&self, flag: &str) -> Option<&str> {
        let i = self.tokens.iter().position(|t| t == flag)?;
        self.tokens.get(i + 1).map(String::as_str)
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InputScalar {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl InputScalar {
    fn into_text(self) -> String {
        match self {
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s,
        }
    }
}

/// Accepts a token list or a table, keeping the table's document order.
struct InputOptionsVisitor;

impl<'de> Visitor<'de> for InputOptionsVisitor {
    type Value = InputOptions;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a list of tokens or a table of input flags")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<InputOptions, A::Error> {
        let mut tokens = Vec::new();
        while let Some(token) = seq.next_element::<String>()? {
            tokens.push(token);
        }
        Ok(InputOptions { tokens })
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<InputOptions, A::Error> {
        let mut options = InputOptions::new();
        while let Some((key, value)) = map.next_entry::<String, InputScalar>()? {
            options.set(&format!("-{}", key.trim_start_matches('-')), value.into_text());
        }
        Ok(options)
    }
}

impl<'de> Deserialize<'de> for InputOptions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(InputOptionsVisitor)
    }
}

impl Serialize for InputOptions {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.tokens.serialize(serializer)
    }
}

/// How a single run is supervised and which derivations it applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorOptions {
    #[serde(default)]
    pub preserve_aspect_ratio: PreserveAspectRatio,

    /// When false, the preserved side never exceeds the source's own size.
    #[serde(default = "default_true")]
    pub allow_enlarge: bool,

    /// Rotate the picture upright using the source's rotation metadata.
    #[serde(default)]
    pub autorotate: bool,

    /// Re-probe and check the output after the encoder exits.
    #[serde(default = "default_true")]
    pub validate_output: bool,

    /// Seconds without encoder output before the run is declared hung.
    /// `None` disables the timer.
    #[serde(default = "default_idle_timeout", with = "idle_timeout_secs")]
    pub idle_timeout_secs: Option<u64>,

    /// Replaces the source path given to `-i`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,

    #[serde(default, skip_serializing_if = "InputOptions::is_empty")]
    pub input_options: InputOptions,
}

fn default_true() -> bool {
    true
}

fn default_idle_timeout() -> Option<u64> {
    Some(DEFAULT_IDLE_TIMEOUT_SECS)
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            preserve_aspect_ratio: PreserveAspectRatio::None,
            allow_enlarge: true,
            autorotate: false,
            validate_output: true,
            idle_timeout_secs: default_idle_timeout(),
            input: None,
            input_options: InputOptions::new(),
        }
    }
}

impl SupervisorOptions {
    /// The idle timeout as a duration, `None` when disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Whether any geometry derivation was requested.
    pub fn wants_derivation(&self) -> bool {
        self.autorotate || self.preserve_aspect_ratio != PreserveAspectRatio::None
    }

    pub fn with_preserve_aspect_ratio(mut self, mode: PreserveAspectRatio) -> Self {
        self.preserve_aspect_ratio = mode;
        self
    }

    pub fn with_allow_enlarge(mut self, allow: bool) -> Self {
        self.allow_enlarge = allow;
        self
    }

    pub fn with_autorotate(mut self, autorotate: bool) -> Self {
        self.autorotate = autorotate;
        self
    }

    pub fn with_validate_output(mut self, validate: bool) -> Self {
        self.validate_output = validate;
        self
    }

    /// Sets the idle timeout; `None` or zero disables it.
    pub fn with_idle_timeout(mut self, secs: Option<u64>) -> Self {
        self.idle_timeout_secs = secs.filter(|s| *s > 0);
        self
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn with_input_options(mut self, options: InputOptions) -> Self {
        self.input_options = options;
        self
    }
}

/// Serde adapter accepting seconds, `0` or `"none"`.
mod idle_timeout_secs {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Secs(u64),
        Word(String),
    }

    pub fn serialize<S>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(secs) => serializer.serialize_u64(*secs),
            None => serializer.serialize_str("none"),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Secs(0) => Ok(None),
            Repr::Secs(secs) => Ok(Some(secs)),
            Repr::Word(word) => {
                let word = word.trim();
                if word.eq_ignore_ascii_case("none") {
                    return Ok(None);
                }
                match word.parse::<u64>() {
                    Ok(0) => Ok(None),
                    Ok(secs) => Ok(Some(secs)),
                    Err(_) => Err(de::Error::custom(format!(
                        "invalid idle timeout '{}', expected seconds or \"none\"",
                        word
                    ))),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_supervisor_options() {
        let options = SupervisorOptions::default();
        assert_eq!(options.preserve_aspect_ratio, PreserveAspectRatio::None);
        assert!(options.allow_enlarge);
        assert!(!options.autorotate);
        assert!(options.validate_output);
        assert_eq!(options.idle_timeout(), Some(Duration::from_secs(30)));
        assert!(!options.wants_derivation());
    }

    #[test]
    fn test_idle_timeout_none_and_zero_disable() {
        let parsed: SupervisorOptions = toml::from_str(r#"idle_timeout_secs = "none""#).unwrap();
        assert_eq!(parsed.idle_timeout(), None);

        let parsed: SupervisorOptions = toml::from_str("idle_timeout_secs = 0").unwrap();
        assert_eq!(parsed.idle_timeout(), None);

        let parsed: SupervisorOptions = toml::from_str("idle_timeout_secs = 5").unwrap();
        assert_eq!(parsed.idle_timeout(), Some(Duration::from_secs(5)));

        assert!(toml::from_str::<SupervisorOptions>(r#"idle_timeout_secs = "soon""#).is_err());
    }

    #[test]
    fn test_preserve_aspect_ratio_names() {
        let parsed: SupervisorOptions = toml::from_str(r#"preserve_aspect_ratio = "fit""#).unwrap();
        assert_eq!(parsed.preserve_aspect_ratio, PreserveAspectRatio::Fit);
        assert!(parsed.wants_derivation());
    }

    #[test]
    fn test_input_options_from_table_and_list() {
        let parsed: SupervisorOptions = toml::from_str(
            r#"
            [input_options]
            ss = "00:00:05"
            threads = 2
            "#,
        )
        .unwrap();
        assert_eq!(parsed.input_options.get("-ss"), Some("00:00:05"));
        assert_eq!(parsed.input_options.get("-threads"), Some("2"));

        let parsed: SupervisorOptions =
            toml::from_str(r#"input_options = ["-ss", "7", "-re"]"#).unwrap();
        assert_eq!(parsed.input_options.tokens(), ["-ss", "7", "-re"]);
    }

    #[test]
    fn test_input_options_table_keeps_document_order() {
        let parsed: SupervisorOptions =
            toml::from_str(r#"input_options = { ss = "5", f = "concat", safe = 0 }"#).unwrap();
        assert_eq!(
            parsed.input_options.tokens(),
            ["-ss", "5", "-f", "concat", "-safe", "0"]
        );

        let parsed: SupervisorOptions =
            serde_json::from_str(r#"{"input_options": {"re": "", "ss": 1.5}}"#).unwrap();
        assert_eq!(parsed.input_options.tokens(), ["-re", "", "-ss", "1.5"]);
    }

    #[test]
    fn test_input_options_rejects_scalar() {
        assert!(toml::from_str::<SupervisorOptions>(r#"input_options = 5"#).is_err());
    }

    #[test]
    fn test_input_options_set_replaces_value() {
        let mut options = InputOptions::from_tokens(["-re", "-ss", "1"]);
        options.set("-ss", "9");
        assert_eq!(options.tokens(), ["-re", "-ss", "9"]);

        let mut options = InputOptions::new();
        options.set("-ss", "3");
        assert_eq!(options.tokens(), ["-ss", "3"]);
    }

    #[test]
    fn test_ffmpeg_config_builder() {
        let config = FfmpegConfig::with_paths("/opt/ffmpeg", "/opt/ffprobe")
            .with_extra_args(["-hide_banner"]);
        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg"));
        assert_eq!(config.extra_args, vec!["-hide_banner".to_string()]);
    }

    #[test]
    fn test_supervisor_options_serialization() {
        let options = SupervisorOptions::default().with_idle_timeout(None);
        let json = serde_json::to_string(&options).unwrap();
        let parsed: SupervisorOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.idle_timeout_secs, None);
        assert!(json.contains(r#""idle_timeout_secs":"none""#));
    }
}
