//! Encoding options and their conversion to ffmpeg argument tokens.
//!
//! An [`OptionSet`] keeps options in insertion order, keyed by the closed
//! [`OptionName`] vocabulary. Serializing it applies one conversion rule per
//! option and then orders the tokens so that seek and input options come
//! first, codecs precede presets, and everything else follows in insertion
//! order with a synthesized `-aspect` last.

use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use tracing::debug;

use super::error::TranscodeError;
use super::progress::parse_duration;

/// Every option the transcoder knows how to turn into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionName {
    SeekTime,
    Input,
    Watermark,
    VideoCodec,
    AudioCodec,
    VideoPreset,
    AudioPreset,
    FilePreset,
    X264Preset,
    Aspect,
    FrameRate,
    Resolution,
    VideoBitrate,
    AudioBitrate,
    AudioSampleRate,
    AudioChannels,
    VideoMaxBitrate,
    VideoMinBitrate,
    VideoBitrateTolerance,
    BufferSize,
    Threads,
    Target,
    Duration,
    KeyframeInterval,
    X264Vprofile,
    VideoFilter,
    Metadata,
    Screenshot,
    Vframes,
    Quality,
    WatermarkFilter,
    Custom,
}

/// Position of a token group in the serialized command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptionGroup {
    Seek,
    Input,
    Codec,
    Preset,
    Remaining,
}

impl OptionName {
    pub const ALL: [OptionName; 32] = [
        Self::SeekTime,
        Self::Input,
        Self::Watermark,
        Self::VideoCodec,
        Self::AudioCodec,
        Self::VideoPreset,
        Self::AudioPreset,
        Self::FilePreset,
        Self::X264Preset,
        Self::Aspect,
        Self::FrameRate,
        Self::Resolution,
        Self::VideoBitrate,
        Self::AudioBitrate,
        Self::AudioSampleRate,
        Self::AudioChannels,
        Self::VideoMaxBitrate,
        Self::VideoMinBitrate,
        Self::VideoBitrateTolerance,
        Self::BufferSize,
        Self::Threads,
        Self::Target,
        Self::Duration,
        Self::KeyframeInterval,
        Self::X264Vprofile,
        Self::VideoFilter,
        Self::Metadata,
        Self::Screenshot,
        Self::Vframes,
        Self::Quality,
        Self::WatermarkFilter,
        Self::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SeekTime => "seek_time",
            Self::Input => "input",
            Self::Watermark => "watermark",
            Self::VideoCodec => "video_codec",
            Self::AudioCodec => "audio_codec",
            Self::VideoPreset => "video_preset",
            Self::AudioPreset => "audio_preset",
            Self::FilePreset => "file_preset",
            Self::X264Preset => "x264_preset",
            Self::Aspect => "aspect",
            Self::FrameRate => "frame_rate",
            Self::Resolution => "resolution",
            Self::VideoBitrate => "video_bitrate",
            Self::AudioBitrate => "audio_bitrate",
            Self::AudioSampleRate => "audio_sample_rate",
            Self::AudioChannels => "audio_channels",
            Self::VideoMaxBitrate => "video_max_bitrate",
            Self::VideoMinBitrate => "video_min_bitrate",
            Self::VideoBitrateTolerance => "video_bitrate_tolerance",
            Self::BufferSize => "buffer_size",
            Self::Threads => "threads",
            Self::Target => "target",
            Self::Duration => "duration",
            Self::KeyframeInterval => "keyframe_interval",
            Self::X264Vprofile => "x264_vprofile",
            Self::VideoFilter => "video_filter",
            Self::Metadata => "metadata",
            Self::Screenshot => "screenshot",
            Self::Vframes => "vframes",
            Self::Quality => "quality",
            Self::WatermarkFilter => "watermark_filter",
            Self::Custom => "custom",
        }
    }

    /// Looks up an option by its key, `None` for keys outside the vocabulary.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|name| name.as_str() == key)
    }

    pub fn group(&self) -> OptionGroup {
        let key = self.as_str();
        match self {
            Self::SeekTime => OptionGroup::Seek,
            Self::Input | Self::Watermark => OptionGroup::Input,
            _ if key.contains("codec") => OptionGroup::Codec,
            _ if key.contains("preset") => OptionGroup::Preset,
            _ => OptionGroup::Remaining,
        }
    }

    /// The flag for options that map to a plain `flag value` pair.
    fn flag(&self) -> Option<&'static str> {
        Some(match self {
            Self::SeekTime => "-ss",
            Self::Input | Self::Watermark => "-i",
            Self::VideoCodec => "-vcodec",
            Self::AudioCodec => "-acodec",
            Self::VideoPreset => "-vpre",
            Self::AudioPreset => "-apre",
            Self::FilePreset => "-fpre",
            Self::X264Preset => "-preset",
            Self::Aspect => "-aspect",
            Self::FrameRate => "-r",
            Self::Resolution => "-s",
            Self::VideoBitrate => "-b:v",
            Self::AudioBitrate => "-b:a",
            Self::AudioSampleRate => "-ar",
            Self::AudioChannels => "-ac",
            Self::VideoMaxBitrate => "-maxrate",
            Self::VideoMinBitrate => "-minrate",
            Self::VideoBitrateTolerance => "-bt",
            Self::BufferSize => "-bufsize",
            Self::Threads => "-threads",
            Self::Target => "-target",
            Self::Duration => "-t",
            Self::KeyframeInterval => "-g",
            Self::X264Vprofile => "-vprofile",
            Self::VideoFilter => "-vf",
            Self::Vframes => "-vframes",
            Self::Quality => "-q:v",
            Self::Metadata | Self::Screenshot | Self::WatermarkFilter | Self::Custom => {
                return None
            }
        })
    }

    /// Options whose value is a bitrate in kilobits.
    fn is_kilobits(&self) -> bool {
        matches!(
            self,
            Self::VideoBitrate
                | Self::AudioBitrate
                | Self::VideoMaxBitrate
                | Self::VideoMinBitrate
                | Self::VideoBitrateTolerance
                | Self::BufferSize
        )
    }

    /// Converts one value of this option into tokens.
    fn convert(&self, value: &OptionValue, set: &OptionSet) -> Vec<String> {
        match self {
            Self::Custom => match value {
                OptionValue::Tokens(tokens) => tokens.clone(),
                other => other
                    .as_scalar()
                    .map(|s| s.split_whitespace().map(String::from).collect())
                    .unwrap_or_default(),
            },
            Self::WatermarkFilter => match value {
                OptionValue::Watermark(filter) => vec![
                    "-filter_complex".to_string(),
                    filter.to_filter(set.resolution()),
                ],
                _ => Vec::new(),
            },
            Self::Screenshot => {
                if matches!(value, OptionValue::Flag(false)) {
                    return Vec::new();
                }
                let mut tokens = Vec::new();
                if !set.contains(Self::Vframes) {
                    tokens.extend(["-vframes".to_string(), "1".to_string()]);
                }
                tokens.extend(["-f".to_string(), "image2".to_string()]);
                tokens
            }
            Self::Metadata => match value.as_scalar() {
                Some(text) => match metadata_specifier(&text) {
                    Some((specifier, entry)) => {
                        vec![format!("-metadata:{}", specifier), entry.to_string()]
                    }
                    None => vec!["-metadata".to_string(), text.clone()],
                },
                None => Vec::new(),
            },
            _ => match (self.flag(), value.as_scalar()) {
                (Some(flag), Some(text)) => {
                    let text = if self.is_kilobits() && !text.contains('k') {
                        format!("{}k", text)
                    } else {
                        text
                    };
                    vec![flag.to_string(), text]
                }
                _ => Vec::new(),
            },
        }
    }

    fn accepts(&self, value: &OptionValue) -> bool {
        match self {
            Self::Custom => !matches!(value, OptionValue::Watermark(_)),
            Self::WatermarkFilter => matches!(value, OptionValue::Watermark(_)),
            _ => value.as_scalar().is_some(),
        }
    }
}

/// Splits `"SPEC KEY=VAL"` into the stream specifier and the entry.
///
/// A plain `KEY=VAL` whose value contains spaces has an `=` before the
/// first space and is left whole.
fn metadata_specifier(text: &str) -> Option<(&str, &str)> {
    let (specifier, entry) = text.trim().split_once(char::is_whitespace)?;
    let entry = entry.trim();
    (!specifier.contains('=') && entry.contains('=')).then_some((specifier, entry))
}

impl fmt::Display for OptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Corner a watermark is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatermarkPosition {
    Lt,
    Rt,
    Lb,
    Rb,
}

/// Placement of an overlaid watermark input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatermarkFilter {
    pub position: WatermarkPosition,
    #[serde(default = "default_padding")]
    pub padding_x: i64,
    #[serde(default = "default_padding")]
    pub padding_y: i64,
}

fn default_padding() -> i64 {
    10
}

impl WatermarkFilter {
    pub fn new(position: WatermarkPosition, padding_x: i64, padding_y: i64) -> Self {
        Self {
            position,
            padding_x,
            padding_y,
        }
    }

    /// Renders the `-filter_complex` graph, scaling first when a resolution is known.
    pub fn to_filter(&self, resolution: Option<String>) -> String {
        let (px, py) = (self.padding_x, self.padding_y);
        let overlay = match self.position {
            WatermarkPosition::Lt => format!("overlay=x={}:y={}", px, py),
            WatermarkPosition::Rt => format!("overlay=x=main_w-overlay_w-{}:y={}", px, py),
            WatermarkPosition::Lb => format!("overlay=x={}:y=main_h-overlay_h-{}", px, py),
            WatermarkPosition::Rb => {
                format!("overlay=x=main_w-overlay_w-{}:y=main_h-overlay_h-{}", px, py)
            }
        };
        match resolution {
            Some(res) => format!("scale={},{}", res, overlay),
            None => overlay,
        }
    }
}

/// Value of a single option.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
    Tokens(Vec<String>),
    Watermark(WatermarkFilter),
}

impl OptionValue {
    /// Renders a scalar value; `None` for structured values.
    pub fn as_scalar(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Integer(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Flag(b) => Some(b.to_string()),
            Self::Tokens(_) | Self::Watermark(_) => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "a string",
            Self::Integer(_) => "an integer",
            Self::Float(_) => "a float",
            Self::Flag(_) => "a boolean",
            Self::Tokens(_) => "a token list",
            Self::Watermark(_) => "a watermark table",
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for OptionValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(value: Vec<String>) -> Self {
        Self::Tokens(value)
    }
}

impl From<WatermarkFilter> for OptionValue {
    fn from(value: WatermarkFilter) -> Self {
        Self::Watermark(value)
    }
}

/// Parses `"WxH"`.
pub fn parse_resolution(text: &str) -> Option<(u32, u32)> {
    let (w, h) = text.trim().split_once('x')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

/// Ordered, duplicate-free set of encoding options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionSet {
    entries: Vec<(OptionName, OptionValue)>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`OptionSet::insert`].
    pub fn with(mut self, name: OptionName, value: impl Into<OptionValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets an option, keeping the original position when it already exists.
    pub fn insert(&mut self, name: OptionName, value: impl Into<OptionValue>) -> Option<OptionValue> {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Sets an option by key. Keys outside the vocabulary are dropped.
    pub fn insert_key(&mut self, key: &str, value: impl Into<OptionValue>) -> bool {
        match OptionName::from_key(key) {
            Some(name) => {
                self.insert(name, value);
                true
            }
            None => {
                debug!(option = key, "Dropping unknown encoding option");
                false
            }
        }
    }

    pub fn get(&self, name: OptionName) -> Option<&OptionValue> {
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn remove(&mut self, name: OptionName) -> Option<OptionValue> {
        let index = self.entries.iter().position(|(n, _)| *n == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains(&self, name: OptionName) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (OptionName, &OptionValue)> {
        self.entries.iter().map(|(n, v)| (*n, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The raw `resolution` value, if set.
    pub fn resolution(&self) -> Option<String> {
        self.get(OptionName::Resolution)
            .and_then(OptionValue::as_scalar)
    }

    pub fn width(&self) -> Option<u32> {
        self.resolution()
            .and_then(|r| parse_resolution(&r))
            .map(|(w, _)| w)
    }

    pub fn height(&self) -> Option<u32> {
        self.resolution()
            .and_then(|r| parse_resolution(&r))
            .map(|(_, h)| h)
    }

    /// Width over height of the requested resolution.
    pub fn calculated_aspect_ratio(&self) -> Option<f64> {
        let (width, height) = (self.width()?, self.height()?);
        if height == 0 {
            return None;
        }
        Some(f64::from(width) / f64::from(height))
    }

    /// The requested output duration in seconds.
    ///
    /// `None` when the option is absent or not a positive duration; see
    /// `has_requested_duration` for mere presence.
    pub fn requested_duration(&self) -> Option<f64> {
        let secs = match self.get(OptionName::Duration)? {
            OptionValue::Integer(i) => *i as f64,
            OptionValue::Float(f) => *f,
            OptionValue::Text(s) => parse_duration(s)?,
            _ => return None,
        };
        (secs.is_finite() && secs > 0.0).then_some(secs)
    }

    /// Whether an output duration was asked for, readable or not.
    pub fn has_requested_duration(&self) -> bool {
        self.contains(OptionName::Duration)
    }

    pub fn is_screenshot(&self) -> bool {
        self.get(OptionName::Screenshot)
            .is_some_and(|v| !matches!(v, OptionValue::Flag(false)))
    }

    /// Removes the seek time of a screenshot so it can be used as an input seek.
    pub fn take_screenshot_seek(&mut self) -> Option<String> {
        if !self.is_screenshot() {
            return None;
        }
        self.remove(OptionName::SeekTime)
            .and_then(|v| v.as_scalar())
            .filter(|s| !s.trim().is_empty())
    }

    /// Checks value types and the resolution format.
    pub fn validate(&self) -> Result<(), TranscodeError> {
        for (name, value) in &self.entries {
            if !name.accepts(value) {
                return Err(TranscodeError::invalid_options(format!(
                    "option '{}' does not accept {}",
                    name,
                    value.kind()
                )));
            }
        }

        if let Some(resolution) = self.resolution() {
            match parse_resolution(&resolution) {
                Some((w, h)) if w > 0 && h > 0 => {}
                _ => {
                    return Err(TranscodeError::invalid_options(format!(
                        "malformed resolution '{}', expected WxH",
                        resolution
                    )))
                }
            }
        }

        Ok(())
    }

    /// Serializes the options into ffmpeg argument tokens.
    pub fn to_tokens(&self) -> Vec<String> {
        let mut entries: Vec<&(OptionName, OptionValue)> = self.entries.iter().collect();
        entries.sort_by_key(|(name, _)| name.group());

        let mut tokens: Vec<String> = entries
            .into_iter()
            .flat_map(|(name, value)| name.convert(value, self))
            .collect();

        if !self.contains(OptionName::Aspect) {
            if let Some(aspect) = self.calculated_aspect_ratio() {
                tokens.push("-aspect".to_string());
                tokens.push(aspect.to_string());
            }
        }

        tokens
    }
}

impl FromIterator<(OptionName, OptionValue)> for OptionSet {
    fn from_iter<I: IntoIterator<Item = (OptionName, OptionValue)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

/// The three accepted representations of encoding options.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodingOptions {
    /// Structured options, subject to derivation.
    Set(OptionSet),
    /// A string split on whitespace and passed through unescaped.
    Raw(String),
    /// Tokens passed through verbatim.
    Tokens(Vec<String>),
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self::Set(OptionSet::new())
    }
}

impl From<OptionSet> for EncodingOptions {
    fn from(set: OptionSet) -> Self {
        Self::Set(set)
    }
}

impl From<Vec<String>> for EncodingOptions {
    fn from(tokens: Vec<String>) -> Self {
        Self::Tokens(tokens)
    }
}

impl From<&str> for EncodingOptions {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

impl EncodingOptions {
    /// Parses options from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, TranscodeError> {
        serde_json::from_str(json).map_err(|e| TranscodeError::invalid_options(e.to_string()))
    }

    pub fn as_set(&self) -> Option<&OptionSet> {
        match self {
            Self::Set(set) => Some(set),
            _ => None,
        }
    }
}

const EXPECTED_OPTIONS: &str = "an options map, a string or a token list";

fn unknown_format<E: de::Error>(kind: &str) -> E {
    E::custom(format!(
        "Unknown options format '{}', should be either {}",
        kind, EXPECTED_OPTIONS
    ))
}

struct OptionValueVisitor;

impl<'de> Visitor<'de> for OptionValueVisitor {
    type Value = OptionValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string, number, boolean, token list or watermark table")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<OptionValue, E> {
        Ok(OptionValue::Flag(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<OptionValue, E> {
        Ok(OptionValue::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<OptionValue, E> {
        Ok(i64::try_from(v)
            .map(OptionValue::Integer)
            .unwrap_or(OptionValue::Float(v as f64)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<OptionValue, E> {
        Ok(OptionValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<OptionValue, E> {
        Ok(OptionValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<OptionValue, E> {
        Ok(OptionValue::Text(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<OptionValue, A::Error> {
        let mut tokens = Vec::new();
        while let Some(token) = seq.next_element::<String>()? {
            tokens.push(token);
        }
        Ok(OptionValue::Tokens(tokens))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<OptionValue, A::Error> {
        WatermarkFilter::deserialize(de::value::MapAccessDeserializer::new(map))
            .map(OptionValue::Watermark)
    }
}

impl<'de> Deserialize<'de> for OptionValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(OptionValueVisitor)
    }
}

struct OptionSetVisitor;

impl<'de> Visitor<'de> for OptionSetVisitor {
    type Value = OptionSet;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an options map")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<OptionSet, A::Error> {
        let mut set = OptionSet::new();
        while let Some(key) = map.next_key::<String>()? {
            match OptionName::from_key(&key) {
                Some(name) => {
                    if let Some(value) = map.next_value::<Option<OptionValue>>()? {
                        set.insert(name, value);
                    }
                }
                None => {
                    map.next_value::<IgnoredAny>()?;
                    debug!(option = %key, "Dropping unknown encoding option");
                }
            }
        }
        Ok(set)
    }
}

impl<'de> Deserialize<'de> for OptionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OptionSetVisitor)
    }
}

struct EncodingOptionsVisitor;

impl<'de> Visitor<'de> for EncodingOptionsVisitor {
    type Value = EncodingOptions;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(EXPECTED_OPTIONS)
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<EncodingOptions, E> {
        Err(unknown_format("boolean"))
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<EncodingOptions, E> {
        Err(unknown_format("integer"))
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<EncodingOptions, E> {
        Err(unknown_format("integer"))
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<EncodingOptions, E> {
        Err(unknown_format("float"))
    }

    fn visit_unit<E: de::Error>(self) -> Result<EncodingOptions, E> {
        Err(unknown_format("null"))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<EncodingOptions, E> {
        Ok(EncodingOptions::Raw(v.to_string()))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<EncodingOptions, A::Error> {
        let mut tokens = Vec::new();
        while let Some(token) = seq.next_element::<String>()? {
            tokens.push(token);
        }
        Ok(EncodingOptions::Tokens(tokens))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<EncodingOptions, A::Error> {
        OptionSetVisitor.visit_map(map).map(EncodingOptions::Set)
    }
}

impl<'de> Deserialize<'de> for EncodingOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(EncodingOptionsVisitor)
    }
}
