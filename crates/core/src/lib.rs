pub mod config;
pub mod probe;
pub mod testing;
pub mod transcode;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError,
};
pub use probe::{Dimensions, FfprobeProber, MediaDescriptor, Probe, ProbeError, Rotation};
pub use transcode::{
    EncodingOptions, FailureReason, FfmpegConfig, OptionName, OptionSet, OptionValue,
    OutputValidator, PreserveAspectRatio, ProgressTracker, StreamLineTimeoutReader,
    SupervisorOptions, TranscodeError, TranscodeProgress, TranscodeRequest, TranscodeState,
    Transcoder,
};
