use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - ffmpeg and ffprobe paths are not empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.ffmpeg.ffmpeg_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "ffmpeg.ffmpeg_path cannot be empty".to_string(),
        ));
    }

    if config.ffmpeg.ffprobe_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "ffmpeg.ffprobe_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
