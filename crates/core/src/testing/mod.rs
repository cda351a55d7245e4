//! Testing utilities and mock implementations.
//!
//! `MockProbe` stands in for ffprobe; `fixtures` builds descriptors and
//! small shell scripts that behave like an encoder, so the full run
//! lifecycle can be exercised without ffmpeg installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use warden_core::testing::{fixtures, MockProbe};
//!
//! let dir = tempfile::TempDir::new()?;
//! let config = fixtures::write_fake_encoder(dir.path(), fixtures::SUCCESS_SCRIPT)?;
//! let probe = MockProbe::new();
//! probe.set_default_result(fixtures::movie("/unused", 7.5)).await;
//! ```

mod mock_probe;

pub use mock_probe::MockProbe;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::io;
    use std::path::Path;

    use crate::probe::{MediaDescriptor, Rotation};
    use crate::transcode::FfmpegConfig;

    /// Create a 640x480 h264/aac movie without a container aspect ratio.
    pub fn movie(path: impl AsRef<Path>, duration_secs: f64) -> MediaDescriptor {
        let mut media =
            MediaDescriptor::new(path.as_ref(), duration_secs).with_dimensions(640, 480);
        media.frame_rate = Some(16.0);
        media.container = Some("mov".to_string());
        media.video_codec = Some("h264".to_string());
        media.audio_codec = Some("aac".to_string());
        media.audio_sample_rate = Some(44100);
        media.audio_channels = Some(2);
        media
    }

    /// Create a movie whose first video stream carries a rotation.
    pub fn rotated_movie(
        path: impl AsRef<Path>,
        duration_secs: f64,
        rotation: Rotation,
    ) -> MediaDescriptor {
        movie(path, duration_secs).with_rotation(rotation)
    }

    /// Create an mp3 whose duration was estimated from the bitrate.
    pub fn audio(path: impl AsRef<Path>, duration_secs: f64) -> MediaDescriptor {
        let mut media = MediaDescriptor::new(path.as_ref(), duration_secs).with_uncertain_duration();
        media.container = Some("mp3".to_string());
        media.audio_codec = Some("mp3".to_string());
        media.audio_sample_rate = Some(44100);
        media.audio_channels = Some(2);
        media.bitrate_kbps = Some(128);
        media
    }

    /// Reports progress on stderr with `\r` separators and writes the output file.
    pub const SUCCESS_SCRIPT: &str = r#"printf 'Input #0, mov, from input\n' >&2
printf 'frame=   10 time=00:00:01.00 bitrate=N/A\r' >&2
printf 'frame=   20 time=00:00:03.00 bitrate=N/A\r' >&2
printf 'frame=   30 time=00:00:06.00 bitrate=N/A\r' >&2
printf 'encoded' > "$out"
exit 0
"#;

    /// Prints one status line, then goes quiet without exiting.
    pub const HANG_SCRIPT: &str = r#"printf 'frame=    1\n' >&2
exec sleep 30
"#;

    /// Closes stderr, then keeps running without exiting.
    pub const CLOSED_STDERR_SCRIPT: &str = r#"printf 'frame=    1\n' >&2
exec 2>&-
exec sleep 30
"#;

    /// Writes the output file but exits with status 3.
    pub const FAIL_AFTER_WRITE_SCRIPT: &str = r#"printf 'encoded' > "$out"
printf 'Error while flushing\n' >&2
exit 3
"#;

    /// Complains and exits with status 1 without writing anything.
    pub const FAIL_SCRIPT: &str = r#"printf 'Unknown encoder\n' >&2
exit 1
"#;

    /// Write a shell script that plays the encoder.
    ///
    /// The returned config runs `/bin/sh <script>` in place of ffmpeg, so
    /// the script sees the usual ffmpeg arguments; `$out` holds the last
    /// one, the output path.
    pub fn write_fake_encoder(dir: &Path, body: &str) -> io::Result<FfmpegConfig> {
        let script = dir.join("fake-ffmpeg.sh");
        let contents = format!(
            "for arg in \"$@\"; do out=\"$arg\"; done\n{}",
            body
        );
        std::fs::write(&script, contents)?;
        Ok(FfmpegConfig::with_paths("/bin/sh", "ffprobe")
            .with_extra_args([script.to_string_lossy().to_string()]))
    }
}
