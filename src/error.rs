//! Error types for the video-watermark-mask crate.

/// Errors that can occur during mask extraction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The video cannot be used as input: unreadable, unprobeable, or its
    /// duration is unknown/non-positive with no keyframe list to fall back on.
    #[error("cannot sample video: {0}")]
    Input(String),

    /// A single frame failed to decode. Recoverable: the pipeline skips the
    /// timestamp and continues with the remaining samples.
    #[error("failed to decode frame at {timestamp:.3}s: {reason}")]
    Decode {
        /// Timestamp of the failed sample, in seconds.
        timestamp: f64,
        /// Human-readable failure cause.
        reason: String,
    },

    /// A decoded frame's dimensions differ from the first decoded frame's.
    #[error("frame dimensions {got_width}x{got_height} do not match first frame {expected_width}x{expected_height}")]
    DimensionMismatch {
        /// Width of the first successfully decoded frame.
        expected_width: u32,
        /// Height of the first successfully decoded frame.
        expected_height: u32,
        /// Width of the mismatching frame.
        got_width: u32,
        /// Height of the mismatching frame.
        got_height: u32,
    },

    /// Fewer than two frames decoded successfully after skipping failures.
    #[error("need at least 2 decoded frames to extract a mask, got {got}")]
    InsufficientSamples {
        /// Number of frames that decoded successfully.
        got: usize,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The mask output format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let io_err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io_err.to_string().contains("gone"));

        let input = Error::Input("duration unknown".to_string());
        assert!(input.to_string().contains("duration unknown"));

        let decode = Error::Decode {
            timestamp: 12.5,
            reason: "seek out of range".to_string(),
        };
        let msg = decode.to_string();
        assert!(msg.contains("12.500"));
        assert!(msg.contains("seek out of range"));

        let mismatch = Error::DimensionMismatch {
            expected_width: 1920,
            expected_height: 1080,
            got_width: 1280,
            got_height: 720,
        };
        let msg = mismatch.to_string();
        assert!(msg.contains("1280x720"));
        assert!(msg.contains("1920x1080"));

        let short = Error::InsufficientSamples { got: 1 };
        assert!(short.to_string().contains("got 1"));
    }
}
