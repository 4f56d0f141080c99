//! External media collaborators: probing and per-timestamp frame decoding.
//!
//! The pipeline never touches containers or codecs itself. It consumes a
//! [`FrameSource`], the capability seam behind which the real work happens;
//! [`FfmpegFrameSource`] shells out to `ffprobe`/`ffmpeg`, and the tests
//! inject deterministic fakes that synthesize pixel buffers.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use image::RgbImage;

use crate::error::{Error, Result};

/// What a probe learns about a video before sampling.
#[derive(Debug, Clone, Default)]
pub struct MediaInfo {
    /// Keyframe timestamps in seconds, possibly empty.
    pub keyframes: Vec<f64>,
    /// Container duration in seconds, if known.
    pub duration: Option<f64>,
}

/// Capability interface for media probing and single-frame decoding.
pub trait FrameSource {
    /// Probe a video for keyframe timestamps and duration.
    ///
    /// A degraded probe (no keyframes, no duration) is still `Ok`; whether
    /// the result is usable is decided by the sampler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] when the video cannot be probed at all.
    fn probe(&self, video: &Path) -> Result<MediaInfo>;

    /// Decode the frame nearest to `timestamp` into an RGB buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] on any per-timestamp failure; callers treat
    /// this as recoverable and skip the sample.
    fn decode_frame(&self, video: &Path, timestamp: f64) -> Result<RgbImage>;
}

/// Frame source backed by the `ffprobe` and `ffmpeg` command-line tools.
#[derive(Debug, Clone)]
pub struct FfmpegFrameSource {
    decode_deadline: Duration,
}

/// Default per-decode deadline before an unresponsive ffmpeg call is killed.
const DEFAULT_DECODE_DEADLINE: Duration = Duration::from_secs(30);

impl Default for FfmpegFrameSource {
    fn default() -> Self {
        Self {
            decode_deadline: DEFAULT_DECODE_DEADLINE,
        }
    }
}

impl FfmpegFrameSource {
    /// Create a source with the default per-decode deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source with a custom per-decode deadline. A call that exceeds
    /// it is killed and reported as a decode failure, so a hung decoder costs
    /// one skipped sample instead of a stalled run.
    #[must_use]
    pub fn with_deadline(decode_deadline: Duration) -> Self {
        Self { decode_deadline }
    }
}

/// Extract keyframe timestamps from `ffprobe -show_entries frame=pkt_dts_time`
/// output, skipping `N/A` entries.
fn parse_keyframe_times(output: &str) -> Vec<f64> {
    output
        .lines()
        .filter_map(|line| {
            let value = line.strip_prefix("pkt_dts_time=")?.trim();
            if value.contains("N/A") {
                return None;
            }
            value.parse::<f64>().ok()
        })
        .collect()
}

/// Parse `ffprobe -show_entries format=duration -of csv=p=0` output.
fn parse_duration(output: &str) -> Option<f64> {
    let first = output.trim().split(',').next()?;
    first.trim().parse::<f64>().ok().filter(|d| d.is_finite())
}

impl FrameSource for FfmpegFrameSource {
    fn probe(&self, video: &Path) -> Result<MediaInfo> {
        let keyframe_probe = Command::new("ffprobe")
            .args([
                "-hide_banner",
                "-loglevel",
                "warning",
                "-select_streams",
                "v",
                "-skip_frame",
                "nokey",
                "-show_frames",
                "-show_entries",
                "frame=pkt_dts_time",
            ])
            .arg(video)
            .output();

        let keyframes = match keyframe_probe {
            Ok(out) if out.status.success() => {
                parse_keyframe_times(&String::from_utf8_lossy(&out.stdout))
            }
            // A failed probe falls back to the duration grid.
            Ok(_) => Vec::new(),
            Err(e) => return Err(Error::Input(format!("failed to run ffprobe: {e}"))),
        };

        let duration = Command::new("ffprobe")
            .args([
                "-hide_banner",
                "-loglevel",
                "warning",
                "-show_entries",
                "format=duration",
                "-of",
                "csv=p=0",
            ])
            .arg(video)
            .output()
            .ok()
            .and_then(|out| parse_duration(&String::from_utf8_lossy(&out.stdout)));

        Ok(MediaInfo {
            keyframes,
            duration,
        })
    }

    fn decode_frame(&self, video: &Path, timestamp: f64) -> Result<RgbImage> {
        let decode_err = |reason: String| Error::Decode { timestamp, reason };

        let mut child = Command::new("ffmpeg")
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-ss",
                &format!("{timestamp:.4}"),
            ])
            .arg("-i")
            .arg(video)
            .args(["-frames:v", "1", "-f", "image2pipe", "-c:v", "png", "pipe:1"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| decode_err(format!("failed to spawn ffmpeg: {e}")))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| decode_err("ffmpeg stdout unavailable".to_string()))?;

        // Drain stdout on a separate thread; a PNG frame outgrows the pipe
        // buffer, so reading after exit would deadlock.
        let reader = thread::spawn(move || {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });

        let deadline = Instant::now() + self.decode_deadline;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(decode_err(format!(
                            "timed out after {:.1}s",
                            self.decode_deadline.as_secs_f64()
                        )));
                    }
                    thread::sleep(Duration::from_millis(20));
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(decode_err(format!("failed to poll ffmpeg: {e}")));
                }
            }
        };

        let data = reader
            .join()
            .map_err(|_| decode_err("ffmpeg reader thread panicked".to_string()))?
            .map_err(|e| decode_err(format!("failed to read ffmpeg output: {e}")))?;

        if !status.success() {
            return Err(decode_err(format!("ffmpeg exited with {status}")));
        }
        if data.is_empty() {
            return Err(decode_err(
                "no frame produced (seek past end of stream?)".to_string(),
            ));
        }

        let frame = image::load_from_memory(&data)
            .map_err(|e| decode_err(format!("undecodable frame data: {e}")))?;
        Ok(frame.to_rgb8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyframe_parsing_skips_noise_and_na_entries() {
        let output = "\
[FRAME]
pkt_dts_time=0.000000
[/FRAME]
[FRAME]
pkt_dts_time=N/A
[/FRAME]
[FRAME]
pkt_dts_time=4.171000
[/FRAME]
media_type=video
";
        let times = parse_keyframe_times(output);
        assert_eq!(times, vec![0.0, 4.171]);
    }

    #[test]
    fn keyframe_parsing_of_empty_output_is_empty() {
        assert!(parse_keyframe_times("").is_empty());
        assert!(parse_keyframe_times("media_type=video\n").is_empty());
    }

    #[test]
    fn duration_parsing_accepts_csv_output() {
        assert_eq!(parse_duration("97.430000\n"), Some(97.43));
        assert_eq!(parse_duration("12.5,extra\n"), Some(12.5));
    }

    #[test]
    fn duration_parsing_rejects_unusable_output() {
        assert_eq!(parse_duration("N/A\n"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("nan"), None);
    }
}
