//! Mask extraction engine.

use std::path::{Path, PathBuf};

use image::{GrayImage, ImageFormat};

use crate::error::{Error, Result};
use crate::gradient::GradientAccumulator;
use crate::mask;
use crate::media::{FfmpegFrameSource, FrameSource};
use crate::sampling::{self, DEFAULT_MAX_SAMPLES, DEFAULT_SEED};

/// Options controlling mask extraction behavior.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Maximum number of frames to sample from the video.
    pub max_samples: usize,
    /// Seed for the deterministic keyframe shuffle.
    pub seed: u64,
    /// Enable verbose output.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            max_samples: DEFAULT_MAX_SAMPLES,
            seed: DEFAULT_SEED,
            verbose: false,
            quiet: false,
        }
    }
}

/// Sampling statistics from one mask computation.
#[derive(Debug, Clone, Copy)]
pub struct MaskStats {
    /// Number of timestamps selected for sampling.
    pub requested: usize,
    /// Number of frames that decoded successfully.
    pub decoded: usize,
    /// Fraction of mask pixels set to 255, in `[0, 1]`.
    pub coverage: f32,
}

/// Result of processing a single video file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed video.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Whether the mask came out empty (no static watermark found).
    pub empty: bool,
    /// Fraction of mask pixels set to 255, in `[0, 1]`.
    pub coverage: f32,
    /// Human-readable status message.
    pub message: String,
}

/// The mask extraction engine.
///
/// Create once with [`MaskEngine::new()`] for the ffmpeg-backed source, or
/// with [`MaskEngine::with_source()`] to inject any [`FrameSource`], and
/// reuse across videos.
pub struct MaskEngine<S = FfmpegFrameSource> {
    source: S,
}

impl MaskEngine<FfmpegFrameSource> {
    /// Create an engine backed by the `ffprobe`/`ffmpeg` command-line tools.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: FfmpegFrameSource::new(),
        }
    }
}

impl Default for MaskEngine<FfmpegFrameSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: FrameSource> MaskEngine<S> {
    /// Create an engine over a custom frame source.
    pub fn with_source(source: S) -> Self {
        Self { source }
    }

    /// Compute the binary watermark mask for a video.
    ///
    /// Probes the video, selects up to `opts.max_samples` timestamps, decodes
    /// and accumulates each frame's gradients online (frames are dropped as
    /// soon as they have contributed), and builds the mask from the
    /// accumulated statistic. Per-timestamp decode failures are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] for an unusable video,
    /// [`Error::DimensionMismatch`] if sampled frames disagree on dimensions,
    /// and [`Error::InsufficientSamples`] if fewer than two frames decode.
    pub fn compute_mask(&self, video: &Path, opts: &ProcessOptions) -> Result<GrayImage> {
        self.compute_mask_with_stats(video, opts).map(|(m, _)| m)
    }

    /// [`compute_mask`](Self::compute_mask) plus sampling statistics.
    ///
    /// # Errors
    ///
    /// As [`compute_mask`](Self::compute_mask).
    pub fn compute_mask_with_stats(
        &self,
        video: &Path,
        opts: &ProcessOptions,
    ) -> Result<(GrayImage, MaskStats)> {
        let info = self.source.probe(video)?;
        let timestamps = sampling::select_timestamps(
            &info.keyframes,
            info.duration,
            opts.max_samples,
            opts.seed,
        )?;
        let requested = timestamps.len();

        let mut accumulator: Option<GradientAccumulator> = None;
        for &timestamp in &timestamps {
            let frame = match self.source.decode_frame(video, timestamp) {
                Ok(frame) => frame,
                Err(Error::Decode { .. }) => continue,
                Err(e) => return Err(e),
            };
            let acc = accumulator
                .get_or_insert_with(|| GradientAccumulator::new(frame.width(), frame.height()));
            acc.accumulate(&frame)?;
        }

        let accumulator = accumulator.ok_or(Error::InsufficientSamples { got: 0 })?;
        let decoded = accumulator.frames();
        let mean = accumulator.finish()?;

        let mask = mask::build_mask(&mean);
        let coverage = mask_coverage(&mask);

        Ok((
            mask,
            MaskStats {
                requested,
                decoded,
                coverage,
            },
        ))
    }

    /// Process a single video file: compute the mask and persist it.
    ///
    /// Returns a [`ProcessResult`] instead of an error so batch runs report
    /// per-file outcomes uniformly. An empty mask is a success: the video has
    /// no detectable static watermark, and downstream removal can be skipped.
    #[must_use]
    pub fn process_file(&self, input: &Path, output: &Path, opts: &ProcessOptions) -> ProcessResult {
        let mut result = ProcessResult {
            path: input.to_path_buf(),
            success: false,
            empty: false,
            coverage: 0.0,
            message: String::new(),
        };

        let (mask, stats) = match self.compute_mask_with_stats(input, opts) {
            Ok(computed) => computed,
            Err(e) => {
                result.message = e.to_string();
                return result;
            }
        };

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    result.message = format!("failed to create output directory: {e}");
                    return result;
                }
            }
        }

        if let Err(e) = save_mask(&mask, output) {
            result.message = format!("failed to save mask: {e}");
            return result;
        }

        result.success = true;
        result.coverage = stats.coverage;
        result.empty = stats.coverage == 0.0;
        result.message = if result.empty {
            format!(
                "no static watermark detected ({}/{} frames decoded)",
                stats.decoded, stats.requested
            )
        } else {
            format!(
                "mask written ({}/{} frames decoded, {:.1}% coverage)",
                stats.decoded,
                stats.requested,
                stats.coverage * 100.0
            )
        };
        result
    }

    /// Process every supported video in a directory, writing one mask per
    /// video into `output_dir`.
    ///
    /// Uses parallel iteration when the `cli` feature is enabled (via rayon).
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        opts: &ProcessOptions,
    ) -> Vec<ProcessResult>
    where
        S: Sync,
    {
        let failure = |path: &Path, message: String| ProcessResult {
            path: path.to_path_buf(),
            success: false,
            empty: false,
            coverage: 0.0,
            message,
        };

        let entries: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| is_supported_video(p))
                .collect(),
            Err(e) => {
                return vec![failure(input_dir, format!("failed to read directory: {e}"))];
            }
        };

        if !output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(output_dir) {
                return vec![failure(
                    output_dir,
                    format!("failed to create output directory: {e}"),
                )];
            }
        }

        let process = |input: &PathBuf| {
            let output = output_dir.join(mask_file_name(input));
            self.process_file(input, &output, opts)
        };

        #[cfg(feature = "cli")]
        {
            use rayon::prelude::*;
            entries.par_iter().map(process).collect()
        }

        #[cfg(not(feature = "cli"))]
        {
            entries.iter().map(process).collect()
        }
    }
}

/// Fraction of mask pixels set to 255.
fn mask_coverage(mask: &GrayImage) -> f32 {
    let set = mask.pixels().filter(|p| p[0] == 255).count();
    #[allow(clippy::cast_precision_loss)]
    {
        set as f32 / mask.pixels().len().max(1) as f32
    }
}

/// Check if a file has a supported video extension.
#[must_use]
pub fn is_supported_video(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "mp4" | "mkv" | "mov" | "avi" | "webm" | "m4v"
        ),
        None => false,
    }
}

/// Mask file name derived from a video path: `"clip.mp4"` maps to
/// `"clip_mask.png"`.
fn mask_file_name(input: &Path) -> String {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    format!("{stem}_mask.png")
}

/// Generate a default mask output path next to the input video.
///
/// Example: `"videos/clip.mp4"` becomes `"videos/clip_mask.png"`.
#[must_use]
pub fn default_mask_path(input: &Path) -> PathBuf {
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(mask_file_name(input))
}

/// Save a mask as a standard single-channel image file.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_mask(mask: &GrayImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    match format {
        ImageFormat::Png | ImageFormat::Bmp => {
            mask.save(path)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}
