//! Locate static video watermarks via cross-frame gradient statistics.
//!
//! A static overlay (logo/watermark) keeps the same edges at the same pixels
//! in every frame, while the scene behind it changes. This crate samples a
//! bounded, deterministic set of frames from a video, averages their *signed*
//! intensity gradients, and takes the absolute value of the mean: overlay
//! edges survive the averaging, scene edges cancel. Thresholding, Gaussian
//! smoothing, and binarization turn the surviving response into a `{0, 255}`
//! mask suitable for an external logo-removal/inpainting filter (for example
//! ffmpeg's `removelogo`).
//!
//! Frame decoding is delegated to an external collaborator behind the
//! [`FrameSource`] trait; [`FfmpegFrameSource`] shells out to
//! `ffprobe`/`ffmpeg`.
//!
//! # Quick Start
//!
//! ```no_run
//! use video_watermark_mask::{MaskEngine, ProcessOptions, save_mask};
//!
//! let engine = MaskEngine::new();
//! let mask = engine
//!     .compute_mask("clip.mp4".as_ref(), &ProcessOptions::default())
//!     .expect("mask extraction failed");
//! save_mask(&mask, "clip_mask.png".as_ref()).expect("failed to save mask");
//! ```
//!
//! An all-zero mask is a valid outcome: the video has no detectable static
//! watermark. Masks are only ever computed from a consistent sample of at
//! least two successfully decoded frames; anything less is an error, never a
//! degraded result.

#![deny(missing_docs)]

pub mod engine;
pub mod error;
pub mod gradient;
pub mod mask;
pub mod media;
pub mod sampling;

pub use engine::{
    default_mask_path, is_supported_video, save_mask, MaskEngine, MaskStats, ProcessOptions,
    ProcessResult,
};
pub use error::{Error, Result};
pub use media::{FfmpegFrameSource, FrameSource, MediaInfo};
