//! Per-frame gradients and their cross-frame accumulation.
//!
//! Each decoded frame contributes a pair of signed directional derivative
//! planes computed on channel-averaged intensity. The accumulator keeps a
//! running elementwise mean of the *signed* values and takes the absolute
//! value only at finalization. The ordering matters: a static overlay
//! produces the same-signed gradient at its edges in every frame and survives
//! the mean, while scene content flips sign frame to frame and cancels toward
//! zero. Taking absolute values per frame would keep every edge ever seen and
//! reduce the whole pipeline to ordinary edge detection.

use image::RgbImage;

use crate::error::{Error, Result};

/// Signed directional derivatives of one frame's intensity.
///
/// Transient: derived per frame, consumed by [`GradientAccumulator::accumulate`],
/// not retained.
pub struct GradientField {
    /// Derivative along the x axis, row-major, `width * height` values.
    pub horizontal: Vec<f32>,
    /// Derivative along the y axis, row-major, `width * height` values.
    pub vertical: Vec<f32>,
}

/// Absolute elementwise mean gradient across all accumulated frames.
pub struct MeanGradient {
    /// Absolute mean derivative along the x axis, row-major.
    pub horizontal: Vec<f32>,
    /// Absolute mean derivative along the y axis, row-major.
    pub vertical: Vec<f32>,
    /// Plane width in pixels.
    pub width: u32,
    /// Plane height in pixels.
    pub height: u32,
}

/// Channel-averaged intensity plane of a frame.
fn intensity_plane(frame: &RgbImage) -> Vec<f32> {
    frame
        .pixels()
        .map(|px| (f32::from(px[0]) + f32::from(px[1]) + f32::from(px[2])) / 3.0)
        .collect()
}

/// Discrete derivative along x: central differences in the interior,
/// one-sided differences at the borders. Degenerate widths yield zeros.
fn horizontal_gradient(plane: &[f32], width: usize, height: usize) -> Vec<f32> {
    let mut out = vec![0.0_f32; plane.len()];
    if width < 2 {
        return out;
    }
    for y in 0..height {
        let row = y * width;
        out[row] = plane[row + 1] - plane[row];
        out[row + width - 1] = plane[row + width - 1] - plane[row + width - 2];
        for x in 1..width - 1 {
            out[row + x] = (plane[row + x + 1] - plane[row + x - 1]) / 2.0;
        }
    }
    out
}

/// Discrete derivative along y, same scheme as [`horizontal_gradient`].
fn vertical_gradient(plane: &[f32], width: usize, height: usize) -> Vec<f32> {
    let mut out = vec![0.0_f32; plane.len()];
    if height < 2 {
        return out;
    }
    for x in 0..width {
        out[x] = plane[width + x] - plane[x];
        out[(height - 1) * width + x] =
            plane[(height - 1) * width + x] - plane[(height - 2) * width + x];
        for y in 1..height - 1 {
            out[y * width + x] = (plane[(y + 1) * width + x] - plane[(y - 1) * width + x]) / 2.0;
        }
    }
    out
}

/// Compute the signed gradient pair for one frame.
#[must_use]
pub fn gradient_field(frame: &RgbImage) -> GradientField {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let plane = intensity_plane(frame);
    GradientField {
        horizontal: horizontal_gradient(&plane, width, height),
        vertical: vertical_gradient(&plane, width, height),
    }
}

/// Running elementwise mean of signed gradients across frames.
///
/// Holds `O(width * height)` state regardless of how many frames contribute;
/// each frame is dropped by the caller after [`accumulate`](Self::accumulate)
/// returns.
pub struct GradientAccumulator {
    sum_horizontal: Vec<f64>,
    sum_vertical: Vec<f64>,
    width: u32,
    height: u32,
    frames: usize,
}

impl GradientAccumulator {
    /// Create an accumulator for frames of the given dimensions.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            sum_horizontal: vec![0.0; len],
            sum_vertical: vec![0.0; len],
            width,
            height,
            frames: 0,
        }
    }

    /// Number of frames accumulated so far.
    #[must_use]
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Add one frame's gradient pair to the running sums.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the frame's dimensions differ
    /// from the accumulator's.
    pub fn accumulate(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(Error::DimensionMismatch {
                expected_width: self.width,
                expected_height: self.height,
                got_width: frame.width(),
                got_height: frame.height(),
            });
        }

        let field = gradient_field(frame);
        for (sum, value) in self.sum_horizontal.iter_mut().zip(&field.horizontal) {
            *sum += f64::from(*value);
        }
        for (sum, value) in self.sum_vertical.iter_mut().zip(&field.vertical) {
            *sum += f64::from(*value);
        }
        self.frames += 1;
        Ok(())
    }

    /// Finalize into the absolute elementwise mean gradient.
    ///
    /// The division by the frame count happens on the signed sums; the
    /// absolute value is applied after, never before.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientSamples`] if fewer than two frames were
    /// accumulated.
    pub fn finish(self) -> Result<MeanGradient> {
        if self.frames < 2 {
            return Err(Error::InsufficientSamples { got: self.frames });
        }

        #[allow(clippy::cast_precision_loss)]
        let count = self.frames as f64;
        #[allow(clippy::cast_possible_truncation)]
        let mean = |sums: Vec<f64>| -> Vec<f32> {
            sums.into_iter().map(|s| (s / count).abs() as f32).collect()
        };

        Ok(MeanGradient {
            horizontal: mean(self.sum_horizontal),
            vertical: mean(self.sum_vertical),
            width: self.width,
            height: self.height,
        })
    }
}
