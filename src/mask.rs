//! Mask construction from the accumulated gradient statistic.
//!
//! The absolute mean gradient planes are thresholded into a boolean salience
//! field, smoothed with an isotropic Gaussian to merge fragmented edge
//! responses and absorb minor misalignment across samples, min-max normalized,
//! and binarized into a `{0, 255}` single-channel mask.
//!
//! The smoothing is an explicit separable convolution rather than a library
//! call, so the kernel support and border handling are pinned down here
//! instead of varying with a numeric backend.

use image::{GrayImage, Luma};

use crate::gradient::MeanGradient;

/// Salience threshold on the absolute mean gradient (0-255 intensity scale).
///
/// Fixed constant with no documented derivation in the detector's lineage; it
/// interacts with the mean-before-abs accumulation and is not independently
/// tunable.
const GRADIENT_THRESHOLD: f32 = 10.0;

/// Standard deviation of the Gaussian smoothing pass.
const SMOOTHING_SIGMA: f32 = 3.0;

/// Cutoff on the normalized smoothed field for the final binarization.
const MASK_CUTOFF: f32 = 0.2;

/// Normalized 1D Gaussian kernel with support `round(4 * sigma)` per side.
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let radius = (4.0 * sigma + 0.5) as usize;
    let two_sigma_sq = 2.0 * sigma * sigma;

    #[allow(clippy::cast_precision_loss)]
    let mut kernel: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let d = i as f32 - radius as f32;
            (-d * d / two_sigma_sq).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Fold an out-of-range index back into `0..n` by mirroring at the borders.
fn reflect(mut i: isize, n: isize) -> usize {
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= n {
            i = 2 * n - 1 - i;
        } else {
            #[allow(clippy::cast_sign_loss)]
            return i as usize;
        }
    }
}

/// Isotropic Gaussian smoothing as two separable 1D passes with reflected
/// borders.
fn gaussian_smooth(field: &[f32], width: usize, height: usize, sigma: f32) -> Vec<f32> {
    let kernel = gaussian_kernel(sigma);
    #[allow(clippy::cast_possible_wrap)]
    let radius = (kernel.len() / 2) as isize;

    #[allow(clippy::cast_possible_wrap)]
    let (w, h) = (width as isize, height as isize);

    // Horizontal pass.
    let mut rows = vec![0.0_f32; field.len()];
    for y in 0..height {
        let row = y * width;
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                #[allow(clippy::cast_possible_wrap)]
                let sx = reflect(x + k as isize - radius, w);
                acc += field[row + sx] * weight;
            }
            #[allow(clippy::cast_sign_loss)]
            {
                rows[row + x as usize] = acc;
            }
        }
    }

    // Vertical pass.
    let mut out = vec![0.0_f32; field.len()];
    for y in 0..h {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                #[allow(clippy::cast_possible_wrap)]
                let sy = reflect(y + k as isize - radius, h);
                acc += rows[sy * width + x] * weight;
            }
            #[allow(clippy::cast_sign_loss)]
            {
                out[y as usize * width + x] = acc;
            }
        }
    }

    out
}

/// Min-max normalize a field into `[0, 1]` in place.
///
/// A uniform field (max equals min) normalizes to all zeros: the valid
/// "no watermark detected" outcome, not a failure.
fn normalize(field: &mut [f32]) {
    let min = field.iter().copied().fold(f32::INFINITY, f32::min);
    let max = field.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    if field.is_empty() || max - min == 0.0 {
        field.fill(0.0);
        return;
    }

    let range = max - min;
    for v in field.iter_mut() {
        *v = (*v - min) / range;
    }
}

/// Build the binary watermark mask from the absolute mean gradient.
///
/// The returned mask has the same dimensions as the sampled frames and every
/// pixel is exactly 0 or 255. An all-zero mask means no static overlay was
/// found.
#[must_use]
pub fn build_mask(gradient: &MeanGradient) -> GrayImage {
    let salient: Vec<f32> = gradient
        .horizontal
        .iter()
        .zip(&gradient.vertical)
        .map(|(h, v)| {
            if *h > GRADIENT_THRESHOLD || *v > GRADIENT_THRESHOLD {
                1.0
            } else {
                0.0
            }
        })
        .collect();

    let width = gradient.width as usize;
    let height = gradient.height as usize;

    let mut field = gaussian_smooth(&salient, width, height, SMOOTHING_SIGMA);
    normalize(&mut field);

    GrayImage::from_fn(gradient.width, gradient.height, |x, y| {
        let value = field[y as usize * width + x as usize];
        Luma([if value > MASK_CUTOFF { 255 } else { 0 }])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean_gradient(width: u32, height: u32, horizontal: Vec<f32>) -> MeanGradient {
        let len = width as usize * height as usize;
        assert_eq!(horizontal.len(), len);
        MeanGradient {
            horizontal,
            vertical: vec![0.0; len],
            width,
            height,
        }
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(3.0);
        assert_eq!(kernel.len(), 25, "radius round(4*3) = 12 gives 25 taps");

        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5, "kernel must sum to 1, got {sum}");

        for i in 0..kernel.len() / 2 {
            let j = kernel.len() - 1 - i;
            assert!((kernel[i] - kernel[j]).abs() < 1e-7);
        }
    }

    #[test]
    fn smoothing_preserves_a_constant_field() {
        let field = vec![0.7_f32; 20 * 15];
        let smoothed = gaussian_smooth(&field, 20, 15, 3.0);
        for &v in &smoothed {
            assert!((v - 0.7).abs() < 1e-4, "reflected borders leak mass: {v}");
        }
    }

    #[test]
    fn smoothing_spreads_an_impulse_symmetrically() {
        let mut field = vec![0.0_f32; 31 * 31];
        field[15 * 31 + 15] = 1.0;
        let smoothed = gaussian_smooth(&field, 31, 31, 3.0);

        let total: f32 = smoothed.iter().sum();
        assert!((total - 1.0).abs() < 1e-4, "mass must be preserved: {total}");

        assert!((smoothed[15 * 31 + 10] - smoothed[15 * 31 + 20]).abs() < 1e-6);
        assert!((smoothed[10 * 31 + 15] - smoothed[20 * 31 + 15]).abs() < 1e-6);
        assert!(
            smoothed[15 * 31 + 15] > smoothed[15 * 31 + 16],
            "peak must stay at the impulse"
        );
    }

    #[test]
    fn normalize_is_invariant_under_positive_affine_rescaling() {
        let base = vec![0.5_f32, 2.0, 3.5, 1.0, 9.0, 4.25];
        let mut a = base.clone();
        let mut b: Vec<f32> = base.iter().map(|v| 3.0 * v + 7.0).collect();

        normalize(&mut a);
        normalize(&mut b);

        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-5, "{x} != {y}");
        }
        assert!(a.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn normalize_maps_a_uniform_field_to_zero() {
        let mut field = vec![4.2_f32; 64];
        normalize(&mut field);
        assert!(field.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn uniform_gradient_below_threshold_gives_an_empty_mask() {
        let gradient = mean_gradient(16, 16, vec![4.0; 256]);
        let mask = build_mask(&gradient);
        assert!(mask.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn mask_values_are_strictly_binary() {
        let mut horizontal = vec![0.0_f32; 40 * 40];
        for x in 10..30 {
            horizontal[12 * 40 + x] = 50.0;
        }
        let mask = build_mask(&mean_gradient(40, 40, horizontal));
        assert_eq!(mask.dimensions(), (40, 40));
        assert!(mask.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert!(mask.pixels().any(|p| p[0] == 255));
    }

    #[test]
    fn rectangle_ring_fills_its_interior_and_leaves_far_pixels_clear() {
        // Salient perimeter of a 12x10 rectangle, the shape a solid static
        // overlay leaves in the mean gradient.
        let (width, height) = (64_u32, 64_u32);
        let mut horizontal = vec![0.0_f32; 64 * 64];
        for x in 20..=31_usize {
            horizontal[18 * 64 + x] = 60.0;
            horizontal[27 * 64 + x] = 60.0;
        }
        for y in 18..=27_usize {
            horizontal[y * 64 + 20] = 60.0;
            horizontal[y * 64 + 31] = 60.0;
        }

        let mask = build_mask(&mean_gradient(width, height, horizontal));

        assert_eq!(mask.get_pixel(25, 22)[0], 255, "interior must be filled");
        assert_eq!(mask.get_pixel(20, 18)[0], 255, "the ring itself is marked");
        assert_eq!(mask.get_pixel(5, 5)[0], 0, "far corner must stay clear");
        assert_eq!(mask.get_pixel(58, 58)[0], 0);
    }
}
