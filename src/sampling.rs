//! Deterministic selection of sample timestamps.
//!
//! Mask extraction works on a bounded sample of decoded frames. Keyframes are
//! preferred because they are cheap to seek to; when the container exposes
//! none, sampling falls back to a uniform time grid over the duration.
//!
//! Selection is randomized but reproducible: the shuffle runs on an explicit
//! seeded generator, so the same video and seed always yield the same sample
//! set. Downstream statistics (and therefore the final mask) depend on which
//! frames are sampled, so this is a correctness requirement, not a nicety.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Error, Result};

/// Default shuffle seed for keyframe sampling.
pub const DEFAULT_SEED: u64 = 42;

/// Default cap on the number of sampled frames.
pub const DEFAULT_MAX_SAMPLES: usize = 50;

/// Select up to `max_count` timestamps (in seconds) to sample from a video.
///
/// With a non-empty `keyframes` list: non-finite entries are dropped, the
/// rest are sorted and deduplicated, shuffled with a generator seeded from
/// `seed`, and truncated to `max_count`.
///
/// With no usable keyframes: a uniform grid of `max_count` points spaced
/// across `duration`, excluding `t = 0`. The grid includes the endpoint; a
/// decode failure at the exact end of the stream is absorbed downstream like
/// any other skipped sample.
///
/// # Errors
///
/// Returns [`Error::Input`] if there are no usable keyframes and the duration
/// is unknown or non-positive.
pub fn select_timestamps(
    keyframes: &[f64],
    duration: Option<f64>,
    max_count: usize,
    seed: u64,
) -> Result<Vec<f64>> {
    let mut times: Vec<f64> = keyframes.iter().copied().filter(|t| t.is_finite()).collect();

    if !times.is_empty() {
        times.sort_by(f64::total_cmp);
        times.dedup();

        let mut rng = StdRng::seed_from_u64(seed);
        times.shuffle(&mut rng);
        times.truncate(max_count);
        return Ok(times);
    }

    match duration {
        Some(d) if d > 0.0 => {
            #[allow(clippy::cast_precision_loss)]
            let step = d / max_count as f64;
            #[allow(clippy::cast_precision_loss)]
            let grid: Vec<f64> = (1..=max_count).map(|i| i as f64 * step).collect();
            Ok(grid)
        }
        Some(d) => Err(Error::Input(format!(
            "non-positive duration {d} and no keyframes"
        ))),
        None => Err(Error::Input(
            "unknown duration and no keyframes".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_gives_identical_selection() {
        let keyframes: Vec<f64> = (0..200).map(f64::from).collect();
        let a = select_timestamps(&keyframes, None, 50, DEFAULT_SEED).unwrap();
        let b = select_timestamps(&keyframes, None, 50, DEFAULT_SEED).unwrap();
        assert_eq!(a, b, "Repeated runs with one seed must match exactly");
    }

    #[test]
    fn different_seeds_give_different_selection() {
        let keyframes: Vec<f64> = (0..200).map(f64::from).collect();
        let a = select_timestamps(&keyframes, None, 50, 1).unwrap();
        let b = select_timestamps(&keyframes, None, 50, 2).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn keyframes_are_deduplicated_and_capped() {
        let keyframes = vec![3.0, 1.0, 2.0, 1.0, 3.0, 2.0];
        let selected = select_timestamps(&keyframes, None, 2, DEFAULT_SEED).unwrap();
        assert_eq!(selected.len(), 2);
        for t in &selected {
            assert!([1.0, 2.0, 3.0].contains(t));
        }
        assert_ne!(selected[0], selected[1], "Duplicates must not survive");
    }

    #[test]
    fn short_keyframe_list_is_returned_whole() {
        let keyframes = vec![5.0, 10.0, 15.0];
        let mut selected = select_timestamps(&keyframes, None, 50, DEFAULT_SEED).unwrap();
        selected.sort_by(f64::total_cmp);
        assert_eq!(selected, vec![5.0, 10.0, 15.0]);
    }

    #[test]
    fn non_finite_keyframes_are_dropped() {
        let keyframes = vec![f64::NAN, 2.0, f64::INFINITY, 4.0];
        let mut selected = select_timestamps(&keyframes, None, 50, DEFAULT_SEED).unwrap();
        selected.sort_by(f64::total_cmp);
        assert_eq!(selected, vec![2.0, 4.0]);
    }

    #[test]
    fn fallback_grid_spans_duration_and_excludes_zero() {
        let selected = select_timestamps(&[], Some(100.0), 10, DEFAULT_SEED).unwrap();
        assert_eq!(selected.len(), 10);
        assert!(selected.iter().all(|&t| t > 0.0), "Grid must exclude t=0");
        assert!((selected[0] - 10.0).abs() < 1e-9);
        assert!((selected[9] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_duration_without_keyframes_is_an_input_error() {
        let result = select_timestamps(&[], None, 10, DEFAULT_SEED);
        assert!(matches!(result, Err(Error::Input(_))));
    }

    #[test]
    fn non_positive_duration_without_keyframes_is_an_input_error() {
        assert!(matches!(
            select_timestamps(&[], Some(0.0), 10, DEFAULT_SEED),
            Err(Error::Input(_))
        ));
        assert!(matches!(
            select_timestamps(&[], Some(-3.0), 10, DEFAULT_SEED),
            Err(Error::Input(_))
        ));
    }
}
