//! Endpoint sweep sequence used to listen for buzzing at the extremes.

use super::pulse::clamp_angle;
use crate::error::{Error, Result};

/// Longest ramp (points from `low` to `high`) a sweep may generate.
pub const MAX_SWEEP_POINTS: usize = 10_000;

/// Targets for a sweep: up from `low` to `high`, then back down to `low`.
///
/// Both bounds are clamped to 0–180° and swapped if given in reverse.  The
/// top is visited once and both ends are always included even when the span
/// is not a multiple of `step`.  A step so small that the ramp would exceed
/// [`MAX_SWEEP_POINTS`] is rejected.
pub fn sweep_sequence(low: f64, high: f64, step: f64) -> Result<Vec<f64>> {
    if !step.is_finite() || step <= 0.0 {
        return Err(Error::InvalidArgument("sweep step must be a positive number"));
    }
    if low.is_nan() || high.is_nan() {
        return Err(Error::InvalidArgument("sweep bounds must be numbers"));
    }
    let (mut low, mut high) = (clamp_angle(low), clamp_angle(high));
    if low > high {
        core::mem::swap(&mut low, &mut high);
    }

    let intervals = ((high - low) / step).floor();
    if intervals >= MAX_SWEEP_POINTS as f64 {
        return Err(Error::InvalidArgument("sweep step too small for the range"));
    }
    let intervals = intervals as usize;

    // Points are computed from `low`, not accumulated, so they do not drift.
    let mut up: Vec<f64> = (0..=intervals)
        .map(|i| (low + i as f64 * step).min(high))
        .collect();
    if up.last() != Some(&high) {
        up.push(high);
    }

    let mut seq = up.clone();
    seq.extend(up.iter().rev().skip(1));
    Ok(seq)
}
