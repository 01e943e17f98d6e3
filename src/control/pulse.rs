//! Angle → pulse width → duty cycle mapping for hobby servos.
//!
//! The servo reads the width of the high pulse in each PWM frame; 0° and
//! 180° sit at the two calibration bounds and everything in between is
//! linear.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lowest commandable angle (degrees).
pub const MIN_ANGLE_DEG: f64 = 0.0;
/// Highest commandable angle (degrees).
pub const MAX_ANGLE_DEG: f64 = 180.0;

/// Pulse-width bounds of one servo.
///
/// Bounds are not cross-checked here: an inverted pair (`min > max`)
/// simply maps 0° to the larger pulse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub min_pulse_us: f64,
    pub max_pulse_us: f64,
}

impl Calibration {
    pub const fn new(min_pulse_us: f64, max_pulse_us: f64) -> Self {
        Self {
            min_pulse_us,
            max_pulse_us,
        }
    }

    pub fn is_inverted(&self) -> bool {
        self.min_pulse_us > self.max_pulse_us
    }
}

/// Clamp an angle into the servo's mechanical range.
pub fn clamp_angle(angle: f64) -> f64 {
    angle.clamp(MIN_ANGLE_DEG, MAX_ANGLE_DEG)
}

/// Pulse width (µs) for `angle`, clamped to 0–180° first.
pub fn angle_to_pulse(angle: f64, cal: &Calibration) -> f64 {
    let a = clamp_angle(angle);
    cal.min_pulse_us + (a / MAX_ANGLE_DEG) * (cal.max_pulse_us - cal.min_pulse_us)
}

/// Duty cycle (percent of the PWM period) for a pulse width at `freq_hz`.
pub fn pulse_to_duty_percent(pulse_us: f64, freq_hz: f64) -> Result<f64> {
    if !freq_hz.is_finite() || freq_hz <= 0.0 {
        return Err(Error::InvalidFrequency(freq_hz));
    }
    let period_us = 1_000_000.0 / freq_hz;
    Ok((pulse_us / period_us) * 100.0)
}

/// Convenience: duty cycle for an angle.
pub fn angle_to_duty_percent(angle: f64, cal: &Calibration, freq_hz: f64) -> Result<f64> {
    pulse_to_duty_percent(angle_to_pulse(angle, cal), freq_hz)
}
