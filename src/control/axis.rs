//! Per-axis motion bookkeeping.
//!
//! An [`Axis`] holds where the servo is (as far as the controller knows),
//! where it should go, and how to turn an angle into a pulse.  It is plain
//! `Copy` data: the control loop snapshots it under the lock, steps the
//! copy, and commits only the new `current` angle back.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::pulse::{Calibration, clamp_angle};

/// Which physical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisId {
    Pan,
    Tilt,
}

impl AxisId {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pan => "pan",
            Self::Tilt => "tilt",
        }
    }
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axis {
    current: f64,
    target: f64,
    calibration: Calibration,
    target_epsilon: f64,
}

impl Axis {
    /// Axis at rest at `angle` (clamped).
    pub fn new(angle: f64, calibration: Calibration, target_epsilon: f64) -> Self {
        let a = clamp_angle(angle);
        Self {
            current: a,
            target: a,
            calibration,
            target_epsilon,
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Set a new target (clamped to 0–180°).
    ///
    /// Returns `false` and leaves the target untouched when the request is
    /// not a number or the raw, unclamped request is within the target
    /// epsilon of the existing target.  An out-of-range request near an
    /// end stop therefore still moves the target onto the stop.
    pub fn set_target(&mut self, angle: f64) -> bool {
        if angle.is_nan() || (angle - self.target).abs() < self.target_epsilon {
            return false;
        }
        self.target = clamp_angle(angle);
        true
    }

    /// Advance `current` toward `target` by at most `max_step` and return it.
    ///
    /// The final step lands exactly on the target; it never overshoots.
    pub fn step_toward_target(&mut self, max_step: f64) -> f64 {
        let delta = self.target - self.current;
        if delta.abs() <= max_step {
            self.current = self.target;
        } else {
            self.current += max_step.copysign(delta);
        }
        self.current
    }

    /// Commit a position computed from a snapshot of this axis.
    pub fn commit(&mut self, angle: f64) {
        self.current = clamp_angle(angle);
    }

    /// Partial calibration update; only the supplied bounds change.
    pub fn set_calibration(&mut self, min_pulse_us: Option<f64>, max_pulse_us: Option<f64>) {
        if let Some(us) = min_pulse_us {
            self.calibration.min_pulse_us = us;
        }
        if let Some(us) = max_pulse_us {
            self.calibration.max_pulse_us = us;
        }
    }
}
