//! Outbound snapshots of the controller.
//!
//! The [`MotionController`](super::service::MotionController) hands these
//! out from `status()`.  Adapters on the other side decide what to do with
//! them: print to the console, log, serialise.

use core::fmt;

use serde::Serialize;

use crate::control::pulse::Calibration;

/// Lifecycle of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControllerState {
    Running,
    Stopped,
}

/// Output side of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisStatus {
    /// Committed position (degrees).
    pub angle: f64,
    /// Requested position (degrees).
    pub target: f64,
    /// Holding a PWM channel right now.
    pub connected: bool,
    /// Controller the channel was acquired on.
    pub controller: Option<u32>,
}

/// A point-in-time snapshot, read under the controller lock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Status {
    pub state: ControllerState,
    pub pan: AxisStatus,
    pub tilt: AxisStatus,
    pub speed_deg_per_s: f64,
    /// Pan and tilt share one calibration update path; pan's is reported.
    pub calibration: Calibration,
}

impl fmt::Display for AxisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}\u{00b0} (target {:.1}\u{00b0}, ", self.angle, self.target)?;
        match (self.connected, self.controller) {
            (true, Some(chip)) => write!(f, "pwmchip{chip})"),
            (false, Some(chip)) => write!(f, "pwmchip{chip}, released)"),
            (_, None) => write!(f, "no output)"),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "state : {:?}", self.state)?;
        writeln!(f, "pan   : {}", self.pan)?;
        writeln!(f, "tilt  : {}", self.tilt)?;
        writeln!(f, "speed : {:.0}\u{00b0}/s", self.speed_deg_per_s)?;
        write!(
            f,
            "pulse : {:.0}..{:.0} us",
            self.calibration.min_pulse_us, self.calibration.max_pulse_us
        )
    }
}
