//! Inbound commands to the motion controller.
//!
//! One command per console line.  The verb is case-insensitive and the
//! arguments are whitespace separated; [`AppCommand::parse`] turns a line
//! into a command without touching the controller, so a rejected line
//! never changes state.

use crate::control::axis::AxisId;
use crate::error::CommandError;

/// Commands the console can send into the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppCommand {
    /// Print the command reference.
    Help,
    /// Print a status snapshot.
    Status,
    /// Both axes to 90°.
    Center,
    /// Absolute pan target (degrees).
    Pan(f64),
    /// Absolute tilt target (degrees).
    Tilt(f64),
    /// Relative move from the current position (degrees, signed).
    Step(AxisId, f64),
    /// Slew rate (°/s).
    Speed(f64),
    /// Pulse width for 0° (µs).
    MinPulse(f64),
    /// Pulse width for 180° (µs).
    MaxPulse(f64),
    /// Diagnostic sweep with the configured bounds.
    Sweep(AxisId),
    /// Shut down and leave.
    Quit,
}

impl AppCommand {
    /// Parse one console line.
    ///
    /// Blank lines give `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((verb, args)) = tokens.split_first() else {
            return Ok(None);
        };
        let unrecognized = || CommandError::Unrecognized(line.trim().to_string());

        let cmd = match (verb.to_ascii_lowercase().as_str(), args) {
            ("help", []) => Self::Help,
            ("status", []) => Self::Status,
            ("center", []) => Self::Center,
            ("quit" | "exit", []) => Self::Quit,
            ("pan", [deg]) => Self::Pan(number(deg)?),
            ("tilt", [deg]) => Self::Tilt(number(deg)?),
            ("step", [axis, delta]) => {
                let axis = parse_axis(axis).ok_or_else(unrecognized)?;
                Self::Step(axis, number(delta)?)
            }
            ("speed", [v]) => Self::Speed(number(v)?),
            ("min_us", [us]) => Self::MinPulse(number(us)?),
            ("max_us", [us]) => Self::MaxPulse(number(us)?),
            ("sweep", [axis]) => Self::Sweep(parse_axis(axis).ok_or_else(unrecognized)?),
            _ => return Err(unrecognized()),
        };
        Ok(Some(cmd))
    }
}

fn parse_axis(token: &str) -> Option<AxisId> {
    match token.to_ascii_lowercase().as_str() {
        "pan" => Some(AxisId::Pan),
        "tilt" => Some(AxisId::Tilt),
        _ => None,
    }
}

/// Finite `f64` only; `nan` and `inf` parse in Rust but are not angles.
fn number(token: &str) -> Result<f64, CommandError> {
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(CommandError::InvalidNumber(token.to_string())),
    }
}
