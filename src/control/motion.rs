//! One control-loop step for one axis, with deadband filtering.

use super::axis::Axis;

/// Result of stepping one axis for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisStep {
    /// Position to commit, whether or not it is written.
    pub angle: f64,
    /// Whether the move is large enough to send to the PWM output.
    pub write: bool,
}

/// Step a snapshot of `axis` by at most `max_step` degrees.
///
/// The hardware write is suppressed unless the move exceeds `deadband`
/// degrees.  The returned angle must be committed either way or the
/// bookkeeping drifts away from the target.
pub fn plan_step(mut axis: Axis, max_step: f64, deadband: f64) -> AxisStep {
    let before = axis.current();
    let angle = axis.step_toward_target(max_step);
    AxisStep {
        angle,
        write: (angle - before).abs() > deadband,
    }
}
