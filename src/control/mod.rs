//! Motion smoothing: pulse mapping, per-axis stepping, deadband, sweeps.
//!
//! Pure logic with no threads or I/O; the
//! [`MotionController`](crate::app::service::MotionController) drives it.

pub mod axis;
pub mod motion;
pub mod pulse;
pub mod sweep;
