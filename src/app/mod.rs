//! Application core: motion logic behind port traits.
//!
//! The [`service::MotionController`] owns the axes and the control loop.
//! PWM hardware is reached only through the traits in [`ports`], so the
//! whole core runs in tests against recording or simulated backends.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
