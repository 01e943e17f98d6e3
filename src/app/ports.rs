//! Port traits: the boundary between the motion core and PWM hardware.
//!
//! ```text
//!   PwmBackend ──open──▶ PwmChannel ──▶ MotionController (domain)
//! ```
//!
//! Backends (sysfs, simulation, embedded-hal wrappers, test mocks)
//! implement these traits.  The controller only ever sees boxed
//! [`PwmChannel`]s, so the core never touches hardware directly.

use crate::error::DriverError;

// ───────────────────────────────────────────────────────────────
// PWM channel (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// One running PWM output.
///
/// Writes come from the control-loop thread; the channel is moved there
/// behind a mutex, hence `Send`.
pub trait PwmChannel: Send {
    /// Set the duty cycle in percent of the PWM period (0–100).
    fn write_duty(&mut self, duty_percent: f64) -> Result<(), DriverError>;

    /// Stop the output and give the channel back to the system.
    ///
    /// Best effort: failures are logged by the implementation, never
    /// returned.  Must be safe to call more than once.
    fn release(&mut self);
}

// ───────────────────────────────────────────────────────────────
// PWM backend (driven adapter: opens channels on a controller)
// ───────────────────────────────────────────────────────────────

/// Opens PWM outputs on a specific controller (a `pwmchipN` on Linux).
pub trait PwmBackend {
    /// Start `channel` on `controller` at `freq_hz` with an initial duty.
    ///
    /// Return an error rather than a half-configured channel: the caller
    /// falls back to the next candidate controller.
    fn open(
        &mut self,
        controller: u32,
        channel: u32,
        freq_hz: f64,
        initial_duty_percent: f64,
    ) -> Result<Box<dyn PwmChannel>, DriverError>;
}
