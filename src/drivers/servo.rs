//! Servo output acquisition and writes.
//!
//! [`acquire`] walks the candidate PWM controllers in order and keeps the
//! first that starts.  The resulting [`AxisOutput`] is either connected or
//! not; a disconnected output swallows writes so the motion bookkeeping
//! carries on regardless.
//!
//! ## Locking
//!
//! The channel sits behind its own mutex, separate from the controller's
//! state lock, so a slow sysfs write never blocks setters or `status()`.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::app::ports::{PwmBackend, PwmChannel};
use crate::control::axis::AxisId;
use crate::control::pulse::{Calibration, angle_to_duty_percent};
use crate::error::DriverError;

/// Outcome of trying every candidate controller for one channel.
pub enum Acquisition {
    Connected {
        channel: Box<dyn PwmChannel>,
        controller: u32,
    },
    Disconnected(DriverError),
}

impl core::fmt::Debug for Acquisition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Connected { controller, .. } => f
                .debug_struct("Connected")
                .field("controller", controller)
                .finish_non_exhaustive(),
            Self::Disconnected(e) => f.debug_tuple("Disconnected").field(e).finish(),
        }
    }
}

/// Open `channel` on the first candidate controller that accepts it.
pub fn acquire(
    backend: &mut dyn PwmBackend,
    channel: u32,
    candidates: &[u32],
    freq_hz: f64,
    initial_duty_percent: f64,
) -> Acquisition {
    for &controller in candidates {
        match backend.open(controller, channel, freq_hz, initial_duty_percent) {
            Ok(ch) => {
                info!("PWM channel {channel} @ controller {controller}, {freq_hz} Hz");
                return Acquisition::Connected {
                    channel: ch,
                    controller,
                };
            }
            Err(e) => debug!("PWM channel {channel} @ controller {controller}: {e}"),
        }
    }
    warn!("PWM channel {channel} unavailable (tried controllers {candidates:?})");
    Acquisition::Disconnected(DriverError::Unavailable { channel })
}

/// The PWM output of one axis.
pub struct AxisOutput {
    axis: AxisId,
    freq_hz: f64,
    controller: Option<u32>,
    connected: AtomicBool,
    channel: Mutex<Option<Box<dyn PwmChannel>>>,
}

impl AxisOutput {
    pub fn new(axis: AxisId, freq_hz: f64, acquisition: Acquisition) -> Self {
        let (controller, channel) = match acquisition {
            Acquisition::Connected {
                channel,
                controller,
            } => (Some(controller), Some(channel)),
            Acquisition::Disconnected(e) => {
                warn!("{axis}: running without output ({e})");
                (None, None)
            }
        };
        Self {
            axis,
            freq_hz,
            controller,
            connected: AtomicBool::new(channel.is_some()),
            channel: Mutex::new(channel),
        }
    }

    /// Controller the output was acquired on, if any.
    pub fn controller(&self) -> Option<u32> {
        self.controller
    }

    /// True while a channel is held (acquired and not yet released).
    ///
    /// Lock-free, so `status()` never waits behind an in-flight write.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Drive the servo to `angle`.
    ///
    /// A disconnected output is a silent no-op.  A failed write is logged
    /// and dropped; the next tick simply tries again with a fresh angle.
    pub fn write_angle(&self, angle: f64, cal: &Calibration) {
        let mut guard = self.channel.lock();
        let Some(channel) = guard.as_mut() else {
            return;
        };
        let duty = match angle_to_duty_percent(angle, cal, self.freq_hz) {
            Ok(d) => d,
            Err(e) => {
                warn!("{}: {e}", self.axis);
                return;
            }
        };
        if let Err(e) = channel.write_duty(duty) {
            warn!("{}: write of {duty:.3}% failed: {e}", self.axis);
        }
    }

    /// Stop and hand back the channel.  Idempotent.
    pub fn release(&self) {
        if let Some(mut channel) = self.channel.lock().take() {
            self.connected.store(false, Ordering::Release);
            channel.release();
            info!("{}: output released", self.axis);
        }
    }
}
