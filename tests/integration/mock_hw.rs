//! Mock PWM backend for integration tests.
//!
//! Records every open, duty write, and release so tests can assert on the
//! full output history without touching `/sys/class/pwm`.  Controllers
//! and channels can be told to fail.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use pantilt::app::ports::{PwmBackend, PwmChannel};
use pantilt::error::DriverError;

// ── PWM call record ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PwmCall {
    Open {
        controller: u32,
        channel: u32,
        freq_hz: f64,
        duty: f64,
    },
    Write {
        controller: u32,
        channel: u32,
        duty: f64,
    },
    Release {
        controller: u32,
        channel: u32,
    },
}

#[derive(Default)]
struct Recorder {
    calls: Vec<PwmCall>,
    dead_controllers: HashSet<u32>,
    failing_channels: HashSet<u32>,
}

// ── MockBackend ───────────────────────────────────────────────

/// Cloning shares the recorder, so a test keeps a handle after passing
/// the backend to the controller.
#[derive(Clone, Default)]
pub struct MockBackend {
    rec: Arc<Mutex<Recorder>>,
}

#[allow(dead_code)]
impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// `open` on this controller fails for every channel.
    pub fn kill_controller(&self, controller: u32) {
        self.rec.lock().dead_controllers.insert(controller);
    }

    /// Duty writes on this channel fail until switched back.
    pub fn fail_writes(&self, channel: u32, fail: bool) {
        let mut rec = self.rec.lock();
        if fail {
            rec.failing_channels.insert(channel);
        } else {
            rec.failing_channels.remove(&channel);
        }
    }

    pub fn calls(&self) -> Vec<PwmCall> {
        self.rec.lock().calls.clone()
    }

    /// Successful duty writes on `channel`, oldest first.
    pub fn writes(&self, channel: u32) -> Vec<f64> {
        self.rec
            .lock()
            .calls
            .iter()
            .filter_map(|c| match *c {
                PwmCall::Write {
                    channel: ch, duty, ..
                } if ch == channel => Some(duty),
                _ => None,
            })
            .collect()
    }

    pub fn last_write(&self, channel: u32) -> Option<f64> {
        self.writes(channel).last().copied()
    }

    pub fn released(&self, channel: u32) -> bool {
        self.rec
            .lock()
            .calls
            .iter()
            .any(|c| matches!(*c, PwmCall::Release { channel: ch, .. } if ch == channel))
    }
}

impl PwmBackend for MockBackend {
    fn open(
        &mut self,
        controller: u32,
        channel: u32,
        freq_hz: f64,
        initial_duty_percent: f64,
    ) -> Result<Box<dyn PwmChannel>, DriverError> {
        let mut rec = self.rec.lock();
        if rec.dead_controllers.contains(&controller) {
            return Err(DriverError::ControllerNotFound { controller });
        }
        rec.calls.push(PwmCall::Open {
            controller,
            channel,
            freq_hz,
            duty: initial_duty_percent,
        });
        Ok(Box::new(MockChannel {
            controller,
            channel,
            rec: Arc::clone(&self.rec),
        }))
    }
}

struct MockChannel {
    controller: u32,
    channel: u32,
    rec: Arc<Mutex<Recorder>>,
}

impl PwmChannel for MockChannel {
    fn write_duty(&mut self, duty_percent: f64) -> Result<(), DriverError> {
        let mut rec = self.rec.lock();
        if rec.failing_channels.contains(&self.channel) {
            return Err(DriverError::WriteFailed {
                kind: std::io::ErrorKind::BrokenPipe,
            });
        }
        rec.calls.push(PwmCall::Write {
            controller: self.controller,
            channel: self.channel,
            duty: duty_percent,
        });
        Ok(())
    }

    fn release(&mut self) {
        self.rec.lock().calls.push(PwmCall::Release {
            controller: self.controller,
            channel: self.channel,
        });
    }
}
