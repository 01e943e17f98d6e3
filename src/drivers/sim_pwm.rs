//! In-memory PWM backend for running the tuner without PWM hardware.
//!
//! Every controller accepts every channel.  Duty writes are kept in a
//! shared table and traced to the log, mirroring what a real output would
//! be doing.

use std::collections::HashMap;
use std::sync::Arc;

use log::{info, trace};
use parking_lot::Mutex;

use crate::app::ports::{PwmBackend, PwmChannel};
use crate::error::DriverError;

/// Last known state of one simulated output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimOutput {
    pub freq_hz: f64,
    pub duty_percent: f64,
    pub enabled: bool,
    pub writes: u64,
}

type Table = Arc<Mutex<HashMap<(u32, u32), SimOutput>>>;

#[derive(Default, Clone)]
pub struct SimBackend {
    outputs: Table,
}

impl SimBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of `pwmchip{controller}/pwm{channel}`, if it was ever opened.
    pub fn output(&self, controller: u32, channel: u32) -> Option<SimOutput> {
        self.outputs.lock().get(&(controller, channel)).copied()
    }
}

impl PwmBackend for SimBackend {
    fn open(
        &mut self,
        controller: u32,
        channel: u32,
        freq_hz: f64,
        initial_duty_percent: f64,
    ) -> Result<Box<dyn PwmChannel>, DriverError> {
        self.outputs.lock().insert(
            (controller, channel),
            SimOutput {
                freq_hz,
                duty_percent: initial_duty_percent,
                enabled: true,
                writes: 0,
            },
        );
        info!("sim: pwmchip{controller}/pwm{channel} started at {initial_duty_percent:.3}%");
        Ok(Box::new(SimChannel {
            key: (controller, channel),
            outputs: Arc::clone(&self.outputs),
        }))
    }
}

struct SimChannel {
    key: (u32, u32),
    outputs: Table,
}

impl PwmChannel for SimChannel {
    fn write_duty(&mut self, duty_percent: f64) -> Result<(), DriverError> {
        let mut outputs = self.outputs.lock();
        let out = outputs.get_mut(&self.key).ok_or(DriverError::Released)?;
        if !out.enabled {
            return Err(DriverError::Released);
        }
        out.duty_percent = duty_percent.clamp(0.0, 100.0);
        out.writes += 1;
        trace!("sim: pwm{} duty={:.3}%", self.key.1, out.duty_percent);
        Ok(())
    }

    fn release(&mut self) {
        if let Some(out) = self.outputs.lock().get_mut(&self.key) {
            out.enabled = false;
        }
    }
}
