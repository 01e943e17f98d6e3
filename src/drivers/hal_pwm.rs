//! Axis output over any `embedded-hal` PWM pin.
//!
//! Lets a servo be driven by a HAL channel (an I²C PWM expander, a
//! microcontroller bridge, ...) instead of sysfs.  Duty percent is scaled
//! onto the channel's own `max_duty_cycle()` resolution.

use embedded_hal::pwm::SetDutyCycle;
use log::warn;

use crate::app::ports::PwmChannel;
use crate::error::DriverError;

pub struct HalPwmChannel<P> {
    pwm: Option<P>,
}

impl<P: SetDutyCycle> HalPwmChannel<P> {
    pub fn new(pwm: P) -> Self {
        Self { pwm: Some(pwm) }
    }

    /// Give back the underlying pin (`None` once released).
    pub fn into_inner(self) -> Option<P> {
        self.pwm
    }
}

impl<P: SetDutyCycle + Send> PwmChannel for HalPwmChannel<P> {
    fn write_duty(&mut self, duty_percent: f64) -> Result<(), DriverError> {
        let pwm = self.pwm.as_mut().ok_or(DriverError::Released)?;
        let max = f64::from(pwm.max_duty_cycle());
        let counts = (duty_percent.clamp(0.0, 100.0) / 100.0 * max).round() as u16;
        pwm.set_duty_cycle(counts).map_err(|e| {
            warn!("hal pwm: {e:?}");
            DriverError::WriteFailed {
                kind: std::io::ErrorKind::Other,
            }
        })
    }

    fn release(&mut self) {
        if let Some(mut pwm) = self.pwm.take() {
            if let Err(e) = pwm.set_duty_cycle_fully_off() {
                warn!("hal pwm: release failed: {e:?}");
            }
        }
    }
}
