//! Linux kernel hardware PWM through sysfs.
//!
//! Layout of the PWM class (`Documentation/ABI/testing/sysfs-class-pwm`):
//!
//! ```text
//! /sys/class/pwm/pwmchipN/export        write M to create pwmM/
//! /sys/class/pwm/pwmchipN/unexport
//! /sys/class/pwm/pwmchipN/pwmM/period      nanoseconds
//! /sys/class/pwm/pwmchipN/pwmM/duty_cycle  nanoseconds, <= period
//! /sys/class/pwm/pwmchipN/pwmM/enable      0 | 1
//! ```
//!
//! On the Pi 5 the header pins need `dtoverlay=pwm-2chan` in
//! `config.txt` before the channels exist.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::app::ports::{PwmBackend, PwmChannel};
use crate::error::DriverError;

const EXPORT_POLL: Duration = Duration::from_millis(10);

/// Opens channels under a sysfs PWM root (normally `/sys/class/pwm`).
pub struct SysfsBackend {
    root: PathBuf,
    export_timeout: Duration,
}

impl SysfsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            export_timeout: Duration::from_millis(500),
        }
    }

    /// How long to wait for udev to create `pwmM/` after an export.
    pub fn with_export_timeout(mut self, timeout: Duration) -> Self {
        self.export_timeout = timeout;
        self
    }
}

impl PwmBackend for SysfsBackend {
    fn open(
        &mut self,
        controller: u32,
        channel: u32,
        freq_hz: f64,
        initial_duty_percent: f64,
    ) -> Result<Box<dyn PwmChannel>, DriverError> {
        let ch = SysfsPwmChannel::open(
            &self.root,
            controller,
            channel,
            freq_hz,
            initial_duty_percent,
            self.export_timeout,
        )?;
        Ok(Box::new(ch))
    }
}

/// One exported `pwmchipN/pwmM`.
#[derive(Debug)]
pub struct SysfsPwmChannel {
    chip_dir: PathBuf,
    dir: PathBuf,
    controller: u32,
    channel: u32,
    period_ns: u64,
    exported_here: bool,
    released: bool,
}

impl SysfsPwmChannel {
    /// Export (if needed), program the period and initial duty, and enable.
    pub fn open(
        root: &Path,
        controller: u32,
        channel: u32,
        freq_hz: f64,
        initial_duty_percent: f64,
        export_timeout: Duration,
    ) -> Result<Self, DriverError> {
        let chip_dir = root.join(format!("pwmchip{controller}"));
        if !chip_dir.is_dir() {
            return Err(DriverError::ControllerNotFound { controller });
        }
        let dir = chip_dir.join(format!("pwm{channel}"));
        let configure_err = |e: io::Error| DriverError::Configure {
            controller,
            channel,
            kind: e.kind(),
        };
        if !freq_hz.is_finite() || freq_hz <= 0.0 {
            return Err(configure_err(io::Error::from(io::ErrorKind::InvalidInput)));
        }

        let mut exported_here = false;
        if !dir.is_dir() {
            fs::write(chip_dir.join("export"), channel.to_string()).map_err(|e| {
                DriverError::Export {
                    controller,
                    channel,
                    kind: e.kind(),
                }
            })?;
            exported_here = true;
            wait_for_dir(&dir, export_timeout).map_err(|e| DriverError::Export {
                controller,
                channel,
                kind: e.kind(),
            })?;
        }

        let period_ns = (1e9 / freq_hz).round() as u64;
        let mut ch = Self {
            chip_dir,
            dir,
            controller,
            channel,
            period_ns,
            exported_here,
            released: false,
        };

        // A stale duty larger than the new period would make the period
        // write fail with EINVAL.
        let _ = ch.write_attr("duty_cycle", 0);
        let setup = ch
            .write_attr("period", period_ns)
            .and_then(|()| ch.write_attr("duty_cycle", ch.duty_ns(initial_duty_percent)))
            .and_then(|()| ch.write_attr("enable", 1));
        if let Err(e) = setup {
            ch.release();
            return Err(configure_err(e));
        }
        debug!(
            "sysfs: pwmchip{controller}/pwm{channel} period={period_ns}ns duty={initial_duty_percent:.3}%"
        );
        Ok(ch)
    }

    pub fn controller(&self) -> u32 {
        self.controller
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    fn duty_ns(&self, duty_percent: f64) -> u64 {
        let fraction = duty_percent.clamp(0.0, 100.0) / 100.0;
        (self.period_ns as f64 * fraction).round() as u64
    }

    fn write_attr(&self, attr: &str, value: u64) -> io::Result<()> {
        fs::write(self.dir.join(attr), value.to_string())
    }
}

fn wait_for_dir(dir: &Path, timeout: Duration) -> io::Result<()> {
    let deadline = Instant::now() + timeout;
    while !dir.is_dir() {
        if Instant::now() >= deadline {
            return Err(io::Error::from(io::ErrorKind::TimedOut));
        }
        thread::sleep(EXPORT_POLL);
    }
    Ok(())
}

impl PwmChannel for SysfsPwmChannel {
    fn write_duty(&mut self, duty_percent: f64) -> Result<(), DriverError> {
        if self.released {
            return Err(DriverError::Released);
        }
        self.write_attr("duty_cycle", self.duty_ns(duty_percent))
            .map_err(|e| DriverError::WriteFailed { kind: e.kind() })
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.write_attr("enable", 0) {
            warn!(
                "sysfs: disable pwmchip{}/pwm{} failed: {e}",
                self.controller, self.channel
            );
        }
        if self.exported_here {
            if let Err(e) = fs::write(self.chip_dir.join("unexport"), self.channel.to_string()) {
                warn!(
                    "sysfs: unexport pwmchip{}/pwm{} failed: {e}",
                    self.controller, self.channel
                );
            }
        }
    }
}

impl Drop for SysfsPwmChannel {
    fn drop(&mut self) {
        self.release();
    }
}

// ── embedded-hal ──────────────────────────────────────────────

impl embedded_hal::pwm::ErrorType for SysfsPwmChannel {
    type Error = DriverError;
}

/// Full u16 resolution spread over the period (~305 ns per count at 50 Hz).
impl embedded_hal::pwm::SetDutyCycle for SysfsPwmChannel {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        let percent = f64::from(duty) / f64::from(u16::MAX) * 100.0;
        self.write_duty(percent)
    }
}
