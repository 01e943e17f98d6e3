//! Tuner configuration parameters
//!
//! All tunable parameters for the pan/tilt controller.
//! Values can be overridden from a JSON file passed on the command line;
//! nothing is persisted back.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::control::pulse::Calibration;
use crate::control::sweep::sweep_sequence;
use crate::error::{Error, Result};
use crate::pins;

/// Control loop rate limits (Hz).  The period must fit a `Duration` and
/// stay short enough that a stop request is seen promptly.
pub const MIN_UPDATE_HZ: f64 = 1.0;
pub const MAX_UPDATE_HZ: f64 = 10_000.0;

/// Longest `shutdown()` will wait for the control loop.
pub const MAX_SHUTDOWN_TIMEOUT_MS: u64 = 60_000;

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    // --- PWM signal ---
    /// Servo frame rate (Hz)
    pub pwm_frequency_hz: f64,
    /// Pulse width at 0° (microseconds)
    pub min_pulse_us: f64,
    /// Pulse width at 180° (microseconds)
    pub max_pulse_us: f64,

    // --- Motion ---
    /// Angle both axes hold at startup (degrees)
    pub init_angle_deg: f64,
    /// Slew rate at startup (degrees per second)
    pub default_speed_deg_per_s: f64,
    /// Lowest slew rate `set_speed` will accept
    pub speed_floor_deg_per_s: f64,
    /// Control loop rate (Hz)
    pub update_hz: f64,
    /// Minimum per-tick movement that is written to hardware (degrees)
    pub apply_deadband_deg: f64,
    /// New targets closer than this to the current target are ignored (degrees)
    pub target_epsilon_deg: f64,

    // --- Hardware ---
    pub pan_channel: u32,
    pub tilt_channel: u32,
    /// PWM controllers to try, in order
    pub controller_candidates: Vec<u32>,
    /// Root of the sysfs PWM class
    pub sysfs_root: PathBuf,

    // --- Lifecycle ---
    /// Upper bound on waiting for the loop thread at shutdown (milliseconds)
    pub shutdown_timeout_ms: u64,

    /// Defaults for the console `sweep` command
    pub sweep: SweepConfig,
}

/// Diagnostic sweep parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub low_deg: f64,
    pub high_deg: f64,
    pub step_deg: f64,
    pub dwell_ms: u64,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            // PWM
            pwm_frequency_hz: pins::SERVO_PWM_FREQ_HZ,
            min_pulse_us: 600.0, // most SG90s are happy in 600..2400
            max_pulse_us: 2400.0,

            // Motion
            init_angle_deg: 90.0,
            default_speed_deg_per_s: 420.0, // CCTV feel, 300..480 is comfortable
            speed_floor_deg_per_s: 60.0,
            update_hz: 100.0,
            apply_deadband_deg: 0.3,
            target_epsilon_deg: 0.5,

            // Hardware
            pan_channel: pins::PAN_CHANNEL,
            tilt_channel: pins::TILT_CHANNEL,
            controller_candidates: vec![pins::PREFERRED_CONTROLLER, pins::FALLBACK_CONTROLLER],
            sysfs_root: PathBuf::from(pins::SYSFS_PWM_ROOT),

            // Lifecycle
            shutdown_timeout_ms: 1000,

            sweep: SweepConfig::default(),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            low_deg: 10.0,
            high_deg: 170.0,
            step_deg: 10.0,
            dwell_ms: 200,
        }
    }
}

impl TunerConfig {
    /// Reject values the controller cannot run with.
    ///
    /// A bad PWM frequency is reported as [`Error::InvalidFrequency`] so the
    /// caller can tell it apart from the other range checks.
    pub fn validate(&self) -> Result<()> {
        if !self.pwm_frequency_hz.is_finite() || self.pwm_frequency_hz <= 0.0 {
            return Err(Error::InvalidFrequency(self.pwm_frequency_hz));
        }
        if !(MIN_UPDATE_HZ..=MAX_UPDATE_HZ).contains(&self.update_hz) {
            return Err(Error::Config("update_hz must be within 1..=10000"));
        }
        if !(self.min_pulse_us.is_finite() && self.min_pulse_us > 0.0)
            || !(self.max_pulse_us.is_finite() && self.max_pulse_us > 0.0)
        {
            return Err(Error::Config("pulse bounds must be positive"));
        }
        if self.min_pulse_us >= self.max_pulse_us {
            return Err(Error::Config("min_pulse_us must be below max_pulse_us"));
        }
        if !self.init_angle_deg.is_finite() {
            return Err(Error::Config("init_angle_deg must be finite"));
        }
        if !(self.speed_floor_deg_per_s.is_finite() && self.speed_floor_deg_per_s > 0.0) {
            return Err(Error::Config("speed_floor_deg_per_s must be positive"));
        }
        if !(self.apply_deadband_deg >= 0.0 && self.target_epsilon_deg >= 0.0) {
            return Err(Error::Config("deadband and epsilon must not be negative"));
        }
        if self.controller_candidates.is_empty() {
            return Err(Error::Config("controller_candidates is empty"));
        }
        if self.pan_channel == self.tilt_channel {
            return Err(Error::Config("pan and tilt share a PWM channel"));
        }
        if self.shutdown_timeout_ms > MAX_SHUTDOWN_TIMEOUT_MS {
            return Err(Error::Config("shutdown_timeout_ms must be at most 60000"));
        }
        let s = &self.sweep;
        if sweep_sequence(s.low_deg, s.high_deg, s.step_deg).is_err() {
            return Err(Error::Config("sweep bounds or step are unusable"));
        }
        Ok(())
    }

    /// Parse a (possibly partial) JSON document; missing fields keep their defaults.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn calibration(&self) -> Calibration {
        Calibration::new(self.min_pulse_us, self.max_pulse_us)
    }

    /// Control loop period. Only meaningful after [`validate`](Self::validate).
    pub fn update_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.update_hz)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl SweepConfig {
    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }
}
