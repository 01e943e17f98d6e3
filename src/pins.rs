//! PWM channel / controller assignments for the Raspberry Pi 5 header.
//!
//! Single source of truth for the defaults in
//! [`TunerConfig`](crate::config::TunerConfig).  Change an assignment here
//! and it propagates to every default.

// ---------------------------------------------------------------------------
// Axis outputs
// ---------------------------------------------------------------------------

/// PAN servo: GPIO12 = hardware PWM channel 0.
pub const PAN_CHANNEL: u32 = 0;
/// TILT servo: GPIO13 = hardware PWM channel 1.
pub const TILT_CHANNEL: u32 = 1;

// ---------------------------------------------------------------------------
// PWM controllers
// ---------------------------------------------------------------------------

/// On the Pi 5 the RP1 PWM block usually shows up as pwmchip2.
pub const PREFERRED_CONTROLLER: u32 = 2;
/// Older kernels / other boards expose it as pwmchip0.
pub const FALLBACK_CONTROLLER: u32 = 0;

/// Root of the kernel PWM class.
pub const SYSFS_PWM_ROOT: &str = "/sys/class/pwm";

// ---------------------------------------------------------------------------
// Servo signal
// ---------------------------------------------------------------------------

/// Standard hobby-servo frame rate.
pub const SERVO_PWM_FREQ_HZ: f64 = 50.0;
