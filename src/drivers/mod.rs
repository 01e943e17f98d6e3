//! PWM backends and the per-axis servo output.

pub mod hal_pwm;
pub mod servo;
pub mod sim_pwm;
pub mod sysfs_pwm;
