//! Integration tests for the MotionController → control loop → PWM
//! pipeline.
//!
//! The loop runs at 1 kHz here so convergence takes milliseconds; every
//! wait is bounded by a generous deadline to stay stable on loaded hosts.

use std::thread;
use std::time::{Duration, Instant};

use super::mock_hw::{MockBackend, PwmCall};

use pantilt::app::events::ControllerState;
use pantilt::app::service::MotionController;
use pantilt::config::TunerConfig;
use pantilt::control::axis::AxisId;
use pantilt::error::Error;

const PAN: u32 = 0;
const TILT: u32 = 1;

fn fast_config() -> TunerConfig {
    TunerConfig {
        update_hz: 1000.0,
        default_speed_deg_per_s: 2000.0,
        ..TunerConfig::default()
    }
}

fn start(config: &TunerConfig) -> (MotionController, MockBackend) {
    let _ = env_logger::builder().is_test(true).try_init();
    let backend = MockBackend::new();
    let mut handle = backend.clone();
    let controller = MotionController::new(config, &mut handle).unwrap();
    (controller, backend)
}

/// Poll `cond` until it holds or two seconds pass.
fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// Duty (percent) for `angle` under the default 600..2400 µs, 50 Hz setup.
fn duty_for(angle: f64) -> f64 {
    (600.0 + 1800.0 * angle / 180.0) / 20_000.0 * 100.0
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ── Start-up & acquisition ───────────────────────────────────

#[test]
fn outputs_start_at_the_initial_angle() {
    let (c, backend) = start(&fast_config());
    let calls = backend.calls();
    for ch in [PAN, TILT] {
        let opened = calls.iter().find_map(|call| match *call {
            PwmCall::Open {
                controller,
                channel,
                freq_hz,
                duty,
            } if channel == ch => Some((controller, freq_hz, duty)),
            _ => None,
        });
        let (controller, freq_hz, duty) = opened.unwrap();
        assert_eq!(controller, 2, "preferred controller first");
        assert_eq!(freq_hz, 50.0);
        assert!(approx(duty, 7.5), "duty {duty}");
    }
    let status = c.status();
    assert_eq!(status.state, ControllerState::Running);
    assert_eq!(status.pan.angle, 90.0);
    assert_eq!(status.pan.controller, Some(2));
}

#[test]
fn falls_back_to_next_controller() {
    let backend = MockBackend::new();
    backend.kill_controller(2);
    let mut handle = backend.clone();
    let c = MotionController::new(&fast_config(), &mut handle).unwrap();

    let status = c.status();
    assert!(status.pan.connected && status.tilt.connected);
    assert_eq!(status.pan.controller, Some(0));
    assert_eq!(status.tilt.controller, Some(0));
}

#[test]
fn unavailable_output_keeps_bookkeeping() {
    let backend = MockBackend::new();
    backend.kill_controller(2);
    backend.kill_controller(0);
    let mut handle = backend.clone();
    let c = MotionController::new(&fast_config(), &mut handle).unwrap();

    let status = c.status();
    assert!(!status.pan.connected);
    assert_eq!(status.pan.controller, None);

    assert!(c.set_pan_target(30.0));
    assert!(wait_until(|| c.status().pan.angle == 30.0));
    assert!(backend.calls().is_empty(), "nothing to write to");
}

#[test]
fn invalid_frequency_fails_construction() {
    let config = TunerConfig {
        pwm_frequency_hz: 0.0,
        ..fast_config()
    };
    let mut backend = MockBackend::new();
    let err = MotionController::new(&config, &mut backend).err();
    assert_eq!(err, Some(Error::InvalidFrequency(0.0)));
    assert!(backend.calls().is_empty());
}

#[test]
fn absurd_update_rate_fails_construction() {
    let config = TunerConfig {
        update_hz: 1e-30,
        ..fast_config()
    };
    let mut backend = MockBackend::new();
    let err = MotionController::new(&config, &mut backend).err();
    assert!(matches!(err, Some(Error::Config(_))), "{err:?}");
    assert!(backend.calls().is_empty());
}

// ── Motion ────────────────────────────────────────────────────

#[test]
fn converges_and_writes_final_duty() {
    let (c, backend) = start(&fast_config());
    c.set_pan_target(120.0);
    c.set_tilt_target(45.0);

    assert!(wait_until(|| {
        let s = c.status();
        s.pan.angle == 120.0 && s.tilt.angle == 45.0
    }));
    assert!(approx(backend.last_write(PAN).unwrap(), duty_for(120.0)));
    assert!(approx(backend.last_write(TILT).unwrap(), duty_for(45.0)));

    // Monotone approach, never past the target.
    let pan = backend.writes(PAN);
    assert!(pan.windows(2).all(|w| w[0] <= w[1]));
    assert!(pan.iter().all(|&d| d <= duty_for(120.0) + 1e-9));
}

#[test]
fn targets_are_clamped() {
    let (c, _backend) = start(&fast_config());
    c.set_pan_target(400.0);
    c.set_tilt_target(-20.0);
    let s = c.status();
    assert_eq!(s.pan.target, 180.0);
    assert_eq!(s.tilt.target, 0.0);
    assert!(!c.set_pan_target(f64::NAN));
}

#[test]
fn repeated_target_is_ignored() {
    let (c, backend) = start(&fast_config());
    assert!(!c.set_pan_target(90.2));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(c.status().pan.target, 90.0);
    assert!(backend.writes(PAN).is_empty());
}

#[test]
fn sub_deadband_move_commits_without_writing() {
    let config = TunerConfig {
        target_epsilon_deg: 0.1,
        ..fast_config()
    };
    let (c, backend) = start(&config);
    assert!(c.set_pan_target(90.2));
    assert!(wait_until(|| c.status().pan.angle == 90.2));
    assert!(backend.writes(PAN).is_empty());
}

#[test]
fn speed_has_a_floor() {
    let (c, _backend) = start(&fast_config());
    assert_eq!(c.set_speed(-10.0), 60.0);
    assert_eq!(c.status().speed_deg_per_s, 60.0);
    assert_eq!(c.set_speed(f64::NAN), 60.0);
    assert_eq!(c.set_speed(480.0), 480.0);
}

#[test]
fn slow_speed_limits_each_tick() {
    let config = TunerConfig {
        update_hz: 100.0,
        ..TunerConfig::default()
    };
    let (c, backend) = start(&config);
    c.set_speed(100.0); // 1° per tick
    c.set_pan_target(100.0);
    assert!(wait_until(|| c.status().pan.angle == 100.0));

    let per_degree = duty_for(1.0) - duty_for(0.0);
    let mut prev = duty_for(90.0);
    for d in backend.writes(PAN) {
        assert!(d - prev <= per_degree + 1e-9, "jumped from {prev} to {d}");
        prev = d;
    }
}

#[test]
fn write_failures_are_isolated_per_axis() {
    let (c, backend) = start(&fast_config());
    backend.fail_writes(PAN, true);
    c.set_pan_target(10.0);
    c.set_tilt_target(170.0);

    assert!(wait_until(|| {
        let s = c.status();
        s.pan.angle == 10.0 && s.tilt.angle == 170.0
    }));
    assert!(backend.writes(PAN).is_empty());
    assert!(approx(backend.last_write(TILT).unwrap(), duty_for(170.0)));
    assert_eq!(c.state(), ControllerState::Running);

    // Recovers on the next move once writes succeed again.
    backend.fail_writes(PAN, false);
    c.set_pan_target(20.0);
    assert!(wait_until(|| backend.last_write(PAN).is_some_and(|d| approx(d, duty_for(20.0)))));
}

// ── Calibration ───────────────────────────────────────────────

#[test]
fn calibration_applies_to_both_axes() {
    let (c, backend) = start(&fast_config());
    c.set_min_pulse(620.0).unwrap();
    c.set_max_pulse(2380.0).unwrap();
    let cal = c.status().calibration;
    assert_eq!((cal.min_pulse_us, cal.max_pulse_us), (620.0, 2380.0));

    c.set_tilt_target(180.0);
    assert!(wait_until(|| backend
        .last_write(TILT)
        .is_some_and(|d| approx(d, 2380.0 / 20_000.0 * 100.0))));
}

#[test]
fn calibration_rejects_nonsense_but_allows_inversion() {
    let (c, _backend) = start(&fast_config());
    assert!(matches!(c.set_min_pulse(0.0), Err(Error::InvalidArgument(_))));
    assert!(matches!(c.set_max_pulse(f64::NAN), Err(Error::InvalidArgument(_))));
    assert_eq!(c.status().calibration.min_pulse_us, 600.0);

    c.set_min_pulse(2500.0).unwrap();
    assert!(c.status().calibration.is_inverted());
}

// ── Sweep ─────────────────────────────────────────────────────

#[test]
fn sweep_goes_up_then_back_down() {
    let (c, backend) = start(&fast_config());
    c.set_speed(10_000.0);
    c.set_pan_target(10.0);
    assert!(wait_until(|| c.status().pan.angle == 10.0));
    let settled = backend.writes(PAN).len();

    c.sweep(AxisId::Pan, 10.0, 30.0, 10.0, Duration::from_millis(50))
        .unwrap();
    assert!(wait_until(|| c.status().pan.angle == 10.0));

    let writes = backend.writes(PAN)[settled..].to_vec();
    let peak = writes
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    assert!(approx(writes[peak], duty_for(30.0)));
    assert!(writes[peak..].windows(2).all(|w| w[0] >= w[1]));
    assert!(approx(*writes.last().unwrap(), duty_for(10.0)));
    assert_eq!(c.status().pan.target, 10.0);
}

#[test]
fn sweep_rejects_bad_step() {
    let (c, _backend) = start(&fast_config());
    let err = c.sweep(AxisId::Tilt, 10.0, 30.0, 0.0, Duration::ZERO);
    assert!(matches!(err, Err(Error::InvalidArgument(_))));
    let err = c.sweep(AxisId::Tilt, 10.0, 170.0, 1e-20, Duration::ZERO);
    assert!(matches!(err, Err(Error::InvalidArgument(_))));
    assert_eq!(c.status().tilt.target, 90.0);
}

// ── Lifecycle ─────────────────────────────────────────────────

#[test]
fn shutdown_is_idempotent_and_keeps_last_angles() {
    let (c, backend) = start(&fast_config());
    c.set_pan_target(60.0);
    assert!(wait_until(|| c.status().pan.angle == 60.0));
    let before = c.status();

    c.shutdown();
    c.shutdown();

    let after = c.status();
    assert_eq!(after.state, ControllerState::Stopped);
    assert_eq!(after.pan.angle, before.pan.angle);
    assert_eq!(after.tilt.angle, before.tilt.angle);
    assert!(!after.pan.connected);
    assert_eq!(after.pan.controller, Some(2));
    assert!(backend.released(PAN) && backend.released(TILT));

    let releases = backend
        .calls()
        .iter()
        .filter(|call| matches!(call, PwmCall::Release { .. }))
        .count();
    assert_eq!(releases, 2, "each channel released once");
}

#[test]
fn nothing_moves_after_shutdown() {
    let (c, backend) = start(&fast_config());
    c.shutdown();
    let writes = backend.writes(PAN).len();
    c.set_pan_target(150.0);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(backend.writes(PAN).len(), writes);
    assert_eq!(c.status().pan.angle, 90.0);
}

#[test]
fn drop_releases_outputs() {
    let (c, backend) = start(&fast_config());
    drop(c);
    assert!(backend.released(PAN) && backend.released(TILT));
}

// ── embedded-hal outputs ─────────────────────────────────────

mod hal {
    use core::convert::Infallible;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU16, Ordering};

    use embedded_hal::pwm::{ErrorType, SetDutyCycle};
    use pantilt::app::ports::{PwmBackend, PwmChannel};
    use pantilt::app::service::MotionController;
    use pantilt::drivers::hal_pwm::HalPwmChannel;
    use pantilt::error::DriverError;

    use super::{fast_config, wait_until};

    /// 4000-count PWM pin; 1 count = 5 µs at 50 Hz.
    struct Pin(Arc<AtomicU16>);

    impl ErrorType for Pin {
        type Error = Infallible;
    }

    impl SetDutyCycle for Pin {
        fn max_duty_cycle(&self) -> u16 {
            4000
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
            self.0.store(duty, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Pan gets the pin; every other channel is missing.
    struct PinBackend(Arc<AtomicU16>);

    impl PwmBackend for PinBackend {
        fn open(
            &mut self,
            controller: u32,
            channel: u32,
            _freq_hz: f64,
            initial_duty_percent: f64,
        ) -> Result<Box<dyn PwmChannel>, DriverError> {
            if channel != 0 {
                return Err(DriverError::ControllerNotFound { controller });
            }
            let mut ch = HalPwmChannel::new(Pin(Arc::clone(&self.0)));
            ch.write_duty(initial_duty_percent)?;
            Ok(Box::new(ch))
        }
    }

    #[test]
    fn embedded_hal_pin_drives_an_axis() {
        let duty = Arc::new(AtomicU16::new(0));
        let mut backend = PinBackend(Arc::clone(&duty));
        let c = MotionController::new(&fast_config(), &mut backend).unwrap();
        assert_eq!(duty.load(Ordering::SeqCst), 300, "1500 us at start");
        assert!(!c.status().tilt.connected);

        c.set_pan_target(180.0);
        assert!(wait_until(|| duty.load(Ordering::SeqCst) == 480));

        c.shutdown();
        assert_eq!(duty.load(Ordering::SeqCst), 0);
    }
}
