//! Integration tests for the console → MotionController → PWM pipeline.

use super::mock_hw::MockBackend;

use pantilt::adapters::console::Console;
use pantilt::app::events::ControllerState;
use pantilt::app::service::MotionController;
use pantilt::config::{SweepConfig, TunerConfig};

fn run_script(script: &str) -> (MotionController, MockBackend, String) {
    let config = TunerConfig {
        update_hz: 1000.0,
        ..TunerConfig::default()
    };
    let backend = MockBackend::new();
    let mut handle = backend.clone();
    let controller = MotionController::new(&config, &mut handle).unwrap();

    let mut out = Vec::new();
    Console::new(&controller, SweepConfig::default(), script.as_bytes(), &mut out)
        .run()
        .unwrap();
    (controller, backend, String::from_utf8(out).unwrap())
}

#[test]
fn quit_shuts_down_and_releases_outputs() {
    let (c, backend, out) = run_script("pan 45\nquit\npan 10\n");
    assert!(out.ends_with("Bye.\n"));
    assert_eq!(c.state(), ControllerState::Stopped);
    assert!(backend.released(0) && backend.released(1));
    // Lines after `quit` are never read.
    assert_eq!(c.status().pan.target, 45.0);
}

#[test]
fn session_survives_bad_input() {
    let (c, _backend, out) = run_script("PAN abc\nfly\nstep roll 4\nTILT 30\nstatus\nexit\n");
    assert!(out.contains("error: not a finite number: 'abc'"));
    assert_eq!(out.matches("Command not recognized").count(), 2);
    assert!(out.contains("state : Running"), "status printed before exit");
    assert_eq!(c.status().tilt.target, 30.0);
}

#[test]
fn sweep_uses_configured_bounds() {
    let config = TunerConfig {
        update_hz: 1000.0,
        default_speed_deg_per_s: 2000.0,
        ..TunerConfig::default()
    };
    let backend = MockBackend::new();
    let mut handle = backend.clone();
    let c = MotionController::new(&config, &mut handle).unwrap();
    let sweep = SweepConfig {
        low_deg: 80.0,
        high_deg: 100.0,
        step_deg: 10.0,
        dwell_ms: 40,
    };

    let mut out = Vec::new();
    Console::new(&c, sweep, "sweep pan\n".as_bytes(), &mut out)
        .run()
        .unwrap();

    // 80, 90, 100, 90, 80
    assert_eq!(c.status().pan.target, 80.0);
    let peak = backend.writes(0).into_iter().fold(f64::MIN, f64::max);
    let duty_at_100 = (600.0 + 1800.0 * 100.0 / 180.0) / 20_000.0 * 100.0;
    assert!((peak - duty_at_100).abs() < 1e-9, "peak {peak}");
    assert!(backend.writes(1).is_empty(), "tilt untouched");
}
