//! Motion controller: the core of the tuner.
//!
//! [`MotionController`] owns both axes, the two PWM outputs, and the
//! fixed-rate control loop thread.  Callers (the console, tests) only
//! mutate targets, speed, and calibration; the loop turns those into a
//! speed-limited, deadband-filtered stream of duty-cycle writes.
//!
//! ```text
//!  set_*_target ─┐            ┌──────────────── loop thread ───────────────┐
//!  set_speed    ─┼─▶ [state] ─┼▶ snapshot ─▶ plan_step ─▶ write ─▶ commit  │
//!  set_*_pulse  ─┘   (mutex)  └──────────────── every period ──────────────┘
//! ```
//!
//! The state lock guards `{pan, tilt, speed}` only.  PWM writes happen
//! after it is dropped, each under its own output lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::config::TunerConfig;
use crate::control::axis::{Axis, AxisId};
use crate::control::motion::plan_step;
use crate::control::pulse::angle_to_duty_percent;
use crate::control::sweep::sweep_sequence;
use crate::drivers::servo::{AxisOutput, acquire};
use crate::error::{Error, Result};

use super::events::{AxisStatus, ControllerState, Status};
use super::ports::PwmBackend;

/// Angle `center()` sends both axes to.
pub const CENTER_ANGLE_DEG: f64 = 90.0;

// ───────────────────────────────────────────────────────────────
// Shared state
// ───────────────────────────────────────────────────────────────

struct MotionState {
    pan: Axis,
    tilt: Axis,
    speed_deg_per_s: f64,
}

impl MotionState {
    fn axis_mut(&mut self, axis: AxisId) -> &mut Axis {
        match axis {
            AxisId::Pan => &mut self.pan,
            AxisId::Tilt => &mut self.tilt,
        }
    }
}

struct Outputs {
    pan: AxisOutput,
    tilt: AxisOutput,
}

impl Outputs {
    fn release(&self) {
        self.pan.release();
        self.tilt.release();
    }
}

struct LoopParams {
    period: Duration,
    deadband_deg: f64,
}

struct Worker {
    stop_tx: Sender<()>,
    done_rx: Receiver<()>,
    thread: JoinHandle<()>,
}

// ───────────────────────────────────────────────────────────────
// MotionController
// ───────────────────────────────────────────────────────────────

pub struct MotionController {
    shared: Arc<Mutex<MotionState>>,
    outputs: Arc<Outputs>,
    running: AtomicBool,
    worker: Mutex<Option<Worker>>,
    speed_floor: f64,
    shutdown_timeout: Duration,
}

impl MotionController {
    /// Acquire both outputs and start the control loop.
    ///
    /// An axis whose output cannot be acquired runs disconnected; only a
    /// bad configuration (e.g. a non-positive PWM frequency) fails here.
    pub fn new(config: &TunerConfig, backend: &mut dyn PwmBackend) -> Result<Self> {
        config.validate()?;

        let cal = config.calibration();
        let freq = config.pwm_frequency_hz;
        let initial_duty = angle_to_duty_percent(config.init_angle_deg, &cal, freq)?;
        let candidates = &config.controller_candidates;

        let outputs = Arc::new(Outputs {
            pan: AxisOutput::new(
                AxisId::Pan,
                freq,
                acquire(backend, config.pan_channel, candidates, freq, initial_duty),
            ),
            tilt: AxisOutput::new(
                AxisId::Tilt,
                freq,
                acquire(backend, config.tilt_channel, candidates, freq, initial_duty),
            ),
        });

        let axis = Axis::new(config.init_angle_deg, cal, config.target_epsilon_deg);
        let shared = Arc::new(Mutex::new(MotionState {
            pan: axis,
            tilt: axis,
            speed_deg_per_s: config.default_speed_deg_per_s.max(config.speed_floor_deg_per_s),
        }));

        let params = LoopParams {
            period: config.update_period(),
            deadband_deg: config.apply_deadband_deg,
        };
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let (done_tx, done_rx) = bounded::<()>(1);
        let spawned = {
            let shared = Arc::clone(&shared);
            let outputs = Arc::clone(&outputs);
            thread::Builder::new()
                .name("motion-loop".into())
                .spawn(move || {
                    run_loop(&shared, &outputs, &params, &stop_rx);
                    let _ = done_tx.send(());
                })
        };
        let thread = match spawned {
            Ok(t) => t,
            Err(e) => {
                warn!("motion: loop thread spawn failed: {e}");
                outputs.release();
                return Err(Error::Init("failed to spawn control loop thread"));
            }
        };
        info!(
            "motion: control loop running at {} Hz, deadband {}\u{00b0}",
            config.update_hz, config.apply_deadband_deg
        );

        Ok(Self {
            shared,
            outputs,
            running: AtomicBool::new(true),
            worker: Mutex::new(Some(Worker {
                stop_tx,
                done_rx,
                thread,
            })),
            speed_floor: config.speed_floor_deg_per_s,
            shutdown_timeout: config.shutdown_timeout(),
        })
    }

    // ── Targets ───────────────────────────────────────────────

    /// Request a new position for `axis` (clamped to 0–180°).
    ///
    /// Returns `false` when the request was dropped: within the target
    /// epsilon of the current target, or not a number.
    pub fn set_target(&self, axis: AxisId, angle: f64) -> bool {
        if angle.is_nan() {
            warn!("{axis}: ignoring NaN target");
            return false;
        }
        let changed = self.shared.lock().axis_mut(axis).set_target(angle);
        if changed {
            debug!("{axis}: target {angle:.1}\u{00b0}");
        }
        changed
    }

    pub fn set_pan_target(&self, angle: f64) -> bool {
        self.set_target(AxisId::Pan, angle)
    }

    pub fn set_tilt_target(&self, angle: f64) -> bool {
        self.set_target(AxisId::Tilt, angle)
    }

    /// Send both axes to 90°.
    pub fn center(&self) {
        self.set_pan_target(CENTER_ANGLE_DEG);
        self.set_tilt_target(CENTER_ANGLE_DEG);
    }

    // ── Speed & calibration ───────────────────────────────────

    /// Set the slew rate, raised to the configured floor.  Returns the
    /// rate actually applied.
    pub fn set_speed(&self, deg_per_s: f64) -> f64 {
        // f64::max also maps NaN to the floor.
        let speed = deg_per_s.max(self.speed_floor);
        self.shared.lock().speed_deg_per_s = speed;
        info!("motion: speed {speed:.0}\u{00b0}/s");
        speed
    }

    /// Pulse width for 0° on both axes.
    pub fn set_min_pulse(&self, us: f64) -> Result<()> {
        self.set_pulse_bounds(Some(us), None)
    }

    /// Pulse width for 180° on both axes.
    pub fn set_max_pulse(&self, us: f64) -> Result<()> {
        self.set_pulse_bounds(None, Some(us))
    }

    fn set_pulse_bounds(&self, min_us: Option<f64>, max_us: Option<f64>) -> Result<()> {
        let us = min_us.or(max_us).unwrap_or(f64::NAN);
        if !us.is_finite() || us <= 0.0 {
            return Err(Error::InvalidArgument("pulse width must be a positive number of µs"));
        }
        let cal = {
            let mut s = self.shared.lock();
            s.pan.set_calibration(min_us, max_us);
            s.tilt.set_calibration(min_us, max_us);
            s.pan.calibration()
        };
        info!(
            "motion: pulse range {:.0}..{:.0} us",
            cal.min_pulse_us, cal.max_pulse_us
        );
        if cal.is_inverted() {
            warn!("motion: min pulse above max pulse, servo direction is reversed");
        }
        Ok(())
    }

    // ── Diagnostics ───────────────────────────────────────────

    /// Step `axis` through `low..high..low` in `step` increments, holding
    /// each target for `dwell`.
    ///
    /// Blocks the calling thread for the whole sequence; never call it from
    /// the control loop.
    pub fn sweep(&self, axis: AxisId, low: f64, high: f64, step: f64, dwell: Duration) -> Result<()> {
        let seq = sweep_sequence(low, high, step)?;
        info!("{axis}: sweep of {} points, {dwell:?} each", seq.len());
        for angle in seq {
            self.set_target(axis, angle);
            thread::sleep(dwell);
        }
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self) -> Status {
        let (pan, tilt, speed) = {
            let s = self.shared.lock();
            (s.pan, s.tilt, s.speed_deg_per_s)
        };
        Status {
            state: self.state(),
            pan: axis_status(&pan, &self.outputs.pan),
            tilt: axis_status(&tilt, &self.outputs.tilt),
            speed_deg_per_s: speed,
            calibration: pan.calibration(),
        }
    }

    pub fn state(&self) -> ControllerState {
        if self.running.load(Ordering::Acquire) {
            ControllerState::Running
        } else {
            ControllerState::Stopped
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Stop the loop (waiting at most the configured timeout) and release
    /// both outputs.  Safe to call repeatedly.
    pub fn shutdown(&self) {
        let mut worker = self.worker.lock();
        let Some(w) = worker.take() else {
            return;
        };
        self.running.store(false, Ordering::Release);
        info!("motion: stopping control loop");

        // Either the message or the loop noticing a dropped sender ends it.
        let _ = w.stop_tx.try_send(());
        drop(w.stop_tx);
        match w.done_rx.recv_timeout(self.shutdown_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if w.thread.join().is_err() {
                    warn!("motion: control loop panicked");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "motion: control loop still running after {:?}, detaching",
                    self.shutdown_timeout
                );
            }
        }

        self.outputs.release();
        info!("motion: stopped");
    }
}

impl Drop for MotionController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn axis_status(axis: &Axis, output: &AxisOutput) -> AxisStatus {
    AxisStatus {
        angle: axis.current(),
        target: axis.target(),
        connected: output.is_connected(),
        controller: output.controller(),
    }
}

// ───────────────────────────────────────────────────────────────
// Control loop
// ───────────────────────────────────────────────────────────────

fn run_loop(
    shared: &Mutex<MotionState>,
    outputs: &Outputs,
    params: &LoopParams,
    stop_rx: &Receiver<()>,
) {
    let period_s = params.period.as_secs_f64();
    let mut next_tick = Instant::now() + params.period;

    loop {
        // 1. Snapshot under the lock
        let (pan, tilt, speed) = {
            let s = shared.lock();
            (s.pan, s.tilt, s.speed_deg_per_s)
        };
        let max_step = speed * period_s;

        // 2. Step each axis outside the lock
        let pan_step = plan_step(pan, max_step, params.deadband_deg);
        let tilt_step = plan_step(tilt, max_step, params.deadband_deg);

        // 3. Write only moves that clear the deadband
        if pan_step.write {
            outputs.pan.write_angle(pan_step.angle, &pan.calibration());
        }
        if tilt_step.write {
            outputs.tilt.write_angle(tilt_step.angle, &tilt.calibration());
        }

        // 4. Commit positions whether or not they were written
        {
            let mut s = shared.lock();
            s.pan.commit(pan_step.angle);
            s.tilt.commit(tilt_step.angle);
        }

        // 5. Wait for the next tick (or a stop request)
        match stop_rx.recv_deadline(next_tick) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
        next_tick += params.period;
        let now = Instant::now();
        if next_tick < now {
            // Overran (suspended, heavily loaded); do not burst to catch up.
            next_tick = now + params.period;
        }
    }
    debug!("motion: control loop exited");
}
