//! Interactive line console.
//!
//! Reads one command per line from any `BufRead`, applies it to a
//! [`MotionController`], and writes replies to any `Write`.  The binary
//! wires it to stdin/stdout; tests drive it from byte slices.
//!
//! Leaving the console (`quit`, `exit`, or end of input) shuts the
//! controller down.

use std::io::{self, BufRead, Write};

use log::{debug, warn};

use crate::app::commands::AppCommand;
use crate::app::service::MotionController;
use crate::config::SweepConfig;
use crate::control::axis::AxisId;
use crate::error::CommandError;

pub const PROMPT: &str = "pantilt> ";

pub const HELP: &str = "\
Commands:
  help                 : this reference
  status               : show status
  center               : both servos to 90\u{00b0}
  pan <deg>            : set PAN 0..180
  tilt <deg>           : set TILT 0..180
  step pan <\u{00b1}deg>      : move PAN relative (e.g. step pan +5)
  step tilt <\u{00b1}deg>     : move TILT relative
  speed <deg_per_s>    : change speed (e.g. 360, 420, 480)
  min_us <us>          : set minimum pulse (e.g. 600)
  max_us <us>          : set maximum pulse (e.g. 2400)
  sweep pan|tilt       : sweep to check endpoints and noise
  quit/exit            : leave

Tips:
- If a servo buzzes at 90\u{00b0}, raise min_us (e.g. 620) or lower max_us (e.g. 2380), then 'center'.
- Make sure servo GND and Pi GND are connected. Use a solid 5V supply (>=2A for 2 servos).
- A 470-1000 \u{00b5}F electrolytic capacitor on the servo 5V rail helps damp noise.
";

/// What the console loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct Console<'a, R, W> {
    controller: &'a MotionController,
    sweep: SweepConfig,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Console<'a, R, W> {
    pub fn new(controller: &'a MotionController, sweep: SweepConfig, input: R, output: W) -> Self {
        Self {
            controller,
            sweep,
            input,
            output,
        }
    }

    /// Run until `quit` or end of input, then shut the controller down.
    ///
    /// Only console I/O errors end the session early; the controller is
    /// shut down in that case as well.
    pub fn run(&mut self) -> io::Result<()> {
        let result = self.session();
        self.controller.shutdown();
        result?;
        writeln!(self.output, "Bye.")?;
        self.output.flush()
    }

    fn session(&mut self) -> io::Result<()> {
        writeln!(self.output, "{HELP}")?;
        let mut line = String::new();
        loop {
            write!(self.output, "{PROMPT}")?;
            self.output.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                debug!("console: end of input");
                writeln!(self.output)?;
                return Ok(());
            }
            if self.handle_line(&line)? == Flow::Quit {
                return Ok(());
            }
        }
    }

    fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        match AppCommand::parse(line) {
            Ok(None) => Ok(Flow::Continue),
            Ok(Some(cmd)) => self.execute(cmd),
            Err(CommandError::Unrecognized(_)) => {
                writeln!(self.output, "Command not recognized. Type 'help'.")?;
                Ok(Flow::Continue)
            }
            Err(e @ CommandError::InvalidNumber(_)) => {
                writeln!(self.output, "error: {e}")?;
                Ok(Flow::Continue)
            }
        }
    }

    fn execute(&mut self, cmd: AppCommand) -> io::Result<Flow> {
        let c = self.controller;
        match cmd {
            AppCommand::Help => writeln!(self.output, "{HELP}")?,
            AppCommand::Status => writeln!(self.output, "{}", c.status())?,
            AppCommand::Center => c.center(),
            AppCommand::Pan(deg) => {
                c.set_pan_target(deg);
            }
            AppCommand::Tilt(deg) => {
                c.set_tilt_target(deg);
            }
            AppCommand::Step(axis, delta) => {
                let status = c.status();
                let current = match axis {
                    AxisId::Pan => status.pan.angle,
                    AxisId::Tilt => status.tilt.angle,
                };
                c.set_target(axis, current + delta);
            }
            AppCommand::Speed(v) => {
                c.set_speed(v);
                writeln!(self.output, "OK")?;
            }
            AppCommand::MinPulse(us) => match c.set_min_pulse(us) {
                Ok(()) => writeln!(self.output, "OK")?,
                Err(e) => writeln!(self.output, "error: {e}")?,
            },
            AppCommand::MaxPulse(us) => match c.set_max_pulse(us) {
                Ok(()) => writeln!(self.output, "OK")?,
                Err(e) => writeln!(self.output, "error: {e}")?,
            },
            AppCommand::Sweep(axis) => {
                let s = self.sweep;
                if let Err(e) = c.sweep(axis, s.low_deg, s.high_deg, s.step_deg, s.dwell()) {
                    warn!("console: sweep rejected: {e}");
                    writeln!(self.output, "error: {e}")?;
                }
            }
            AppCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }
}
