//! Unified error types for the pan/tilt tuner.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! console and binary error handling uniform.  Hardware errors are `Copy`
//! so the control loop can log and drop them without allocation.

use core::fmt;
use std::io;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A PWM output could not be acquired or written.
    Driver(DriverError),
    /// PWM frequency is zero, negative, or not a number.
    InvalidFrequency(f64),
    /// An argument cannot be clamped into a meaningful value.
    InvalidArgument(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
    /// Controller start-up failed.
    Init(&'static str),
    /// A console line could not be turned into a command.
    Command(CommandError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Driver(e) => write!(f, "driver: {e}"),
            Self::InvalidFrequency(hz) => write!(f, "invalid PWM frequency: {hz} Hz"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Command(e) => write!(f, "command: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Driver errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// None of the candidate controllers could start the channel.
    Unavailable { channel: u32 },
    /// The PWM controller (chip) does not exist.
    ControllerNotFound { controller: u32 },
    /// Exporting the channel on the controller failed.
    Export {
        controller: u32,
        channel: u32,
        kind: io::ErrorKind,
    },
    /// Setting period, initial duty, or enable failed.
    Configure {
        controller: u32,
        channel: u32,
        kind: io::ErrorKind,
    },
    /// A duty-cycle write failed (device removed, permissions, ...).
    WriteFailed { kind: io::ErrorKind },
    /// The output was already released.
    Released,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { channel } => {
                write!(f, "no PWM controller could drive channel {channel}")
            }
            Self::ControllerNotFound { controller } => {
                write!(f, "PWM controller {controller} not found")
            }
            Self::Export {
                controller,
                channel,
                kind,
            } => write!(f, "export of pwmchip{controller}/pwm{channel} failed ({kind})"),
            Self::Configure {
                controller,
                channel,
                kind,
            } => write!(f, "configure of pwmchip{controller}/pwm{channel} failed ({kind})"),
            Self::WriteFailed { kind } => write!(f, "duty-cycle write failed ({kind})"),
            Self::Released => write!(f, "output released"),
        }
    }
}

impl std::error::Error for DriverError {}

impl embedded_hal::pwm::Error for DriverError {
    fn kind(&self) -> embedded_hal::pwm::ErrorKind {
        embedded_hal::pwm::ErrorKind::Other
    }
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

/// Errors from turning a console line into an [`AppCommand`](crate::app::commands::AppCommand).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown verb or wrong number of arguments.
    Unrecognized(String),
    /// An argument that should be a finite number is not.
    InvalidNumber(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unrecognized(line) => write!(f, "not recognized: '{line}'"),
            Self::InvalidNumber(arg) => write!(f, "not a finite number: '{arg}'"),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
