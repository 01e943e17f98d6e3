//! Pan/tilt servo tuner library.
//!
//! Exposes the motion core, the PWM drivers, and the console adapter so
//! the binary and the integration tests share one module tree.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod pins;

pub use error::{Error, Result};
