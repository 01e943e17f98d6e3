//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the motion controller
//! end to end against the recording backend in `mock_hw`.  No PWM
//! hardware is required.

mod console_tests;
mod controller_tests;
mod mock_hw;
