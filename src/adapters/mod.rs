//! Adapters: the outer ring around the motion core.
//!
//! | Adapter   | Drives             | Connects to          |
//! |-----------|--------------------|----------------------|
//! | `console` | `MotionController` | line-oriented stdin  |

pub mod console;
