//! Control loops expressed as operator compositions.
//!
//! - [`bang_bang`] - three-state on/off controller with a dead band
//! - [`pid`] - proportional-integral-derivative controller with optional
//!   output clamping and anti-windup
//!
//! Both take their inputs as sources and produce a source of commands, so
//! gains and setpoints may themselves be live streams (a [`ReactiveCell`]
//! behind a UI knob, a config file, a constant).
//!
//! [`ReactiveCell`]: crate::cell::ReactiveCell

pub mod bang_bang;
pub mod pid;

pub use bang_bang::{bang_bang, Command, Setpoint};
pub use pid::{pid, PidGains, PidState};
