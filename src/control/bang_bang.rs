//! Bang-bang control with hysteresis.

use crate::ops::{fold, zip2};
use crate::source::Source;
use serde::{Deserialize, Serialize};

/// Output of a bang-bang controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Drive the process variable up (e.g. heater on)
    Up,
    /// Drive the process variable down
    Down,
    /// No action
    #[default]
    Neutral,
}

/// Target value and half-width of the dead band around it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Setpoint {
    pub target: f64,
    pub hysteresis: f64,
}

impl Setpoint {
    pub fn new(target: f64, hysteresis: f64) -> Self {
        Self { target, hysteresis }
    }

    /// Lower edge of the dead band
    pub fn lower(&self) -> f64 {
        self.target - self.hysteresis
    }

    /// Upper edge of the dead band
    pub fn upper(&self) -> f64 {
        self.target + self.hysteresis
    }

    /// Next command given the previous one.
    ///
    /// Below the band drives up, above it drives down, inside it the
    /// previous command is held.
    pub fn command(&self, process_value: f64, previous: Command) -> Command {
        if process_value < self.lower() {
            Command::Up
        } else if process_value > self.upper() {
            Command::Down
        } else {
            previous
        }
    }
}

/// Fold the zipped process variable and setpoint into a [`Command`] stream.
///
/// A command is pushed for every pair; it starts as [`Command::Neutral`] and
/// only changes when the process variable leaves the dead band.
pub fn bang_bang(process_value: Source<f64>, setpoint: Source<Setpoint>) -> Source<Command> {
    zip2(process_value, setpoint).pipe(fold(
        Command::Neutral,
        |previous: Command, (pv, setpoint): (f64, Setpoint)| {
            let next = setpoint.command(pv, previous);
            if next != previous {
                tracing::debug!(?previous, ?next, pv, "bang-bang command changed");
            }
            next
        },
    ))
}
