//! PID control folded over a combined input stream.

use crate::clock::{stamp, Timestamp};
use crate::ops::combine3;
use crate::source::{Push, Source};
use crate::types::{Range, TaggedValue};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Proportional, integral and derivative weights
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PidGains {
    #[serde(default)]
    pub kp: f64,
    #[serde(default)]
    pub ki: f64,
    #[serde(default)]
    pub kd: f64,
}

impl PidGains {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }
}

/// State carried from one PID tick to the next
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidState<Time> {
    /// Error of the previous tick (`setpoint - process value`)
    pub error: f64,
    /// Accumulated `error * dt`, in the clock's native unit
    pub integral: f64,
    /// Time of the previous tick; `None` before the first one
    pub last_time: Option<Time>,
    /// Last computed output
    pub output: f64,
}

impl<Time> Default for PidState<Time> {
    fn default() -> Self {
        Self {
            error: 0.0,
            integral: 0.0,
            last_time: None,
            output: 0.0,
        }
    }
}

impl<Time: Timestamp> PidState<Time> {
    /// Advance one tick and return the new output.
    ///
    /// The first tick has no `dt`, so it contributes neither integral nor
    /// derivative. When `limits` clamp the output the integral is not
    /// advanced, which keeps the integrator from winding up while
    /// saturated.
    pub fn update(
        &mut self,
        error: f64,
        now: Time,
        gains: &PidGains,
        limits: Option<&Range<f64>>,
    ) -> f64 {
        let (integral, derivative) = match self.last_time {
            Some(last) => {
                let dt = Time::delta_as_f64(now.elapsed_since(last));
                let derivative = if dt > 0.0 {
                    (error - self.error) / dt
                } else {
                    0.0
                };
                (self.integral + error * dt, derivative)
            }
            None => (self.integral, 0.0),
        };

        let proportional = gains.kp * error;
        let raw = proportional + gains.ki * integral + gains.kd * derivative;
        let output = match limits {
            Some(limits) if !limits.contains(raw) => {
                tracing::trace!(raw, "pid output clamped, integrator frozen");
                limits.clamp(proportional + gains.ki * self.integral + gains.kd * derivative)
            }
            _ => {
                self.integral = integral;
                raw
            }
        };

        self.error = error;
        self.last_time = Some(now);
        self.output = output;
        output
    }
}

/// PID controller over live process value, setpoint and gains.
///
/// Each combined `(process value, setpoint, gains)` triple is stamped with
/// `clock` and drives one [`PidState::update`]; the output is pushed every
/// tick. State is per binding.
pub fn pid<Time: Timestamp>(
    process_value: Source<f64>,
    setpoint: Source<f64>,
    gains: Source<PidGains>,
    clock: Source<Time>,
    limits: Option<Range<f64>>,
) -> Source<f64> {
    let inputs = combine3(process_value, setpoint, gains, |pv: f64, sp: f64, gains: PidGains| {
        (sp - pv, gains)
    })
    .pipe(stamp(clock));

    Source::new(move |push, end| {
        let state = Rc::new(RefCell::new(PidState::<Time>::default()));
        inputs.bind(
            Push::new(move |tagged: TaggedValue<(f64, PidGains), Time>| {
                let ((error, gains), now) = tagged.into_parts();
                let output = state
                    .borrow_mut()
                    .update(error, now, &gains, limits.as_ref());
                push.call(output);
            }),
            end,
        )
    })
}
