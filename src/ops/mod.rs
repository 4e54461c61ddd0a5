//! Operator library.
//!
//! Single-input operators are pipes: functions returning
//! `impl Fn(Source<A>) -> Source<B>`, applied with [`Source::pipe`]. The
//! returned closure may be applied to many sources, and each resulting source
//! may be bound many times; state lives in the binding, never in the pipe.
//!
//! ```text
//! sensor ──► filter ──► ema ──► cache ──► display
//!                        ▲
//!                      clock
//! ```
//!
//! Multi-input operators ([`combine`]) are plain constructors taking the
//! operand sources.

pub mod combine;
pub mod fallible;
pub mod timed;
pub mod transform;

pub use combine::{
    choose, combine2, combine3, combine4, concat, merge, zip2, zip3, zip4,
};
pub use fallible::{log_errors, make_infallible, unwrap_fallible};
pub use timed::{
    cache, debounce, exponential_moving_average, interval, periodic, stopwatch, throttle,
    timed_latch,
};
pub use transform::{
    dedupe, filter, filter_map, fold, inspect, map, reduce, scan, unwrap_endable,
};

use crate::source::{Push, Source};
use std::cell::RefCell;
use std::rc::Rc;

/// Per-binding state machine over `upstream`.
///
/// `init` runs once per binding. `step` sees the state mutably and returns
/// the value to push, if any; the push happens after the state borrow ends so
/// downstream may pull reentrantly.
pub(crate) fn stateful<A, B, S>(
    upstream: Source<A>,
    init: impl Fn() -> S + 'static,
    step: impl Fn(&mut S, A) -> Option<B> + 'static,
) -> Source<B>
where
    A: 'static,
    B: 'static,
    S: 'static,
{
    let step = Rc::new(step);
    Source::new(move |push, end| {
        let state = Rc::new(RefCell::new(init()));
        let step = step.clone();
        upstream.bind(
            Push::new(move |value| {
                let output = step(&mut state.borrow_mut(), value);
                if let Some(output) = output {
                    push.call(output);
                }
            }),
            end,
        )
    })
}
