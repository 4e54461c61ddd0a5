//! # hybridflow: hybrid push/pull dataflow composition
//!
//! A small execution model for control applications where some producers are
//! polled ("give me a value now": an ADC read, a clock) and others are
//! event-driven ("tell me when it changes": a button, a setpoint knob). Both
//! kinds implement one protocol and compose through one operator library.
//!
//! ## Protocol
//!
//! - **Source**: `(push, end) -> pull`. Binding a [`Source`] hands it the
//!   consumer's callbacks and returns the consumer's pull. A source may push
//!   during binding, on pull, or spontaneously at any time.
//! - **Consumer**: any function taking a source and binding it.
//! - **Pipe**: a consumer that returns a new source; every operator in
//!   [`ops`] is one.
//!
//! Push flows downstream, pull flows upstream, and end flows downstream.
//! Pulling after end makes the producer signal end again.
//!
//! ## Modules
//!
//! - [`source`] / [`types`] - protocol callbacks, leaf sources, value wrappers
//! - [`cell`] - [`ReactiveCell`], the bridge from imperative code
//! - [`ops`] - transform, fallible, combine and time-windowed operators
//! - [`clock`] - [`Timestamp`] and clock sources
//! - [`lift`] - run plain-value pipes over wrapped values
//! - [`control`] - bang-bang and PID loops built from the above
//! - [`config`] - file-backed settings for assembled graphs
//!
//! ## Example
//!
//! ```ignore
//! use hybridflow::clock::ManualClock;
//! use hybridflow::consumer::Collector;
//! use hybridflow::ops::{exponential_moving_average, throttle};
//! use hybridflow::source::from_fn;
//!
//! let clock = ManualClock::new(0u32);
//! let filtered = from_fn(read_adc)
//!     .pipe(exponential_moving_average(50, clock.source()))
//!     .pipe(throttle(100, clock.source()));
//!
//! let display = Collector::new();
//! let pull = display.attach(&filtered);
//! loop {
//!     clock.advance(10);
//!     pull.call();
//! }
//! ```
//!
//! Everything is single-threaded and synchronous: within one push every
//! downstream effect completes before the call returns.

pub mod cell;
pub mod clock;
pub mod config;
pub mod consumer;
pub mod control;
pub mod error;
pub mod lift;
pub mod ops;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use cell::ReactiveCell;
pub use clock::{ManualClock, Timestamp};
pub use config::FlowConfig;
pub use consumer::{Collector, Poller};
pub use error::{ContractViolation, FlowError, Result};
pub use lift::Lowered;
pub use source::{End, Pull, Push, Source};
pub use types::{Endable, Fallible, Range, TaggedValue};
