//! Time representation and clock producers.
//!
//! Time-windowed operators never read a global clock. They take a companion
//! `Source<T: Timestamp>` and pull it whenever they need "now", so a test can
//! drive them with a [`ManualClock`] and firmware with a hardware tick counter.
//!
//! Deltas are always computed as `later.elapsed_since(earlier)`. For unsigned
//! tick counters this is a wrapping subtraction, which stays correct across
//! counter overflow as long as the real gap is below one full wrap.

use crate::cell::ReactiveCell;
use crate::source::{Pull, Push, Source};
use crate::types::TaggedValue;
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A point in time as seen by the dataflow graph
pub trait Timestamp: Copy + PartialEq + std::fmt::Debug + 'static {
    /// Span between two timestamps
    type Delta: Copy + PartialOrd + Default + std::fmt::Debug + 'static;

    /// `self - earlier`
    fn elapsed_since(self, earlier: Self) -> Self::Delta;

    /// `self + delta`
    fn advance(self, delta: Self::Delta) -> Self;

    /// Delta as a plain number in the timestamp's native unit
    fn delta_as_f64(delta: Self::Delta) -> f64;

    fn zero_delta() -> Self::Delta {
        Self::Delta::default()
    }
}

macro_rules! impl_wrapping_timestamp {
    ($($ty:ty),*) => {
        $(
            impl Timestamp for $ty {
                type Delta = $ty;

                #[inline]
                fn elapsed_since(self, earlier: Self) -> Self::Delta {
                    self.wrapping_sub(earlier)
                }

                #[inline]
                fn advance(self, delta: Self::Delta) -> Self {
                    self.wrapping_add(delta)
                }

                #[inline]
                fn delta_as_f64(delta: Self::Delta) -> f64 {
                    delta as f64
                }
            }
        )*
    };
}

impl_wrapping_timestamp!(u16, u32, u64);

impl Timestamp for f64 {
    type Delta = f64;

    fn elapsed_since(self, earlier: Self) -> f64 {
        self - earlier
    }

    fn advance(self, delta: f64) -> Self {
        self + delta
    }

    fn delta_as_f64(delta: f64) -> f64 {
        delta
    }
}

/// Durations measured from some fixed origin; deltas saturate at zero.
impl Timestamp for Duration {
    type Delta = Duration;

    fn elapsed_since(self, earlier: Self) -> Duration {
        self.saturating_sub(earlier)
    }

    fn advance(self, delta: Duration) -> Self {
        self.saturating_add(delta)
    }

    /// Seconds
    fn delta_as_f64(delta: Duration) -> f64 {
        delta.as_secs_f64()
    }
}

/// Ratio `delta / over` in the timestamp's native unit
pub(crate) fn delta_ratio<T: Timestamp>(delta: T::Delta, over: T::Delta) -> f64 {
    T::delta_as_f64(delta) / T::delta_as_f64(over)
}

// ==================== Clock sources ====================

/// Manually advanced clock for tests and simulations.
///
/// Setting or advancing the clock pushes the new time to every binding, and
/// every pull re-delivers the current time.
#[derive(Clone, Debug)]
pub struct ManualClock<T: Timestamp> {
    now: ReactiveCell<T>,
}

impl<T: Timestamp> ManualClock<T> {
    pub fn new(start: T) -> Self {
        Self {
            now: ReactiveCell::with_value(start),
        }
    }

    pub fn now(&self) -> T {
        self.now.get()
    }

    pub fn set(&self, time: T) {
        self.now.set(time);
    }

    pub fn advance(&self, delta: T::Delta) {
        self.now.set(self.now().advance(delta));
    }

    pub fn source(&self) -> Source<T> {
        self.now.source()
    }
}

/// Monotonic time elapsed since this call, read on every pull.
pub fn system_clock() -> Source<Duration> {
    let origin = Instant::now();
    crate::source::from_fn(move || origin.elapsed())
}

/// Tag each upstream value with the time read from `clock`.
///
/// The clock is pulled once per upstream value. A clock that pushes on its
/// own only updates the remembered time. Values that arrive before any time is
/// known are dropped.
pub fn stamp<T, Time>(clock: Source<Time>) -> impl Fn(Source<T>) -> Source<TaggedValue<T, Time>>
where
    T: 'static,
    Time: Timestamp,
{
    move |upstream: Source<T>| {
        let clock = clock.clone();
        Source::new(move |push, end| {
            let (clock_pull, now) = read_clock(&clock);
            tracing::trace!("stamp bound to clock");
            upstream.bind(
                Push::new(move |value| {
                    clock_pull.call();
                    if let Some(t) = now.get() {
                        push.call(TaggedValue::new(value, t));
                    }
                }),
                end,
            )
        })
    }
}

/// Bind `clock`, remembering the latest time it pushed.
pub(crate) fn read_clock<Time: Timestamp>(clock: &Source<Time>) -> (Pull, Rc<Cell<Option<Time>>>) {
    let now: Rc<Cell<Option<Time>>> = Rc::new(Cell::new(None));
    let slot = now.clone();
    let pull = clock.subscribe(move |t| slot.set(Some(t)));
    (pull, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::Collector;
    use crate::source::iterate;

    #[test]
    fn test_wrapping_delta_across_overflow() {
        let before = u32::MAX - 2;
        let after = before.advance(5);
        assert_eq!(after, 2);
        assert_eq!(after.elapsed_since(before), 5);
    }

    #[test]
    fn test_duration_delta_saturates() {
        let a = Duration::from_millis(10);
        let b = Duration::from_millis(30);
        assert_eq!(a.elapsed_since(b), Duration::ZERO);
        assert_eq!(Duration::delta_as_f64(b.elapsed_since(a)), 0.02);
    }

    #[test]
    fn test_manual_clock_pushes_on_advance() {
        let clock = ManualClock::new(0u32);
        let collector = Collector::new();
        let pull = collector.attach(&clock.source());
        clock.advance(5);
        pull.call();
        assert_eq!(collector.values(), vec![5, 5]);
    }

    #[test]
    fn test_stamp_tags_with_current_time() {
        let clock = ManualClock::new(100u64);
        let collector = Collector::new();
        let stamped = iterate(['a', 'b']).pipe(stamp(clock.source()));
        let pull = collector.attach(&stamped);
        pull.call();
        clock.advance(10);
        pull.call();
        assert_eq!(
            collector.values(),
            vec![TaggedValue::new('a', 100), TaggedValue::new('b', 110)]
        );
    }

    #[test]
    fn test_stamp_drops_values_without_time() {
        let collector = Collector::new();
        let stamped = iterate([1]).pipe(stamp(crate::source::never::<u32>()));
        collector.attach(&stamped).call();
        assert!(collector.is_empty());
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let collector = Collector::new();
        let pull = collector.attach(&system_clock());
        pull.call();
        pull.call();
        let values = collector.values();
        assert!(values[1] >= values[0]);
    }
}
