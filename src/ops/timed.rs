//! Time- and state-windowed operators.
//!
//! Every operator here takes a companion clock source and reads time through
//! [`stamp`], so time only advances when the clock says so. All deltas are
//! computed as `later.elapsed_since(earlier)`, which keeps wrapping tick
//! counters correct across overflow.
//!
//! # Operators
//!
//! - [`cache`] - replay the latest value on pull
//! - [`throttle`] - at most one value per window, windows start at the value
//! - [`debounce`] - settle on a value only after it held for an interval
//! - [`timed_latch`] - hold a non-default value for a fixed duration
//! - [`stopwatch`] - elapsed time since the last lap transition
//! - [`exponential_moving_average`] - single-pole IIR low-pass filter
//! - [`interval`] / [`periodic`] - drift-free periodic pulse

use super::stateful;
use crate::clock::{delta_ratio, read_clock, stamp, Timestamp};
use crate::source::{constant, End, Pull, Push, Source};
use crate::types::TaggedValue;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// ==================== Cache ====================

/// Remember the latest value and replay it on pull.
///
/// A pull first pulls upstream. If upstream pushed during that pull, the
/// fresh value has already gone downstream and nothing is replayed;
/// otherwise the cached value (if any) is pushed.
///
/// Upstream end is absorbed once something is cached: the cache keeps
/// answering pulls without pulling upstream again. If upstream ends before
/// ever pushing, end is forwarded.
pub fn cache<T: Clone + 'static>() -> impl Fn(Source<T>) -> Source<T> {
    |upstream: Source<T>| {
        Source::new(move |push, end| {
            let cached: Rc<RefCell<Option<T>>> = Rc::new(RefCell::new(None));
            let pulling = Rc::new(Cell::new(false));
            let fresh = Rc::new(Cell::new(false));
            let ended = Rc::new(Cell::new(false));

            let upstream_pull = {
                let cached = cached.clone();
                let pulling = pulling.clone();
                let fresh = fresh.clone();
                let push = push.clone();
                let on_end = {
                    let cached = cached.clone();
                    let ended = ended.clone();
                    let end = end.clone();
                    End::new(move || {
                        ended.set(true);
                        if cached.borrow().is_none() {
                            end.call();
                        } else {
                            tracing::trace!("cache outlives upstream end");
                        }
                    })
                };
                upstream.bind(
                    Push::new(move |value: T| {
                        *cached.borrow_mut() = Some(value.clone());
                        if pulling.get() {
                            fresh.set(true);
                        }
                        push.call(value);
                    }),
                    on_end,
                )
            };

            Pull::new(move || {
                if ended.get() {
                    let replay = cached.borrow().clone();
                    match replay {
                        Some(value) => push.call(value),
                        None => end.call(),
                    }
                    return;
                }

                let outer_pulling = pulling.replace(true);
                let outer_fresh = fresh.replace(false);
                upstream_pull.call();
                let pushed = fresh.get();
                pulling.set(outer_pulling);
                fresh.set(outer_fresh || pushed);
                if pushed {
                    return;
                }
                // An upstream end during this pull with nothing cached has
                // already been forwarded.
                let replay = cached.borrow().clone();
                if let Some(value) = replay {
                    push.call(value);
                }
            })
        })
    }
}

// ==================== Throttle ====================

/// Forward the first value of each window of length `interval`.
///
/// The forwarded value opens a window at its own timestamp; values with
/// `elapsed <= interval` since then are dropped. Windows do not snap to a grid.
pub fn throttle<T, Time>(
    interval: Time::Delta,
    clock: Source<Time>,
) -> impl Fn(Source<T>) -> Source<T>
where
    T: 'static,
    Time: Timestamp,
{
    let stamp = stamp(clock);
    move |upstream: Source<T>| {
        stateful(
            stamp(upstream),
            || None::<Time>,
            move |window: &mut Option<Time>, tagged: TaggedValue<T, Time>| {
                let (value, t) = tagged.into_parts();
                if matches!(*window, Some(start) if t.elapsed_since(start) <= interval) {
                    return None;
                }
                *window = Some(t);
                Some(value)
            },
        )
    }
}

// ==================== Debounce ====================

struct DebounceState<T, Time> {
    settled: Option<T>,
    testing: Option<(T, Time)>,
}

/// Settle on a value only once it has been observed again after `interval`.
///
/// A value different from the settled one starts a test. The first value
/// observed at least `interval` after the test began concludes it: if that
/// value equals the candidate, the candidate becomes settled, otherwise the
/// old settled value stays. The settled value is pushed on every upstream
/// value once one exists.
pub fn debounce<T, Time>(
    interval: Time::Delta,
    clock: Source<Time>,
) -> impl Fn(Source<T>) -> Source<T>
where
    T: Clone + PartialEq + 'static,
    Time: Timestamp,
{
    let stamp = stamp(clock);
    move |upstream: Source<T>| {
        stateful(
            stamp(upstream),
            || DebounceState::<T, Time> {
                settled: None,
                testing: None,
            },
            move |state, tagged: TaggedValue<T, Time>| {
                let (value, t) = tagged.into_parts();

                let verdict = match &state.testing {
                    Some((candidate, started)) if t.elapsed_since(*started) >= interval => {
                        Some(*candidate == value)
                    }
                    _ => None,
                };
                if let Some(confirmed) = verdict {
                    if confirmed {
                        tracing::debug!("debounce settled on new value");
                        state.settled = Some(value.clone());
                    }
                    state.testing = None;
                }

                if state.testing.is_none() && state.settled.as_ref() != Some(&value) {
                    state.testing = Some((value, t));
                }

                state.settled.clone()
            },
        )
    }
}

// ==================== Timed latch ====================

/// Hold a non-default value for `duration`, then force `default`.
///
/// - `default` from upstream is forwarded and clears any latch.
/// - A non-default value with no latch starts one and is forwarded.
/// - While the latch is open the latched value is repeated, whatever
///   upstream sends.
/// - The first value at or after `duration` forces `default` and clears the
///   latch; the next non-default value starts a new one.
pub fn timed_latch<T, Time>(
    duration: Time::Delta,
    default: T,
    clock: Source<Time>,
) -> impl Fn(Source<T>) -> Source<T>
where
    T: Clone + PartialEq + 'static,
    Time: Timestamp,
{
    let stamp = stamp(clock);
    let default = Rc::new(default);
    move |upstream: Source<T>| {
        let default = default.clone();
        stateful(
            stamp(upstream),
            || None::<(T, Time)>,
            move |latch: &mut Option<(T, Time)>, tagged: TaggedValue<T, Time>| {
                let (value, t) = tagged.into_parts();
                if value == *default {
                    *latch = None;
                    return Some(value);
                }
                let open = latch
                    .as_ref()
                    .map(|(held, started)| (held.clone(), t.elapsed_since(*started) >= duration));
                match open {
                    None => {
                        *latch = Some((value.clone(), t));
                        Some(value)
                    }
                    Some((_, true)) => {
                        tracing::debug!("timed latch expired");
                        *latch = None;
                        Some((*default).clone())
                    }
                    Some((held, false)) => Some(held),
                }
            },
        )
    }
}

// ==================== Stopwatch ====================

/// Tag each value with the time elapsed since the current lap began.
///
/// A lap begins at the first value and whenever the stream goes from not
/// satisfying `lap_condition` to satisfying it.
pub fn stopwatch<T, Time>(
    lap_condition: impl Fn(&T) -> bool + 'static,
    clock: Source<Time>,
) -> impl Fn(Source<T>) -> Source<TaggedValue<T, Time::Delta>>
where
    T: 'static,
    Time: Timestamp,
{
    let stamp = stamp(clock);
    let lap_condition = Rc::new(lap_condition);
    move |upstream: Source<T>| {
        let lap_condition = lap_condition.clone();
        stateful(
            stamp(upstream),
            || (None::<Time>, false),
            move |(origin, was_satisfied): &mut (Option<Time>, bool),
                  tagged: TaggedValue<T, Time>| {
                let (value, t) = tagged.into_parts();
                let satisfied = lap_condition(&value);
                let start = match *origin {
                    Some(start) if !(satisfied && !*was_satisfied) => start,
                    _ => t,
                };
                *origin = Some(start);
                *was_satisfied = satisfied;
                Some(TaggedValue::new(value, t.elapsed_since(start)))
            },
        )
    }
}

// ==================== Exponential moving average ====================

/// `alpha = 1 - e^(-dt / tau)`, saturating to 1 for a zero time constant.
fn smoothing_factor<Time: Timestamp>(dt: Time::Delta, time_constant: Time::Delta) -> f64 {
    let ratio = delta_ratio::<Time>(dt, time_constant);
    if ratio.is_nan() || ratio.is_infinite() {
        return 1.0;
    }
    1.0 - (-ratio.max(0.0)).exp()
}

/// Single-pole IIR low-pass filter over irregularly sampled values.
///
/// The first sample is adopted as is. Each following sample moves the output
/// by `(sample - output) * alpha`, with `alpha` derived from the time since
/// the previous sample. Large gaps push `alpha` toward 1, i.e. full adoption.
pub fn exponential_moving_average<Time>(
    time_constant: Time::Delta,
    clock: Source<Time>,
) -> impl Fn(Source<f64>) -> Source<f64>
where
    Time: Timestamp,
{
    let stamp = stamp(clock);
    move |upstream: Source<f64>| {
        stateful(
            stamp(upstream),
            || None::<(f64, Time)>,
            move |previous: &mut Option<(f64, Time)>, tagged: TaggedValue<f64, Time>| {
                let (sample, t) = tagged.into_parts();
                let integrated = match *previous {
                    None => sample,
                    Some((prev, last)) => {
                        let alpha = smoothing_factor::<Time>(t.elapsed_since(last), time_constant);
                        prev + (sample - prev) * alpha
                    }
                };
                *previous = Some((integrated, t));
                Some(integrated)
            },
        )
    }
}

// ==================== Interval ====================

/// Emit a scheduled instant each time `period` has elapsed on `clock`.
///
/// The first clock reading is the origin. Each emission advances the schedule
/// by the current period from the previous scheduled instant, not from the
/// observed time, so jitter does not accumulate. If the clock jumps by more
/// than one period the schedule resynchronizes to the observed time.
///
/// Pull pulls `period`, then `clock`. End is forwarded from either.
pub fn interval<Time: Timestamp>(period: Source<Time::Delta>, clock: Source<Time>) -> Source<Time> {
    Source::new(move |push, end| {
        let (period_pull, current_period) = read_period::<Time>(&period, end.clone());
        let scheduled: Rc<Cell<Option<Time>>> = Rc::new(Cell::new(None));

        let clock_pull = clock.bind(
            Push::new(move |t: Time| {
                let Some(p) = current_period.get() else {
                    return;
                };
                let Some(previous) = scheduled.get() else {
                    scheduled.set(Some(t));
                    return;
                };
                if t.elapsed_since(previous) < p {
                    return;
                }
                let mut next = previous.advance(p);
                if t.elapsed_since(next) >= p {
                    tracing::debug!(observed = ?t, expected = ?next, "interval resynchronized");
                    next = t;
                }
                scheduled.set(Some(next));
                push.call(next);
            }),
            end,
        );

        Pull::new(move || {
            period_pull.call();
            clock_pull.call();
        })
    })
}

/// [`interval`] with a fixed period.
pub fn periodic<Time: Timestamp>(period: Time::Delta, clock: Source<Time>) -> Source<Time> {
    interval(constant(period), clock)
}

fn read_period<Time: Timestamp>(
    period: &Source<Time::Delta>,
    end: End,
) -> (Pull, Rc<Cell<Option<Time::Delta>>>) {
    let current: Rc<Cell<Option<Time::Delta>>> = Rc::new(Cell::new(None));
    let slot = current.clone();
    let pull = period.bind(Push::new(move |p| slot.set(Some(p))), end);
    (pull, current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::ReactiveCell;
    use crate::clock::ManualClock;
    use crate::consumer::Collector;
    use crate::source::{emitter, iterate, Emitter};

    /// Emit `value` with the clock set to `t`.
    fn feed<T: Clone + 'static>(clock: &ManualClock<u32>, tx: &Emitter<T>, t: u32, value: T) {
        clock.set(t);
        tx.emit(value);
    }

    #[test]
    fn test_cache_replays_after_single_push() {
        let pushed = Rc::new(Cell::new(false));
        let p = pushed.clone();
        let once = crate::source::from_fn(move || !p.replace(true))
            .pipe(crate::ops::filter(|first: &bool| *first))
            .pipe(crate::ops::map(|_: bool| 42));
        let collector = Collector::new();
        let pull = collector.attach(&once.pipe(cache()));
        pull.call();
        pull.call();
        assert_eq!(collector.values(), vec![42, 42]);
    }

    #[test]
    fn test_cache_outlives_upstream_end() {
        let collector = Collector::new();
        let pull = collector.attach(&iterate([7]).pipe(cache()));
        pull.call();
        pull.call();
        pull.call();
        assert_eq!(collector.values(), vec![7, 7, 7]);
        assert!(!collector.is_ended());
    }

    #[test]
    fn test_cache_prefers_fresh_push() {
        let collector = Collector::new();
        let pull = collector.attach(&iterate([1, 2]).pipe(cache()));
        pull.call();
        pull.call();
        assert_eq!(collector.values(), vec![1, 2]);
    }

    #[test]
    fn test_cache_forwards_end_when_empty() {
        let collector = Collector::<u8>::new();
        let pull = collector.attach(&crate::source::empty().pipe(cache()));
        pull.call();
        assert!(collector.is_ended());
    }

    #[test]
    fn test_throttle_windows_start_at_forwarded_value() {
        let clock = ManualClock::new(0u32);
        let (tx, upstream) = emitter();
        let collector = Collector::new();
        collector.attach(&upstream.pipe(throttle(10, clock.source())));
        for t in 0..=22 {
            feed(&clock, &tx, t, t);
        }
        assert_eq!(collector.values(), vec![0, 11, 22]);
    }

    fn run_debounce(start: u32, script: &[char]) -> Vec<char> {
        let clock = ManualClock::new(start);
        let (tx, upstream) = emitter();
        let collector = Collector::new();
        collector.attach(&upstream.pipe(debounce(5, clock.source())));
        for (i, &value) in script.iter().enumerate() {
            feed(&clock, &tx, start.wrapping_add(i as u32), value);
        }
        collector.values()
    }

    #[test]
    fn test_debounce_reverts_when_candidate_fails() {
        // Stable X, then Y/Z for interval - 1 ticks, then X again.
        let script: Vec<char> = "XXXXXXXXXXYZYZXX".chars().collect();
        let output = run_debounce(0, &script);
        assert_eq!(output.len(), script.len() - 5);
        assert!(output.iter().all(|&v| v == 'X'));
    }

    #[test]
    fn test_debounce_flips_after_full_interval() {
        let script: Vec<char> = "XXXXXXYYYYYY".chars().collect();
        let output = run_debounce(0, &script);
        assert_eq!(output.last(), Some(&'Y'));
        assert_eq!(output[output.len() - 2], 'X');
    }

    #[test]
    fn test_debounce_across_counter_wrap() {
        let script: Vec<char> = "XXXXXXYYYYYY".chars().collect();
        assert_eq!(
            run_debounce(u32::MAX - 3, &script),
            run_debounce(0, &script)
        );
    }

    #[test]
    fn test_timed_latch_state_machine() {
        let clock = ManualClock::new(0u32);
        let (tx, upstream) = emitter();
        let collector = Collector::new();
        collector.attach(&upstream.pipe(timed_latch(3, 0, clock.source())));
        let script = [0, 5, 7, 0, 6, 6, 6, 6, 6];
        for (t, value) in script.into_iter().enumerate() {
            feed(&clock, &tx, t as u32, value);
        }
        assert_eq!(collector.values(), vec![0, 5, 5, 0, 6, 6, 6, 0, 6]);
    }

    #[test]
    fn test_stopwatch_rebases_on_lap() {
        let clock = ManualClock::new(0u32);
        let (tx, upstream) = emitter();
        let collector = Collector::new();
        collector.attach(&upstream.pipe(stopwatch(|v: &i32| *v > 0, clock.source())));
        for (t, value) in [(0, 0), (2, 1), (5, 1), (6, 0), (9, 2)] {
            feed(&clock, &tx, t, value);
        }
        let elapsed: Vec<u32> = collector.values().iter().map(|tv| *tv.tag()).collect();
        assert_eq!(elapsed, vec![0, 0, 3, 4, 0]);
    }

    #[test]
    fn test_ema_step_response() {
        let clock = ManualClock::new(0.0f64);
        let (tx, upstream) = emitter();
        let collector = Collector::new();
        collector.attach(&upstream.pipe(exponential_moving_average(1.0, clock.source())));
        tx.emit(0.0);
        clock.set(1.0);
        tx.emit(1.0);
        let alpha = 1.0 - (-1.0f64).exp();
        assert!((collector.last().unwrap_or_default() - alpha).abs() < 1e-12);

        // A jump far beyond the time constant adopts the sample.
        clock.set(1_000.0);
        tx.emit(5.0);
        assert!((collector.last().unwrap_or_default() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_ema_zero_time_constant_adopts() {
        let clock = ManualClock::new(0u32);
        let (tx, upstream) = emitter();
        let collector = Collector::new();
        collector.attach(&upstream.pipe(exponential_moving_average(0, clock.source())));
        tx.emit(1.0);
        tx.emit(3.0);
        assert_eq!(collector.values(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_interval_does_not_drift() {
        let clock = ManualClock::new(0u32);
        let collector = Collector::new();
        let pull = collector.attach(&periodic(10, clock.source()));
        pull.call();
        for t in [5, 10, 23, 30, 75, 85] {
            clock.set(t);
        }
        assert_eq!(collector.values(), vec![10, 20, 30, 75, 85]);
    }

    #[test]
    fn test_interval_follows_current_period() {
        let period = ReactiveCell::with_value(10u32);
        let clock = ManualClock::new(0u32);
        let collector = Collector::new();
        let pull = collector.attach(&interval(period.source(), clock.source()));
        pull.call();
        clock.set(10);

        // Pushed period: the next tick is the previous one plus 25.
        period.set(25);
        clock.set(30);
        clock.set(35);
        assert_eq!(collector.values(), vec![10, 35]);

        // A silent period change is seen only once pulled, and the period is
        // pulled before the clock.
        period.set_silently(5);
        clock.set(41);
        assert_eq!(collector.len(), 2);
        pull.call();
        assert_eq!(collector.values(), vec![10, 35, 40]);
    }
}
