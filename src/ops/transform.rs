//! Stateless and accumulator combinators.
//!
//! Every operator here binds its upstream exactly once per downstream binding
//! and forwards end unchanged.

use super::stateful;
use crate::source::{Push, Source};
use crate::types::Endable;
use std::rc::Rc;

/// Transform every value with `f`.
pub fn map<A, B>(f: impl Fn(A) -> B + 'static) -> impl Fn(Source<A>) -> Source<B>
where
    A: 'static,
    B: 'static,
{
    let f = Rc::new(f);
    move |upstream: Source<A>| {
        let f = f.clone();
        Source::new(move |push, end| {
            let f = f.clone();
            upstream.bind(Push::new(move |value| push.call(f(value))), end)
        })
    }
}

/// Forward only values satisfying `predicate`.
pub fn filter<T>(predicate: impl Fn(&T) -> bool + 'static) -> impl Fn(Source<T>) -> Source<T>
where
    T: 'static,
{
    let predicate = Rc::new(predicate);
    move |upstream: Source<T>| {
        let predicate = predicate.clone();
        Source::new(move |push, end| {
            let predicate = predicate.clone();
            upstream.bind(
                Push::new(move |value| {
                    if predicate(&value) {
                        push.call(value);
                    }
                }),
                end,
            )
        })
    }
}

/// Transform and filter in one step; `None` drops the value.
pub fn filter_map<A, B>(f: impl Fn(A) -> Option<B> + 'static) -> impl Fn(Source<A>) -> Source<B>
where
    A: 'static,
    B: 'static,
{
    let f = Rc::new(f);
    move |upstream: Source<A>| {
        let f = f.clone();
        Source::new(move |push, end| {
            let f = f.clone();
            upstream.bind(
                Push::new(move |value| {
                    if let Some(output) = f(value) {
                        push.call(output);
                    }
                }),
                end,
            )
        })
    }
}

/// Run `f` on every value without changing the stream.
pub fn inspect<T>(f: impl Fn(&T) + 'static) -> impl Fn(Source<T>) -> Source<T>
where
    T: 'static,
{
    let f = Rc::new(f);
    move |upstream: Source<T>| {
        let f = f.clone();
        Source::new(move |push, end| {
            let f = f.clone();
            upstream.bind(
                Push::new(move |value| {
                    f(&value);
                    push.call(value);
                }),
                end,
            )
        })
    }
}

/// Running fold: the accumulator is pushed after every update.
///
/// Each binding starts from its own clone of `init`.
pub fn fold<A, B>(init: B, f: impl Fn(B, A) -> B + 'static) -> impl Fn(Source<A>) -> Source<B>
where
    A: 'static,
    B: Clone + 'static,
{
    let f = Rc::new(f);
    move |upstream: Source<A>| {
        let init = init.clone();
        let f = f.clone();
        stateful(
            upstream,
            move || init.clone(),
            move |acc: &mut B, value| {
                let next = f(acc.clone(), value);
                *acc = next.clone();
                Some(next)
            },
        )
    }
}

/// Stateful filter-map: `f` mutates the per-binding state and may emit.
pub fn scan<A, B, S>(
    init: S,
    f: impl Fn(&mut S, A) -> Option<B> + 'static,
) -> impl Fn(Source<A>) -> Source<B>
where
    A: 'static,
    B: 'static,
    S: Clone + 'static,
{
    let f = Rc::new(f);
    move |upstream: Source<A>| {
        let init = init.clone();
        let f = f.clone();
        stateful(upstream, move || init.clone(), move |state, value| f(state, value))
    }
}

/// Running reduction seeded by the first value, which is pushed as is.
pub fn reduce<T>(f: impl Fn(T, T) -> T + 'static) -> impl Fn(Source<T>) -> Source<T>
where
    T: Clone + 'static,
{
    let f = Rc::new(f);
    move |upstream: Source<T>| {
        let f = f.clone();
        stateful(
            upstream,
            || None,
            move |acc: &mut Option<T>, value| {
                let next = match acc.take() {
                    Some(prev) => f(prev, value),
                    None => value,
                };
                *acc = Some(next.clone());
                Some(next)
            },
        )
    }
}

/// Drop values equal to the previously forwarded one.
pub fn dedupe<T>() -> impl Fn(Source<T>) -> Source<T>
where
    T: Clone + PartialEq + 'static,
{
    |upstream: Source<T>| {
        stateful(
            upstream,
            || None,
            |last: &mut Option<T>, value| {
                if last.as_ref() == Some(&value) {
                    return None;
                }
                *last = Some(value.clone());
                Some(value)
            },
        )
    }
}

/// Unpack an `Endable` stream: payloads are pushed, and end is signalled after
/// a `Last` payload or on `Ended`.
pub fn unwrap_endable<T>() -> impl Fn(Source<Endable<T>>) -> Source<T>
where
    T: 'static,
{
    |upstream: Source<Endable<T>>| {
        Source::new(move |push, end| {
            let finished = end.clone();
            upstream.bind(
                Push::new(move |item| match item {
                    Endable::More(value) => push.call(value),
                    Endable::Last(value) => {
                        push.call(value);
                        finished.call();
                    }
                    Endable::Ended => finished.call(),
                }),
                end,
            )
        })
    }
}
