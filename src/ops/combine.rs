//! Multi-producer combinators.
//!
//! Operands are always bound and pulled left to right. Tie-breaking between
//! sources with independent state depends on this order, so it is part of
//! each operator's contract.

use crate::source::{End, Pull, Push, Source};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::rc::Rc;

/// Combine the latest values of two sources with `f`.
///
/// Each operand holds the last value seen since the most recent pull. A push
/// from either operand emits `f(a, b)` once both hold a value. Pulling clears
/// both slots, then pulls `a` and `b`, so a pull never re-emits a stale pair.
/// End is forwarded as soon as either operand ends.
pub fn combine2<A, B, C>(a: Source<A>, b: Source<B>, f: impl Fn(A, B) -> C + 'static) -> Source<C>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: 'static,
{
    let f = Rc::new(f);
    Source::new(move |push, end| {
        let held: Rc<RefCell<(Option<A>, Option<B>)>> = Rc::new(RefCell::new((None, None)));
        let emit = {
            let held = held.clone();
            let f = f.clone();
            Rc::new(move || {
                let pair = match &*held.borrow() {
                    (Some(a), Some(b)) => Some((a.clone(), b.clone())),
                    _ => None,
                };
                if let Some((a, b)) = pair {
                    push.call(f(a, b));
                }
            })
        };

        let pull_a = {
            let held = held.clone();
            let emit = emit.clone();
            a.bind(
                Push::new(move |value| {
                    held.borrow_mut().0 = Some(value);
                    emit();
                }),
                end.clone(),
            )
        };
        let pull_b = {
            let held = held.clone();
            b.bind(
                Push::new(move |value| {
                    held.borrow_mut().1 = Some(value);
                    emit();
                }),
                end,
            )
        };

        Pull::new(move || {
            *held.borrow_mut() = (None, None);
            pull_a.call();
            pull_b.call();
        })
    })
}

/// Three-operand [`combine2`].
///
/// Built as `combine2(zip2(a, b), c)`: the inner pair resets when the outer
/// pull clears, binding and pull order stay `a, b, c`, and a push from any
/// operand emits once all three hold a value.
pub fn combine3<A, B, C, D>(
    a: Source<A>,
    b: Source<B>,
    c: Source<C>,
    f: impl Fn(A, B, C) -> D + 'static,
) -> Source<D>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    D: 'static,
{
    combine2(zip2(a, b), c, move |(a, b), c| f(a, b, c))
}

/// Four-operand [`combine2`], built on [`zip3`] the same way as [`combine3`].
pub fn combine4<A, B, C, D, E>(
    a: Source<A>,
    b: Source<B>,
    c: Source<C>,
    d: Source<D>,
    f: impl Fn(A, B, C, D) -> E + 'static,
) -> Source<E>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    D: Clone + 'static,
    E: 'static,
{
    combine2(zip3(a, b, c), d, move |(a, b, c), d| f(a, b, c, d))
}

pub fn zip2<A, B>(a: Source<A>, b: Source<B>) -> Source<(A, B)>
where
    A: Clone + 'static,
    B: Clone + 'static,
{
    combine2(a, b, |a, b| (a, b))
}

pub fn zip3<A, B, C>(a: Source<A>, b: Source<B>, c: Source<C>) -> Source<(A, B, C)>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
{
    combine3(a, b, c, |a, b, c| (a, b, c))
}

pub fn zip4<A, B, C, D>(
    a: Source<A>,
    b: Source<B>,
    c: Source<C>,
    d: Source<D>,
) -> Source<(A, B, C, D)>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    D: Clone + 'static,
{
    combine4(a, b, c, d, |a, b, c, d| (a, b, c, d))
}

/// Interleave two sources into one, without combining values.
///
/// Pull pulls `a` then `b`. End is forwarded once both operands have ended.
pub fn merge<T: 'static>(a: Source<T>, b: Source<T>) -> Source<T> {
    Source::new(move |push, end| {
        let ended = Rc::new(Cell::new([false, false]));
        let end_of = |slot: usize| {
            let ended = ended.clone();
            let end = end.clone();
            End::new(move || {
                let mut flags = ended.get();
                flags[slot] = true;
                ended.set(flags);
                if flags == [true, true] {
                    end.call();
                }
            })
        };
        let pull_a = a.bind(push.clone(), end_of(0));
        let pull_b = b.bind(push, end_of(1));
        Pull::new(move || {
            pull_a.call();
            pull_b.call();
        })
    })
}

/// All values of `first`, then all values of `second`.
///
/// `second` is bound only once `first` has ended. If that happens during a
/// pull, `second` is pulled right away so the pull is not wasted. Anything
/// `first` pushes after its end is dropped.
pub fn concat<T: 'static>(first: Source<T>, second: Source<T>) -> Source<T> {
    Source::new(move |push, end| {
        let second_pull: Rc<RefCell<Option<Pull>>> = Rc::new(RefCell::new(None));
        let first_done = Rc::new(Cell::new(false));

        let on_first_end = {
            let second = second.clone();
            let push = push.clone();
            let end = end.clone();
            let slot = second_pull.clone();
            let done = first_done.clone();
            End::new(move || {
                if done.replace(true) {
                    return;
                }
                tracing::trace!("concat handing over to second source");
                let pull = second.bind(push.clone(), end.clone());
                *slot.borrow_mut() = Some(pull);
            })
        };

        let gate = first_done.clone();
        let first_pull = first.bind(
            Push::new(move |value| {
                if !gate.get() {
                    push.call(value);
                }
            }),
            on_first_end,
        );

        Pull::new(move || {
            let active = second_pull.borrow().clone();
            match active {
                Some(pull) => pull.call(),
                None => {
                    first_pull.call();
                    let handed_over = second_pull.borrow().clone();
                    if let Some(pull) = handed_over {
                        pull.call();
                    }
                }
            }
        })
    })
}

/// Forward values from the case selected by the latest key from `switch`.
///
/// The result is off until `switch` pushes a key present in `cases`; a key
/// that is not present switches it off again. Pull pulls `switch`, then the
/// selected case. End is forwarded when every case has ended, or as soon as
/// `switch` ends. `switch` is bound first, then the cases in key order.
pub fn choose<K, V>(cases: impl IntoIterator<Item = (K, Source<V>)>, switch: Source<K>) -> Source<V>
where
    K: Ord + Clone + Debug + 'static,
    V: 'static,
{
    let cases: Rc<BTreeMap<K, Source<V>>> = Rc::new(cases.into_iter().collect());
    Source::new(move |push, end| {
        let selected: Rc<RefCell<Option<K>>> = Rc::new(RefCell::new(None));

        let switch_pull = {
            let selected = selected.clone();
            let cases = cases.clone();
            switch.bind(
                Push::new(move |key| {
                    let next = cases.contains_key(&key).then_some(key);
                    if *selected.borrow() != next {
                        tracing::debug!(selected = ?next, "choose switched case");
                    }
                    *selected.borrow_mut() = next;
                }),
                end.clone(),
            )
        };

        let remaining = Rc::new(Cell::new(cases.len()));
        let mut pulls: BTreeMap<K, Pull> = BTreeMap::new();
        for (key, case) in cases.iter() {
            let case_end = {
                let remaining = remaining.clone();
                let end = end.clone();
                let done = Cell::new(false);
                End::new(move || {
                    if !done.replace(true) {
                        remaining.set(remaining.get() - 1);
                    }
                    if remaining.get() == 0 {
                        end.call();
                    }
                })
            };
            let case_push = {
                let selected = selected.clone();
                let key = key.clone();
                let push = push.clone();
                Push::new(move |value| {
                    let active = selected.borrow().as_ref() == Some(&key);
                    if active {
                        push.call(value);
                    }
                })
            };
            pulls.insert(key.clone(), case.bind(case_push, case_end));
        }

        Pull::new(move || {
            switch_pull.call();
            let current = selected.borrow().clone();
            if let Some(pull) = current.and_then(|key| pulls.get(&key)) {
                pull.call();
            }
        })
    })
}
