//! Lifting plain-value pipes over wrapped values.
//!
//! [`lift`] runs an inner pipe `Source<I> -> Source<IO>` inside an outer
//! stream of `O`. Each outer value is lowered: either projected to an `I`
//! that enters the inner pipe, or turned directly into a final `OO` that
//! bypasses it. Inner outputs are lifted back to `OO` together with the
//! latest projected outer value, which is where side-channel data (a tag, the
//! other tuple slot) comes from.
//!
//! ```text
//!            ┌── Inner(i) ──► inner pipe ──► lift_fn(io, &outer) ──┐
//! outer ─► lower_fn                                                ├─► out
//!            └── Bypass(oo) ───────────────────────────────────────┘
//! ```

use crate::source::{End, Pull, Push, Source};
use crate::types::{Fallible, TaggedValue};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// The result of lowering an outer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lowered<I, O> {
    /// Projected value for the inner pipe
    Inner(I),
    /// Already-final output that skips the inner pipe
    Bypass(O),
}

/// Per-binding wiring between the outer stream and the inner pipe's entry.
struct Entry<I> {
    pushes: RefCell<Vec<Push<I>>>,
    ends: RefCell<Vec<End>>,
    upstream_pull: RefCell<Option<Pull>>,
}

impl<I: 'static> Entry<I> {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            pushes: RefCell::new(Vec::new()),
            ends: RefCell::new(Vec::new()),
            upstream_pull: RefCell::new(None),
        })
    }

    fn source(self: &Rc<Self>) -> Source<I> {
        let entry = self.clone();
        Source::new(move |push, end| {
            entry.pushes.borrow_mut().push(push);
            entry.ends.borrow_mut().push(end);
            let entry = entry.clone();
            Pull::new(move || {
                let pull = entry.upstream_pull.borrow().clone();
                if let Some(pull) = pull {
                    pull.call();
                }
            })
        })
    }

    fn push(&self, value: I)
    where
        I: Clone,
    {
        let count = self.pushes.borrow().len();
        for index in 0..count {
            let push = self.pushes.borrow().get(index).cloned();
            if let Some(push) = push {
                push.call(value.clone());
            }
        }
    }

    /// Signal end into the inner pipe; `false` if it never bound the entry.
    fn end(&self) -> bool {
        let ends = self.ends.borrow().clone();
        for end in &ends {
            end.call();
        }
        !ends.is_empty()
    }
}

/// Adapt `inner` to operate on a wrapped outer type.
///
/// `lower_fn` decides per outer value whether it enters the inner pipe.
/// `lift_fn` rebuilds an outer output from each inner output and the latest
/// outer value that entered the pipe. An upstream end is routed through the
/// inner pipe so inner operators observe it.
pub fn lift<O, OO, I, IO, P>(
    inner: P,
    lift_fn: impl Fn(IO, &O) -> OO + 'static,
    lower_fn: impl Fn(&O) -> Lowered<I, OO> + 'static,
) -> impl Fn(Source<O>) -> Source<OO>
where
    O: Clone + 'static,
    OO: 'static,
    I: Clone + 'static,
    IO: 'static,
    P: Fn(Source<I>) -> Source<IO> + 'static,
{
    let inner = Rc::new(inner);
    let lift_fn = Rc::new(lift_fn);
    let lower_fn = Rc::new(lower_fn);
    move |upstream: Source<O>| {
        let inner = inner.clone();
        let lift_fn = lift_fn.clone();
        let lower_fn = lower_fn.clone();
        Source::new(move |push: Push<OO>, end: End| {
            let entry = Entry::<I>::new();
            let last_outer: Rc<RefCell<Option<O>>> = Rc::new(RefCell::new(None));
            let pulling = Rc::new(Cell::new(false));
            let bypassed = Rc::new(Cell::new(false));

            let inner_pull = {
                let last_outer = last_outer.clone();
                let lift_fn = lift_fn.clone();
                let push = push.clone();
                let bypassed = bypassed.clone();
                inner(entry.source()).bind(
                    Push::new(move |io: IO| {
                        // A bypass value already answered this pull.
                        if bypassed.get() {
                            return;
                        }
                        let outer = last_outer.borrow().clone();
                        if let Some(outer) = outer {
                            push.call(lift_fn(io, &outer));
                        }
                    }),
                    end.clone(),
                )
            };

            let upstream_pull = {
                let entry_for_push = entry.clone();
                let entry_for_end = entry.clone();
                let lower_fn = lower_fn.clone();
                let pulling = pulling.clone();
                let bypassed = bypassed.clone();
                upstream.bind(
                    Push::new(move |outer: O| match lower_fn(&outer) {
                        Lowered::Inner(value) => {
                            *last_outer.borrow_mut() = Some(outer);
                            entry_for_push.push(value);
                        }
                        Lowered::Bypass(output) => {
                            if pulling.get() {
                                bypassed.set(true);
                            }
                            push.call(output);
                        }
                    }),
                    End::new(move || {
                        if !entry_for_end.end() {
                            end.call();
                        }
                    }),
                )
            };
            *entry.upstream_pull.borrow_mut() = Some(upstream_pull.clone());
            tracing::trace!("lifted pipe bound");

            Pull::new(move || {
                let outer_pulling = pulling.replace(true);
                let outer_bypassed = bypassed.replace(false);
                inner_pull.call();
                // An inner pipe that never bound its entry still lets
                // bypass values through.
                if entry.ends.borrow().is_empty() {
                    upstream_pull.call();
                }
                pulling.set(outer_pulling);
                bypassed.set(outer_bypassed);
            })
        })
    }
}

/// Lift over `Option`: `None` bypasses as `None`.
pub fn lift_optional<I, IO>(
    inner: impl Fn(Source<I>) -> Source<IO> + 'static,
) -> impl Fn(Source<Option<I>>) -> Source<Option<IO>>
where
    I: Clone + 'static,
    IO: 'static,
{
    lift(
        inner,
        |output: IO, _: &Option<I>| Some(output),
        |outer: &Option<I>| match outer {
            Some(value) => Lowered::Inner(value.clone()),
            None => Lowered::Bypass(None),
        },
    )
}

/// Lift over `TaggedValue`, reattaching the tag of the latest input.
pub fn lift_tagged<I, IO, Tag>(
    inner: impl Fn(Source<I>) -> Source<IO> + 'static,
) -> impl Fn(Source<TaggedValue<I, Tag>>) -> Source<TaggedValue<IO, Tag>>
where
    I: Clone + 'static,
    IO: 'static,
    Tag: Clone + 'static,
{
    lift(
        inner,
        |output: IO, outer: &TaggedValue<I, Tag>| TaggedValue::new(output, outer.tag().clone()),
        |outer: &TaggedValue<I, Tag>| Lowered::Inner(outer.value().clone()),
    )
}

/// Lift over `Fallible`: failures bypass with their error unchanged.
pub fn lift_fallible<I, IO, E>(
    inner: impl Fn(Source<I>) -> Source<IO> + 'static,
) -> impl Fn(Source<Fallible<I, E>>) -> Source<Fallible<IO, E>>
where
    I: Clone + 'static,
    IO: 'static,
    E: Clone + 'static,
{
    lift(
        inner,
        |output: IO, _: &Fallible<I, E>| Fallible::Success(output),
        |outer: &Fallible<I, E>| match outer {
            Fallible::Success(value) => Lowered::Inner(value.clone()),
            Fallible::Failure(error) => Lowered::Bypass(Fallible::Failure(error.clone())),
        },
    )
}

/// Lift over the first slot of a pair.
pub fn lift_first<I, IO, X>(
    inner: impl Fn(Source<I>) -> Source<IO> + 'static,
) -> impl Fn(Source<(I, X)>) -> Source<(IO, X)>
where
    I: Clone + 'static,
    IO: 'static,
    X: Clone + 'static,
{
    lift(
        inner,
        |output: IO, outer: &(I, X)| (output, outer.1.clone()),
        |outer: &(I, X)| Lowered::Inner(outer.0.clone()),
    )
}

/// Lift over the second slot of a pair.
pub fn lift_second<X, I, IO>(
    inner: impl Fn(Source<I>) -> Source<IO> + 'static,
) -> impl Fn(Source<(X, I)>) -> Source<(X, IO)>
where
    X: Clone + 'static,
    I: Clone + 'static,
    IO: 'static,
{
    lift(
        inner,
        |output: IO, outer: &(X, I)| (outer.0.clone(), output),
        |outer: &(X, I)| Lowered::Inner(outer.1.clone()),
    )
}
