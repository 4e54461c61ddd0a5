//! The producer/consumer protocol.
//!
//! A [`Source<T>`] is a factory: binding it with a [`Push<T>`] and an [`End`]
//! callback returns a [`Pull`] callback. The source decides when to push. It
//! may push while being bound, spontaneously from some external event, or in
//! response to the returned pull being called (possibly reentrantly, before
//! the pull returns).
//!
//! ```text
//!            push(value) ──►
//! [Source] ─ end()       ──► [Consumer]
//!          ◄── pull()
//! ```
//!
//! A *consumer function* takes a source and binds it; a *pipe* is a consumer
//! function that returns a new source. All operators in [`crate::ops`] are
//! pipes or multi-input constructors.

use crate::types::{Endable, Fallible};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Callback invoked by a producer for every value.
pub struct Push<T>(Rc<dyn Fn(T)>);

impl<T> Push<T> {
    pub fn new(f: impl Fn(T) + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Deliver a value downstream.
    #[inline]
    pub fn call(&self, value: T) {
        (self.0)(value)
    }
}

impl<T> Clone for Push<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> fmt::Debug for Push<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Push")
    }
}

/// Callback invoked by a producer when it has no more values.
///
/// May be called more than once; consumers treat repeats as the same event.
#[derive(Clone)]
pub struct End(Rc<dyn Fn()>);

impl End {
    pub fn new(f: impl Fn() + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// An end callback that ignores the signal.
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    #[inline]
    pub fn call(&self) {
        (self.0)()
    }
}

impl fmt::Debug for End {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("End")
    }
}

/// Callback returned by binding; asks the producer for a fresh value.
#[derive(Clone)]
pub struct Pull(Rc<dyn Fn()>);

impl Pull {
    pub fn new(f: impl Fn() + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// A pull that requests nothing, for purely push-driven producers.
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    #[inline]
    pub fn call(&self) {
        (self.0)()
    }
}

impl fmt::Debug for Pull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pull")
    }
}

type Factory<T> = dyn Fn(Push<T>, End) -> Pull;

/// A producer of `T` values.
///
/// Cloning shares the factory, not any binding state: every [`bind`](Self::bind)
/// creates an independent binding.
pub struct Source<T>(Rc<Factory<T>>);

impl<T> Clone for Source<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Source")
    }
}

impl<T: 'static> Source<T> {
    /// Create a source from its binding factory.
    pub fn new(factory: impl Fn(Push<T>, End) -> Pull + 'static) -> Self {
        Self(Rc::new(factory))
    }

    /// Bind a consumer's callbacks, returning the pull callback.
    pub fn bind(&self, push: Push<T>, end: End) -> Pull {
        (self.0)(push, end)
    }

    /// Bind with a value callback only; end is ignored.
    pub fn subscribe(&self, on_value: impl Fn(T) + 'static) -> Pull {
        self.bind(Push::new(on_value), End::noop())
    }

    /// Apply a pipe, yielding the transformed source.
    pub fn pipe<U>(self, pipe: impl FnOnce(Source<T>) -> Source<U>) -> Source<U> {
        pipe(self)
    }

    /// Apply a consumer function, returning whatever it returns.
    pub fn consume<R>(self, consumer: impl FnOnce(Source<T>) -> R) -> R {
        consumer(self)
    }
}

// ==================== Leaf sources ====================

/// Pull-only source: every pull pushes `f()`.
pub fn from_fn<T: 'static>(f: impl Fn() -> T + 'static) -> Source<T> {
    let f = Rc::new(f);
    Source::new(move |push, _end| {
        let f = f.clone();
        Pull::new(move || push.call(f()))
    })
}

/// Polling source whose read can fail; failures become `Fallible::Failure`.
pub fn try_from_fn<T, E>(f: impl Fn() -> Result<T, E> + 'static) -> Source<Fallible<T, E>>
where
    T: 'static,
    E: 'static,
{
    from_fn(move || Fallible::from(f()))
}

/// Every pull pushes a clone of `value`.
pub fn constant<T: Clone + 'static>(value: T) -> Source<T> {
    from_fn(move || value.clone())
}

/// A source that signals end on every pull and never pushes.
pub fn empty<T: 'static>() -> Source<T> {
    Source::new(|_push, end| Pull::new(move || end.call()))
}

/// A source that never pushes and never ends.
pub fn never<T: 'static>() -> Source<T> {
    Source::new(|_push, _end| Pull::noop())
}

/// Each pull pushes the next value; once exhausted every pull signals end.
pub fn iterate<T: Clone + 'static>(values: impl IntoIterator<Item = T>) -> Source<T> {
    let values: Rc<[T]> = values.into_iter().collect();
    Source::new(move |push, end| {
        let values = values.clone();
        let cursor = Cell::new(0usize);
        Pull::new(move || {
            let index = cursor.get();
            match values.get(index) {
                Some(value) => {
                    cursor.set(index + 1);
                    push.call(value.clone());
                }
                None => end.call(),
            }
        })
    })
}

/// Sequence-bounded source: `More` for every value but the last, `Last` for
/// the last, then `Ended` together with end on every later pull.
pub fn sequence<T: Clone + 'static>(values: impl IntoIterator<Item = T>) -> Source<Endable<T>> {
    let values: Rc<[T]> = values.into_iter().collect();
    Source::new(move |push, end| {
        let values = values.clone();
        let cursor = Cell::new(0usize);
        Pull::new(move || {
            let index = cursor.get();
            match values.get(index) {
                Some(value) => {
                    cursor.set(index + 1);
                    if index + 1 == values.len() {
                        push.call(Endable::Last(value.clone()));
                    } else {
                        push.call(Endable::More(value.clone()));
                    }
                }
                None => {
                    push.call(Endable::Ended);
                    end.call();
                }
            }
        })
    })
}

/// Source driven imperatively through the returned [`Emitter`].
///
/// Every binding receives every emission. Pull is a no-op.
///
/// Bindings are kept until the last handle is dropped; there is no
/// unsubscribe, so binding the source in a loop leaks one entry per bind.
pub fn emitter<T: Clone + 'static>() -> (Emitter<T>, Source<T>) {
    let bindings: Rc<RefCell<Vec<(Push<T>, End)>>> = Rc::new(RefCell::new(Vec::new()));
    let emitter = Emitter {
        bindings: bindings.clone(),
    };
    let source = Source::new(move |push, end| {
        bindings.borrow_mut().push((push, end));
        Pull::noop()
    });
    (emitter, source)
}

/// Push side of [`emitter`], standing in for interrupt or I/O driven producers.
#[derive(Clone)]
pub struct Emitter<T> {
    bindings: Rc<RefCell<Vec<(Push<T>, End)>>>,
}

impl<T: Clone + 'static> Emitter<T> {
    pub fn emit(&self, value: T) {
        let mut index = 0;
        // Re-borrow per binding so consumers may bind again while we emit.
        while let Some(push) = self.binding(index).map(|(push, _)| push) {
            push.call(value.clone());
            index += 1;
        }
    }

    pub fn finish(&self) {
        let mut index = 0;
        while let Some((_, end)) = self.binding(index) {
            end.call();
            index += 1;
        }
    }

    /// Number of bindings made so far; never shrinks.
    pub fn binding_count(&self) -> usize {
        self.bindings.borrow().len()
    }

    fn binding(&self, index: usize) -> Option<(Push<T>, End)> {
        self.bindings.borrow().get(index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::Collector;

    #[test]
    fn test_from_fn_pushes_only_on_pull() {
        let counter = Rc::new(Cell::new(0));
        let c = counter.clone();
        let source = from_fn(move || {
            c.set(c.get() + 1);
            c.get()
        });
        let collector = Collector::new();
        let pull = collector.attach(&source);
        assert!(collector.values().is_empty());
        pull.call();
        pull.call();
        assert_eq!(collector.values(), vec![1, 2]);
    }

    #[test]
    fn test_iterate_resignals_end() {
        let collector = Collector::new();
        let pull = collector.attach(&iterate([1, 2]));
        for _ in 0..4 {
            pull.call();
        }
        assert_eq!(collector.values(), vec![1, 2]);
        assert_eq!(collector.end_count(), 2);
    }

    #[test]
    fn test_bindings_are_independent() {
        let source = iterate(["a", "b"]);
        let first = Collector::new();
        let second = Collector::new();
        let pull_first = first.attach(&source);
        let pull_second = second.attach(&source);
        pull_first.call();
        pull_first.call();
        pull_second.call();
        assert_eq!(first.values(), vec!["a", "b"]);
        assert_eq!(second.values(), vec!["a"]);
    }

    #[test]
    fn test_sequence_marks_last_and_ended() {
        let collector = Collector::new();
        let pull = collector.attach(&sequence([10, 20]));
        pull.call();
        pull.call();
        pull.call();
        assert_eq!(
            collector.values(),
            vec![Endable::More(10), Endable::Last(20), Endable::Ended]
        );
        assert_eq!(collector.end_count(), 1);
    }

    #[test]
    fn test_empty_ends_on_every_pull() {
        let collector = Collector::<u8>::new();
        let pull = collector.attach(&empty());
        pull.call();
        pull.call();
        assert_eq!(collector.end_count(), 2);
    }

    #[test]
    fn test_emitter_fans_out() {
        let (emitter, source) = emitter();
        let a = Collector::new();
        let b = Collector::new();
        a.attach(&source);
        b.attach(&source);
        emitter.emit(7);
        emitter.finish();
        assert_eq!(a.values(), vec![7]);
        assert_eq!(b.values(), vec![7]);
        assert!(a.is_ended() && b.is_ended());
    }

    #[test]
    fn test_emitter_keeps_dropped_bindings() {
        let (emitter, source) = emitter::<u8>();
        for _ in 0..3 {
            let collector = Collector::new();
            collector.attach(&source);
        }
        assert_eq!(emitter.binding_count(), 3);
        emitter.emit(1);
        assert_eq!(emitter.binding_count(), 3);
    }

    #[test]
    fn test_try_from_fn_wraps_failures() {
        let fail = Rc::new(Cell::new(false));
        let f = fail.clone();
        let source = try_from_fn(move || if f.get() { Err("disconnected") } else { Ok(3) });
        let collector = Collector::new();
        let pull = collector.attach(&source);
        pull.call();
        fail.set(true);
        pull.call();
        assert_eq!(
            collector.values(),
            vec![Fallible::Success(3), Fallible::Failure("disconnected")]
        );
    }
}
