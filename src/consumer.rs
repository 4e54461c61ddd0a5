//! Terminal consumers.
//!
//! A consumer binds a source and performs a side effect per value. These are
//! the shapes external collaborators (displays, publishers, test harnesses)
//! use to sit at the end of a graph.

use crate::source::{End, Pull, Push, Source};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Consumer function running `f` for every value; returns the binding's pull.
pub fn for_each<T: 'static>(f: impl Fn(T) + 'static) -> impl FnOnce(Source<T>) -> Pull {
    move |source| source.subscribe(f)
}

/// Records every pushed value and end signal.
///
/// Cloning shares the recording, so a clone can be attached while the
/// original is inspected.
pub struct Collector<T> {
    values: Rc<RefCell<Vec<T>>>,
    ends: Rc<Cell<usize>>,
}

impl<T> Clone for Collector<T> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            ends: self.ends.clone(),
        }
    }
}

impl<T: 'static> Collector<T> {
    pub fn new() -> Self {
        Self {
            values: Rc::new(RefCell::new(Vec::new())),
            ends: Rc::new(Cell::new(0)),
        }
    }

    /// Bind `source`, recording into this collector.
    pub fn attach(&self, source: &Source<T>) -> Pull {
        let values = self.values.clone();
        let ends = self.ends.clone();
        source.bind(
            Push::new(move |v| values.borrow_mut().push(v)),
            End::new(move || ends.set(ends.get() + 1)),
        )
    }

    /// Number of end signals observed.
    pub fn end_count(&self) -> usize {
        self.ends.get()
    }

    pub fn is_ended(&self) -> bool {
        self.ends.get() > 0
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }

    /// Drain the recorded values.
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.values.borrow_mut())
    }
}

impl<T: Clone + 'static> Collector<T> {
    pub fn values(&self) -> Vec<T> {
        self.values.borrow().clone()
    }

    pub fn last(&self) -> Option<T> {
        self.values.borrow().last().cloned()
    }
}

impl<T: 'static> Default for Collector<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Synchronous "give me a value now" view over a source.
pub struct Poller<T> {
    latest: Rc<RefCell<Option<T>>>,
    ended: Rc<Cell<bool>>,
    pull: Pull,
}

impl<T: 'static> Poller<T> {
    pub fn new(source: &Source<T>) -> Self {
        let latest = Rc::new(RefCell::new(None));
        let ended = Rc::new(Cell::new(false));
        let slot = latest.clone();
        let flag = ended.clone();
        let pull = source.bind(
            Push::new(move |v| *slot.borrow_mut() = Some(v)),
            End::new(move || flag.set(true)),
        );
        Self {
            latest,
            ended,
            pull,
        }
    }

    /// Pull and return the freshest value pushed since the previous poll.
    ///
    /// Values pushed spontaneously between polls count; the latest wins.
    pub fn poll(&self) -> Option<T> {
        self.pull.call();
        self.latest.borrow_mut().take()
    }

    pub fn is_ended(&self) -> bool {
        self.ended.get()
    }
}

/// Bind `source`, pull it `pulls` times and return the recording.
#[cfg(test)]
pub(crate) fn drain<T: 'static>(source: &Source<T>, pulls: usize) -> Collector<T> {
    let collector = Collector::new();
    let pull = collector.attach(source);
    for _ in 0..pulls {
        pull.call();
    }
    collector
}
