//! Reactive cell: imperative code's entry point into the graph.
//!
//! A [`ReactiveCell`] stores an optional value and fans every [`set`] out to
//! its subscribers, in subscription order, before `set` returns. It is also a
//! pull-compatible producer through [`source`]: pulling a binding re-delivers
//! the current value to that binding only.
//!
//! Cloning a cell clones the handle. All clones see the same value and the
//! same subscriber list.
//!
//! [`set`]: ReactiveCell::set
//! [`source`]: ReactiveCell::source

use crate::error::ContractViolation;
use crate::source::{Pull, Push, Source};
use std::cell::RefCell;
use std::rc::Rc;

struct CellInner<T> {
    value: RefCell<Option<T>>,
    subscribers: RefCell<Vec<Push<T>>>,
}

/// Mutable value holder with synchronous fan-out.
pub struct ReactiveCell<T> {
    inner: Rc<CellInner<T>>,
}

impl<T> Clone for ReactiveCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> ReactiveCell<T> {
    /// Create an empty cell
    pub fn new() -> Self {
        Self::from_option(None)
    }

    /// Create a cell holding `value`
    pub fn with_value(value: T) -> Self {
        Self::from_option(Some(value))
    }

    fn from_option(value: Option<T>) -> Self {
        Self {
            inner: Rc::new(CellInner {
                value: RefCell::new(value),
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Store `value` and notify every subscriber
    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = Some(value.clone());
        self.notify(value);
    }

    /// Store `value` without notifying anyone
    pub fn set_silently(&self, value: T) {
        *self.inner.value.borrow_mut() = Some(value);
    }

    /// Replace the value with `f(current)` and notify
    pub fn update(&self, f: impl FnOnce(Option<T>) -> T) {
        let current = self.inner.value.borrow().clone();
        self.set(f(current));
    }

    pub fn try_get(&self) -> Result<T, ContractViolation> {
        self.inner
            .value
            .borrow()
            .clone()
            .ok_or(ContractViolation::UnsetCell)
    }

    /// Current value
    ///
    /// # Panics
    ///
    /// Panics with [`ContractViolation::UnsetCell`] if nothing was set yet.
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(violation) => panic!("{violation}"),
        }
    }

    pub fn is_set(&self) -> bool {
        self.inner.value.borrow().is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Register `push`, optionally delivering the current value right away
    ///
    /// Subscribers are never removed; the list lives as long as the cell.
    pub fn subscribe(&self, push: Push<T>, emit_current: bool) {
        self.inner.subscribers.borrow_mut().push(push.clone());
        tracing::debug!(
            subscribers = self.subscriber_count(),
            "reactive cell subscription added"
        );
        if emit_current {
            let current = self.inner.value.borrow().clone();
            if let Some(value) = current {
                push.call(value);
            }
        }
    }

    /// Producer view of this cell
    ///
    /// Binding subscribes without emitting; each pull pushes the current value
    /// (if any) to that binding. The source never ends.
    ///
    /// There is no unsubscribe: every bind adds a subscriber for the rest of
    /// the cell's life, so rebinding in a loop grows the list without bound.
    pub fn source(&self) -> Source<T> {
        let cell = self.clone();
        Source::new(move |push, _end| {
            cell.subscribe(push.clone(), false);
            let cell = cell.clone();
            Pull::new(move || {
                let current = cell.inner.value.borrow().clone();
                if let Some(value) = current {
                    push.call(value);
                }
            })
        })
    }

    /// Bind `source` so that each of its values is `set` on this cell
    pub fn assign_from(&self, source: &Source<T>) -> Pull {
        let cell = self.clone();
        source.subscribe(move |value| cell.set(value))
    }

    fn notify(&self, value: T) {
        // Index walk with a fresh borrow per step: subscribers may subscribe
        // or set while being notified.
        let mut index = 0;
        loop {
            let subscriber = self.inner.subscribers.borrow().get(index).cloned();
            match subscriber {
                Some(push) => push.call(value.clone()),
                None => break,
            }
            index += 1;
        }
    }
}

impl<T: Clone + 'static> Default for ReactiveCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + std::fmt::Debug + 'static> std::fmt::Debug for ReactiveCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveCell")
            .field("value", &*self.inner.value.borrow())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::Collector;
    use std::cell::Cell;

    #[test]
    fn test_set_notifies_in_order() {
        let cell = ReactiveCell::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for id in 0..3 {
            let order = order.clone();
            cell.subscribe(Push::new(move |v: i32| order.borrow_mut().push((id, v))), false);
        }
        cell.set(9);
        assert_eq!(*order.borrow(), vec![(0, 9), (1, 9), (2, 9)]);
    }

    #[test]
    fn test_subscribe_can_emit_current() {
        let cell = ReactiveCell::with_value(4);
        let seen = Rc::new(Cell::new(0));
        let s = seen.clone();
        cell.subscribe(Push::new(move |v| s.set(v)), true);
        assert_eq!(seen.get(), 4);
    }

    #[test]
    fn test_set_silently_skips_subscribers() {
        let cell = ReactiveCell::new();
        let collector = Collector::new();
        collector.attach(&cell.source());
        cell.set_silently(1);
        assert!(collector.is_empty());
        assert_eq!(cell.get(), 1);
    }

    #[test]
    fn test_source_pull_targets_single_binding() {
        let cell = ReactiveCell::with_value("on");
        let a = Collector::new();
        let b = Collector::new();
        let pull_a = a.attach(&cell.source());
        b.attach(&cell.source());
        pull_a.call();
        assert_eq!(a.values(), vec!["on"]);
        assert!(b.is_empty());
        cell.set("off");
        assert_eq!(a.values(), vec!["on", "off"]);
        assert_eq!(b.values(), vec!["off"]);
    }

    #[test]
    fn test_unset_cell_is_violation() {
        let cell = ReactiveCell::<u8>::new();
        assert_eq!(cell.try_get(), Err(ContractViolation::UnsetCell));
        assert!(!cell.is_set());
    }

    #[test]
    #[should_panic(expected = "unset reactive cell")]
    fn test_get_unset_panics() {
        ReactiveCell::<u8>::new().get();
    }

    #[test]
    fn test_reentrant_subscribe_during_notify() {
        let cell = ReactiveCell::new();
        let inner = cell.clone();
        let late = Collector::new();
        let late_clone = late.clone();
        cell.subscribe(
            Push::new(move |_v: i32| {
                if inner.subscriber_count() == 1 {
                    late_clone.attach(&inner.source());
                }
            }),
            false,
        );
        cell.set(1);
        assert_eq!(cell.subscriber_count(), 2);
        // The subscriber added mid-notification sees the same value.
        assert_eq!(late.values(), vec![1]);
    }

    #[test]
    fn test_assign_from_bridges_source() {
        let cell = ReactiveCell::new();
        let pull = cell.assign_from(&crate::source::iterate([3, 4]));
        pull.call();
        assert_eq!(cell.get(), 3);
        pull.call();
        assert_eq!(cell.get(), 4);
    }

    #[test]
    fn test_update_uses_current() {
        let cell = ReactiveCell::with_value(2);
        cell.update(|v| v.unwrap_or(0) * 5);
        assert_eq!(cell.get(), 10);
    }

    #[test]
    fn test_rebinding_source_accumulates_subscribers() {
        let cell = ReactiveCell::with_value(0u8);
        let source = cell.source();
        for _ in 0..4 {
            let collector = Collector::new();
            collector.attach(&source);
        }
        assert_eq!(cell.subscriber_count(), 4);
    }
}
