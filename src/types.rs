//! Value wrappers shared by producers and operators
//!
//! This module contains the small types that flow through the graph
//! alongside plain values:
//!
//! - [`Endable`] - Tri-state value of sequence-bounded producers
//! - [`Fallible`] - Success/error sum carried as a first-class graph value
//! - [`TaggedValue`] - Payload paired with metadata, usually a timestamp
//! - [`Range`] - Inclusive `[min, max]` pair
//!
//! Accessors that would have to invent a value (the payload of an ended
//! sequence, the wrong side of a `Fallible`) have a `try_*` form returning
//! [`ContractViolation`] and a panicking form for code that has already
//! established the case.

use crate::error::ContractViolation;
use serde::{Deserialize, Serialize};

// ==================== Endable ====================

/// A value from a sequence-bounded producer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endable<T> {
    /// More values may follow
    More(T),
    /// This is the final value
    Last(T),
    /// The sequence has ended; there is no payload
    Ended,
}

impl<T> Endable<T> {
    /// Whether this is the final payload
    pub fn is_last(&self) -> bool {
        matches!(self, Endable::Last(_))
    }

    /// Whether the sequence ended without a payload
    pub fn is_ended(&self) -> bool {
        matches!(self, Endable::Ended)
    }

    /// Whether nothing will follow this value
    pub fn is_final(&self) -> bool {
        !matches!(self, Endable::More(_))
    }

    pub fn try_value(&self) -> Result<&T, ContractViolation> {
        match self {
            Endable::More(v) | Endable::Last(v) => Ok(v),
            Endable::Ended => Err(ContractViolation::EndedPayload),
        }
    }

    /// Get the payload
    ///
    /// # Panics
    ///
    /// Panics with [`ContractViolation::EndedPayload`] on `Ended`.
    pub fn value(&self) -> &T {
        match self.try_value() {
            Ok(v) => v,
            Err(violation) => panic!("{violation}"),
        }
    }

    /// Take the payload, `None` for `Ended`
    pub fn into_value(self) -> Option<T> {
        match self {
            Endable::More(v) | Endable::Last(v) => Some(v),
            Endable::Ended => None,
        }
    }

    /// Transform the payload, keeping the finality flag
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Endable<U> {
        match self {
            Endable::More(v) => Endable::More(f(v)),
            Endable::Last(v) => Endable::Last(f(v)),
            Endable::Ended => Endable::Ended,
        }
    }
}

// ==================== Fallible ====================

/// Success value or domain error, never both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fallible<T, E> {
    Success(T),
    Failure(E),
}

impl<T, E> Fallible<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, Fallible::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Fallible::Failure(_))
    }

    pub fn try_value(&self) -> Result<&T, ContractViolation> {
        match self {
            Fallible::Success(v) => Ok(v),
            Fallible::Failure(_) => Err(ContractViolation::ValueOfFailure),
        }
    }

    pub fn try_error(&self) -> Result<&E, ContractViolation> {
        match self {
            Fallible::Success(_) => Err(ContractViolation::ErrorOfSuccess),
            Fallible::Failure(e) => Ok(e),
        }
    }

    /// Get the success value
    ///
    /// # Panics
    ///
    /// Panics with [`ContractViolation::ValueOfFailure`] on a failure.
    pub fn value(&self) -> &T {
        match self.try_value() {
            Ok(v) => v,
            Err(violation) => panic!("{violation}"),
        }
    }

    /// Get the error value
    ///
    /// # Panics
    ///
    /// Panics with [`ContractViolation::ErrorOfSuccess`] on a success.
    pub fn error(&self) -> &E {
        match self.try_error() {
            Ok(e) => e,
            Err(violation) => panic!("{violation}"),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fallible<U, E> {
        match self {
            Fallible::Success(v) => Fallible::Success(f(v)),
            Fallible::Failure(e) => Fallible::Failure(e),
        }
    }

    pub fn map_err<F>(self, f: impl FnOnce(E) -> F) -> Fallible<T, F> {
        match self {
            Fallible::Success(v) => Fallible::Success(v),
            Fallible::Failure(e) => Fallible::Failure(f(e)),
        }
    }

    /// Success value, or `default` on failure
    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Fallible::Success(v) => v,
            Fallible::Failure(_) => default,
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Fallible::Success(v) => Ok(v),
            Fallible::Failure(e) => Err(e),
        }
    }
}

impl<T, E> From<Result<T, E>> for Fallible<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Fallible::Success(v),
            Err(e) => Fallible::Failure(e),
        }
    }
}

impl<T, E> From<Fallible<T, E>> for Result<T, E> {
    fn from(fallible: Fallible<T, E>) -> Self {
        fallible.into_result()
    }
}

// ==================== Tagged Value ====================

/// A payload paired with metadata attached when it was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaggedValue<T, Tag> {
    value: T,
    tag: Tag,
}

impl<T, Tag> TaggedValue<T, Tag> {
    pub fn new(value: T, tag: Tag) -> Self {
        Self { value, tag }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn into_parts(self) -> (T, Tag) {
        (self.value, self.tag)
    }

    /// Transform the payload, keeping the tag
    pub fn map_value<U>(self, f: impl FnOnce(T) -> U) -> TaggedValue<U, Tag> {
        TaggedValue {
            value: f(self.value),
            tag: self.tag,
        }
    }
}

// ==================== Range ====================

/// Inclusive `[min, max]` pair
///
/// No ordering is enforced between `min` and `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range<T> {
    pub min: T,
    pub max: T,
}

impl<T> Range<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: PartialOrd + Copy> Range<T> {
    /// Whether `value` lies within the bounds
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }

    /// Clamp `value` into the bounds
    pub fn clamp(&self, value: T) -> T {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    /// Whether `min <= max`
    pub fn is_ordered(&self) -> bool {
        self.min <= self.max
    }
}
