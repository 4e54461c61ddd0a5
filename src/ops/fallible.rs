//! Operators over `Fallible` streams.
//!
//! Domain failures are values. These operators are the sanctioned places
//! where the error branch is logged, replaced or dropped.

use super::transform::{filter_map, inspect, map};
use crate::source::Source;
use crate::types::Fallible;
use std::fmt::Display;

/// Forward successes; log each failure at `warn` and drop it.
pub fn make_infallible<T, E>() -> impl Fn(Source<Fallible<T, E>>) -> Source<T>
where
    T: 'static,
    E: Display + 'static,
{
    filter_map(|item: Fallible<T, E>| match item {
        Fallible::Success(value) => Some(value),
        Fallible::Failure(error) => {
            tracing::warn!(%error, "dropping failed value");
            None
        }
    })
}

/// Forward every value unchanged, logging failures at `error`.
pub fn log_errors<T, E>(
    context: impl Into<String>,
) -> impl Fn(Source<Fallible<T, E>>) -> Source<Fallible<T, E>>
where
    T: 'static,
    E: Display + 'static,
{
    let context = context.into();
    inspect(move |item: &Fallible<T, E>| {
        if let Fallible::Failure(error) = item {
            tracing::error!(context = %context, %error, "domain failure");
        }
    })
}

/// Replace each failure with a clone of `default`.
pub fn unwrap_fallible<T, E>(default: T) -> impl Fn(Source<Fallible<T, E>>) -> Source<T>
where
    T: Clone + 'static,
    E: 'static,
{
    map(move |item: Fallible<T, E>| item.unwrap_or(default.clone()))
}
