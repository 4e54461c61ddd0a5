//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use hybridflow::{Collector, Source};

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Bind `source` and pull it `pulls` times
pub fn drain<T: Clone + 'static>(source: &Source<T>, pulls: usize) -> Collector<T> {
    let collector = Collector::new();
    let pull = collector.attach(source);
    for _ in 0..pulls {
        pull.call();
    }
    collector
}
