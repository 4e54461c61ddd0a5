//! Scripted inputs for time-windowed operators

use hybridflow::source::emitter;
use hybridflow::{Collector, ManualClock, Source};

/// Values pushed at given tick offsets of a manual `u32` clock
pub struct TimedScript<T> {
    start: u32,
    steps: Vec<(u32, T)>,
}

impl<T: Clone + 'static> TimedScript<T> {
    pub fn new() -> Self {
        Self {
            start: 0,
            steps: Vec::new(),
        }
    }

    /// Absolute clock value of offset zero
    pub fn starting_at(mut self, start: u32) -> Self {
        self.start = start;
        self
    }

    pub fn at(mut self, offset: u32, value: T) -> Self {
        self.steps.push((offset, value));
        self
    }

    /// One value per tick, continuing after the last step
    pub fn ticks(mut self, values: impl IntoIterator<Item = T>) -> Self {
        let mut offset = self.steps.last().map(|(o, _)| o + 1).unwrap_or(0);
        for value in values {
            self.steps.push((offset, value));
            offset += 1;
        }
        self
    }

    /// Feed the script through `build` and collect what comes out
    pub fn run<U: Clone + 'static>(
        self,
        build: impl FnOnce(Source<T>, Source<u32>) -> Source<U>,
    ) -> Vec<U> {
        let clock = ManualClock::new(self.start);
        let (tx, input) = emitter();
        let collector = Collector::new();
        collector.attach(&build(input, clock.source()));
        for (offset, value) in self.steps {
            clock.set(self.start.wrapping_add(offset));
            tx.emit(value);
        }
        collector.values()
    }
}

