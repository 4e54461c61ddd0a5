//! Observable guarantees of the producer/consumer protocol and its operators

mod common;

use common::builders::TimedScript;
use common::drain;
use hybridflow::clock::stamp;
use hybridflow::ops::{
    cache, combine2, concat, debounce, exponential_moving_average, merge, throttle, zip2,
};
use hybridflow::source::{emitter, empty, from_fn, iterate};
use hybridflow::{Collector, End, Pull, Push, ReactiveCell, Source};
use std::cell::Cell;
use std::rc::Rc;

/// Pushes `value` on the first pull only, then stays silent.
fn push_once<T: Clone + 'static>(value: T) -> Source<T> {
    Source::new(move |push, _end| {
        let value = value.clone();
        let done = Rc::new(Cell::new(false));
        Pull::new(move || {
            if !done.replace(true) {
                push.call(value.clone());
            }
        })
    })
}

#[test]
fn test_cache_idempotence() {
    let collector = drain(&push_once(9).pipe(cache()), 2);
    assert_eq!(collector.values(), vec![9, 9]);

    let collector = drain(&iterate([9]).pipe(cache()), 2);
    assert_eq!(collector.values(), vec![9, 9]);
    assert!(!collector.is_ended());
}

#[test]
fn test_cache_non_duplication() {
    let counter = Rc::new(Cell::new(0));
    let c = counter.clone();
    let sensor = from_fn(move || {
        c.set(c.get() + 1);
        c.get()
    });
    let collector = drain(&sensor.pipe(cache()), 3);
    assert_eq!(collector.values(), vec![1, 2, 3]);
}

#[test]
fn test_combine_priming() {
    let (a_tx, a) = emitter();
    let (b_tx, b) = emitter();
    let collector = Collector::new();
    collector.attach(&combine2(a, b, |x: i32, y: i32| x * 10 + y));
    a_tx.emit(1);
    a_tx.emit(2);
    assert!(collector.is_empty());
    b_tx.emit(5);
    a_tx.emit(3);
    b_tx.emit(6);
    assert_eq!(collector.values(), vec![25, 35, 36]);
}

#[test]
fn test_throttle_windowing() {
    let output = TimedScript::new()
        .ticks(0..=22u32)
        .run(|input, clock| input.pipe(throttle(10, clock)));
    assert_eq!(output, vec![0, 11, 22]);
}

#[test]
fn test_debounce_settle_and_revert() {
    let interval = 6;
    let stable = std::iter::repeat('A').take(10);
    let alternating = "BC".chars().cycle().take(interval as usize - 1);

    let reverted = TimedScript::new()
        .ticks(stable.clone().chain(alternating).chain(['A']))
        .run(|input, clock| input.pipe(debounce(interval, clock)));
    assert_eq!(reverted.last(), Some(&'A'));
    assert!(reverted.iter().all(|&v| v == 'A'));

    let flipped = TimedScript::new()
        .ticks(stable.chain(std::iter::repeat('B').take(interval as usize + 1)))
        .run(|input, clock| input.pipe(debounce(interval, clock)));
    assert_eq!(flipped.last(), Some(&'B'));
}

#[test]
fn test_debounce_across_tick_counter_wrap() {
    let script = || "AAAAAAABBBBBBB".chars().collect::<Vec<_>>();
    let plain = TimedScript::new()
        .ticks(script())
        .run(|input, clock| input.pipe(debounce(4, clock)));
    let wrapped = TimedScript::new()
        .starting_at(u32::MAX - 5)
        .ticks(script())
        .run(|input, clock| input.pipe(debounce(4, clock)));
    assert_eq!(plain, wrapped);
}

#[test]
fn test_zip_reset_on_pull() {
    let a = ReactiveCell::with_value(1);
    let b = ReactiveCell::with_value('x');
    let collector = Collector::new();
    let pull = collector.attach(&zip2(a.source(), b.source()));
    pull.call();
    assert_eq!(collector.take(), vec![(1, 'x')]);

    // Only `a` answers the next pull; nothing stale is combined.
    let silent_b = push_once('y');
    let collector = Collector::new();
    let pull = collector.attach(&zip2(a.source(), silent_b));
    pull.call();
    pull.call();
    assert_eq!(collector.values(), vec![(1, 'y')]);
}

#[test]
fn test_ema_stability_on_constant_input() {
    let output = TimedScript::new()
        .at(0, 4.25)
        .at(3, 4.25)
        .at(1_000, 4.25)
        .at(1_001, 4.25)
        .run(|input, clock| input.pipe(exponential_moving_average(7, clock)));
    assert_eq!(output, vec![4.25; 4]);
}

#[test]
fn test_end_is_resignalled_on_every_pull() {
    let collector = drain(&iterate([1]).pipe(hybridflow::ops::map(|v: i32| v)), 4);
    assert_eq!(collector.end_count(), 3);

    let collector = drain(&empty::<u8>(), 2);
    assert_eq!(collector.end_count(), 2);
}

#[test]
fn test_reentrant_push_during_pull() {
    // A consumer that sets the cell it is reading from while handling a push.
    let cell = ReactiveCell::with_value(0);
    let seen = Rc::new(Cell::new(0));
    let (writer, s) = (cell.clone(), seen.clone());
    let pull = cell.source().bind(
        Push::new(move |v: i32| {
            s.set(s.get() + 1);
            if v < 3 {
                writer.set(v + 1);
            }
        }),
        End::noop(),
    );
    pull.call();
    assert_eq!(cell.get(), 3);
    assert_eq!(seen.get(), 4);
}

#[test]
fn test_merge_and_concat_ordering() {
    let collector = drain(&merge(iterate([1, 2]), iterate([10])), 2);
    assert_eq!(collector.values(), vec![1, 10, 2]);

    let collector = drain(&concat(iterate([1, 2]), iterate([3])), 4);
    assert_eq!(collector.values(), vec![1, 2, 3]);
    assert!(collector.is_ended());
}

#[test]
fn test_timed_script_ticks_follow_last_step() {
    let stamped = TimedScript::new()
        .starting_at(100)
        .at(5, 'a')
        .ticks(['b', 'c'])
        .run(|input, clock| input.pipe(stamp(clock)));
    let ticks: Vec<(char, u32)> = stamped.iter().map(|v| (*v.value(), *v.tag())).collect();
    assert_eq!(ticks, vec![('a', 105), ('b', 106), ('c', 107)]);
}
