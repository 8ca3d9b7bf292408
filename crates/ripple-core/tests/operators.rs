// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Behaviour of the canonical operators against synchronous sources.

mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{completed, recorder, Seen};
use ripple_core::{
    defer, filter, from_iterable, map, of, skip, Emitter, Stream, StreamError, Subscriber,
};

#[test]
fn map_transforms_every_value() {
    let (subscriber, log) = recorder();
    of(vec![1, 2, 3]).pipe(map(|v: i32| v * 10)).subscribe(subscriber);
    assert_eq!(*log.borrow(), completed([10, 20, 30]));
}

#[test]
fn filter_drops_rejected_values_only() {
    let (subscriber, log) = recorder();
    of(vec!['a', 'b', 'c', 'd'])
        .pipe(filter(|c: &char| *c != 'b'))
        .subscribe(subscriber);
    assert_eq!(*log.borrow(), completed(['a', 'c', 'd']));
}

#[test]
fn skip_two_of_three_keeps_the_last() {
    let (subscriber, log) = recorder();
    of(vec!['a', 'b', 'c']).pipe(skip(2)).subscribe(subscriber);
    assert_eq!(*log.borrow(), completed(['c']));
}

#[test]
fn skip_more_than_available_only_completes() {
    let (subscriber, log) = recorder();
    of(vec!['a', 'b']).pipe(skip(2)).subscribe(subscriber);
    assert_eq!(*log.borrow(), vec![Seen::Complete]);
}

#[test]
fn skip_counts_per_subscription() {
    let stream = of(vec![1, 2, 3]).skip(1);
    let (first, first_log) = recorder();
    let (second, second_log) = recorder();
    stream.subscribe(first);
    stream.subscribe(second);
    assert_eq!(*first_log.borrow(), completed([2, 3]));
    assert_eq!(*second_log.borrow(), completed([2, 3]));
}

#[test]
fn operators_compose_left_to_right() {
    let (subscriber, log) = recorder();
    of(vec!['a', 'b', 'c', 'd', 'e'])
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| *c != 'A' && *c != 'D')
        .skip(1)
        .subscribe(subscriber);
    assert_eq!(*log.borrow(), completed(['C', 'E']));
}

#[test]
fn panicking_projection_becomes_runtime_error_and_stops_the_source() {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let (subscriber, log) = recorder();
    from_iterable(1..=5)
        .map(move |v: i32| {
            counter.set(counter.get() + 1);
            assert!(v != 3, "three is not allowed");
            v * 10
        })
        .subscribe(subscriber);

    let log = log.borrow();
    assert_eq!(log[..2], [Seen::Next(10), Seen::Next(20)]);
    assert_eq!(log.len(), 3);
    match &log[2] {
        Seen::Error(StreamError::Runtime(err)) => {
            assert_eq!(err.origin, "map");
            assert!(err.message.contains("three is not allowed"));
        }
        other => panic!("expected runtime error, got {other:?}"),
    }
    assert_eq!(calls.get(), 3, "upstream must stop after the error");
}

#[test]
fn panicking_predicate_becomes_runtime_error() {
    let (subscriber, log) = recorder();
    of(vec![1, 2])
        .filter(|_: &i32| panic!("predicate exploded"))
        .subscribe(subscriber);
    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert!(matches!(&log[0], Seen::Error(StreamError::Runtime(err)) if err.origin == "filter"));
}

#[test]
fn try_map_error_terminates_with_the_returned_payload() {
    let (subscriber, log) = recorder();
    of(vec![1, 2, 3])
        .try_map(|v: i32| {
            if v == 2 {
                Err(StreamError::raised("two"))
            } else {
                Ok(v)
            }
        })
        .subscribe(subscriber);
    assert_eq!(
        *log.borrow(),
        vec![Seen::Next(1), Seen::Error(StreamError::raised("two"))]
    );
}

#[test]
fn operators_ignore_a_misbehaving_source_after_its_terminal() {
    let raw = Stream::new(|emitter: Emitter<i32>| {
        emitter.next(1);
        emitter.complete();
        emitter.next(2);
        emitter.error(StreamError::raised("late"));
        emitter.complete();
    });
    let (subscriber, log) = recorder();
    raw.map(|v| v + 1).filter(|_| true).subscribe(subscriber);
    assert_eq!(*log.borrow(), completed([2]));
}

#[test]
fn error_passes_through_operators_untouched() {
    let raw = Stream::new(|emitter: Emitter<i32>| {
        emitter.next(1);
        emitter.error(StreamError::raised("boom"));
    });
    let (subscriber, log) = recorder();
    raw.map(|v| v * 2).skip(0).subscribe(subscriber);
    assert_eq!(
        *log.borrow(),
        vec![Seen::Next(2), Seen::Error(StreamError::raised("boom"))]
    );
}

#[test]
fn from_iterable_stops_when_the_subscriber_cancels() {
    let pulled = Rc::new(Cell::new(0));
    let source = {
        let pulled = Rc::clone(&pulled);
        from_iterable((0..100).inspect(move |_| pulled.set(pulled.get() + 1)))
    };
    let (subscriber, log) = recorder();
    // An error downstream cancels the whole chain.
    source
        .try_map(|v: i32| if v < 2 { Ok(v) } else { Err(StreamError::raised("enough")) })
        .subscribe(subscriber);
    assert_eq!(log.borrow().len(), 3);
    assert!(pulled.get() < 5, "pulled {} items", pulled.get());
}

#[test]
fn empty_source_only_completes() {
    let (subscriber, log) = recorder();
    of(Vec::<u8>::new()).map(u32::from).subscribe(subscriber);
    assert_eq!(*log.borrow(), vec![Seen::Complete]);
}

#[test]
fn defer_builds_a_fresh_stream_per_subscription() {
    let builds = Rc::new(Cell::new(0));
    let counter = Rc::clone(&builds);
    let stream = defer(move || {
        counter.set(counter.get() + 1);
        of(vec![counter.get()])
    });
    assert_eq!(builds.get(), 0);

    let (first, first_log) = recorder();
    let (second, second_log) = recorder();
    stream.subscribe(first);
    stream.subscribe(second);

    assert_eq!(builds.get(), 2);
    assert_eq!(*first_log.borrow(), completed([1]));
    assert_eq!(*second_log.borrow(), completed([2]));
}

#[test]
fn subscribe_next_ignores_terminal_events() {
    let total = Rc::new(Cell::new(0));
    let sink = Rc::clone(&total);
    let sub = of(vec![1, 2, 3]).subscribe_next(move |v| sink.set(sink.get() + v));
    assert_eq!(total.get(), 6);
    assert!(sub.is_closed());
}

#[test]
fn cancelling_downstream_cancels_upstream() {
    let torn_down = Rc::new(Cell::new(false));
    let flag = Rc::clone(&torn_down);
    let never = Stream::new(move |_emitter: Emitter<i32>| {
        let flag = Rc::clone(&flag);
        ripple_core::Teardown::action(move || flag.set(true))
    });
    let sub = never.map(|v| v).skip(1).subscribe(Subscriber::new());
    assert!(!torn_down.get());
    sub.cancel();
    assert!(torn_down.get());
}
