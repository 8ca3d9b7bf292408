// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Subscription lifecycle: laziness, teardown, containment.

mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{completed, recorder, Seen};
use ripple_core::{Broadcaster, Emitter, Stream, StreamError, Subscriber, Teardown};

fn counting_teardown(runs: &Rc<Cell<u32>>) -> Teardown {
    let runs = Rc::clone(runs);
    Teardown::action(move || runs.set(runs.get() + 1))
}

#[test]
fn producer_is_lazy_and_runs_per_subscription() {
    let starts = Rc::new(Cell::new(0));
    let counter = Rc::clone(&starts);
    let stream = Stream::new(move |emitter: Emitter<u32>| {
        counter.set(counter.get() + 1);
        emitter.next(counter.get());
        emitter.complete();
    });
    assert_eq!(starts.get(), 0);

    let (first, first_log) = recorder();
    let (second, second_log) = recorder();
    stream.subscribe(first);
    stream.subscribe(second);

    assert_eq!(starts.get(), 2);
    assert_eq!(*first_log.borrow(), completed([1]));
    assert_eq!(*second_log.borrow(), completed([2]));
}

#[test]
fn synchronous_emissions_arrive_before_subscribe_returns() {
    let (subscriber, log) = recorder();
    let sub = Stream::new(|emitter: Emitter<&str>| {
        emitter.next("x");
        emitter.complete();
    })
    .subscribe(subscriber);
    assert_eq!(*log.borrow(), completed(["x"]));
    assert!(sub.is_closed());
}

#[test]
fn teardown_runs_exactly_once() {
    let runs = Rc::new(Cell::new(0));
    let tracked = Rc::clone(&runs);
    let stream = Stream::new(move |_: Emitter<u8>| counting_teardown(&tracked));
    let sub = stream.subscribe(Subscriber::new());
    sub.cancel();
    sub.cancel();
    assert_eq!(runs.get(), 1);
}

#[test]
fn terminal_event_releases_resources() {
    let runs = Rc::new(Cell::new(0));
    let tracked = Rc::clone(&runs);
    let stream = Stream::new(move |emitter: Emitter<u8>| {
        emitter.subscription().add_teardown(counting_teardown(&tracked));
        emitter.complete();
        counting_teardown(&tracked)
    });
    let sub = stream.subscribe(Subscriber::new());
    assert!(sub.is_closed());
    assert_eq!(runs.get(), 2);
    sub.cancel();
    assert_eq!(runs.get(), 2);
}

#[test]
fn producer_panic_is_delivered_as_runtime_error() {
    let (subscriber, log) = recorder::<u8>();
    let stream = Stream::new(|emitter: Emitter<u8>| -> Teardown {
        emitter.next(1);
        panic!("producer blew up");
    });
    let sub = stream.subscribe(subscriber);

    let log = log.borrow();
    assert_eq!(log[0], Seen::Next(1));
    match &log[1] {
        Seen::Error(StreamError::Runtime(err)) => {
            assert_eq!(err.origin, "producer");
            assert_eq!(err.message, "producer blew up");
        }
        other => panic!("expected runtime error, got {other:?}"),
    }
    assert!(sub.is_closed());
}

#[test]
fn panicking_callback_does_not_escape_the_producer() {
    let (subscriber, log) = recorder::<u8>();
    let stream = Stream::new(|emitter: Emitter<u8>| {
        emitter.next(1);
        emitter.next(2);
    });
    stream
        .map(|v| {
            assert!(v < 2, "too big");
            v
        })
        .subscribe(subscriber);
    let log = log.borrow();
    assert_eq!(log.len(), 2);
    assert!(matches!(log[1], Seen::Error(StreamError::Runtime(_))));
}

#[test]
fn injected_value_source_separates_cold_from_hot() {
    let source = Rc::new(Cell::new(0_u32));
    let draw = {
        let source = Rc::clone(&source);
        move || {
            source.set(source.get() + 1);
            source.get()
        }
    };

    // Cold: every subscriber triggers its own draw.
    let cold = {
        let draw = draw.clone();
        Stream::new(move |emitter: Emitter<u32>| emitter.next(draw()))
    };
    let (a, a_log) = recorder();
    let (b, b_log) = recorder();
    cold.subscribe(a);
    cold.subscribe(b);
    assert_ne!(a_log.borrow()[0], b_log.borrow()[0]);

    // Hot: one draw shared by every subscriber.
    let hot = Broadcaster::new();
    let (c, c_log) = recorder();
    let (d, d_log) = recorder();
    hot.subscribe(c);
    hot.subscribe(d);
    hot.next(draw());
    assert_eq!(*c_log.borrow(), *d_log.borrow());
    assert_eq!(source.get(), 3);
}
