// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical operators, built only on the [`Stream`] contract.
//!
//! Transformation operators return an [`Operator`] for use with
//! [`Stream::pipe`]; creation operators return a [`Stream`] directly.
//! Every transformation subscribes upstream as a child of the downstream
//! subscription before the upstream producer runs. Cancelling downstream,
//! or delivering a terminal event to it, therefore reaches upstream even in
//! the middle of a synchronous emission. Callback panics become
//! [`StreamError::Runtime`] errors.

use std::rc::Rc;

use crate::emitter::Emitter;
use crate::error::{contain, StreamError};
use crate::scheduler::Scheduler;
use crate::stream::{Operator, Stream};
use crate::subscriber::Subscriber;

/// Upstream subscriber that forwards terminal events to `downstream`.
fn relay<T: 'static, U: 'static>(downstream: &Emitter<U>) -> Subscriber<T> {
    let on_error = downstream.clone();
    let on_complete = downstream.clone();
    Subscriber::new()
        .on_error(move |err| on_error.error(err))
        .on_complete(move || on_complete.complete())
}

/// Emits `project(v)` for every upstream value.
pub fn map<T, U, F>(project: F) -> impl Operator<T, U>
where
    T: 'static,
    U: 'static,
    F: Fn(T) -> U + 'static,
{
    let project = Rc::new(project);
    move |source: Stream<T>| {
        Stream::new(move |downstream: Emitter<U>| {
            let project = Rc::clone(&project);
            let sink = downstream.clone();
            let upstream = relay(&downstream).on_next(move |value: T| {
                match contain("map", || project(value)) {
                    Ok(mapped) => sink.next(mapped),
                    Err(err) => sink.error(err.into()),
                }
            });
            source.subscribe_child(downstream.subscription(), upstream);
        })
    }
}

/// Like [`map`], but `project` may fail; `Err` terminates the stream.
pub fn try_map<T, U, F>(project: F) -> impl Operator<T, U>
where
    T: 'static,
    U: 'static,
    F: Fn(T) -> Result<U, StreamError> + 'static,
{
    let project = Rc::new(project);
    move |source: Stream<T>| {
        Stream::new(move |downstream: Emitter<U>| {
            let project = Rc::clone(&project);
            let sink = downstream.clone();
            let upstream = relay(&downstream).on_next(move |value: T| {
                match contain("try_map", || project(value)) {
                    Ok(Ok(mapped)) => sink.next(mapped),
                    Ok(Err(err)) => sink.error(err),
                    Err(err) => sink.error(err.into()),
                }
            });
            source.subscribe_child(downstream.subscription(), upstream);
        })
    }
}

/// Forwards only the values for which `predicate` holds. Dropped values
/// leave no trace; surviving and terminal events keep their timing.
pub fn filter<T, P>(predicate: P) -> impl Operator<T, T>
where
    T: 'static,
    P: Fn(&T) -> bool + 'static,
{
    let predicate = Rc::new(predicate);
    move |source: Stream<T>| {
        Stream::new(move |downstream: Emitter<T>| {
            let predicate = Rc::clone(&predicate);
            let sink = downstream.clone();
            let upstream = relay(&downstream).on_next(move |value: T| {
                match contain("filter", || predicate(&value)) {
                    Ok(true) => sink.next(value),
                    Ok(false) => {}
                    Err(err) => sink.error(err.into()),
                }
            });
            source.subscribe_child(downstream.subscription(), upstream);
        })
    }
}

/// Drops the first `count` values of each subscription.
pub fn skip<T: 'static>(count: usize) -> impl Operator<T, T> {
    move |source: Stream<T>| {
        Stream::new(move |downstream: Emitter<T>| {
            let sink = downstream.clone();
            let mut remaining = count;
            let upstream = relay(&downstream).on_next(move |value: T| {
                if remaining > 0 {
                    remaining -= 1;
                } else {
                    sink.next(value);
                }
            });
            source.subscribe_child(downstream.subscription(), upstream);
        })
    }
}

/// Emits every item synchronously, then completes. Stops early if the
/// subscriber cancels mid-iteration.
pub fn from_iterable<I>(items: I) -> Stream<I::Item>
where
    I: IntoIterator + Clone + 'static,
    I::Item: 'static,
{
    Stream::new(move |emitter: Emitter<I::Item>| {
        for item in items.clone() {
            if emitter.is_closed() {
                return;
            }
            emitter.next(item);
        }
        emitter.complete();
    })
}

/// [`from_iterable`] over an owned vector.
pub fn of<T: Clone + 'static>(items: Vec<T>) -> Stream<T> {
    from_iterable(items)
}

/// Builds a fresh stream from `factory` for every subscription.
pub fn defer<T, F>(factory: F) -> Stream<T>
where
    T: 'static,
    F: Fn() -> Stream<T> + 'static,
{
    Stream::new(move |emitter: Emitter<T>| {
        factory().subscribe_child(emitter.subscription(), emitter.clone().into());
    })
}

/// Emits `0` after `delay` frames on `scheduler`, then completes.
pub fn timer(delay: u64, scheduler: Rc<dyn Scheduler>) -> Stream<u64> {
    Stream::new(move |emitter: Emitter<u64>| {
        emitter.schedule(&scheduler, delay, |emitter| {
            emitter.next(0);
            emitter.complete();
        });
    })
}
