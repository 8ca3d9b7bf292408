// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The stream primitive.
//!
//! A [`Stream`] holds a producer `Fn(Emitter<T>) -> Teardown`. Subscribing
//! runs the producer synchronously; anything it emits before returning is
//! delivered before [`Stream::subscribe`] returns. Work deferred through a
//! [`Scheduler`](crate::Scheduler) runs when that scheduler gets to it.

use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::emitter::Emitter;
use crate::error::{contain, StreamError};
use crate::operators;
use crate::subscriber::{Observer, Subscriber};
use crate::subscription::{Subscription, Teardown};

type Producer<T> = dyn Fn(Emitter<T>) -> Teardown;

/// Transformation from one stream into another, applied by [`Stream::pipe`].
///
/// Implemented for every `FnOnce(Stream<T>) -> Stream<U>`; the operator
/// functions in [`operators`](crate::operators) return such closures.
pub trait Operator<T, U> {
    /// Builds the downstream stream from `source`.
    fn apply(self, source: Stream<T>) -> Stream<U>;
}

impl<T, U, F> Operator<T, U> for F
where
    F: FnOnce(Stream<T>) -> Stream<U>,
{
    fn apply(self, source: Stream<T>) -> Stream<U> {
        self(source)
    }
}

/// Lazy, push-based sequence blueprint. Cheap to clone; each
/// subscription runs the producer independently.
pub struct Stream<T> {
    producer: Rc<Producer<T>>,
}

impl<T: 'static> Stream<T> {
    /// Wraps a producer. The producer returns its teardown (anything
    /// convertible into [`Teardown`], including a `Subscription` or `()`).
    pub fn new<F, R>(producer: F) -> Self
    where
        F: Fn(Emitter<T>) -> R + 'static,
        R: Into<Teardown>,
    {
        Self {
            producer: Rc::new(move |emitter: Emitter<T>| -> Teardown { producer(emitter).into() }),
        }
    }

    /// Runs the producer for `subscriber` and returns the subscription.
    ///
    /// A panic inside the producer is delivered to `subscriber` as a
    /// [`StreamError::Runtime`] error instead of unwinding.
    pub fn subscribe(&self, subscriber: Subscriber<T>) -> Subscription {
        self.run(Subscription::new(), subscriber)
    }

    /// Like [`subscribe`](Self::subscribe), but the new subscription is
    /// registered as a child of `parent` before the producer runs, so a
    /// cancellation of `parent` triggered by a synchronous emission already
    /// reaches this producer. Operators subscribe upstream this way.
    pub fn subscribe_child(&self, parent: &Subscription, subscriber: Subscriber<T>) -> Subscription {
        let subscription = Subscription::new();
        parent.add(subscription.clone());
        self.run(subscription, subscriber)
    }

    /// Subscribes with only a `next` handler.
    pub fn subscribe_next(&self, f: impl FnMut(T) + 'static) -> Subscription {
        self.subscribe(Subscriber::from_next(f))
    }

    /// Subscribes any [`Observer`].
    pub fn subscribe_observer(&self, observer: impl Observer<T> + 'static) -> Subscription {
        self.subscribe(Subscriber::from_observer(observer))
    }

    /// Applies `operator`. Chain calls to compose left-to-right.
    pub fn pipe<U, O>(self, operator: O) -> Stream<U>
    where
        O: Operator<T, U>,
    {
        operator.apply(self)
    }

    fn run(&self, subscription: Subscription, subscriber: Subscriber<T>) -> Subscription {
        if subscription.is_closed() {
            return subscription;
        }
        let emitter = Emitter::new(subscriber, subscription.clone());
        debug!(subscription = %subscription.id(), "subscribe");
        match contain("producer", || (self.producer)(emitter.clone())) {
            Ok(teardown) => subscription.add_teardown(teardown),
            Err(err) => {
                warn!(subscription = %subscription.id(), %err, "producer failed");
                emitter.error(StreamError::Runtime(err));
            }
        }
        subscription
    }

    /// `self.pipe(map(project))`.
    pub fn map<U: 'static>(self, project: impl Fn(T) -> U + 'static) -> Stream<U> {
        self.pipe(operators::map(project))
    }

    /// `self.pipe(try_map(project))`.
    pub fn try_map<U: 'static>(
        self,
        project: impl Fn(T) -> Result<U, StreamError> + 'static,
    ) -> Stream<U> {
        self.pipe(operators::try_map(project))
    }

    /// `self.pipe(filter(predicate))`.
    pub fn filter(self, predicate: impl Fn(&T) -> bool + 'static) -> Stream<T> {
        self.pipe(operators::filter(predicate))
    }

    /// `self.pipe(skip(count))`.
    pub fn skip(self, count: usize) -> Stream<T> {
        self.pipe(operators::skip(count))
    }
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            producer: Rc::clone(&self.producer),
        }
    }
}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream").finish_non_exhaustive()
    }
}
