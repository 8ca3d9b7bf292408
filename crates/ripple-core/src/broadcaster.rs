// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Multicast node: a stream and an observer at once.
//!
//! Signals fan out to the emitters registered at the moment of delivery,
//! in registration order. Each delivery pass iterates over a snapshot, so
//! observers added or removed while a pass is running (for example by
//! cancelling from inside `next`) do not disturb it; a cancelled observer's
//! emitter simply absorbs whatever is still in flight.
//!
//! Values are never replayed. Once the broadcaster has terminated, late
//! subscribers immediately receive the stored terminal event.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::emitter::Emitter;
use crate::error::StreamError;
use crate::stream::Stream;
use crate::subscriber::{Observer, Subscriber};
use crate::subscription::{Subscription, Teardown};

#[derive(Clone, Debug)]
enum Terminal {
    Completed,
    Errored(StreamError),
}

struct BroadcasterInner<T> {
    observers: RefCell<Vec<Emitter<T>>>,
    terminal: RefCell<Option<Terminal>>,
}

/// Subject-style multicast node. Clones share state.
///
/// ```
/// use ripple_core::{Broadcaster, Subscriber};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let subject = Broadcaster::new();
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&seen);
/// let sub = subject.subscribe(Subscriber::from_next(move |v| sink.borrow_mut().push(v)));
/// subject.next("A");
/// sub.cancel();
/// subject.next("B");
/// assert_eq!(*seen.borrow(), vec!["A"]);
/// ```
pub struct Broadcaster<T> {
    inner: Rc<BroadcasterInner<T>>,
}

impl<T: Clone + 'static> Broadcaster<T> {
    /// A broadcaster with no observers.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(BroadcasterInner {
                observers: RefCell::new(Vec::new()),
                terminal: RefCell::new(None),
            }),
        }
    }

    /// Number of currently registered observers.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    /// `true` after `complete` or `error`.
    pub fn is_stopped(&self) -> bool {
        self.inner.terminal.borrow().is_some()
    }

    /// Sends `value` to every registered observer.
    pub fn next(&self, value: T) {
        if self.is_stopped() {
            trace!("broadcaster next after terminal ignored");
            return;
        }
        let snapshot = self.inner.observers.borrow().clone();
        for observer in &snapshot {
            observer.next(value.clone());
        }
    }

    /// Sends `err` to every registered observer and stops.
    pub fn error(&self, err: StreamError) {
        let Some(observers) = self.stop(Terminal::Errored(err.clone())) else {
            return;
        };
        for observer in &observers {
            observer.error(err.clone());
        }
    }

    /// Completes every registered observer and stops.
    pub fn complete(&self) {
        let Some(observers) = self.stop(Terminal::Completed) else {
            return;
        };
        for observer in &observers {
            observer.complete();
        }
    }

    /// Registers `subscriber` for future signals.
    pub fn subscribe(&self, subscriber: Subscriber<T>) -> Subscription {
        self.as_stream().subscribe(subscriber)
    }

    /// Stream view: each subscription registers one observer, and
    /// cancelling it removes that observer.
    pub fn as_stream(&self) -> Stream<T> {
        let inner = Rc::clone(&self.inner);
        Stream::new(move |emitter: Emitter<T>| {
            let terminal = inner.terminal.borrow().clone();
            match terminal {
                Some(Terminal::Completed) => {
                    emitter.complete();
                    return Teardown::Noop;
                }
                Some(Terminal::Errored(err)) => {
                    emitter.error(err);
                    return Teardown::Noop;
                }
                None => {}
            }
            let id = emitter.id();
            inner.observers.borrow_mut().push(emitter);
            debug!(subscription = %id, "broadcaster observer registered");
            let weak = Rc::downgrade(&inner);
            Teardown::action(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.observers.borrow_mut().retain(|observer| observer.id() != id);
                }
            })
        })
    }

    /// Takes the observer list and records `terminal`; `None` if already stopped.
    fn stop(&self, terminal: Terminal) -> Option<Vec<Emitter<T>>> {
        if self.is_stopped() {
            trace!("broadcaster terminal after terminal ignored");
            return None;
        }
        *self.inner.terminal.borrow_mut() = Some(terminal);
        let observers = std::mem::take(&mut *self.inner.observers.borrow_mut());
        Some(observers)
    }
}

impl<T: Clone + 'static> Default for Broadcaster<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Broadcaster<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Observer<T> for Broadcaster<T> {
    fn next(&mut self, value: T) {
        Broadcaster::next(self, value);
    }

    fn error(&mut self, err: StreamError) {
        Broadcaster::error(self, err);
    }

    fn complete(&mut self) {
        Broadcaster::complete(self);
    }
}

impl<T: Clone + 'static> From<Broadcaster<T>> for Subscriber<T> {
    fn from(broadcaster: Broadcaster<T>) -> Self {
        let on_error = broadcaster.clone();
        let on_complete = broadcaster.clone();
        Subscriber::new()
            .on_next(move |value| broadcaster.next(value))
            .on_error(move |err| on_error.error(err))
            .on_complete(move || on_complete.complete())
    }
}

impl<T> fmt::Debug for Broadcaster<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcaster")
            .field("observers", &self.inner.observers.borrow().len())
            .field("terminal", &*self.inner.terminal.borrow())
            .finish()
    }
}
