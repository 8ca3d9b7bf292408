// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-subscription delivery capability.
//!
//! An [`Emitter`] is what a producer receives when its stream is subscribed.
//! It wraps the downstream [`Subscriber`] in a small state machine:
//!
//! - `Active` is the only state that accepts signals.
//! - `Completed`, `Errored` and `Cancelled` are terminal and absorb
//!   everything that follows.
//!
//! Delivering a terminal event closes the emitter's [`Subscription`], which
//! runs its teardowns (upstream subscriptions, owned clock tasks).
//!
//! Signals raised re-entrantly while the subscriber is still handling an
//! earlier one are queued and delivered in order once it returns.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{trace, warn};

use crate::error::{contain, StreamError};
use crate::scheduler::{Scheduler, TaskHandle};
use crate::subscriber::{Observer, Subscriber};
use crate::subscription::{Subscription, SubscriptionId, Teardown};

/// Delivery state of one subscription.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EmitterState {
    /// Accepting signals.
    Active,
    /// `complete` was delivered.
    Completed,
    /// `error` was delivered.
    Errored,
    /// The subscription was cancelled before a terminal event.
    Cancelled,
}

enum Signal<T> {
    Next(T),
    Error(StreamError),
    Complete,
}

struct EmitterInner<T> {
    state: Cell<EmitterState>,
    sink: RefCell<Option<Subscriber<T>>>,
    backlog: RefCell<VecDeque<Signal<T>>>,
    subscription: Subscription,
    owns_tasks: Cell<bool>,
}

impl<T> EmitterInner<T> {
    fn mark_cancelled(&self) {
        if self.state.get() != EmitterState::Active {
            return;
        }
        self.state.set(EmitterState::Cancelled);
        self.backlog.borrow_mut().clear();
        // The sink stays borrowed when cancellation comes from inside its own callback.
        if let Ok(mut sink) = self.sink.try_borrow_mut() {
            sink.take();
        }
    }
}

/// Subscriber capability handed to producers. Clones share state.
pub struct Emitter<T> {
    inner: Rc<EmitterInner<T>>,
}

impl<T: 'static> Emitter<T> {
    pub(crate) fn new(subscriber: Subscriber<T>, subscription: Subscription) -> Self {
        let inner = Rc::new(EmitterInner {
            state: Cell::new(EmitterState::Active),
            sink: RefCell::new(Some(subscriber)),
            backlog: RefCell::new(VecDeque::new()),
            subscription,
            owns_tasks: Cell::new(false),
        });
        let weak = Rc::downgrade(&inner);
        inner.subscription.add_teardown(Teardown::action(move || {
            if let Some(inner) = weak.upgrade() {
                inner.mark_cancelled();
            }
        }));
        Self { inner }
    }

    /// Current delivery state.
    pub fn state(&self) -> EmitterState {
        self.inner.state.get()
    }

    /// `true` while signals are still accepted.
    pub fn is_active(&self) -> bool {
        self.state() == EmitterState::Active
    }

    /// `true` once a terminal event was delivered or the subscription was cancelled.
    pub fn is_closed(&self) -> bool {
        !self.is_active()
    }

    /// The subscription this emitter feeds. Producers may register
    /// additional teardowns or child subscriptions on it.
    pub fn subscription(&self) -> &Subscription {
        &self.inner.subscription
    }

    /// Id of the owning subscription.
    pub fn id(&self) -> SubscriptionId {
        self.inner.subscription.id()
    }

    /// Delivers a value. Ignored unless `Active`.
    pub fn next(&self, value: T) {
        if !self.is_active() {
            trace!(subscription = %self.id(), state = ?self.state(), "next ignored");
            return;
        }
        self.deliver(Signal::Next(value));
    }

    /// Delivers an error and closes the subscription. Ignored unless `Active`.
    pub fn error(&self, err: StreamError) {
        if !self.finish(EmitterState::Errored) {
            trace!(subscription = %self.id(), state = ?self.state(), "error ignored");
            return;
        }
        self.deliver(Signal::Error(err));
    }

    /// Delivers completion and closes the subscription. Ignored unless `Active`.
    pub fn complete(&self) {
        if !self.finish(EmitterState::Completed) {
            trace!(subscription = %self.id(), state = ?self.state(), "complete ignored");
            return;
        }
        self.deliver(Signal::Complete);
    }

    /// Schedules `action` on `scheduler`, `delay` frames from now.
    ///
    /// The task is tagged with this emitter's subscription id; the first
    /// call also registers a teardown that removes every task of that owner,
    /// so cancellation never leaves work behind on the clock. A panic inside
    /// `action` is delivered to this emitter as a runtime error.
    ///
    /// Returns `None` when the emitter is already closed.
    pub fn schedule(
        &self,
        scheduler: &Rc<dyn Scheduler>,
        delay: u64,
        action: impl FnOnce(&Emitter<T>) + 'static,
    ) -> Option<TaskHandle> {
        if !self.is_active() {
            return None;
        }
        if !self.inner.owns_tasks.replace(true) {
            let owner = self.id();
            let weak: Weak<dyn Scheduler> = Rc::downgrade(scheduler);
            self.inner.subscription.add_teardown(Teardown::action(move || {
                if let Some(scheduler) = weak.upgrade() {
                    let removed = scheduler.cancel_owned(owner);
                    trace!(%owner, removed, "released owned tasks");
                }
            }));
        }
        let emitter = self.clone();
        let handle = scheduler.schedule(
            delay,
            self.id(),
            Box::new(move || {
                if !emitter.is_active() {
                    return;
                }
                if let Err(err) = contain("scheduled task", || action(&emitter)) {
                    warn!(subscription = %emitter.id(), %err, "scheduled task failed");
                    emitter.error(err.into());
                }
            }),
        );
        Some(handle)
    }

    fn finish(&self, state: EmitterState) -> bool {
        if !self.is_active() {
            return false;
        }
        self.inner.state.set(state);
        true
    }

    fn deliver(&self, signal: Signal<T>) {
        let Ok(mut sink) = self.inner.sink.try_borrow_mut() else {
            self.inner.backlog.borrow_mut().push_back(signal);
            return;
        };
        let mut pending = Some(signal);
        while let Some(signal) = pending {
            if self.state() == EmitterState::Cancelled {
                self.inner.backlog.borrow_mut().clear();
                break;
            }
            let terminal = !matches!(signal, Signal::Next(_));
            if let Some(observer) = sink.as_mut() {
                match signal {
                    Signal::Next(value) => observer.next(value),
                    Signal::Error(err) => observer.error(err),
                    Signal::Complete => observer.complete(),
                }
            }
            if terminal {
                self.inner.subscription.cancel();
            }
            pending = self.inner.backlog.borrow_mut().pop_front();
        }
        if !self.is_active() {
            sink.take();
        }
    }
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Observer<T> for Emitter<T> {
    fn next(&mut self, value: T) {
        Emitter::next(self, value);
    }

    fn error(&mut self, err: StreamError) {
        Emitter::error(self, err);
    }

    fn complete(&mut self) {
        Emitter::complete(self);
    }
}

impl<T: 'static> From<Emitter<T>> for Subscriber<T> {
    fn from(emitter: Emitter<T>) -> Self {
        let on_error = emitter.clone();
        let on_complete = emitter.clone();
        Subscriber::new()
            .on_next(move |value| emitter.next(value))
            .on_error(move |err| on_error.error(err))
            .on_complete(move || on_complete.complete())
    }
}

impl<T> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("subscription", &self.inner.subscription.id())
            .field("state", &self.inner.state.get())
            .finish_non_exhaustive()
    }
}
