// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Subscription handles: exactly-once cancellation with owned children.
//!
//! A [`Subscription`] owns an ordered list of [`Teardown`]s. Child
//! subscriptions are stored as teardowns too, so cancelling a parent cancels
//! every descendant in registration order. Adding a teardown to an already
//! closed subscription runs it immediately.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{trace, warn};

use crate::error::contain;

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a subscription.
///
/// Scheduled tasks are tagged with the id of the subscription that owns
/// them so a cancellation can remove them from the clock.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Allocates a fresh id.
    pub fn next() -> Self {
        Self(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Cleanup returned by a producer or registered on a subscription.
#[derive(Default)]
pub enum Teardown {
    /// Nothing to clean up.
    #[default]
    Noop,
    /// Arbitrary cleanup action, run once.
    Action(Box<dyn FnOnce()>),
    /// A child subscription, cancelled with its parent.
    Subscription(Subscription),
}

impl Teardown {
    /// Wraps a closure as a teardown.
    pub fn action(f: impl FnOnce() + 'static) -> Self {
        Self::Action(Box::new(f))
    }

    fn run(self) {
        match self {
            Self::Noop => {}
            Self::Action(action) => {
                if let Err(err) = contain("teardown", action) {
                    warn!(%err, "teardown action failed");
                }
            }
            Self::Subscription(child) => child.cancel(),
        }
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Noop => f.write_str("Noop"),
            Self::Action(_) => f.write_str("Action(..)"),
            Self::Subscription(sub) => f.debug_tuple("Subscription").field(sub).finish(),
        }
    }
}

impl From<()> for Teardown {
    fn from((): ()) -> Self {
        Self::Noop
    }
}

impl From<Subscription> for Teardown {
    fn from(subscription: Subscription) -> Self {
        Self::Subscription(subscription)
    }
}

impl From<Option<Subscription>> for Teardown {
    fn from(subscription: Option<Subscription>) -> Self {
        subscription.map_or(Self::Noop, Self::Subscription)
    }
}

struct SubscriptionInner {
    id: SubscriptionId,
    closed: Cell<bool>,
    teardowns: RefCell<Vec<Teardown>>,
}

/// Handle to a live (or closed) subscription. Clones share state.
#[derive(Clone)]
pub struct Subscription {
    inner: Rc<SubscriptionInner>,
}

impl Subscription {
    /// Creates an open subscription with no teardowns.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SubscriptionInner {
                id: SubscriptionId::next(),
                closed: Cell::new(false),
                teardowns: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Identifier used to tag tasks owned by this subscription.
    pub fn id(&self) -> SubscriptionId {
        self.inner.id
    }

    /// `true` once [`cancel`](Self::cancel) has run (directly, through a
    /// parent, or because a terminal event was delivered).
    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    /// Registers a teardown. Runs it immediately if already closed.
    pub fn add_teardown(&self, teardown: impl Into<Teardown>) {
        let teardown = teardown.into();
        if let Teardown::Subscription(child) = &teardown {
            if Rc::ptr_eq(&child.inner, &self.inner) {
                return;
            }
        }
        if self.is_closed() {
            teardown.run();
            return;
        }
        self.inner.teardowns.borrow_mut().push(teardown);
    }

    /// Adds `child`; cancelling `self` cancels it.
    pub fn add(&self, child: Subscription) {
        self.add_teardown(Teardown::Subscription(child));
    }

    /// Cancels this subscription and all of its children. Idempotent.
    pub fn cancel(&self) {
        if self.inner.closed.replace(true) {
            return;
        }
        let teardowns = self.inner.teardowns.take();
        trace!(subscription = %self.inner.id, teardowns = teardowns.len(), "cancel");
        for teardown in teardowns {
            teardown.run();
        }
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.inner.id)
            .field("closed", &self.inner.closed.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Rc<Cell<u32>>, impl FnOnce() + 'static) {
        let hits = Rc::new(Cell::new(0));
        let hook = Rc::clone(&hits);
        (hits, move || hook.set(hook.get() + 1))
    }

    #[test]
    fn cancel_runs_teardowns_exactly_once() {
        let sub = Subscription::new();
        let (hits, hook) = counter();
        sub.add_teardown(Teardown::action(hook));

        sub.cancel();
        sub.cancel();
        assert_eq!(hits.get(), 1);
        assert!(sub.is_closed());
    }

    #[test]
    fn cancelling_parent_cancels_descendants() {
        let parent = Subscription::new();
        let child = Subscription::new();
        let grandchild = Subscription::new();
        let (hits, hook) = counter();
        grandchild.add_teardown(Teardown::action(hook));
        child.add(grandchild.clone());
        parent.add(child.clone());

        parent.cancel();
        assert!(child.is_closed());
        assert!(grandchild.is_closed());
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn teardown_added_after_close_runs_immediately() {
        let sub = Subscription::new();
        sub.cancel();
        let (hits, hook) = counter();
        sub.add_teardown(Teardown::action(hook));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn adding_self_is_ignored() {
        let sub = Subscription::new();
        sub.add(sub.clone());
        sub.cancel();
        assert!(sub.is_closed());
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(Subscription::new().id(), Subscription::new().id());
    }
}
