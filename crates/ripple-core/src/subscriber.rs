// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The observer interface and a closure-backed implementation.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::StreamError;

/// Receiver of stream signals. All three capabilities are required;
/// [`Subscriber`] supplies no-op defaults for the ones a caller omits.
pub trait Observer<T> {
    /// A value was produced.
    fn next(&mut self, value: T);
    /// The stream failed. Terminal.
    fn error(&mut self, err: StreamError);
    /// The stream finished. Terminal.
    fn complete(&mut self);
}

/// Observer assembled from closures.
///
/// ```
/// use ripple_core::{from_iterable, Subscriber};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&seen);
/// from_iterable(vec![1, 2, 3]).subscribe(Subscriber::new().on_next(move |v| sink.borrow_mut().push(v)));
/// assert_eq!(*seen.borrow(), vec![1, 2, 3]);
/// ```
pub struct Subscriber<T> {
    next: Box<dyn FnMut(T)>,
    error: Box<dyn FnMut(StreamError)>,
    complete: Box<dyn FnMut()>,
}

impl<T: 'static> Subscriber<T> {
    /// A subscriber that ignores every signal.
    pub fn new() -> Self {
        Self {
            next: Box::new(|_| {}),
            error: Box::new(|_| {}),
            complete: Box::new(|| {}),
        }
    }

    /// Shorthand for `Subscriber::new().on_next(f)`.
    pub fn from_next(f: impl FnMut(T) + 'static) -> Self {
        Self::new().on_next(f)
    }

    /// Wraps any [`Observer`] implementation.
    pub fn from_observer(observer: impl Observer<T> + 'static) -> Self {
        let shared = Rc::new(RefCell::new(observer));
        let on_error = Rc::clone(&shared);
        let on_complete = Rc::clone(&shared);
        Self {
            next: Box::new(move |value| shared.borrow_mut().next(value)),
            error: Box::new(move |err| on_error.borrow_mut().error(err)),
            complete: Box::new(move || on_complete.borrow_mut().complete()),
        }
    }

    /// Replaces the `next` handler.
    pub fn on_next(mut self, f: impl FnMut(T) + 'static) -> Self {
        self.next = Box::new(f);
        self
    }

    /// Replaces the `error` handler.
    pub fn on_error(mut self, f: impl FnMut(StreamError) + 'static) -> Self {
        self.error = Box::new(f);
        self
    }

    /// Replaces the `complete` handler.
    pub fn on_complete(mut self, f: impl FnMut() + 'static) -> Self {
        self.complete = Box::new(f);
        self
    }
}

impl<T: 'static> Default for Subscriber<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Observer<T> for Subscriber<T> {
    fn next(&mut self, value: T) {
        (self.next)(value);
    }

    fn error(&mut self, err: StreamError) {
        (self.error)(err);
    }

    fn complete(&mut self) {
        (self.complete)();
    }
}

impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").finish_non_exhaustive()
    }
}
