// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use ripple_core::{StreamError, Subscriber};

/// One observed signal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Seen<T> {
    Next(T),
    Error(StreamError),
    Complete,
}

/// Shared log filled by a [`recorder`] subscriber.
pub type Log<T> = Rc<RefCell<Vec<Seen<T>>>>;

/// Subscriber that appends every signal to the returned log.
pub fn recorder<T: 'static>() -> (Subscriber<T>, Log<T>) {
    let log: Log<T> = Rc::new(RefCell::new(Vec::new()));
    let (on_next, on_error, on_complete) = (Rc::clone(&log), Rc::clone(&log), Rc::clone(&log));
    let subscriber = Subscriber::new()
        .on_next(move |v| on_next.borrow_mut().push(Seen::Next(v)))
        .on_error(move |e| on_error.borrow_mut().push(Seen::Error(e)))
        .on_complete(move || on_complete.borrow_mut().push(Seen::Complete));
    (subscriber, log)
}

/// Shorthand for a list of `Seen::Next` values followed by `Seen::Complete`.
pub fn completed<T>(values: impl IntoIterator<Item = T>) -> Vec<Seen<T>> {
    values
        .into_iter()
        .map(Seen::Next)
        .chain(std::iter::once(Seen::Complete))
        .collect()
}
