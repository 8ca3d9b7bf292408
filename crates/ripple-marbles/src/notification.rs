// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Materialized stream signals.

use std::fmt;

use ripple_core::{Observer, StreamError};

use crate::values::{FromMarble, MarbleValues};

/// One signal as data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification<T> {
    /// `next(value)`
    Next(T),
    /// `error(err)`
    Error(StreamError),
    /// `complete()`
    Complete,
}

impl<T> Notification<T> {
    /// Replays this signal into `observer`.
    pub fn deliver<O: Observer<T> + ?Sized>(self, observer: &mut O) {
        match self {
            Self::Next(value) => observer.next(value),
            Self::Error(err) => observer.error(err),
            Self::Complete => observer.complete(),
        }
    }

    /// `true` for `Error` and `Complete`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Next(_))
    }
}

impl<T: PartialEq + FromMarble> Notification<T> {
    /// Diagram character for this signal, looking values up in `values`.
    pub fn marble(&self, values: &MarbleValues<T>) -> char {
        match self {
            Self::Next(value) => values.symbol_for(value),
            Self::Error(_) => '#',
            Self::Complete => '|',
        }
    }
}

impl<T: fmt::Debug> fmt::Display for Notification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Next(value) => write!(f, "next({value:?})"),
            Self::Error(err) => write!(f, "error({err})"),
            Self::Complete => f.write_str("complete"),
        }
    }
}

/// A notification stamped with the frame it arrived at, relative to the
/// subscription that observed it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedEvent<T> {
    /// Frame offset from the subscription.
    pub frame: u64,
    /// What arrived.
    pub notification: Notification<T>,
}
