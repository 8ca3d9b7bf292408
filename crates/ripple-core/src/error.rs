// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error payloads delivered through `error` terminal events.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use thiserror::Error;

/// A producer, operator callback or scheduled action failed while running.
///
/// The failure is contained: it reaches the affected subscriber as an
/// `error` terminal event and never unwinds into the caller or the clock.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{origin} failed: {message}")]
pub struct SubscriptionRuntimeError {
    /// Which piece of the pipeline failed (`"producer"`, `"map"`, ...).
    pub origin: &'static str,
    /// Panic message or error description.
    pub message: String,
}

impl SubscriptionRuntimeError {
    /// Builds a runtime error for `origin`.
    pub fn new(origin: &'static str, message: impl Into<String>) -> Self {
        Self {
            origin,
            message: message.into(),
        }
    }

    fn from_panic(origin: &'static str, payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_owned()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "non-string panic payload".to_owned()
        };
        Self::new(origin, message)
    }
}

/// Error carried by a stream's `error` terminal event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// Error raised deliberately by a producer (or a diagram's `#`).
    #[error("{0}")]
    Raised(String),
    /// Contained failure of a producer or operator.
    #[error(transparent)]
    Runtime(#[from] SubscriptionRuntimeError),
}

impl StreamError {
    /// Shorthand for [`StreamError::Raised`].
    pub fn raised(payload: impl Into<String>) -> Self {
        Self::Raised(payload.into())
    }
}

/// Runs `f`, converting a panic into a [`SubscriptionRuntimeError`].
pub(crate) fn contain<R>(
    origin: &'static str,
    f: impl FnOnce() -> R,
) -> Result<R, SubscriptionRuntimeError> {
    catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| SubscriptionRuntimeError::from_panic(origin, payload.as_ref()))
}
