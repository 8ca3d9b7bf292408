// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! ripple-core: push-based streams with explicit subscription lifecycles.
//!
//! A [`Stream`] is a lazy blueprint. Nothing runs until [`Stream::subscribe`]
//! invokes the producer with an [`Emitter`], the per-subscription capability
//! that enforces the delivery state machine:
//!
//! ```text
//! Active ──next*──▶ Active
//! Active ──complete──▶ Completed
//! Active ──error──▶ Errored
//! Active ──cancel──▶ Cancelled
//! ```
//!
//! Terminal states absorb every later signal. Time-based work goes through
//! the [`Scheduler`] port so the same operators run on a wall clock or on a
//! deterministic virtual clock.
//!
//! # Modules
//!
//! - [`stream`] - the stream primitive and the [`Operator`] composition seam
//! - [`emitter`] - per-subscription delivery state machine
//! - [`subscriber`] - the [`Observer`] interface and closure-backed [`Subscriber`]
//! - [`subscription`] - exactly-once cancellation with owned children
//! - [`operators`] - map, filter, skip, from_iterable and friends
//! - [`broadcaster`] - multicast node (subject)
//! - [`scheduler`] - scheduling port implemented by clocks
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::use_self
)]

pub mod broadcaster;
pub mod emitter;
mod error;
pub mod operators;
pub mod scheduler;
pub mod stream;
pub mod subscriber;
pub mod subscription;

/// Multicast node that is both a stream and an observer.
pub use broadcaster::Broadcaster;
/// Per-subscription delivery capability and its states.
pub use emitter::{Emitter, EmitterState};
/// Error payloads carried by `error` terminal events.
pub use error::{StreamError, SubscriptionRuntimeError};
/// Canonical operators.
pub use operators::{defer, filter, from_iterable, map, of, skip, timer, try_map};
/// Scheduling port for time-based producers.
pub use scheduler::{Scheduler, TaskAction, TaskHandle};
/// Stream primitive and operator seam.
pub use stream::{Operator, Stream};
/// Observer interface and the closure-backed subscriber.
pub use subscriber::{Observer, Subscriber};
/// Subscription handles and teardown actions.
pub use subscription::{Subscription, SubscriptionId, Teardown};
