// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scheduling port for time-based producers.
//!
//! Time is measured in frames (`u64`). Implementations must run tasks in
//! ascending `(time, sequence)` order, where `sequence` is the order in which
//! tasks were scheduled; equal-time tasks therefore run FIFO.

use crate::subscription::SubscriptionId;

/// Deferred work queued on a scheduler.
pub type TaskAction = Box<dyn FnOnce()>;

/// Identifies one pending task. Ordered by `(time, sequence)`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TaskHandle {
    /// Frame at which the task is due.
    pub time: u64,
    /// Scheduling order; breaks ties between equal `time`s.
    pub sequence: u64,
}

/// A clock that can run deferred work.
pub trait Scheduler {
    /// Current time in frames.
    fn now(&self) -> u64;

    /// Queues `action` to run `delay` frames from now, owned by `owner`.
    fn schedule(&self, delay: u64, owner: SubscriptionId, action: TaskAction) -> TaskHandle;

    /// Removes one pending task. Returns `false` if it already ran or was removed.
    fn cancel(&self, handle: TaskHandle) -> bool;

    /// Removes every pending task owned by `owner`; returns how many were removed.
    fn cancel_owned(&self, owner: SubscriptionId) -> usize;
}
