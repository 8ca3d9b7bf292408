// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Discrete-event virtual clock.
//!
//! Tasks run in `(time, sequence)` order, where `sequence` is a counter
//! bumped on every `schedule` call, so equal-time tasks run in the order
//! they were scheduled. Time never moves backwards. No wall-clock time is
//! involved: advancing a thousand frames costs as much as the tasks that
//! fall inside them.
//!
//! The queue is never borrowed while a task runs, so tasks may schedule,
//! cancel, or subscribe freely.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use ripple_core::{Scheduler, SubscriptionId, TaskAction, TaskHandle};
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::HarnessConfig;

/// A run exceeded one of the harness limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SchedulingOverflowError {
    /// The next task lies beyond `max_frames`.
    #[error("next task at frame {next} is past the frame limit {limit}")]
    TimeLimit {
        /// Configured `max_frames`.
        limit: u64,
        /// Time of the offending task.
        next: u64,
    },
    /// More than `max_steps` tasks ran in one advance or flush.
    #[error("more than {limit} tasks ran without the queue draining")]
    StepLimit {
        /// Configured `max_steps`.
        limit: u64,
    },
}

struct ScheduledTask {
    owner: SubscriptionId,
    action: TaskAction,
}

#[derive(Default)]
struct ClockState {
    now: u64,
    next_sequence: u64,
    queue: BTreeMap<TaskHandle, ScheduledTask>,
    owners: FxHashMap<SubscriptionId, BTreeSet<TaskHandle>>,
}

impl ClockState {
    fn forget_owner(&mut self, owner: SubscriptionId, handle: TaskHandle) {
        if let Some(handles) = self.owners.get_mut(&owner) {
            handles.remove(&handle);
            if handles.is_empty() {
                self.owners.remove(&owner);
            }
        }
    }
}

/// Virtual-time scheduler used by the marble harness.
pub struct VirtualClock {
    state: RefCell<ClockState>,
    config: HarnessConfig,
}

impl VirtualClock {
    /// A clock at frame zero with default limits.
    pub fn new() -> Self {
        Self::with_config(HarnessConfig::default())
    }

    /// A clock at frame zero with the given limits.
    pub fn with_config(config: HarnessConfig) -> Self {
        Self {
            state: RefCell::new(ClockState::default()),
            config,
        }
    }

    /// Limits this clock enforces.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Current virtual time.
    pub fn now(&self) -> u64 {
        self.state.borrow().now
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Queues `action` at `now + delay` on behalf of `owner`.
    pub fn schedule(&self, delay: u64, owner: SubscriptionId, action: TaskAction) -> TaskHandle {
        let mut state = self.state.borrow_mut();
        let handle = TaskHandle {
            time: state.now.saturating_add(delay),
            sequence: state.next_sequence,
        };
        state.next_sequence += 1;
        state.queue.insert(handle, ScheduledTask { owner, action });
        state.owners.entry(owner).or_default().insert(handle);
        trace!(time = handle.time, sequence = handle.sequence, %owner, "task scheduled");
        handle
    }

    /// Removes one pending task. `false` if it already ran or was cancelled.
    pub fn cancel(&self, handle: TaskHandle) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(task) = state.queue.remove(&handle) else {
            return false;
        };
        state.forget_owner(task.owner, handle);
        true
    }

    /// Removes every pending task of `owner`; returns how many were removed.
    pub fn cancel_owned(&self, owner: SubscriptionId) -> usize {
        let removed = {
            let mut state = self.state.borrow_mut();
            let Some(handles) = state.owners.remove(&owner) else {
                return 0;
            };
            for handle in &handles {
                state.queue.remove(handle);
            }
            handles.len()
        };
        trace!(%owner, removed, "owner tasks cancelled");
        removed
    }

    /// Runs every task due at or before `target`, including ones scheduled
    /// along the way, then moves `now` to `target`.
    pub fn advance_to(&self, target: u64) -> Result<(), SchedulingOverflowError> {
        let from = self.now();
        let executed = self.drain(Some(target))?;
        let mut state = self.state.borrow_mut();
        state.now = state.now.max(target);
        debug!(from, to = state.now, executed, "clock advanced");
        Ok(())
    }

    /// `advance_to(now + delta)`.
    pub fn advance_by(&self, delta: u64) -> Result<(), SchedulingOverflowError> {
        self.advance_to(self.now().saturating_add(delta))
    }

    /// Runs tasks until the queue is empty. `now` ends at the last task's time.
    pub fn flush(&self) -> Result<(), SchedulingOverflowError> {
        let from = self.now();
        let executed = self.drain(None)?;
        debug!(from, to = self.now(), executed, "clock flushed");
        Ok(())
    }

    fn drain(&self, target: Option<u64>) -> Result<u64, SchedulingOverflowError> {
        let mut executed: u64 = 0;
        while let Some((handle, task)) = self.pop_due(target, executed)? {
            trace!(time = handle.time, sequence = handle.sequence, owner = %task.owner, "task fired");
            (task.action)();
            executed += 1;
        }
        Ok(executed)
    }

    /// Pops the next task due by `target`, applying the overflow guards.
    fn pop_due(
        &self,
        target: Option<u64>,
        executed: u64,
    ) -> Result<Option<(TaskHandle, ScheduledTask)>, SchedulingOverflowError> {
        let mut state = self.state.borrow_mut();
        let Some(&handle) = state.queue.keys().next() else {
            return Ok(None);
        };
        if target.is_some_and(|target| handle.time > target) {
            return Ok(None);
        }
        if handle.time > self.config.max_frames {
            return Err(SchedulingOverflowError::TimeLimit {
                limit: self.config.max_frames,
                next: handle.time,
            });
        }
        if executed >= self.config.max_steps {
            return Err(SchedulingOverflowError::StepLimit {
                limit: self.config.max_steps,
            });
        }
        let Some(task) = state.queue.remove(&handle) else {
            return Ok(None);
        };
        state.forget_owner(task.owner, handle);
        state.now = state.now.max(handle.time);
        Ok(Some((handle, task)))
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for VirtualClock {
    fn now(&self) -> u64 {
        Self::now(self)
    }

    fn schedule(&self, delay: u64, owner: SubscriptionId, action: TaskAction) -> TaskHandle {
        Self::schedule(self, delay, owner, action)
    }

    fn cancel(&self, handle: TaskHandle) -> bool {
        Self::cancel(self, handle)
    }

    fn cancel_owned(&self, owner: SubscriptionId) -> usize {
        Self::cancel_owned(self, owner)
    }
}

impl fmt::Debug for VirtualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("VirtualClock")
            .field("now", &state.now)
            .field("pending", &state.queue.len())
            .field("config", &self.config)
            .finish()
    }
}
