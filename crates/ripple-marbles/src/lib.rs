// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! ripple-marbles: deterministic, virtual-time marble tests for Ripple streams.
//!
//! A marble diagram draws a stream on a time axis, one character per frame:
//! `-a-b-(cd)-|` emits `a` at frame 1, `b` at frame 3, `c` and `d` together
//! at frame 5 and completes at frame 7. [`TestScheduler::run`] gives a test
//! body a fresh [`VirtualClock`], factories that turn diagrams into cold or
//! hot streams, and [`RunContext::expect`] to record a stream and compare it
//! against an expected diagram once the clock has drained.
//!
//! Nothing waits on a real clock. `1000ms (a|)` costs a single task.
//!
//! # Modules
//!
//! - [`diagram`] - parser, renderer and [`ParseError`]
//! - [`values`] - symbol tables and the [`FromMarble`] fallback
//! - [`clock`] - the virtual clock and its overflow guards
//! - [`factory`] - cold and hot streams from diagrams
//! - [`comparator`] - recording and frame-by-frame diffs
//! - [`harness`] - [`TestScheduler`] and the run context
//! - [`config`] - [`HarnessConfig`] and its storage port
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
    clippy::missing_errors_doc,
    clippy::use_self
)]

pub mod clock;
pub mod comparator;
pub mod config;
pub mod diagram;
pub mod factory;
pub mod harness;
pub mod notification;
pub mod values;

/// Virtual clock and its limit errors.
pub use clock::{SchedulingOverflowError, VirtualClock};
/// Recording and diffing.
pub use comparator::{
    compare, compare_diagrams, diff_events, AssertionMismatch, AssertionMismatchError, FrameDiff,
    Recorder,
};
/// Harness configuration and storage.
pub use config::{
    ConfigError, ConfigService, ConfigStore, FileConfigStore, HarnessConfig, MemoryConfigStore,
    CONFIG_KEY,
};
/// Diagram parsing and rendering.
pub use diagram::{
    parse_diagram, Diagram, DiagramToken, ParseError, TokenKind, MAX_DIAGRAM_FRAMES,
};
/// Stream factories.
pub use factory::{cold, hot};
/// Test entry point.
pub use harness::{Expectation, HarnessError, RunContext, TestScheduler};
/// Signals as data.
pub use notification::{Notification, RecordedEvent};
/// Symbol tables.
pub use values::{FromMarble, MarbleValues, DEFAULT_ERROR_PAYLOAD};
