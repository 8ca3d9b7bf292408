// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Recording live subscriptions and diffing them against diagrams.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use ripple_core::{Observer, Stream, StreamError, Subscriber, Subscription};
use serde::Serialize;
use thiserror::Error;

use crate::clock::VirtualClock;
use crate::diagram::{render_frames, Diagram, ParseError};
use crate::notification::{Notification, RecordedEvent};
use crate::values::{FromMarble, MarbleValues};

type Tape<T> = Rc<RefCell<Vec<RecordedEvent<T>>>>;

/// Observer that stamps each signal with the clock's time since subscription.
struct TapeWriter<T> {
    clock: Rc<VirtualClock>,
    start: u64,
    tape: Tape<T>,
}

impl<T> TapeWriter<T> {
    fn push(&self, notification: Notification<T>) {
        let frame = self.clock.now().saturating_sub(self.start);
        self.tape.borrow_mut().push(RecordedEvent {
            frame,
            notification,
        });
    }
}

impl<T> Observer<T> for TapeWriter<T> {
    fn next(&mut self, value: T) {
        self.push(Notification::Next(value));
    }

    fn error(&mut self, err: StreamError) {
        self.push(Notification::Error(err));
    }

    fn complete(&mut self) {
        self.push(Notification::Complete);
    }
}

/// A live subscription whose signals are being recorded.
pub struct Recorder<T> {
    tape: Tape<T>,
    subscription: Subscription,
    subscribed_at: u64,
}

impl<T: 'static> Recorder<T> {
    /// Subscribes to `stream` now and starts recording.
    pub fn attach(clock: &Rc<VirtualClock>, stream: &Stream<T>) -> Self {
        let tape: Tape<T> = Rc::new(RefCell::new(Vec::new()));
        let subscribed_at = clock.now();
        let writer = TapeWriter {
            clock: Rc::clone(clock),
            start: subscribed_at,
            tape: Rc::clone(&tape),
        };
        let subscription = stream.subscribe(Subscriber::from_observer(writer));
        Self {
            tape,
            subscription,
            subscribed_at,
        }
    }

    /// Clock time at which the subscription was made.
    pub fn subscribed_at(&self) -> u64 {
        self.subscribed_at
    }

    /// The recorded subscription.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Everything recorded so far.
    pub fn events(&self) -> Vec<RecordedEvent<T>>
    where
        T: Clone,
    {
        self.tape.borrow().clone()
    }
}

impl<T> fmt::Debug for Recorder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("subscription", &self.subscription)
            .field("subscribed_at", &self.subscribed_at)
            .field("recorded", &self.tape.borrow().len())
            .finish()
    }
}

/// One frame where expectation and recording disagree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FrameDiff {
    /// Frame relative to the subscription.
    pub frame: u64,
    /// Expected signals at that frame, in order.
    pub expected: Vec<String>,
    /// Recorded signals at that frame, in order.
    pub actual: Vec<String>,
}

/// A failed assertion: both sides drawn on the same time axis plus the
/// per-frame differences.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssertionMismatch {
    /// Registration order of the assertion within its run.
    pub index: usize,
    /// Expected events, drawn from frame zero.
    pub expected_diagram: String,
    /// Recorded events, drawn from frame zero.
    pub actual_diagram: String,
    /// Frames that differ.
    pub diffs: Vec<FrameDiff>,
}

impl fmt::Display for AssertionMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "assertion #{} does not match", self.index)?;
        writeln!(f, "  expected: {}", self.expected_diagram)?;
        write!(f, "  actual:   {}", self.actual_diagram)?;
        for diff in &self.diffs {
            write!(
                f,
                "\n  frame {}: expected [{}], actual [{}]",
                diff.frame,
                diff.expected.join(", "),
                diff.actual.join(", ")
            )?;
        }
        Ok(())
    }
}

/// Every mismatch of one run.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{}", render_report(.mismatches))]
pub struct AssertionMismatchError {
    /// Failed assertions in registration order.
    pub mismatches: Vec<AssertionMismatch>,
}

fn render_report(mismatches: &[AssertionMismatch]) -> String {
    let mut out = format!("{} marble assertion(s) failed", mismatches.len());
    for mismatch in mismatches {
        out.push('\n');
        out.push_str(&mismatch.to_string());
    }
    out
}

fn by_frame<T>(events: &[RecordedEvent<T>]) -> BTreeMap<u64, Vec<&Notification<T>>> {
    let mut frames: BTreeMap<u64, Vec<&Notification<T>>> = BTreeMap::new();
    for event in events {
        frames.entry(event.frame).or_default().push(&event.notification);
    }
    frames
}

/// Frames at which `expected` and `actual` differ, in frame order.
pub fn diff_events<T>(expected: &[RecordedEvent<T>], actual: &[RecordedEvent<T>]) -> Vec<FrameDiff>
where
    T: PartialEq + fmt::Debug,
{
    let expected = by_frame(expected);
    let actual = by_frame(actual);
    let frames: std::collections::BTreeSet<u64> =
        expected.keys().chain(actual.keys()).copied().collect();
    let describe = |signals: Option<&Vec<&Notification<T>>>| -> Vec<String> {
        signals
            .map(|signals| signals.iter().map(ToString::to_string).collect())
            .unwrap_or_default()
    };
    frames
        .into_iter()
        .filter_map(|frame| {
            let (want, got) = (expected.get(&frame), actual.get(&frame));
            if want == got {
                return None;
            }
            Some(FrameDiff {
                frame,
                expected: describe(want),
                actual: describe(got),
            })
        })
        .collect()
}

fn draw<T>(events: &[RecordedEvent<T>], values: &MarbleValues<T>, end: i64) -> String
where
    T: PartialEq + FromMarble,
{
    let mut frames: BTreeMap<i64, Vec<char>> = BTreeMap::new();
    for event in events {
        let frame = i64::try_from(event.frame).unwrap_or(i64::MAX);
        frames
            .entry(frame)
            .or_default()
            .push(event.notification.marble(values));
    }
    render_frames(&frames, 0, end)
}

fn span<T>(events: &[RecordedEvent<T>]) -> i64 {
    events
        .iter()
        .map(|event| i64::try_from(event.frame).unwrap_or(i64::MAX).saturating_add(1))
        .max()
        .unwrap_or(0)
}

/// Compares one recording against its expected events. `None` when equal.
pub fn compare<T>(
    index: usize,
    expected: &[RecordedEvent<T>],
    actual: &[RecordedEvent<T>],
    values: &MarbleValues<T>,
) -> Option<AssertionMismatch>
where
    T: PartialEq + fmt::Debug + FromMarble,
{
    let diffs = diff_events(expected, actual);
    if diffs.is_empty() {
        return None;
    }
    let end = span(expected).max(span(actual));
    Some(AssertionMismatch {
        index,
        expected_diagram: draw(expected, values, end),
        actual_diagram: draw(actual, values, end),
        diffs,
    })
}

/// Compares two diagrams over their literal symbols, from frame zero on.
pub fn compare_diagrams(
    expected: &str,
    actual: &str,
    frame_duration_ms: u64,
) -> Result<Option<AssertionMismatch>, ParseError> {
    let values: MarbleValues<char> = MarbleValues::new();
    let expected = Diagram::parse_with(expected, frame_duration_ms)?.expected_events(&values)?;
    let actual = Diagram::parse_with(actual, frame_duration_ms)?.expected_events(&values)?;
    Ok(compare(0, &expected, &actual, &values))
}
