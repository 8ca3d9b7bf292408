// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `TestScheduler::run`: the entry point tying clock, factories and
//! comparator together.
//!
//! ```
//! use ripple_marbles::{MarbleValues, TestScheduler};
//!
//! let values = MarbleValues::new();
//! TestScheduler::new()
//!     .run(|ctx| {
//!         let source = ctx.cold("-a-b-c-|", &values)?;
//!         ctx.expect(&source.filter(|v: &char| *v != 'b'))
//!             .to_match("-a---c-|", &values)?;
//!         Ok(())
//!     })
//!     .unwrap();
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ripple_core::{Scheduler, Stream};
use thiserror::Error;
use tracing::{debug, warn};

use crate::clock::{SchedulingOverflowError, VirtualClock};
use crate::comparator::{compare, AssertionMismatch, AssertionMismatchError, Recorder};
use crate::config::{ConfigError, HarnessConfig};
use crate::diagram::{Diagram, ParseError};
use crate::factory;
use crate::values::{FromMarble, MarbleValues};

/// Anything that makes a harness run fail.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A diagram did not parse.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The clock hit a limit.
    #[error(transparent)]
    Overflow(#[from] SchedulingOverflowError),
    /// One or more expectations did not hold.
    #[error(transparent)]
    Mismatch(#[from] AssertionMismatchError),
    /// The harness configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

type Assertion = Box<dyn FnOnce(usize) -> Option<AssertionMismatch>>;

/// Runs marble tests on a fresh [`VirtualClock`] per run.
#[derive(Clone, Debug, Default)]
pub struct TestScheduler {
    config: HarnessConfig,
}

impl TestScheduler {
    /// A scheduler with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// A scheduler with `config`, validated up front.
    pub fn with_config(config: HarnessConfig) -> Result<Self, HarnessError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Limits applied to each run.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Runs `body`, flushes the clock, then checks every registered
    /// expectation. All mismatches are reported together.
    pub fn run<R>(
        &self,
        body: impl FnOnce(&RunContext) -> Result<R, HarnessError>,
    ) -> Result<R, HarnessError> {
        let ctx = RunContext {
            clock: Rc::new(VirtualClock::with_config(self.config)),
            assertions: RefCell::new(Vec::new()),
        };
        let output = body(&ctx)?;
        ctx.clock.flush()?;

        let assertions = ctx.assertions.into_inner();
        let total = assertions.len();
        let mismatches: Vec<AssertionMismatch> = assertions
            .into_iter()
            .enumerate()
            .filter_map(|(index, check)| check(index))
            .collect();
        debug!(assertions = total, failed = mismatches.len(), now = ctx.clock.now(), "run finished");
        if mismatches.is_empty() {
            Ok(output)
        } else {
            warn!(failed = mismatches.len(), "marble assertions failed");
            Err(AssertionMismatchError { mismatches }.into())
        }
    }
}

/// Handle passed to a run body.
pub struct RunContext {
    clock: Rc<VirtualClock>,
    assertions: RefCell<Vec<Assertion>>,
}

impl RunContext {
    /// The run's clock.
    pub fn clock(&self) -> &Rc<VirtualClock> {
        &self.clock
    }

    /// The run's clock as a scheduler, for operators such as `timer`.
    pub fn scheduler(&self) -> Rc<dyn Scheduler> {
        self.clock.clone()
    }

    /// See [`factory::cold`].
    pub fn cold<T>(&self, diagram: &str, values: &MarbleValues<T>) -> Result<Stream<T>, ParseError>
    where
        T: Clone + FromMarble + 'static,
    {
        factory::cold(&self.clock, diagram, values)
    }

    /// See [`factory::hot`].
    pub fn hot<T>(&self, diagram: &str, values: &MarbleValues<T>) -> Result<Stream<T>, ParseError>
    where
        T: Clone + FromMarble + 'static,
    {
        factory::hot(&self.clock, diagram, values)
    }

    /// Subscribes to `stream` now and returns the pending expectation.
    pub fn expect<T: 'static>(&self, stream: &Stream<T>) -> Expectation<'_, T> {
        Expectation {
            ctx: self,
            recorder: Recorder::attach(&self.clock, stream),
        }
    }

    /// Runs every queued task early, for bodies that inspect state mid-run.
    pub fn flush(&self) -> Result<(), SchedulingOverflowError> {
        self.clock.flush()
    }

    /// Advances the clock by `frames`.
    pub fn advance_by(&self, frames: u64) -> Result<(), SchedulingOverflowError> {
        self.clock.advance_by(frames)
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("clock", &self.clock)
            .field("assertions", &self.assertions.borrow().len())
            .finish()
    }
}

/// A recording waiting for its expected diagram.
#[derive(Debug)]
pub struct Expectation<'a, T> {
    ctx: &'a RunContext,
    recorder: Recorder<T>,
}

impl<T> Expectation<'_, T>
where
    T: Clone + PartialEq + fmt::Debug + FromMarble + 'static,
{
    /// Registers `diagram` as the expected output. The diagram is parsed
    /// now; the comparison happens when the run ends. Frames before `^` are
    /// ignored, and frames count from the moment of `expect`.
    pub fn to_match(self, diagram: &str, values: &MarbleValues<T>) -> Result<(), ParseError> {
        let expected = Diagram::parse_with(diagram, self.ctx.clock.config().frame_duration_ms)?
            .expected_events(values)?;
        let values = values.clone();
        let recorder = self.recorder;
        self.ctx.assertions.borrow_mut().push(Box::new(move |index| {
            compare(index, &expected, &recorder.events(), &values)
        }));
        Ok(())
    }
}
