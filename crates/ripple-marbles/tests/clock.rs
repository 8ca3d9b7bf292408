// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Virtual clock ordering, cancellation and overflow guards.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ripple_core::{timer, Scheduler, Subscriber, SubscriptionId};
use ripple_marbles::{HarnessConfig, SchedulingOverflowError, VirtualClock};

type Trace = Rc<RefCell<Vec<(u64, &'static str)>>>;

fn stamp(clock: &Rc<VirtualClock>, trace: &Trace, name: &'static str) -> Box<dyn FnOnce()> {
    let (clock, trace) = (Rc::clone(clock), Rc::clone(trace));
    Box::new(move || trace.borrow_mut().push((clock.now(), name)))
}

#[test]
fn advance_to_runs_due_tasks_including_ones_scheduled_on_the_way() {
    let clock = Rc::new(VirtualClock::new());
    let trace: Trace = Rc::default();
    let owner = SubscriptionId::next();

    let nested = {
        let (inner_clock, inner_trace) = (Rc::clone(&clock), Rc::clone(&trace));
        Box::new(move || {
            inner_trace.borrow_mut().push((inner_clock.now(), "outer"));
            let follow_up = stamp(&inner_clock, &inner_trace, "inner");
            inner_clock.schedule(2, owner, follow_up);
            let too_late = stamp(&inner_clock, &inner_trace, "too late");
            inner_clock.schedule(10, owner, too_late);
        })
    };
    clock.schedule(3, owner, nested);
    clock.schedule(8, owner, stamp(&clock, &trace, "eight"));

    clock.advance_to(8).unwrap();
    assert_eq!(*trace.borrow(), vec![(3, "outer"), (5, "inner"), (8, "eight")]);
    assert_eq!(clock.now(), 8);
    assert_eq!(clock.pending(), 1);

    clock.advance_by(4).unwrap();
    assert_eq!(clock.now(), 12);
    assert_eq!(clock.pending(), 1);
    clock.flush().unwrap();
    assert_eq!(trace.borrow().last(), Some(&(13, "too late")));
}

#[test]
fn time_never_moves_backwards() {
    let clock = VirtualClock::new();
    clock.advance_to(10).unwrap();
    clock.advance_to(4).unwrap();
    assert_eq!(clock.now(), 10);
}

#[test]
fn flush_reports_tasks_past_the_frame_limit() {
    let config = HarnessConfig {
        max_frames: 50,
        ..HarnessConfig::default()
    };
    let clock = VirtualClock::with_config(config);
    let ran = Rc::new(Cell::new(false));
    let flag = Rc::clone(&ran);
    clock.schedule(51, SubscriptionId::next(), Box::new(move || flag.set(true)));

    assert_eq!(
        clock.flush(),
        Err(SchedulingOverflowError::TimeLimit { limit: 50, next: 51 })
    );
    assert!(!ran.get());
}

#[test]
fn zero_delay_self_rescheduling_hits_the_step_limit() {
    fn reschedule(clock: &Rc<VirtualClock>, owner: SubscriptionId) {
        let again = Rc::clone(clock);
        clock.schedule(0, owner, Box::new(move || reschedule(&again, owner)));
    }

    let config = HarnessConfig {
        max_steps: 100,
        ..HarnessConfig::default()
    };
    let clock = Rc::new(VirtualClock::with_config(config));
    reschedule(&clock, SubscriptionId::next());

    assert_eq!(
        clock.flush(),
        Err(SchedulingOverflowError::StepLimit { limit: 100 })
    );
    assert_eq!(clock.now(), 0);
}

#[test]
fn timer_fires_on_virtual_time_only() {
    let clock = Rc::new(VirtualClock::new());
    let scheduler: Rc<dyn Scheduler> = clock.clone();
    let fired = Rc::new(Cell::new(None));
    let sink = Rc::clone(&fired);
    let sub = timer(1000, scheduler).subscribe(Subscriber::from_next(move |v| sink.set(Some(v))));

    clock.advance_to(999).unwrap();
    assert_eq!(fired.get(), None);
    clock.advance_by(1).unwrap();
    assert_eq!(fired.get(), Some(0));
    assert!(sub.is_closed());
}

#[test]
fn cancelling_a_subscription_removes_its_tasks() {
    let clock = Rc::new(VirtualClock::new());
    let scheduler: Rc<dyn Scheduler> = clock.clone();
    let fired = Rc::new(Cell::new(false));
    let sink = Rc::clone(&fired);
    let sub = timer(5, scheduler).subscribe(Subscriber::from_next(move |_| sink.set(true)));
    assert_eq!(clock.pending(), 1);

    sub.cancel();
    assert_eq!(clock.pending(), 0);
    clock.flush().unwrap();
    assert!(!fired.get());
}
