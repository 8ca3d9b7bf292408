// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Streams built from diagrams.
//!
//! A cold stream replays its diagram for every subscriber, starting at that
//! subscriber's subscription time. A hot stream plays its diagram once, on
//! the clock, and whoever is subscribed at a given frame sees that frame.

use std::rc::Rc;

use ripple_core::{Broadcaster, Emitter, Scheduler, Stream, SubscriptionId};
use tracing::debug;

use crate::clock::VirtualClock;
use crate::diagram::{Diagram, ParseError};
use crate::notification::Notification;
use crate::values::{FromMarble, MarbleValues};

/// Cold stream for `diagram`. `^` is rejected.
pub fn cold<T>(
    clock: &Rc<VirtualClock>,
    diagram: &str,
    values: &MarbleValues<T>,
) -> Result<Stream<T>, ParseError>
where
    T: Clone + FromMarble + 'static,
{
    let parsed = Diagram::parse_with(diagram, clock.config().frame_duration_ms)?;
    if let Some(caret) = parsed.subscription_point() {
        return Err(ParseError::SubscriptionPointInCold {
            position: caret.position,
        });
    }
    let events: Rc<[(u64, Notification<T>)]> = parsed
        .expected_events(values)?
        .into_iter()
        .map(|event| (event.frame, event.notification))
        .collect();
    let scheduler: Rc<dyn Scheduler> = clock.clone();
    debug!(events = events.len(), "cold stream built");

    Ok(Stream::new(move |emitter: Emitter<T>| {
        for (frame, notification) in events.iter() {
            let notification = notification.clone();
            emitter.schedule(&scheduler, *frame, move |emitter| {
                notification.deliver(&mut emitter.clone());
            });
        }
    }))
}

/// Hot stream for `diagram`.
///
/// Events before `^` are delivered immediately, before anyone can
/// subscribe. A terminal marker must come after `^`.
/// Events from `^` on are scheduled once, relative to the clock's current
/// time, and multicast to the subscribers present when they fire.
pub fn hot<T>(
    clock: &Rc<VirtualClock>,
    diagram: &str,
    values: &MarbleValues<T>,
) -> Result<Stream<T>, ParseError>
where
    T: Clone + FromMarble + 'static,
{
    let parsed = Diagram::parse_with(diagram, clock.config().frame_duration_ms)?;
    let events = parsed.notifications(values)?;
    let subject = Broadcaster::new();
    let owner = SubscriptionId::next();

    let mut scheduled = 0_usize;
    for (frame, notification) in events {
        match u64::try_from(frame) {
            Err(_) => notification.deliver(&mut subject.clone()),
            Ok(delay) => {
                let mut target = subject.clone();
                clock.schedule(delay, owner, Box::new(move || notification.deliver(&mut target)));
                scheduled += 1;
            }
        }
    }
    debug!(%owner, scheduled, at = clock.now(), "hot stream started");
    Ok(subject.as_stream())
}
