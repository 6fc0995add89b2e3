//! Timeline event dispatch.
//!
//! A closed set of event variants delivered synchronously to
//! subscribers in registration order. One subscriber panicking must not
//! prevent delivery to the rest, so each callback runs inside
//! `catch_unwind` and failures are logged.

use montage_core::RationalTime;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

use crate::segment::SegmentId;
use crate::track::TrackId;

/// Everything observable about the timeline, as a closed enum.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    /// Coarse-grained "something changed" notification.
    TrackUpdated,
    TrackAdded {
        track: TrackId,
    },
    TrackRemoved {
        track: TrackId,
    },
    SegmentAdded {
        track: TrackId,
        segment: SegmentId,
    },
    SegmentRemoved {
        track: TrackId,
        segment: SegmentId,
    },
    SegmentSplit {
        track: TrackId,
        original: SegmentId,
        tail: SegmentId,
        split_time: RationalTime,
    },
    CursorMoved {
        old: RationalTime,
        new: RationalTime,
    },
    SelectionChanged {
        selected: Vec<SegmentId>,
    },
}

type Listener = Box<dyn FnMut(&TimelineEvent) + Send>;

/// Synchronous event fan-out in registration order.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners are invoked in registration order
    /// on every emit.
    pub fn subscribe(&mut self, listener: impl FnMut(&TimelineEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver an event to every listener. A panicking listener is
    /// isolated: delivery continues with the remaining listeners.
    pub fn emit(&mut self, event: &TimelineEvent) {
        for (index, listener) in self.listeners.iter_mut().enumerate() {
            let result = catch_unwind(AssertUnwindSafe(|| listener(event)));
            if result.is_err() {
                warn!(listener = index, event = ?event, "timeline listener panicked");
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn delivery_in_registration_order() {
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        for tag in ["first", "second", "third"] {
            let log = log.clone();
            bus.subscribe(move |_| log.lock().unwrap().push(tag));
        }

        bus.emit(&TimelineEvent::TrackUpdated);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn panicking_listener_does_not_block_the_rest() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();

        bus.subscribe(|_| panic!("bad listener"));
        {
            let delivered = delivered.clone();
            bus.subscribe(move |_| {
                delivered.fetch_add(1, Ordering::SeqCst);
            });
        }

        bus.emit(&TimelineEvent::TrackUpdated);
        bus.emit(&TimelineEvent::TrackUpdated);
        assert_eq!(delivered.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn events_carry_payloads() {
        let seen = Arc::new(std::sync::Mutex::new(None));
        let mut bus = EventBus::new();
        {
            let seen = seen.clone();
            bus.subscribe(move |e| {
                if let TimelineEvent::CursorMoved { old, new } = e {
                    *seen.lock().unwrap() = Some((*old, *new));
                }
            });
        }

        bus.emit(&TimelineEvent::CursorMoved {
            old: RationalTime::ZERO,
            new: RationalTime::new(3, 1),
        });
        assert_eq!(
            *seen.lock().unwrap(),
            Some((RationalTime::ZERO, RationalTime::new(3, 1)))
        );
    }
}
