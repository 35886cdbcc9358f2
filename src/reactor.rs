//! Timer collaborator
//!
//! The host's event loop owns the poll timer. The device only asks it for the
//! current time and moves the timer's next wake time: `Some(now)` to poll as
//! soon as possible, `None` to stop polling.

use std::cell::Cell;
use std::rc::Rc;

use crate::input::types::EventTime;

/// The host event loop as seen by the device.
pub trait Reactor {
    /// Current monotonic time.
    fn monotonic(&self) -> EventTime;

    /// Move the poll timer's next wake time; `None` means never.
    fn update_timer(&self, waketime: Option<EventTime>);
}

impl<R: Reactor + ?Sized> Reactor for &R {
    fn monotonic(&self) -> EventTime {
        (**self).monotonic()
    }

    fn update_timer(&self, waketime: Option<EventTime>) {
        (**self).update_timer(waketime)
    }
}

impl<R: Reactor + ?Sized> Reactor for Rc<R> {
    fn monotonic(&self) -> EventTime {
        (**self).monotonic()
    }

    fn update_timer(&self, waketime: Option<EventTime>) {
        (**self).update_timer(waketime)
    }
}

/// Single-timer reactor with a hand-driven clock.
///
/// Used by the simulation binary and the tests: the caller advances time and
/// fires the timer explicitly, so every poll cycle is deterministic.
#[derive(Debug, Default)]
pub struct ManualReactor {
    now: Cell<EventTime>,
    waketime: Cell<Option<EventTime>>,
}

impl ManualReactor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_time(&self, now: EventTime) {
        self.now.set(now);
    }

    pub fn advance(&self, seconds: EventTime) {
        self.now.set(self.now.get() + seconds);
    }

    /// Pending wake time of the poll timer.
    pub fn waketime(&self) -> Option<EventTime> {
        self.waketime.get()
    }

    /// Disarm the timer and return the firing time if it is due.
    pub fn take_due(&self) -> Option<EventTime> {
        let now = self.now.get();
        match self.waketime.get() {
            Some(waketime) if waketime <= now => {
                self.waketime.set(None);
                Some(now)
            }
            _ => None,
        }
    }

    /// Fire the timer while it stays due, at most `limit` times.
    ///
    /// Each wake time returned by `on_timer` is applied before the next check,
    /// exactly as a real reactor reschedules a timer from its callback's result.
    pub fn run_due<E>(
        &self,
        limit: usize,
        mut on_timer: impl FnMut(EventTime) -> Result<Option<EventTime>, E>,
    ) -> Result<usize, E> {
        let mut fired = 0;
        while fired < limit {
            let Some(eventtime) = self.take_due() else {
                break;
            };
            let next = on_timer(eventtime)?;
            // A callback may have re-armed the timer itself; its result wins.
            self.update_timer(next);
            fired += 1;
        }
        Ok(fired)
    }
}

impl Reactor for ManualReactor {
    fn monotonic(&self) -> EventTime {
        self.now.get()
    }

    fn update_timer(&self, waketime: Option<EventTime>) {
        self.waketime.set(waketime);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_is_due_only_once_per_arm() {
        let reactor = ManualReactor::new();
        reactor.set_time(1.0);
        assert_eq!(reactor.take_due(), None);

        reactor.update_timer(Some(1.0));
        assert_eq!(reactor.take_due(), Some(1.0));
        assert_eq!(reactor.take_due(), None);
    }

    #[test]
    fn future_wake_waits_for_the_clock() {
        let reactor = ManualReactor::new();
        reactor.update_timer(Some(2.0));
        reactor.set_time(1.5);
        assert_eq!(reactor.take_due(), None);
        reactor.advance(0.5);
        assert_eq!(reactor.take_due(), Some(2.0));
    }

    #[test]
    fn run_due_applies_returned_wake_times() {
        let reactor = ManualReactor::new();
        reactor.update_timer(Some(0.0));

        let mut remaining = 3;
        let fired = reactor
            .run_due(10, |now| {
                remaining -= 1;
                Ok::<_, ()>(if remaining > 0 { Some(now) } else { None })
            })
            .unwrap();
        assert_eq!(fired, 3);
        assert_eq!(reactor.waketime(), None);
    }

    #[test]
    fn run_due_stops_at_limit() {
        let reactor = ManualReactor::new();
        reactor.update_timer(Some(0.0));

        let fired = reactor.run_due(4, |now| Ok::<_, ()>(Some(now))).unwrap();
        assert_eq!(fired, 4);
        assert_eq!(reactor.waketime(), Some(0.0));
    }
}
