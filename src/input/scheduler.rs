//! Interrupt driven poll scheduling
//!
//! The expander's interrupt line means "at least one input changed and software
//! has not read it yet". Bus reads are not allowed from the interrupt event
//! itself, so the event only arms the poll timer. Every firing performs one
//! guarded read, and the timer keeps re-arming itself for as long as the line
//! stays asserted.
//!
//! ```text
//!            ready() / active level, no read in flight
//!   Idle ---------------------------------------------> Armed
//!    ^                                                  |  |
//!    |          fire, level inactive: wake = never      |  | fire, level active:
//!    +--------------------------------------------------+  | wake = now
//!                                                       <--+
//! ```

use std::cell::Cell;

use crate::error::Error;
use crate::input::guard::OverlapGuard;
use crate::input::types::EventTime;
use crate::reactor::Reactor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Timer inactive.
    Idle,
    /// Timer scheduled to fire as soon as possible.
    Armed,
}

/// Idle/Armed state machine around the host's poll timer.
#[derive(Debug)]
pub struct PollScheduler {
    state: Cell<PollState>,
    interrupt_level: Cell<bool>,
    guard: OverlapGuard,
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PollScheduler {
    pub fn new() -> Self {
        Self {
            state: Cell::new(PollState::Idle),
            interrupt_level: Cell::new(false),
            guard: OverlapGuard::new(),
        }
    }

    pub fn state(&self) -> PollState {
        self.state.get()
    }

    pub fn interrupt_level(&self) -> bool {
        self.interrupt_level.get()
    }

    /// True while a poll cycle's hardware read is executing.
    pub fn is_reading(&self) -> bool {
        self.guard.is_busy()
    }

    /// Schedule a poll as soon as possible.
    pub fn arm(&self, reactor: &impl Reactor) {
        self.state.set(PollState::Armed);
        reactor.update_timer(Some(reactor.monotonic()));
    }

    /// Record a new interrupt level and arm the timer on an active level.
    ///
    /// While a read is in flight the request is skipped instead of queued: the
    /// running cycle consults the latest level when it finishes. Returns whether
    /// the timer was armed.
    pub fn on_interrupt(&self, reactor: &impl Reactor, level: bool) -> bool {
        self.interrupt_level.set(level);
        if !level {
            return false;
        }
        if self.guard.is_busy() {
            log::debug!("Interrupt raised during a pin read, the running poll will re-arm");
            return false;
        }
        self.arm(reactor);
        true
    }

    /// Perform the single hardware read of a poll cycle.
    ///
    /// Fails with [`Error::OverlappingRead`] if another read is still in flight.
    /// The guard is released before returning, whether the read succeeded or not.
    pub fn read<E>(&self, read: impl FnOnce() -> Result<u32, E>) -> Result<u32, Error<E>> {
        if self.state.get() == PollState::Idle {
            log::debug!("Poll timer fired while idle");
        }
        let Some(_token) = self.guard.enter() else {
            log::error!("Poll timer fired while a pin read was still in flight");
            return Err(Error::OverlappingRead);
        };
        read().map_err(|err| {
            self.state.set(PollState::Idle);
            Error::Bus(err)
        })
    }

    /// Decide the next wake time from the most recent interrupt level.
    pub fn next_wake(&self, now: EventTime) -> Option<EventTime> {
        if self.interrupt_level.get() {
            log::debug!("Interrupt line still active, scheduling another update");
            self.state.set(PollState::Armed);
            Some(now)
        } else {
            log::debug!("Interrupt line released, pausing the timer");
            self.state.set(PollState::Idle);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactor::ManualReactor;

    #[test]
    fn active_interrupt_arms_idle_scheduler() {
        let reactor = ManualReactor::new();
        reactor.set_time(5.0);
        let scheduler = PollScheduler::new();
        assert_eq!(scheduler.state(), PollState::Idle);

        assert!(scheduler.on_interrupt(&reactor, true));
        assert_eq!(scheduler.state(), PollState::Armed);
        assert_eq!(reactor.waketime(), Some(5.0));
    }

    #[test]
    fn inactive_interrupt_does_not_arm() {
        let reactor = ManualReactor::new();
        let scheduler = PollScheduler::new();

        assert!(!scheduler.on_interrupt(&reactor, false));
        assert_eq!(scheduler.state(), PollState::Idle);
        assert_eq!(reactor.waketime(), None);
    }

    #[test]
    fn rearms_while_level_active_then_goes_idle() {
        let reactor = ManualReactor::new();
        let scheduler = PollScheduler::new();
        scheduler.on_interrupt(&reactor, true);

        scheduler.read(|| Ok::<_, ()>(0)).unwrap();
        assert_eq!(scheduler.next_wake(1.0), Some(1.0));
        assert_eq!(scheduler.state(), PollState::Armed);

        scheduler.on_interrupt(&reactor, false);
        scheduler.read(|| Ok::<_, ()>(0)).unwrap();
        assert_eq!(scheduler.next_wake(2.0), None);
        assert_eq!(scheduler.state(), PollState::Idle);
    }

    #[test]
    fn interrupt_during_read_is_skipped_but_level_is_kept() {
        let reactor = ManualReactor::new();
        let scheduler = PollScheduler::new();

        let pins = scheduler
            .read(|| {
                assert!(scheduler.is_reading());
                assert!(!scheduler.on_interrupt(&reactor, true));
                Ok::<_, ()>(0b10)
            })
            .unwrap();
        assert_eq!(pins, 0b10);
        assert!(!scheduler.is_reading());
        assert_eq!(reactor.waketime(), None);

        // The level raised mid-read still drives the re-arm decision.
        assert_eq!(scheduler.next_wake(3.0), Some(3.0));
    }

    #[test]
    fn nested_read_is_an_overlap() {
        let scheduler = PollScheduler::new();

        let outer = scheduler.read(|| {
            let inner = scheduler.read(|| Ok::<_, ()>(1));
            assert!(matches!(inner, Err(Error::OverlappingRead)));
            Ok::<_, ()>(2)
        });
        assert!(matches!(outer, Ok(2)));
    }

    #[test]
    fn failed_read_releases_guard_and_idles() {
        let reactor = ManualReactor::new();
        let scheduler = PollScheduler::new();
        scheduler.arm(&reactor);

        let result = scheduler.read(|| Err::<u32, _>("nack"));
        assert!(matches!(result, Err(Error::Bus("nack"))));
        assert!(!scheduler.is_reading());
        assert_eq!(scheduler.state(), PollState::Idle);
    }
}
