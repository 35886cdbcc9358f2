//! Snapshot comparison and `buttons_state` delivery
//!
//! Every changed snapshot produces one dispatch cycle: the shared ack counter
//! advances once and each oid with a registered callback gets one
//! [`Delivery`] carrying that counter. Deliveries are queued rather than run
//! inline, so a slow or re-entrant consumer never runs inside a poll cycle.

use std::cell::Cell;

use futures::channel::mpsc;
use futures::{FutureExt, StreamExt};

use crate::input::types::{ButtonsState, EventTime, ResponseCallback};
use crate::registry::PinRegistry;

/// One queued notification for one consumer.
pub struct Delivery {
    callback: ResponseCallback,
    params: ButtonsState,
}

impl Delivery {
    pub fn params(&self) -> &ButtonsState {
        &self.params
    }

    /// Hand the payload to the consumer.
    pub fn deliver(self) {
        (self.callback)(&self.params);
    }
}

/// Compares snapshots and queues per-oid notifications.
pub struct ChangeDispatcher {
    last_pins: Cell<Option<u32>>,
    ack_count: Cell<u8>,
    queue: mpsc::UnboundedSender<Delivery>,
}

impl ChangeDispatcher {
    /// Create a dispatcher and the queue its deliveries end up in.
    pub fn new() -> (Self, DeliveryQueue) {
        let (queue, receiver) = mpsc::unbounded();
        let dispatcher = Self {
            last_pins: Cell::new(None),
            ack_count: Cell::new(0),
            queue,
        };
        (dispatcher, DeliveryQueue { receiver })
    }

    /// Snapshot from the latest dispatch cycle, `None` before the first read.
    pub fn last_pins(&self) -> Option<u32> {
        self.last_pins.get()
    }

    pub fn ack_count(&self) -> u8 {
        self.ack_count.get()
    }

    /// Compare `raw` against the previous snapshot and queue notifications.
    ///
    /// Returns whether the snapshot changed.
    pub fn on_snapshot(&self, registry: &PinRegistry, raw: u32, eventtime: EventTime) -> bool {
        let previous = self.last_pins.get();
        match previous {
            Some(previous) => log::debug!(
                "I2C input pins value {:#010b}, previous value was {:#010b}",
                raw,
                previous
            ),
            None => log::debug!("I2C input pins value {:#010b}, no previous value", raw),
        }
        if previous == Some(raw) {
            return false;
        }
        self.last_pins.set(Some(raw));

        let ack_count = self.ack_count.get().wrapping_add(1);
        self.ack_count.set(ack_count);

        for (oid, callback) in registry.callbacks() {
            let params = ButtonsState {
                ack_count,
                oid,
                state: vec![registry.state_word(oid, raw)],
                receive_time: eventtime,
            };
            let delivery = Delivery {
                callback: callback.clone(),
                params,
            };
            if self.queue.unbounded_send(delivery).is_err() {
                log::warn!("Delivery queue closed, dropping buttons_state for oid {}", oid);
            }
        }
        true
    }
}

/// Consumer end of the notification queue, drained by the host event loop.
pub struct DeliveryQueue {
    receiver: mpsc::UnboundedReceiver<Delivery>,
}

impl DeliveryQueue {
    /// Take the next queued delivery without running it.
    pub fn try_next(&mut self) -> Option<Delivery> {
        self.receiver.next().now_or_never().flatten()
    }

    /// Run every delivery queued so far and return how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(delivery) = self.try_next() {
            delivery.deliver();
            delivered += 1;
        }
        delivered
    }

    /// Run deliveries as they arrive, until the device is dropped.
    pub async fn run(mut self) {
        while let Some(delivery) = self.receiver.next().await {
            delivery.deliver();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::input::types::Oid;

    type Seen = Rc<RefCell<Vec<ButtonsState>>>;

    fn recorder(seen: &Seen) -> ResponseCallback {
        let seen = seen.clone();
        Rc::new(move |params: &ButtonsState| seen.borrow_mut().push(params.clone()))
    }

    fn registry(groups: &[&[u8]], seen: &Seen) -> PinRegistry {
        let mut registry = PinRegistry::new();
        for mapping in groups {
            let oid = registry.create_oid();
            registry.configure(oid.index(), mapping.len()).unwrap();
            for (pos, pin) in mapping.iter().enumerate() {
                registry.bind(oid.index(), pos, *pin).unwrap();
            }
            registry
                .register_response("buttons_state", oid, recorder(seen))
                .unwrap();
        }
        registry
    }

    #[test]
    fn first_snapshot_always_dispatches() {
        let seen = Seen::default();
        let registry = registry(&[&[3, 5]], &seen);
        let (dispatcher, mut queue) = ChangeDispatcher::new();

        assert!(dispatcher.on_snapshot(&registry, 0, 1.0));
        assert_eq!(queue.run_pending(), 1);
        assert_eq!(
            seen.borrow()[0],
            ButtonsState {
                ack_count: 1,
                oid: Oid(0),
                state: vec![0],
                receive_time: 1.0
            }
        );
    }

    #[test]
    fn unchanged_snapshot_does_not_dispatch() {
        let seen = Seen::default();
        let registry = registry(&[&[0]], &seen);
        let (dispatcher, mut queue) = ChangeDispatcher::new();

        assert!(dispatcher.on_snapshot(&registry, 0b1, 1.0));
        assert!(!dispatcher.on_snapshot(&registry, 0b1, 2.0));
        assert!(!dispatcher.on_snapshot(&registry, 0b1, 3.0));

        assert_eq!(queue.run_pending(), 1);
        assert_eq!(dispatcher.ack_count(), 1);
        assert_eq!(dispatcher.last_pins(), Some(0b1));
    }

    #[test]
    fn ack_count_is_shared_by_all_oids_of_a_cycle() {
        let seen = Seen::default();
        let registry = registry(&[&[0], &[1], &[2]], &seen);
        let (dispatcher, mut queue) = ChangeDispatcher::new();

        dispatcher.on_snapshot(&registry, 0b001, 1.0);
        dispatcher.on_snapshot(&registry, 0b110, 2.0);
        assert_eq!(queue.run_pending(), 6);

        let seen = seen.borrow();
        let acks: Vec<_> = seen.iter().map(|p| p.ack_count).collect();
        let oids: Vec<_> = seen.iter().map(|p| p.oid.index()).collect();
        let states: Vec<_> = seen.iter().map(|p| p.state[0]).collect();
        assert_eq!(acks, [1, 1, 1, 2, 2, 2]);
        assert_eq!(oids, [0, 1, 2, 0, 1, 2]);
        assert_eq!(states, [1, 0, 0, 0, 1, 1]);
    }

    #[test]
    fn ack_count_wraps_after_255() {
        let registry = PinRegistry::new();
        let (dispatcher, _queue) = ChangeDispatcher::new();

        for raw in 0..255 {
            dispatcher.on_snapshot(&registry, raw, 0.0);
        }
        assert_eq!(dispatcher.ack_count(), 255);
        dispatcher.on_snapshot(&registry, 255, 0.0);
        assert_eq!(dispatcher.ack_count(), 0);
        dispatcher.on_snapshot(&registry, 256, 0.0);
        assert_eq!(dispatcher.ack_count(), 1);
    }

    #[test]
    fn oids_without_callback_are_skipped() {
        let seen = Seen::default();
        let mut registry = PinRegistry::new();
        let silent = registry.create_oid();
        let loud = registry.create_oid();
        registry.configure(silent.index(), 1).unwrap();
        registry.configure(loud.index(), 1).unwrap();
        registry.bind(silent.index(), 0, 0).unwrap();
        registry.bind(loud.index(), 0, 1).unwrap();
        registry
            .register_response("buttons_state", loud, recorder(&seen))
            .unwrap();
        let (dispatcher, mut queue) = ChangeDispatcher::new();

        dispatcher.on_snapshot(&registry, 0b11, 0.5);
        assert_eq!(queue.run_pending(), 1);
        assert_eq!(seen.borrow()[0].oid, loud);
        assert_eq!(seen.borrow()[0].state, [1]);
    }

    #[test]
    fn deliveries_wait_for_the_queue_to_run() {
        let seen = Seen::default();
        let registry = registry(&[&[0]], &seen);
        let (dispatcher, mut queue) = ChangeDispatcher::new();

        dispatcher.on_snapshot(&registry, 1, 0.0);
        assert!(seen.borrow().is_empty());

        let delivery = queue.try_next().unwrap();
        assert_eq!(delivery.params().state, [1]);
        delivery.deliver();
        assert_eq!(seen.borrow().len(), 1);
        assert!(queue.try_next().is_none());
    }

    #[test]
    fn async_runner_drains_until_dispatcher_is_dropped() {
        let seen = Seen::default();
        let registry = registry(&[&[0], &[1]], &seen);
        let (dispatcher, queue) = ChangeDispatcher::new();

        dispatcher.on_snapshot(&registry, 0b01, 0.0);
        dispatcher.on_snapshot(&registry, 0b10, 0.1);
        drop(dispatcher);

        futures::executor::block_on(queue.run());
        assert_eq!(seen.borrow().len(), 4);
    }

    #[test]
    fn closed_queue_drops_deliveries() {
        let seen = Seen::default();
        let registry = registry(&[&[0]], &seen);
        let (dispatcher, queue) = ChangeDispatcher::new();
        drop(queue);

        assert!(dispatcher.on_snapshot(&registry, 1, 0.0));
        assert_eq!(dispatcher.ack_count(), 1);
        assert!(seen.borrow().is_empty());
    }
}
