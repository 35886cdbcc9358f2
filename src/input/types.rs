//! Types for input handling

use std::rc::Rc;

/// Host monotonic time in seconds.
pub type EventTime = f64;

/// Object identifier of one logical button group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid(pub(crate) usize);

impl Oid {
    /// Position of this object in the registry.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Payload of one `buttons_state` notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonsState {
    /// Shared sequence number of the dispatch cycle, wrapping at 256.
    pub ack_count: u8,
    pub oid: Oid,
    /// One state word; bit i is the level of logical position i.
    pub state: Vec<u32>,
    pub receive_time: EventTime,
}

/// Consumer callback for `buttons_state` notifications.
pub type ResponseCallback = Rc<dyn Fn(&ButtonsState)>;

/// Sender handed out for `buttons_ack`. The emulation has no host-side flow
/// control, so acknowledgements are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct AckSender;

impl AckSender {
    pub fn send(&self, _data: &[u32]) {}
}

/// Command queue handle. The emulation never allocates one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandQueue;

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for ButtonsState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "buttons_state oid={} ack_count={} state={:?} at {:.3}",
            self.oid, self.ack_count, self.state, self.receive_time
        )
    }
}
