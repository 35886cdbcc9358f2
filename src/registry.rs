//! Pin mapping and callback registry, indexed by [`Oid`].

use crate::command::Cmd;
use crate::error::ProtocolError;
use crate::input::types::{Oid, ResponseCallback};

/// Widest state word a single oid can report.
pub const MAX_BUTTONS: usize = 32;

/// Logical button positions and consumer callbacks for every oid.
#[derive(Default)]
pub struct PinRegistry {
    pins: Vec<Vec<Option<u8>>>,
    callbacks: Vec<Option<ResponseCallback>>,
}

impl PinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an empty mapping and callback slot.
    pub fn create_oid(&mut self) -> Oid {
        self.pins.push(Vec::new());
        self.callbacks.push(None);
        Oid(self.pins.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn lookup(&self, oid: usize) -> Result<Oid, ProtocolError> {
        if oid < self.pins.len() {
            Ok(Oid(oid))
        } else {
            Err(ProtocolError::UnknownOid(oid))
        }
    }

    /// Reset the mapping of `oid` to `count` unbound positions.
    pub fn configure(&mut self, oid: usize, count: usize) -> Result<(), ProtocolError> {
        let oid = self.lookup(oid)?;
        if count > MAX_BUTTONS {
            return Err(ProtocolError::TooManyButtons { oid, count });
        }
        self.pins[oid.0] = vec![None; count];
        Ok(())
    }

    /// Bind one position to a physical pin and return the previous binding.
    ///
    /// Rebinding is last-write-wins.
    pub fn bind(&mut self, oid: usize, pos: usize, pin: u8) -> Result<Option<u8>, ProtocolError> {
        let oid = self.lookup(oid)?;
        let slots = &mut self.pins[oid.0];
        let count = slots.len();
        let slot = slots
            .get_mut(pos)
            .ok_or(ProtocolError::PositionOutOfRange { oid, pos, count })?;
        Ok(slot.replace(pin))
    }

    pub fn mapping(&self, oid: Oid) -> &[Option<u8>] {
        &self.pins[oid.0]
    }

    /// Register the consumer of `name` responses for `oid`.
    pub fn register_response(
        &mut self,
        name: &str,
        oid: Oid,
        callback: ResponseCallback,
    ) -> Result<(), ProtocolError> {
        if name != Cmd::BUTTONS_STATE {
            return Err(ProtocolError::UnsupportedResponse(name.to_string()));
        }
        let slot = self
            .callbacks
            .get_mut(oid.0)
            .ok_or(ProtocolError::UnknownOid(oid.0))?;
        *slot = Some(callback);
        Ok(())
    }

    /// First position that no `buttons_add` has bound yet.
    pub fn first_unbound(&self) -> Option<(Oid, usize)> {
        self.pins.iter().enumerate().find_map(|(oid, slots)| {
            slots
                .iter()
                .position(Option::is_none)
                .map(|pos| (Oid(oid), pos))
        })
    }

    /// Gather the mapped bits of `raw` into a per-position state word.
    ///
    /// Unbound positions read as released.
    pub fn state_word(&self, oid: Oid, raw: u32) -> u32 {
        self.pins[oid.0]
            .iter()
            .enumerate()
            .filter_map(|(i, pin)| pin.map(|pin| ((raw >> pin) & 1) << i))
            .fold(0, |word, bit| word | bit)
    }

    /// Oids with a registered callback, in ascending order.
    pub fn callbacks(&self) -> impl Iterator<Item = (Oid, &ResponseCallback)> {
        self.callbacks
            .iter()
            .enumerate()
            .filter_map(|(oid, cb)| cb.as_ref().map(|cb| (Oid(oid), cb)))
    }
}
