//! Error types for the I2C inputs emulation
//!
//! Configuration problems surface as [`ProtocolError`] and abort the host's
//! configuration attempt. Runtime failures of a poll cycle surface as [`Error`],
//! which carries the bus collaborator's own error type unchanged.

use crate::input::types::Oid;

/// A malformed or unsupported request from the host's configuration pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("empty command")]
    EmptyCommand,
    #[error("command is not supported by I2C inputs: {0}")]
    UnsupportedCommand(String),
    #[error("malformed argument '{token}' in '{command}', expected key=value")]
    MalformedArgument { command: String, token: String },
    #[error("command '{command}' is missing argument '{key}'")]
    MissingArgument { command: String, key: &'static str },
    #[error("invalid value '{value}' for argument '{key}'")]
    InvalidValue { key: &'static str, value: String },
    #[error("malformed pin reference '{0}', expected PIN_<n>")]
    MalformedPin(String),
    #[error("pin {0} does not fit in a 32 bit input snapshot")]
    PinOutOfRange(u32),
    #[error("unknown oid {0}")]
    UnknownOid(usize),
    #[error("oid {oid} declares {count} buttons, at most 32 are supported")]
    TooManyButtons { oid: Oid, count: usize },
    #[error("position {pos} is out of range for oid {oid} with {count} buttons")]
    PositionOutOfRange { oid: Oid, pos: usize, count: usize },
    #[error("position {pos} of oid {oid} was never bound to a pin")]
    UnboundPosition { oid: Oid, pos: usize },
    #[error("I2C inputs only supports the buttons_state response callback, not '{0}'")]
    UnsupportedResponse(String),
    #[error("I2C inputs does not support the '{0}' command")]
    UnsupportedOutgoing(String),
}

/// Errors raised while configuring or polling the device.
///
/// `E` is the error type of the [`InputPins`](crate::expander::InputPins)
/// collaborator.
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("input pin access failed: {0:?}")]
    Bus(E),
    #[error("poll cycle started while a hardware read was still in flight")]
    OverlappingRead,
}

/// Problems in the device's own configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("config section '{0}' has no object name")]
    MissingName(String),
    #[error("0x{0:02X} is not a 7-bit I2C address")]
    InvalidAddress(u8),
}
