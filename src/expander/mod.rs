//! Input pin collaborators
//!
//! The device never talks to a bus itself. It asks an [`InputPins`]
//! implementation to set pins up at config time and to read every input pin
//! as one bitmask per poll cycle.
//!
//! - [`NoPins`] keeps the default behavior: setup is a no-op, reads return 0.
//! - [`Mcp23017`] drives a Microchip MCP23017 16-bit expander over
//!   `embedded-hal` I2C (feature `mcp23017`).

use core::convert::Infallible;

#[cfg(feature = "mcp23017")]
pub mod mcp23017;
#[cfg(feature = "mcp23017")]
mod regs;

#[cfg(feature = "mcp23017")]
pub use mcp23017::{InterruptOutput, Mcp23017, Mcp23017Error};

/// Hardware side of the emulated buttons subsystem.
pub trait InputPins {
    type Error: core::fmt::Debug;

    /// Configure `pin` as an input, with or without its pull-up resistor.
    fn setup_input_pin(&mut self, pin: u8, pull_up: bool) -> Result<(), Self::Error> {
        let _ = (pin, pull_up);
        Ok(())
    }

    /// Read all input pins at once; bit n is the level of pin n.
    fn read_input_pins(&mut self) -> Result<u32, Self::Error> {
        Ok(0)
    }
}

/// Placeholder hardware that reports every pin low.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPins;

impl InputPins for NoPins {
    type Error = Infallible;
}

impl<P: InputPins + ?Sized> InputPins for &mut P {
    type Error = P::Error;

    fn setup_input_pin(&mut self, pin: u8, pull_up: bool) -> Result<(), Self::Error> {
        (**self).setup_input_pin(pin, pull_up)
    }

    fn read_input_pins(&mut self) -> Result<u32, Self::Error> {
        (**self).read_input_pins()
    }
}
