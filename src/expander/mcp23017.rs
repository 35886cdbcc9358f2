//! MCP23017 input expander
//!
//! 16 GPIO pins on two 8-bit ports. Port A maps to bits 0..8 of the snapshot,
//! port B to bits 8..16. Every configured input also gets interrupt-on-change,
//! so the expander's INT line stays asserted until the GPIO registers are read.
//!
//! [MCP23017 Datasheet](https://ww1.microchip.com/downloads/en/devicedoc/20001952c.pdf)

use embedded_hal::i2c::I2c;

use crate::expander::regs::{Iocon, Reg};
use crate::expander::InputPins;

/// Number of GPIO pins on the device.
pub const PIN_COUNT: u8 = 16;

#[derive(Debug, thiserror::Error)]
pub enum Mcp23017Error<E> {
    #[error("I2C transfer failed: {0:?}")]
    I2c(E),
    #[error("pin {0} does not exist on a 16-pin expander")]
    InvalidPin(u8),
}

impl<E> From<E> for Mcp23017Error<E> {
    fn from(value: E) -> Self {
        Self::I2c(value)
    }
}

/// Electrical behavior of the mirrored INT output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterruptOutput {
    /// Push-pull, low while an interrupt is pending (power-on default).
    #[default]
    ActiveLow,
    /// Push-pull, high while an interrupt is pending.
    ActiveHigh,
    /// Open-drain, needs an external pull-up.
    OpenDrain,
}

impl InterruptOutput {
    fn iocon_bits(self) -> u8 {
        match self {
            InterruptOutput::ActiveLow => 0,
            InterruptOutput::ActiveHigh => Iocon::INTPOL,
            InterruptOutput::OpenDrain => Iocon::ODR,
        }
    }
}

/// MCP23017 driver with shadow copies of the pin configuration registers.
pub struct Mcp23017<I2C> {
    i2c: I2C,
    address: u8,
    iodir: u16,
    gppu: u16,
    gpinten: u16,
}

impl<I2C> Mcp23017<I2C> {
    /// Default address with A0..A2 tied low.
    pub const DEFAULT_ADDRESS: u8 = 0x20;

    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            iodir: 0xFFFF,
            gppu: 0x0000,
            gpinten: 0x0000,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Release the bus.
    pub fn destroy(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> Mcp23017<I2C> {
    /// Mirror both ports onto one interrupt line with the given output style.
    pub fn init(&mut self, output: InterruptOutput) -> Result<(), Mcp23017Error<I2C::Error>> {
        log::info!(
            "Initializing MCP23017 at 0x{:02X}, interrupt output {:?}",
            self.address,
            output
        );
        self.i2c
            .write(self.address, &[Reg::IOCON, Iocon::MIRROR | output.iocon_bits()])?;
        Ok(())
    }

    /// Write a 16-bit value into an A/B register pair.
    fn write_pair(&mut self, reg: u8, value: u16) -> Result<(), Mcp23017Error<I2C::Error>> {
        let [a, b] = value.to_le_bytes();
        self.i2c.write(self.address, &[reg, a, b])?;
        Ok(())
    }
}

impl<I2C: I2c> InputPins for Mcp23017<I2C> {
    type Error = Mcp23017Error<I2C::Error>;

    fn setup_input_pin(&mut self, pin: u8, pull_up: bool) -> Result<(), Self::Error> {
        if pin >= PIN_COUNT {
            return Err(Mcp23017Error::InvalidPin(pin));
        }
        let mask = 1u16 << pin;

        // 1 = input
        self.iodir |= mask;
        // 1 = enable the 100k pull-up
        if pull_up {
            self.gppu |= mask;
        } else {
            self.gppu &= !mask;
        }
        // Interrupt on any change against the previous value
        self.gpinten |= mask;

        log::debug!(
            "MCP23017 0x{:02X}: pin {} as input, pull-up {}",
            self.address,
            pin,
            pull_up
        );
        self.write_pair(Reg::IODIRA, self.iodir)?;
        self.write_pair(Reg::GPPUA, self.gppu)?;
        self.write_pair(Reg::GPINTENA, self.gpinten)
    }

    fn read_input_pins(&mut self) -> Result<u32, Self::Error> {
        let mut buffer = [0u8; 2];
        self.i2c
            .write_read(self.address, &[Reg::GPIOA], &mut buffer)?;
        Ok(u16::from_le_bytes(buffer).into())
    }
}
