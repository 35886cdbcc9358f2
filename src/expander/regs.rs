/// MCP23017 register addresses with IOCON.BANK = 0, where every A register is
/// directly followed by its B twin so one sequential transfer covers both ports.
pub struct Reg;
impl Reg {
    // Configuration
    pub const IODIRA: u8 = 0x00;
    pub const GPINTENA: u8 = 0x04;
    pub const IOCON: u8 = 0x0A;
    pub const GPPUA: u8 = 0x0C;

    // Port
    pub const GPIOA: u8 = 0x12;
}

/// IOCON bits.
pub struct Iocon;
impl Iocon {
    // INTA and INTB are internally connected
    pub const MIRROR: u8 = 0x40;
    // Open-drain interrupt output
    pub const ODR: u8 = 0x04;
    // Active-high interrupt output
    pub const INTPOL: u8 = 0x02;
}

/*
Power-on defaults:
IODIR   - 0xFF (all inputs)
GPPU    - 0x00 (no pull-ups)
GPINTEN - 0x00 (no interrupt-on-change)
IOCON   - 0x00 (BANK = 0, sequential operation, active-low push-pull INT)
*/
