use crate::error::ConfigError;

/// Configuration of one I2C inputs device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputsConfig {
    /// Object name, the second word of the config section header.
    pub name: String,
    /// 7-bit I2C address of the expander.
    pub address: u8,
    /// Bus speed requested from the transport.
    pub speed_hz: u32,
    /// Host pin wired to the expander's interrupt output. Without it the pins
    /// are read once at startup and never again.
    pub interrupt_pin: Option<String>,
}

impl InputsConfig {
    /// Config section prefix for this device kind.
    pub const SECTION: &'static str = "eio_i2c_inputs";
    pub const DEFAULT_SPEED_HZ: u32 = 400_000;

    pub fn new(name: impl Into<String>, address: u8) -> Result<Self, ConfigError> {
        if address > 0x7F {
            return Err(ConfigError::InvalidAddress(address));
        }
        Ok(Self {
            name: name.into(),
            address,
            speed_hz: Self::DEFAULT_SPEED_HZ,
            interrupt_pin: None,
        })
    }

    /// Build a config from a section header such as `eio_i2c_inputs panel`.
    pub fn from_section(section: &str, address: u8) -> Result<Self, ConfigError> {
        let name = section
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| ConfigError::MissingName(section.to_string()))?;
        Self::new(name, address)
    }

    pub fn with_speed(mut self, speed_hz: u32) -> Self {
        self.speed_hz = speed_hz;
        self
    }

    pub fn with_interrupt_pin(mut self, pin: impl Into<String>) -> Self {
        self.interrupt_pin = Some(pin.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_comes_from_section_header() {
        let config = InputsConfig::from_section("eio_i2c_inputs front_panel", 0x20).unwrap();
        assert_eq!(config.name, "front_panel");
        assert_eq!(config.speed_hz, InputsConfig::DEFAULT_SPEED_HZ);
        assert_eq!(config.interrupt_pin, None);
    }

    #[test]
    fn section_without_name_is_rejected() {
        assert_eq!(
            InputsConfig::from_section("eio_i2c_inputs", 0x20),
            Err(ConfigError::MissingName("eio_i2c_inputs".into()))
        );
    }

    #[test]
    fn address_must_fit_in_seven_bits() {
        assert_eq!(
            InputsConfig::new("panel", 0x80),
            Err(ConfigError::InvalidAddress(0x80))
        );
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = InputsConfig::new("panel", 0x27)
            .unwrap()
            .with_speed(100_000)
            .with_interrupt_pin("^!PC7");
        assert_eq!(config.speed_hz, 100_000);
        assert_eq!(config.interrupt_pin.as_deref(), Some("^!PC7"));
    }
}
