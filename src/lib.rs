//! Buttons subsystem emulated on a polled I2C input expander
//!
//! A host that drives button groups through an MCU's `config_buttons` /
//! `buttons_add` / `buttons_state` protocol can point them at an
//! [`I2cInputs`] device instead. The device interprets those commands itself,
//! reads the expander whenever its interrupt line is active and delivers
//! `buttons_state` notifications through a [`DeliveryQueue`].
//!
//! ```no_run
//! use std::rc::Rc;
//!
//! use i2c_inputs::{ButtonsMcu, ButtonsState, CommandStage, I2cInputs, InputsConfig};
//! use i2c_inputs::{ManualReactor, NoPins};
//!
//! let config = InputsConfig::from_section("eio_i2c_inputs panel", 0x20)?;
//! let (device, mut queue) = I2cInputs::new(config, NoPins, ManualReactor::new());
//! let oid = device.create_oid();
//! device.add_config_cmd("config_buttons oid=0 button_count=1", CommandStage::Config);
//! device.add_config_cmd("buttons_add oid=0 pos=0 pull_up=1 pin=PIN_3", CommandStage::Config);
//! device.register_response(Rc::new(|s: &ButtonsState| println!("{s}")), "buttons_state", oid)?;
//! device.build_config()?;
//! device.ready();
//! queue.run_pending();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod expander;
pub mod input;
pub mod reactor;
pub mod registry;

pub use command::{Command, CommandLog, CommandStage};
pub use config::InputsConfig;
pub use error::{ConfigError, Error, ProtocolError};
pub use expander::{InputPins, NoPins};
pub use input::{
    AckSender, ButtonsMcu, ButtonsState, CommandQueue, DeliveryQueue, EventTime, I2cInputs, Oid,
    PollState, ResponseCallback,
};
pub use reactor::{ManualReactor, Reactor};
