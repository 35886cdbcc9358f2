//! Emulated MCU buttons subsystem on an I2C input expander
//!
//! [`I2cInputs`] stands in for the microcontroller a host's buttons consumer
//! normally talks to. The consumer allocates oids, queues its usual firmware
//! commands and registers for `buttons_state` responses through [`ButtonsMcu`];
//! the device answers by polling the expander whenever its interrupt line is
//! active.
//!
//! ### Lifecycle
//! 1. [`I2cInputs::new`] with the expander ([`InputPins`]) and host [`Reactor`]
//! 1. consumers call [`ButtonsMcu`] methods and queue commands
//! 1. [`I2cInputs::build_config`] runs config callbacks and interprets commands
//! 1. [`I2cInputs::ready`] schedules the first poll
//! 1. the host forwards interrupt pin changes to [`I2cInputs::handle_interrupt`]
//!    and timer firings to [`I2cInputs::on_timer`]
//! 1. the host drains the returned [`DeliveryQueue`]
//!
//! Every entry point takes `&self`. A bus read that pumps the host event loop
//! may therefore call back into the device while the read is still in flight;
//! the poll scheduler makes sure no second read starts in that window.

use std::cell::RefCell;

use crate::command::{Cmd, Command, CommandLog, CommandStage};
use crate::config::InputsConfig;
use crate::error::{Error, ProtocolError};
use crate::expander::InputPins;
use crate::reactor::Reactor;
use crate::registry::PinRegistry;

pub mod dispatch;
pub mod guard;
pub mod scheduler;
pub mod types;

pub use dispatch::{ChangeDispatcher, Delivery, DeliveryQueue};
pub use guard::OverlapGuard;
pub use scheduler::{PollScheduler, PollState};
pub use types::*;

/// What a host buttons consumer needs from the MCU it is attached to.
pub trait ButtonsMcu {
    /// Allocate the next object id.
    fn create_oid(&self) -> Oid;

    /// Queue a firmware command for the given stage.
    fn add_config_cmd(&self, cmd: &str, stage: CommandStage);

    /// Run `callback` when the configuration is built, before commands are
    /// interpreted.
    fn register_config_callback(&self, callback: Box<dyn FnOnce(&Self)>);

    fn alloc_command_queue(&self) -> Option<CommandQueue>;

    fn get_query_slot(&self, oid: Oid) -> u64;

    fn seconds_to_clock(&self, seconds: f64) -> u64;

    /// Register the handler of `name` responses for `oid`.
    fn register_response(
        &self,
        callback: ResponseCallback,
        name: &str,
        oid: Oid,
    ) -> Result<(), ProtocolError>;

    /// Resolve an outgoing command by its message format.
    fn lookup_command(&self, msgformat: &str) -> Result<AckSender, ProtocolError>;
}

type ConfigCallback<P, R> = Box<dyn FnOnce(&I2cInputs<P, R>)>;

/// Buttons subsystem emulated on top of an input expander.
pub struct I2cInputs<P, R> {
    config: InputsConfig,
    reactor: R,
    pins: RefCell<P>,
    registry: RefCell<PinRegistry>,
    commands: RefCell<CommandLog>,
    config_callbacks: RefCell<Vec<ConfigCallback<P, R>>>,
    scheduler: PollScheduler,
    dispatcher: ChangeDispatcher,
}

impl<P, R> I2cInputs<P, R>
where
    P: InputPins,
    R: Reactor,
{
    /// Create the device and the queue its notifications are delivered through.
    pub fn new(config: InputsConfig, pins: P, reactor: R) -> (Self, DeliveryQueue) {
        log::info!(
            "I2C inputs '{}' at 0x{:02X}, {} Hz, interrupt pin {:?}",
            config.name,
            config.address,
            config.speed_hz,
            config.interrupt_pin
        );
        let (dispatcher, deliveries) = ChangeDispatcher::new();
        let device = Self {
            config,
            reactor,
            pins: RefCell::new(pins),
            registry: RefCell::new(PinRegistry::new()),
            commands: RefCell::new(CommandLog::new()),
            config_callbacks: RefCell::new(Vec::new()),
            scheduler: PollScheduler::new(),
            dispatcher,
        };
        (device, deliveries)
    }

    pub fn config(&self) -> &InputsConfig {
        &self.config
    }

    pub fn poll_state(&self) -> PollState {
        self.scheduler.state()
    }

    /// Snapshot from the latest change, `None` before the first poll.
    pub fn last_pins(&self) -> Option<u32> {
        self.dispatcher.last_pins()
    }

    /// Commands the host must replay itself after a firmware restart.
    pub fn restart_commands(&self) -> Vec<String> {
        self.commands.borrow().restart_commands().to_vec()
    }

    /// Access the expander outside a poll cycle.
    ///
    /// # Panics
    /// If called from inside the expander's own read.
    pub fn with_pins<T>(&self, f: impl FnOnce(&mut P) -> T) -> T {
        f(&mut *self.pins.borrow_mut())
    }

    /// Run config callbacks, then interpret config and init commands in order.
    ///
    /// Fails if any command is rejected or any declared position stays unbound.
    pub fn build_config(&self) -> Result<(), Error<P::Error>> {
        // Callbacks may register further callbacks; those run in the same build.
        loop {
            let callbacks = std::mem::take(&mut *self.config_callbacks.borrow_mut());
            if callbacks.is_empty() {
                break;
            }
            for callback in callbacks {
                callback(self);
            }
        }

        let commands: Vec<String> = self
            .commands
            .borrow()
            .interpretation_order()
            .map(str::to_string)
            .collect();
        for line in &commands {
            self.interpret(line)?;
        }

        if let Some((oid, pos)) = self.registry.borrow().first_unbound() {
            return Err(ProtocolError::UnboundPosition { oid, pos }.into());
        }
        log::info!(
            "I2C inputs '{}' configured: {} commands, {} oids",
            self.config.name,
            commands.len(),
            self.registry.borrow().len()
        );
        Ok(())
    }

    /// Apply a single configuration command.
    pub fn interpret(&self, line: &str) -> Result<(), Error<P::Error>> {
        match Command::parse(line)? {
            Command::ConfigButtons { oid, button_count } => {
                self.registry.borrow_mut().configure(oid, button_count)?;
            }
            Command::ButtonsAdd {
                oid,
                pos,
                pull_up,
                pin,
            } => {
                let previous = self.registry.borrow_mut().bind(oid, pos, pin)?;
                if let Some(previous) = previous {
                    log::warn!(
                        "oid {} position {} rebound from PIN_{} to PIN_{}",
                        oid,
                        pos,
                        previous,
                        pin
                    );
                }
                self.pins
                    .borrow_mut()
                    .setup_input_pin(pin, pull_up)
                    .map_err(Error::Bus)?;
            }
            Command::ButtonsQuery => {}
        }
        Ok(())
    }

    /// Host startup: read the pins once, whatever the interrupt line says.
    pub fn ready(&self) {
        log::info!("I2C inputs '{}' ready, scheduling first update", self.config.name);
        self.scheduler.arm(&self.reactor);
    }

    /// Interrupt pin level change reported by the host's buttons subsystem.
    pub fn handle_interrupt(&self, eventtime: EventTime, level: bool) {
        log::debug!("Interrupt pin level {} at {:.3}", level, eventtime);
        self.scheduler.on_interrupt(&self.reactor, level);
    }

    /// Poll timer callback. Returns the timer's next wake time.
    pub fn on_timer(&self, eventtime: EventTime) -> Result<Option<EventTime>, Error<P::Error>> {
        let raw = self
            .scheduler
            .read(|| self.pins.borrow_mut().read_input_pins())?;
        self.dispatcher
            .on_snapshot(&self.registry.borrow(), raw, eventtime);

        // We keep re-reading input pins until the interrupt line is released
        Ok(self.scheduler.next_wake(self.reactor.monotonic()))
    }
}

impl<P, R> ButtonsMcu for I2cInputs<P, R>
where
    P: InputPins,
    R: Reactor,
{
    fn create_oid(&self) -> Oid {
        self.registry.borrow_mut().create_oid()
    }

    fn add_config_cmd(&self, cmd: &str, stage: CommandStage) {
        self.commands.borrow_mut().add(cmd, stage);
    }

    fn register_config_callback(&self, callback: Box<dyn FnOnce(&Self)>) {
        self.config_callbacks.borrow_mut().push(callback);
    }

    fn alloc_command_queue(&self) -> Option<CommandQueue> {
        None
    }

    fn get_query_slot(&self, _oid: Oid) -> u64 {
        0
    }

    fn seconds_to_clock(&self, _seconds: f64) -> u64 {
        0
    }

    fn register_response(
        &self,
        callback: ResponseCallback,
        name: &str,
        oid: Oid,
    ) -> Result<(), ProtocolError> {
        self.registry
            .borrow_mut()
            .register_response(name, oid, callback)
    }

    fn lookup_command(&self, msgformat: &str) -> Result<AckSender, ProtocolError> {
        match msgformat.split_whitespace().next() {
            Some(Cmd::BUTTONS_ACK) => Ok(AckSender),
            _ => Err(ProtocolError::UnsupportedOutgoing(msgformat.to_string())),
        }
    }
}
