//! Host side simulation of a front panel wired to an MCP23017-style expander.
//!
//! The expander is scripted: every poll reads the next snapshot. The host
//! event loop is a [`ManualReactor`] stepped through a list of interrupt pin
//! changes, and a small panel consumer logs button presses the way a menu
//! driver would see them.
//!
//! Set `I2C_INPUTS_LOG` to `debug` to see every poll cycle.

use std::cell::Cell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use anyhow::Context;
use log::LevelFilter;

use i2c_inputs::{
    ButtonsMcu, ButtonsState, CommandStage, DeliveryQueue, EventTime, I2cInputs, InputPins,
    InputsConfig, ManualReactor, Reactor,
};

/// Polls allowed per simulation step while the interrupt line stays active.
const MAX_POLLS_PER_STEP: usize = 3;

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{:<5} {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

/// Expander whose pin levels follow a script, one snapshot per read.
struct ScriptedPins {
    snapshots: VecDeque<u32>,
    current: u32,
}

impl ScriptedPins {
    fn new(snapshots: impl IntoIterator<Item = u32>) -> Self {
        Self {
            snapshots: snapshots.into_iter().collect(),
            current: 0,
        }
    }
}

impl InputPins for ScriptedPins {
    type Error = Infallible;

    fn setup_input_pin(&mut self, pin: u8, pull_up: bool) -> Result<(), Self::Error> {
        log::info!("Expander pin {} set up as input, pull-up {}", pin, pull_up);
        Ok(())
    }

    fn read_input_pins(&mut self) -> Result<u32, Self::Error> {
        // Once the script runs out the pins keep their last level
        if let Some(next) = self.snapshots.pop_front() {
            self.current = next;
        }
        Ok(self.current)
    }
}

type Device = I2cInputs<ScriptedPins, Rc<ManualReactor>>;

/// Attach a button group the way a host menu driver does.
fn attach_panel<M: ButtonsMcu + 'static>(
    mcu: &M,
    buttons: &'static [(&'static str, u8)],
) -> anyhow::Result<()> {
    let oid = mcu.create_oid();
    let ack = mcu
        .lookup_command("buttons_ack oid=%c count=%c")
        .context("Buttons consumer needs buttons_ack")?;

    mcu.register_config_callback(Box::new(move |mcu: &M| {
        let index = oid.index();
        mcu.add_config_cmd(
            &format!("config_buttons oid={} button_count={}", index, buttons.len()),
            CommandStage::Config,
        );
        for (pos, (_, pin)) in buttons.iter().enumerate() {
            mcu.add_config_cmd(
                &format!("buttons_add oid={} pos={} pull_up=1 pin=PIN_{}", index, pos, pin),
                CommandStage::Config,
            );
        }
        let clock = mcu.get_query_slot(oid);
        let rest_ticks = mcu.seconds_to_clock(0.002);
        mcu.add_config_cmd(
            &format!(
                "buttons_query oid={} clock={} rest_ticks={} retransmit_count=50 invert=0",
                index, clock, rest_ticks
            ),
            CommandStage::Init,
        );
    }));

    let pressed = Cell::new(0u32);
    let callback = Rc::new(move |params: &ButtonsState| {
        let state = params.state.first().copied().unwrap_or_default();
        let changed = state ^ pressed.replace(state);
        for (pos, (name, _)) in buttons.iter().enumerate() {
            if changed & (1 << pos) != 0 {
                let action = if state & (1 << pos) != 0 { "pressed" } else { "released" };
                log::info!("Button '{}' {} at {:.3}", name, action, params.receive_time);
            }
        }
        ack.send(&[params.oid.index() as u32, u32::from(params.ack_count)]);
    });
    mcu.register_response(callback, "buttons_state", oid)
        .context("Failed to register buttons_state handler")?;
    Ok(())
}

/// Fire the poll timer while it is due, then deliver the notifications.
fn step(device: &Device, reactor: &ManualReactor, queue: &mut DeliveryQueue) -> anyhow::Result<()> {
    let polls = reactor
        .run_due(MAX_POLLS_PER_STEP, |eventtime| device.on_timer(eventtime))
        .context("Poll cycle failed")?;
    let delivered = queue.run_pending();
    log::info!(
        "t={:.3}: {} polls, {} notifications, timer {:?}",
        reactor.monotonic(),
        polls,
        delivered,
        device.poll_state()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    log::set_logger(&LOGGER).map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))?;
    let level = std::env::var("I2C_INPUTS_LOG")
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::Info);
    log::set_max_level(level);

    let config = InputsConfig::from_section("eio_i2c_inputs front_panel", 0x20)
        .context("Invalid device config")?
        .with_interrupt_pin("^!PC7");

    // up=PIN_3, down=PIN_5, enter=PIN_1
    let pins = ScriptedPins::new([
        0b0000_0000,
        0b0000_1000,
        0b0000_1000,
        0b0010_1000,
        0b0010_0000,
        0b0000_0000,
        0b0000_0010,
        0b0000_0000,
    ]);
    let reactor = Rc::new(ManualReactor::new());
    let (device, mut queue) = I2cInputs::new(config, pins, reactor.clone());

    attach_panel(&device, &[("up", 3), ("down", 5), ("enter", 1)])?;
    device
        .build_config()
        .context("Failed to build I2C inputs config")?;
    if !device.restart_commands().is_empty() {
        log::warn!("Restart commands are not replayed by the device");
    }

    device.ready();
    step(&device, &reactor, &mut queue)?;

    let interrupts: [(EventTime, bool); 6] = [
        (1.000, true),
        (1.010, false),
        (1.500, true),
        (1.520, false),
        (2.000, true),
        (2.005, false),
    ];
    for (time, level) in interrupts {
        reactor.set_time(time);
        device.handle_interrupt(time, level);
        step(&device, &reactor, &mut queue)?;
    }

    log::info!(
        "Simulation of '{}' done, last pin snapshot {:?}",
        device.config().name,
        device.last_pins().map(|pins| format!("{:#010b}", pins))
    );
    Ok(())
}
