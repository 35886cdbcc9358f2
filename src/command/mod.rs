//! Configuration command protocol
//!
//! The host's generic buttons consumer describes its pin layout with textual
//! firmware commands such as `buttons_add oid=0 pos=1 pull_up=1 pin=PIN_5`.
//! This module turns that text into a closed [`Command`] type and keeps the
//! ordered [`CommandLog`] the device interprets at config-build time.
//!
//! ### Interpretation order
//! 1. all [`CommandStage::Config`] commands, in insertion order
//! 1. all [`CommandStage::Init`] commands, in insertion order
//!
//! [`CommandStage::Restart`] commands are only stored for the host's own replay.

use crate::error::ProtocolError;

pub mod cmd;

pub use cmd::Cmd;

/// Highest physical pin index that fits in a snapshot word.
const MAX_PIN: u32 = 31;

/// A parsed configuration command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Allocate `button_count` unbound positions for `oid`.
    ConfigButtons { oid: usize, button_count: usize },
    /// Bind position `pos` of `oid` to physical pin `pin`.
    ButtonsAdd {
        oid: usize,
        pos: usize,
        pull_up: bool,
        pin: u8,
    },
    /// Periodic query request. Polling is interrupt driven here, so it is a no-op.
    ButtonsQuery,
}

impl Command {
    /// Parse one whitespace separated command line.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let mut tokens = line.split_whitespace();
        let name = tokens.next().ok_or(ProtocolError::EmptyCommand)?;
        let args = Args::parse(name, tokens)?;

        match name {
            Cmd::CONFIG_BUTTONS => Ok(Command::ConfigButtons {
                oid: args.value("oid")?,
                button_count: args.value("button_count")?,
            }),
            Cmd::BUTTONS_ADD => {
                let pull_up: i64 = args.value("pull_up")?;
                if pull_up < 0 {
                    log::warn!(
                        "Pull-down requested in '{}', I2C inputs only support pull-ups",
                        line.trim()
                    );
                }
                Ok(Command::ButtonsAdd {
                    oid: args.value("oid")?,
                    pos: args.value("pos")?,
                    pull_up: pull_up > 0,
                    pin: parse_pin(args.get("pin")?)?,
                })
            }
            Cmd::BUTTONS_QUERY => Ok(Command::ButtonsQuery),
            other => Err(ProtocolError::UnsupportedCommand(other.to_string())),
        }
    }
}

impl core::str::FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::parse(s)
    }
}

/// Extract the physical index from a `PIN_<n>` reference.
fn parse_pin(token: &str) -> Result<u8, ProtocolError> {
    let index = token
        .strip_prefix(Cmd::PIN_PREFIX)
        .ok_or_else(|| ProtocolError::MalformedPin(token.to_string()))?;
    let index: u32 = index
        .parse()
        .map_err(|_| ProtocolError::MalformedPin(token.to_string()))?;
    if index > MAX_PIN {
        return Err(ProtocolError::PinOutOfRange(index));
    }
    Ok(index as u8)
}

/// `key=value` arguments of one command, in the order given.
struct Args<'a> {
    command: &'a str,
    pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> Args<'a> {
    fn parse(
        command: &'a str,
        tokens: impl Iterator<Item = &'a str>,
    ) -> Result<Self, ProtocolError> {
        let pairs = tokens
            .map(|token| {
                token
                    .split_once('=')
                    .ok_or_else(|| ProtocolError::MalformedArgument {
                        command: command.to_string(),
                        token: token.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { command, pairs })
    }

    /// Last occurrence wins, like a dictionary built from the tokens.
    fn get(&self, key: &'static str) -> Result<&'a str, ProtocolError> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .ok_or_else(|| ProtocolError::MissingArgument {
                command: self.command.to_string(),
                key,
            })
    }

    fn value<T: core::str::FromStr>(&self, key: &'static str) -> Result<T, ProtocolError> {
        let value = self.get(key)?;
        value.parse().map_err(|_| ProtocolError::InvalidValue {
            key,
            value: value.to_string(),
        })
    }
}

/// When the host wants a command sent to the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStage {
    /// Object configuration, sent once per config build.
    Config,
    /// Initial state, sent after all config commands.
    Init,
    /// Sent again after a firmware restart; never interpreted by the emulation.
    Restart,
}

/// Commands collected from the host, grouped by stage.
#[derive(Debug, Default)]
pub struct CommandLog {
    config: Vec<String>,
    init: Vec<String>,
    restart: Vec<String>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a command for the given stage.
    pub fn add(&mut self, cmd: impl Into<String>, stage: CommandStage) {
        let cmd = cmd.into();
        match stage {
            CommandStage::Config => self.config.push(cmd),
            CommandStage::Init => self.init.push(cmd),
            CommandStage::Restart => self.restart.push(cmd),
        }
    }

    /// Config commands followed by init commands, each in insertion order.
    pub fn interpretation_order(&self) -> impl Iterator<Item = &str> {
        self.config
            .iter()
            .chain(self.init.iter())
            .map(String::as_str)
    }

    /// Commands the host replays itself after a firmware restart.
    pub fn restart_commands(&self) -> &[String] {
        &self.restart
    }

    pub fn len(&self) -> usize {
        self.config.len() + self.init.len() + self.restart.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config_buttons() {
        let cmd = Command::parse("config_buttons oid=2 button_count=4").unwrap();
        assert_eq!(
            cmd,
            Command::ConfigButtons {
                oid: 2,
                button_count: 4
            }
        );
    }

    #[test]
    fn parses_buttons_add_in_any_argument_order() {
        let cmd = Command::parse("buttons_add pin=PIN_12 pull_up=1 pos=3 oid=0").unwrap();
        assert_eq!(
            cmd,
            Command::ButtonsAdd {
                oid: 0,
                pos: 3,
                pull_up: true,
                pin: 12
            }
        );
    }

    #[test]
    fn pull_down_request_is_not_a_pull_up() {
        let cmd = Command::parse("buttons_add oid=0 pos=0 pull_up=-1 pin=PIN_1").unwrap();
        assert!(matches!(cmd, Command::ButtonsAdd { pull_up: false, .. }));
    }

    #[test]
    fn buttons_query_is_accepted() {
        let cmd = Command::parse(
            "buttons_query oid=0 clock=0 rest_ticks=1000 retransmit_count=3 invert=0",
        )
        .unwrap();
        assert_eq!(cmd, Command::ButtonsQuery);
    }

    #[test]
    fn rejects_unsupported_command() {
        assert_eq!(
            Command::parse("foo_bar oid=1"),
            Err(ProtocolError::UnsupportedCommand("foo_bar".into()))
        );
    }

    #[test]
    fn rejects_pin_without_prefix() {
        assert_eq!(
            Command::parse("buttons_add oid=0 pos=0 pull_up=0 pin=5"),
            Err(ProtocolError::MalformedPin("5".into()))
        );
    }

    #[test]
    fn rejects_pin_with_non_numeric_index() {
        assert_eq!(
            Command::parse("buttons_add oid=0 pos=0 pull_up=0 pin=PIN_A"),
            Err(ProtocolError::MalformedPin("PIN_A".into()))
        );
    }

    #[test]
    fn rejects_pin_beyond_snapshot_width() {
        assert_eq!(
            Command::parse("buttons_add oid=0 pos=0 pull_up=0 pin=PIN_32"),
            Err(ProtocolError::PinOutOfRange(32))
        );
    }

    #[test]
    fn rejects_token_without_equals() {
        assert!(matches!(
            Command::parse("config_buttons oid=0 4"),
            Err(ProtocolError::MalformedArgument { token, .. }) if token == "4"
        ));
    }

    #[test]
    fn rejects_missing_and_invalid_arguments() {
        assert!(matches!(
            Command::parse("config_buttons oid=0"),
            Err(ProtocolError::MissingArgument {
                key: "button_count",
                ..
            })
        ));
        assert!(matches!(
            Command::parse("config_buttons oid=x button_count=1"),
            Err(ProtocolError::InvalidValue { key: "oid", .. })
        ));
    }

    #[test]
    fn rejects_empty_line() {
        assert_eq!(Command::parse("   "), Err(ProtocolError::EmptyCommand));
    }

    #[test]
    fn log_orders_config_before_init_and_keeps_restart_aside() {
        let mut log = CommandLog::new();
        log.add("init_a", CommandStage::Init);
        log.add("config_a", CommandStage::Config);
        log.add("restart_a", CommandStage::Restart);
        log.add("init_b", CommandStage::Init);
        log.add("config_b", CommandStage::Config);

        let order: Vec<_> = log.interpretation_order().collect();
        assert_eq!(order, ["config_a", "config_b", "init_a", "init_b"]);
        assert_eq!(log.restart_commands(), ["restart_a".to_string()]);
        assert_eq!(log.len(), 5);
    }
}
