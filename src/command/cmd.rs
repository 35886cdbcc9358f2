/// Message names understood by the emulated buttons firmware.
pub struct Cmd;
impl Cmd {
    // Config-time commands
    pub const CONFIG_BUTTONS: &'static str = "config_buttons";
    pub const BUTTONS_ADD: &'static str = "buttons_add";
    pub const BUTTONS_QUERY: &'static str = "buttons_query";

    // Host to device
    pub const BUTTONS_ACK: &'static str = "buttons_ack";

    // Device to host
    pub const BUTTONS_STATE: &'static str = "buttons_state";

    // Prefix of a physical pin reference, e.g. PIN_3
    pub const PIN_PREFIX: &'static str = "PIN_";
}

/*
Argument keys:
config_buttons - oid, button_count
buttons_add    - oid, pos, pull_up, pin
buttons_query  - oid, clock, rest_ticks, retransmit_count, invert (ignored)
buttons_ack    - oid, count (ignored)
*/
