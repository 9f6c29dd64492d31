//! ## canview-core::command
//! **Vehicle command catalog**
//!
//! Each command the dashboard can send resolves to a CAN message name and the
//! signal values written into it. Signals not listed are transmitted as zero.

pub const ENGINE_ON: &str = "engine_on";
pub const ENGINE_OFF: &str = "engine_off";

/// A command and the CAN message it writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub message: &'static str,
    pub signals: &'static [(&'static str, i64)],
}

const ENGINE_TEMP: (&str, i64) = ("EngineWaterTemp", 50);
const ENGINE_TEMP_FAIL: (&str, i64) = ("EngineWaterTempFailSts", 0);

pub const COMMAND_CATALOG: &[CommandSpec] = &[
    CommandSpec {
        name: ENGINE_ON,
        message: "STATUS_CCAN3",
        signals: &[("EngineSts", 1), ENGINE_TEMP, ENGINE_TEMP_FAIL],
    },
    CommandSpec {
        name: ENGINE_OFF,
        message: "STATUS_CCAN3",
        signals: &[("EngineSts", 0), ENGINE_TEMP, ENGINE_TEMP_FAIL],
    },
    CommandSpec {
        name: "bonnet_open",
        message: "EXTERNAL_LIGHTS",
        signals: &[("BonnetSts", 1)],
    },
    CommandSpec {
        name: "bonnet_close",
        message: "EXTERNAL_LIGHTS",
        signals: &[("BonnetSts", 0)],
    },
    CommandSpec {
        name: "door_open",
        message: "STATUS_BH_BCM1",
        signals: &[("DriverDoorSts", 1)],
    },
    CommandSpec {
        name: "door_close",
        message: "STATUS_BH_BCM1",
        signals: &[("DriverDoorSts", 0)],
    },
    CommandSpec {
        name: "headlamp_on",
        message: "EXTERNAL_LIGHTS",
        signals: &[("LowBeamSts", 1)],
    },
    CommandSpec {
        name: "headlamp_off",
        message: "EXTERNAL_LIGHTS",
        signals: &[("LowBeamSts", 0)],
    },
    CommandSpec {
        name: "left_ind_on",
        message: "EXTERNAL_LIGHTS",
        signals: &[("LHTurnSignalSts", 1)],
    },
    CommandSpec {
        name: "left_ind_off",
        message: "EXTERNAL_LIGHTS",
        signals: &[("LHTurnSignalSts", 0)],
    },
    CommandSpec {
        name: "right_ind_on",
        message: "EXTERNAL_LIGHTS",
        signals: &[("RHTurnSignalSts", 1)],
    },
    CommandSpec {
        name: "right_ind_off",
        message: "EXTERNAL_LIGHTS",
        signals: &[("RHTurnSignalSts", 0)],
    },
];

pub fn lookup_command(name: &str) -> Option<&'static CommandSpec> {
    COMMAND_CATALOG.iter().find(|spec| spec.name == name)
}

/// A dashboard control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Button {
    pub label: &'static str,
    pub command: &'static str,
}

/// Controls shown on the dashboard. `tire_spin` and `brake_apply` have no
/// catalog entry; the endpoint answers them with a rejection.
pub const DASHBOARD_BUTTONS: &[Button] = &[
    Button { label: "Engine ON", command: ENGINE_ON },
    Button { label: "Engine OFF", command: ENGINE_OFF },
    Button { label: "Bonnet OPEN", command: "bonnet_open" },
    Button { label: "Bonnet CLOSE", command: "bonnet_close" },
    Button { label: "Driver Door OPEN", command: "door_open" },
    Button { label: "Driver Door CLOSE", command: "door_close" },
    Button { label: "Headlamp ON", command: "headlamp_on" },
    Button { label: "Headlamp OFF", command: "headlamp_off" },
    Button { label: "Drive Forward", command: "tire_spin" },
    Button { label: "Brake", command: "brake_apply" },
];

pub fn find_button(command: &str) -> Option<&'static Button> {
    DASHBOARD_BUTTONS.iter().find(|b| b.command == command)
}
