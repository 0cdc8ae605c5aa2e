use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A command a device type understands, e.g. `Dimmer` on a Tasmota light.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceType {
    pub id: u32,
    pub name: String,
    pub commands: Vec<Command>,
}

impl DeviceType {
    pub fn command(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn supports(&self, name: &str) -> bool {
        self.command(name).is_some()
    }
}

/// Static catalog of the device types a show can address.
pub struct DeviceLibrary {
    pub types: HashMap<u32, DeviceType>,
}

pub const TASMOTA: u32 = 1;

impl DeviceLibrary {
    pub fn new() -> Self {
        let mut types = HashMap::new();

        // Seldom changes, so the catalog is built in rather than stored.
        types.insert(
            TASMOTA,
            DeviceType {
                id: TASMOTA,
                name: "Tasmota".to_string(),
                commands: tasmota_commands(),
            },
        );

        Self { types }
    }

    pub fn get(&self, id: u32) -> Option<&DeviceType> {
        self.types.get(&id)
    }

    pub fn by_name(&self, name: &str) -> Option<&DeviceType> {
        self.types
            .values()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// All device types ordered by id.
    pub fn all(&self) -> Vec<&DeviceType> {
        let mut types: Vec<&DeviceType> = self.types.values().collect();
        types.sort_by_key(|t| t.id);
        types
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.all())
    }
}

impl Default for DeviceLibrary {
    fn default() -> Self {
        Self::new()
    }
}

fn command(name: &str, description: &str) -> Command {
    Command {
        name: name.to_string(),
        description: description.to_string(),
    }
}

fn tasmota_commands() -> Vec<Command> {
    vec![
        command("Power", "Power - Toggle, On, Off"),
        command(
            "Color1",
            "Color1 - Set color, values can be r,g,b or #hex",
        ),
        command(
            "Color2",
            "Color2 - Set color adjusted to current Dimmer value",
        ),
        command(
            "CT",
            "CT - Set color temperature from 153 (cold) to 500 (warm) for CT lights",
        ),
        command("Dimmer", "Dimmer - Set dimmer value from 0 to 100(%)"),
        command("Fade", "Fade - 0 = do not use fade (default), 1 = use fade"),
        command(
            "Speed",
            "Speed - Set fade speed from fast 1 to very slow 40 (The Speed value represents the time in 0.5s)",
        ),
        command(
            "HsbColor",
            "HsbColor - hue,sat,bri = set color by hue, saturation and brightness",
        ),
        command("HsbColor1", "HsbColor1 - 0..360 = set hue"),
        command("HsbColor2", "HsbColor2 - 0..100 = set saturation"),
        command("HsbColor3", "HsbColor3 - 0..100 = set brightness"),
        command(
            "Scheme",
            "Scheme - 0 = single color, 1 = start wake up, 2 = cycle up colors, 3 = cycle down colors, 4 = random cycle colors",
        ),
        command(
            "Wakeup",
            "Wakeup - Start wake up from OFF to stored Dimmer value (0..100 = Start wake up from OFF to provided value)",
        ),
        command(
            "WakeupDuration",
            "WakeupDuration - 1..3000 = set wake up duration in seconds",
        ),
        command(
            "White",
            "White - 1..100 = set white channel brightness in single white channel lights (single W or RGBW lights)",
        ),
    ]
}
