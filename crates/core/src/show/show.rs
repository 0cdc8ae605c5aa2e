use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub type ShowId = u64;
pub type CycleId = u64;
pub type SceneId = u64;
pub type GroupId = u64;
pub type ActionId = u64;
pub type DeviceId = u64;

/// Values a show or cycle may override for everything nested inside it.
///
/// A missing value, zero and the empty string all mean "not set": stored data
/// has never distinguished an explicit zero from an absent override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter2: Option<String>,
}

impl GlobalOverrides {
    pub fn is_empty(&self) -> bool {
        self.delay().is_none()
            && self.speed().is_none()
            && self.parameter1().is_none()
            && self.parameter2().is_none()
    }

    pub fn delay(&self) -> Option<f64> {
        self.delay.filter(|d| *d != 0.0)
    }

    pub fn speed(&self) -> Option<i32> {
        self.speed.filter(|s| *s != 0)
    }

    pub fn parameter1(&self) -> Option<&str> {
        self.parameter1.as_deref().filter(|p| !p.is_empty())
    }

    pub fn parameter2(&self) -> Option<&str> {
        self.parameter2.as_deref().filter(|p| !p.is_empty())
    }
}

/// Which inherited global value, if any, replaces an action's own parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlobalParameter {
    #[default]
    None,
    Speed,
    Parameter1,
    Parameter2,
}

impl GlobalParameter {
    pub fn as_str(&self) -> &'static str {
        match self {
            GlobalParameter::None => "none",
            GlobalParameter::Speed => "speed",
            GlobalParameter::Parameter1 => "parameter1",
            GlobalParameter::Parameter2 => "parameter2",
        }
    }
}

impl fmt::Display for GlobalParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GlobalParameter {
    type Err = String;

    /// Accepts both `speed` and the older `GlobalSpeed` spelling, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let tag = lower.strip_prefix("global").unwrap_or(&lower);

        match tag {
            "" | "none" => Ok(GlobalParameter::None),
            "speed" => Ok(GlobalParameter::Speed),
            "parameter1" => Ok(GlobalParameter::Parameter1),
            "parameter2" => Ok(GlobalParameter::Parameter2),
            _ => Err(format!("unknown global parameter '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    /// Base topic; commands go to `{topic}/cmnd/{command}`.
    pub topic: String,
    /// Id in the device type catalog.
    pub device_type: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub group_id: GroupId,
    pub devices: Vec<Device>,
    pub command: String,
    pub parameter: String,
    pub global_parameter: GlobalParameter,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub scene_id: SceneId,
    /// Seconds to wait after the group's actions fire.
    pub delay: f64,
    /// Prefer the enclosing global delay over `delay` when one is set.
    pub global_delay: bool,
    pub order: i32,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: SceneId,
    pub name: String,
    /// Authoring restriction only; playback ignores it.
    pub allowed_devices: Vec<Device>,
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: CycleId,
    pub show_id: ShowId,
    pub scene_id: SceneId,
    pub scene_cycles: u32,
    /// Seconds to wait once every repetition of the scene has played.
    pub end_delay: f64,
    /// Whether the cycle plays again on repeat passes.
    pub loop_include: bool,
    pub globals: GlobalOverrides,
    pub scene: Scene,
}

/// A playable show. Snapshots handed to the runner are fully populated and
/// never change while it plays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    pub id: ShowId,
    pub name: String,
    pub topic: String,
    pub repeat: bool,
    pub globals: GlobalOverrides,
    pub cycles: Vec<Cycle>,
}

impl Show {
    /// Number of device commands one pass over every cycle publishes.
    pub fn dispatch_count(&self) -> usize {
        self.cycles
            .iter()
            .map(|cycle| cycle.scene_cycles as usize * cycle.scene.dispatch_count())
            .sum()
    }
}

impl Scene {
    pub fn dispatch_count(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|g| g.actions.iter())
            .map(|a| a.devices.len())
            .sum()
    }
}
