//! Typed partial updates built from submitted form fields.
//!
//! Each patch knows its own fields and parser. Keys match case-insensitively
//! and ignore `_`/`-`, so `GlobalDelay`, `global_delay` and `global-delay`
//! are the same field. Empty values and unknown keys are skipped; a value
//! that does not parse rejects the whole patch.

use std::collections::HashMap;
use std::str::FromStr;

use super::memory_store::{ActionRecord, CycleRecord, GroupRecord, SceneRecord, ShowRecord};
use crate::show::show::{DeviceId, GlobalParameter, SceneId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("field '{field}': cannot parse '{value}' as {expected}")]
pub struct PatchError {
    pub field: String,
    pub value: String,
    pub expected: &'static str,
}

struct Fields<'a> {
    values: HashMap<String, &'a str>,
}

impl<'a> Fields<'a> {
    fn new(fields: &'a HashMap<String, String>) -> Self {
        let values = fields
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (normalize(k), v.trim()))
            .collect();
        Self { values }
    }

    fn string(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.to_string())
    }

    fn parse<T: FromStr>(&self, key: &str, expected: &'static str) -> Result<Option<T>, PatchError> {
        self.values
            .get(key)
            .map(|v| v.parse::<T>().map_err(|_| error(key, v, expected)))
            .transpose()
    }

    /// A delay: finite and not negative.
    fn seconds(&self, key: &str) -> Result<Option<f64>, PatchError> {
        self.values
            .get(key)
            .map(|v| {
                v.parse::<f64>()
                    .ok()
                    .filter(|s| s.is_finite() && *s >= 0.0)
                    .ok_or_else(|| error(key, v, "a non-negative number of seconds"))
            })
            .transpose()
    }

    /// A repetition count of at least one.
    fn count(&self, key: &str) -> Result<Option<i64>, PatchError> {
        self.values
            .get(key)
            .map(|v| {
                v.parse::<i64>()
                    .ok()
                    .filter(|n| *n >= 1)
                    .ok_or_else(|| error(key, v, "a count of at least 1"))
            })
            .transpose()
    }

    fn flag(&self, key: &str) -> Result<Option<bool>, PatchError> {
        self.values
            .get(key)
            .map(|v| parse_bool(v).ok_or_else(|| error(key, v, "a boolean")))
            .transpose()
    }

    /// Space- or comma-separated id list.
    fn ids(&self, key: &str) -> Result<Option<Vec<DeviceId>>, PatchError> {
        self.values
            .get(key)
            .map(|v| {
                v.split(|c: char| c == ' ' || c == ',')
                    .filter(|s| !s.is_empty())
                    .map(|s| s.parse().map_err(|_| error(key, v, "a list of ids")))
                    .collect::<Result<Vec<DeviceId>, PatchError>>()
            })
            .transpose()
    }

    fn global_parameter(&self, key: &str) -> Result<Option<GlobalParameter>, PatchError> {
        self.parse(key, "a global parameter (speed, parameter1, parameter2)")
    }
}

fn normalize(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn error(field: &str, value: &str, expected: &'static str) -> PatchError {
    PatchError {
        field: field.to_string(),
        value: value.to_string(),
        expected,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "on" | "yes" => Some(true),
        "0" | "f" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

macro_rules! set {
    ($target:expr, $value:expr) => {
        if let Some(value) = &$value {
            $target = value.clone();
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShowPatch {
    pub name: Option<String>,
    pub topic: Option<String>,
    pub repeat: Option<bool>,
    pub global_delay: Option<f64>,
    pub global_speed: Option<i32>,
    pub global_parameter1: Option<String>,
    pub global_parameter2: Option<String>,
}

impl ShowPatch {
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, PatchError> {
        let f = Fields::new(fields);
        Ok(Self {
            name: f.string("name"),
            topic: f.string("topic"),
            repeat: f.flag("repeat")?,
            global_delay: f.seconds("globaldelay")?,
            global_speed: f.parse("globalspeed", "an integer")?,
            global_parameter1: f.string("globalparameter1"),
            global_parameter2: f.string("globalparameter2"),
        })
    }

    pub fn apply(&self, record: &mut ShowRecord) {
        set!(record.name, self.name);
        set!(record.topic, self.topic);
        set!(record.repeat, self.repeat);
        if self.global_delay.is_some() {
            record.globals.delay = self.global_delay;
        }
        if self.global_speed.is_some() {
            record.globals.speed = self.global_speed;
        }
        if self.global_parameter1.is_some() {
            record.globals.parameter1 = self.global_parameter1.clone();
        }
        if self.global_parameter2.is_some() {
            record.globals.parameter2 = self.global_parameter2.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CyclePatch {
    pub scene_id: Option<SceneId>,
    pub scene_cycles: Option<i64>,
    pub end_delay: Option<f64>,
    pub loop_include: Option<bool>,
    pub global_delay: Option<f64>,
    pub global_speed: Option<i32>,
    pub global_parameter1: Option<String>,
    pub global_parameter2: Option<String>,
}

impl CyclePatch {
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, PatchError> {
        let f = Fields::new(fields);
        Ok(Self {
            scene_id: f.parse("sceneid", "a scene id")?,
            scene_cycles: f.count("scenecycles")?,
            end_delay: f.seconds("enddelay")?,
            loop_include: f.flag("loopinclude")?,
            global_delay: f.seconds("globaldelay")?,
            global_speed: f.parse("globalspeed", "an integer")?,
            global_parameter1: f.string("globalparameter1"),
            global_parameter2: f.string("globalparameter2"),
        })
    }

    pub fn apply(&self, record: &mut CycleRecord) {
        set!(record.scene_id, self.scene_id);
        set!(record.scene_cycles, self.scene_cycles);
        set!(record.end_delay, self.end_delay);
        set!(record.loop_include, self.loop_include);
        if self.global_delay.is_some() {
            record.globals.delay = self.global_delay;
        }
        if self.global_speed.is_some() {
            record.globals.speed = self.global_speed;
        }
        if self.global_parameter1.is_some() {
            record.globals.parameter1 = self.global_parameter1.clone();
        }
        if self.global_parameter2.is_some() {
            record.globals.parameter2 = self.global_parameter2.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenePatch {
    pub name: Option<String>,
    pub allowed_devices: Option<Vec<DeviceId>>,
}

impl ScenePatch {
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, PatchError> {
        let f = Fields::new(fields);
        Ok(Self {
            name: f.string("name"),
            allowed_devices: f.ids("alloweddevices")?,
        })
    }

    pub fn apply(&self, record: &mut SceneRecord) {
        set!(record.name, self.name);
        set!(record.allowed_devices, self.allowed_devices);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupPatch {
    pub delay: Option<f64>,
    pub global_delay: Option<bool>,
    pub order: Option<i32>,
}

impl GroupPatch {
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, PatchError> {
        let f = Fields::new(fields);
        Ok(Self {
            delay: f.seconds("delay")?,
            global_delay: f.flag("globaldelay")?,
            order: f.parse("order", "an integer")?,
        })
    }

    pub fn apply(&self, record: &mut GroupRecord) {
        set!(record.delay, self.delay);
        set!(record.global_delay, self.global_delay);
        set!(record.order, self.order);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionPatch {
    pub devices: Option<Vec<DeviceId>>,
    pub command: Option<String>,
    pub parameter: Option<String>,
    pub global_parameter: Option<GlobalParameter>,
    pub order: Option<i32>,
}

impl ActionPatch {
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, PatchError> {
        let f = Fields::new(fields);
        Ok(Self {
            devices: f.ids("devices")?,
            command: f.string("command"),
            parameter: f.string("parameter"),
            global_parameter: f.global_parameter("globalparameter")?,
            order: f.parse("order", "an integer")?,
        })
    }

    pub fn apply(&self, record: &mut ActionRecord) {
        set!(record.devices, self.devices);
        set!(record.command, self.command);
        set!(record.parameter, self.parameter);
        set!(record.order, self.order);
        if let Some(tag) = self.global_parameter {
            record.global_parameter = tag.as_str().to_string();
        }
    }
}
