use crate::show::show::{Action, GlobalOverrides, GlobalParameter, Group};

/// Effective global values at one nesting level.
///
/// Each field cascades independently: a level's own non-zero value wins,
/// otherwise the value from the nearest enclosing level that set one is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Globals {
    pub delay: f64,
    pub speed: i32,
    pub parameter1: String,
    pub parameter2: String,
}

impl Globals {
    /// Show-level globals, resolved against an empty outer scope.
    pub fn for_show(overrides: &GlobalOverrides) -> Self {
        Self::default().merge(overrides)
    }

    /// Globals for a nested level, e.g. a cycle inside a show.
    pub fn merge(&self, overrides: &GlobalOverrides) -> Self {
        Self {
            delay: overrides.delay().unwrap_or(self.delay),
            speed: overrides.speed().unwrap_or(self.speed),
            parameter1: overrides
                .parameter1()
                .map_or_else(|| self.parameter1.clone(), str::to_string),
            parameter2: overrides
                .parameter2()
                .map_or_else(|| self.parameter2.clone(), str::to_string),
        }
    }

    /// Seconds to wait after a group's actions have fired.
    pub fn group_delay(&self, group: &Group) -> f64 {
        if group.global_delay && self.delay != 0.0 {
            self.delay
        } else {
            group.delay
        }
    }

    /// The parameter an action is dispatched with. The tagged global replaces
    /// the action's literal only when it is set.
    pub fn action_parameter(&self, action: &Action) -> String {
        match action.global_parameter {
            GlobalParameter::Speed if self.speed != 0 => self.speed.to_string(),
            GlobalParameter::Parameter1 if !self.parameter1.is_empty() => self.parameter1.clone(),
            GlobalParameter::Parameter2 if !self.parameter2.is_empty() => self.parameter2.clone(),
            _ => action.parameter.clone(),
        }
    }
}
