//! Engine settings: key bindings, thresholds and the flat option table
//!
//! Every numeric value is clamped into its valid range when set; nothing is
//! ever rejected for being out of range. Key symbols are opaque strings and
//! are passed to the sink verbatim.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::direction::Direction;
use crate::error::{GatewayError, GatewayResult};

/// Default prone duration in seconds
pub const DEFAULT_PRONE_DURATION_SECS: f64 = 0.8;
/// Shortest prone duration; keeps the crouch/prone window from collapsing to zero
pub const MIN_PRONE_DURATION_SECS: f64 = 0.05;
/// Longest prone duration accepted
pub const MAX_PRONE_DURATION_SECS: f64 = 60.0;

/// Named action with a key binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Forward,
    Backward,
    Left,
    Right,
    Jump,
    Crouch,
    Sprint,
    Prone,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::Forward,
        Action::Backward,
        Action::Left,
        Action::Right,
        Action::Jump,
        Action::Crouch,
        Action::Sprint,
        Action::Prone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Forward => "forward",
            Action::Backward => "backward",
            Action::Left => "left",
            Action::Right => "right",
            Action::Jump => "jump",
            Action::Crouch => "crouch",
            Action::Sprint => "sprint",
            Action::Prone => "prone",
        }
    }
}

impl From<Direction> for Action {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Forward => Action::Forward,
            Direction::Backward => Action::Backward,
            Direction::Left => Action::Left,
            Direction::Right => Action::Right,
        }
    }
}

/// Threshold-gated input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    Movement,
    Jump,
    Crouch,
    Sprint,
}

impl Gate {
    pub const ALL: [Gate; 4] = [Gate::Movement, Gate::Jump, Gate::Crouch, Gate::Sprint];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gate::Movement => "movement",
            Gate::Jump => "jump",
            Gate::Crouch => "crouch",
            Gate::Sprint => "sprint",
        }
    }
}

/// Key symbol bound to each action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct KeyBindings {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
    pub jump: String,
    pub crouch: String,
    pub sprint: String,
    pub prone: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: "w".to_string(),
            backward: "s".to_string(),
            left: "a".to_string(),
            right: "d".to_string(),
            jump: "space".to_string(),
            crouch: "c".to_string(),
            sprint: "shift".to_string(),
            prone: "x".to_string(),
        }
    }
}

impl KeyBindings {
    pub fn key_for(&self, direction: Direction) -> &str {
        self.get(direction.into())
    }

    pub fn get(&self, action: Action) -> &str {
        match action {
            Action::Forward => &self.forward,
            Action::Backward => &self.backward,
            Action::Left => &self.left,
            Action::Right => &self.right,
            Action::Jump => &self.jump,
            Action::Crouch => &self.crouch,
            Action::Sprint => &self.sprint,
            Action::Prone => &self.prone,
        }
    }

    pub fn set(&mut self, action: Action, key: impl Into<String>) {
        let slot = match action {
            Action::Forward => &mut self.forward,
            Action::Backward => &mut self.backward,
            Action::Left => &mut self.left,
            Action::Right => &mut self.right,
            Action::Jump => &mut self.jump,
            Action::Crouch => &mut self.crouch,
            Action::Sprint => &mut self.sprint,
            Action::Prone => &mut self.prone,
        };
        *slot = key.into();
    }
}

/// Per-gate thresholds, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub movement: f64,
    pub jump: f64,
    pub crouch: f64,
    pub sprint: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            movement: 0.5,
            jump: 0.5,
            crouch: 0.5,
            sprint: 0.9,
        }
    }
}

impl Thresholds {
    pub fn get(&self, gate: Gate) -> f64 {
        match gate {
            Gate::Movement => self.movement,
            Gate::Jump => self.jump,
            Gate::Crouch => self.crouch,
            Gate::Sprint => self.sprint,
        }
    }

    fn slot(&mut self, gate: Gate) -> &mut f64 {
        match gate {
            Gate::Movement => &mut self.movement,
            Gate::Jump => &mut self.jump,
            Gate::Crouch => &mut self.crouch,
            Gate::Sprint => &mut self.sprint,
        }
    }
}

/// Complete engine configuration, owned by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bindings: KeyBindings,
    pub thresholds: Thresholds,
    pub sprint_enabled: bool,
    pub prone_duration: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bindings: KeyBindings::default(),
            thresholds: Thresholds::default(),
            sprint_enabled: true,
            prone_duration: Duration::from_secs_f64(DEFAULT_PRONE_DURATION_SECS),
        }
    }
}

impl Settings {
    /// Set a threshold, clamped to `[0, 1]`. NaN leaves the value unchanged.
    /// Returns the value in effect afterwards.
    pub fn set_threshold(&mut self, gate: Gate, value: f64) -> f64 {
        let slot = self.thresholds.slot(gate);
        if let Some(clamped) = clamp_unit(value) {
            *slot = clamped;
        }
        *slot
    }

    /// Set the prone duration in seconds, clamped to
    /// `[MIN_PRONE_DURATION_SECS, MAX_PRONE_DURATION_SECS]`. NaN leaves it unchanged.
    pub fn set_prone_duration(&mut self, secs: f64) -> Duration {
        if let Some(duration) = clamp_prone_duration(secs) {
            self.prone_duration = duration;
        }
        self.prone_duration
    }
}

/// Clamp into `[0, 1]`; `None` for NaN
pub fn clamp_unit(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value.clamp(0.0, 1.0))
    }
}

/// Clamp a prone duration in seconds; `None` for NaN
pub fn clamp_prone_duration(secs: f64) -> Option<Duration> {
    clamp_prone_secs(secs).map(Duration::from_secs_f64)
}

/// Prone duration clamped in seconds, before any `Duration` rounding
pub fn clamp_prone_secs(secs: f64) -> Option<f64> {
    if secs.is_nan() {
        None
    } else {
        Some(secs.clamp(MIN_PRONE_DURATION_SECS, MAX_PRONE_DURATION_SECS))
    }
}

/// Entry of the flat option table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionName {
    /// `<action>_key`
    Key(Action),
    /// `button_key.<index>` (0-based)
    ButtonKey(usize),
    /// `<gate>_threshold`
    Threshold(Gate),
    SprintEnabled,
    ProneDuration,
}

impl OptionName {
    /// Every fixed option name, for help output
    pub fn catalog() -> Vec<String> {
        let mut names: Vec<String> = Action::ALL
            .iter()
            .map(|a| OptionName::Key(*a).to_string())
            .collect();
        names.push("button_key.<index>".to_string());
        names.extend(Gate::ALL.iter().map(|g| OptionName::Threshold(*g).to_string()));
        names.push(OptionName::SprintEnabled.to_string());
        names.push(OptionName::ProneDuration.to_string());
        names
    }
}

impl fmt::Display for OptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionName::Key(action) => write!(f, "{}_key", action.as_str()),
            OptionName::ButtonKey(index) => write!(f, "button_key.{}", index),
            OptionName::Threshold(gate) => write!(f, "{}_threshold", gate.as_str()),
            OptionName::SprintEnabled => f.write_str("sprint_enabled"),
            OptionName::ProneDuration => f.write_str("prone_duration"),
        }
    }
}

impl FromStr for OptionName {
    type Err = GatewayError;

    fn from_str(s: &str) -> GatewayResult<Self> {
        let name = s.trim();
        let unknown = || GatewayError::UnknownOption {
            name: name.to_string(),
        };

        if let Some(index) = name.strip_prefix("button_key.") {
            return index
                .parse::<usize>()
                .map(OptionName::ButtonKey)
                .map_err(|_| unknown());
        }
        if let Some(action) = name.strip_suffix("_key") {
            return Action::ALL
                .iter()
                .find(|a| a.as_str() == action)
                .map(|a| OptionName::Key(*a))
                .ok_or_else(unknown);
        }
        if let Some(gate) = name.strip_suffix("_threshold") {
            return Gate::ALL
                .iter()
                .find(|g| g.as_str() == gate)
                .map(|g| OptionName::Threshold(*g))
                .ok_or_else(unknown);
        }
        match name {
            "sprint_enabled" => Ok(OptionName::SprintEnabled),
            "prone_duration" => Ok(OptionName::ProneDuration),
            _ => Err(unknown()),
        }
    }
}

/// Parse a numeric option value
pub fn parse_number(name: &OptionName, value: &str) -> GatewayResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| GatewayError::invalid_value(name.to_string(), value, "a number"))
}

/// Parse a boolean option value (`true/false`, `on/off`, `yes/no`, `1/0`)
pub fn parse_flag(name: &OptionName, value: &str) -> GatewayResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(GatewayError::invalid_value(
            name.to_string(),
            value,
            "true or false",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_are_clamped() {
        let mut settings = Settings::default();

        assert_eq!(settings.set_threshold(Gate::Jump, 1.7), 1.0);
        assert_eq!(settings.set_threshold(Gate::Jump, -0.3), 0.0);
        assert_eq!(settings.set_threshold(Gate::Jump, 0.42), 0.42);
        assert_eq!(settings.set_threshold(Gate::Jump, f64::NAN), 0.42);
        assert_eq!(settings.set_threshold(Gate::Sprint, f64::INFINITY), 1.0);
    }

    #[test]
    fn test_prone_duration_is_clamped() {
        let mut settings = Settings::default();

        assert_eq!(
            settings.set_prone_duration(0.0),
            Duration::from_secs_f64(MIN_PRONE_DURATION_SECS)
        );
        assert_eq!(
            settings.set_prone_duration(-5.0),
            Duration::from_secs_f64(MIN_PRONE_DURATION_SECS)
        );
        assert_eq!(settings.set_prone_duration(1.5), Duration::from_millis(1500));
        assert_eq!(settings.set_prone_duration(f64::NAN), Duration::from_millis(1500));
        assert_eq!(
            settings.set_prone_duration(f64::INFINITY),
            Duration::from_secs_f64(MAX_PRONE_DURATION_SECS)
        );
    }

    #[test]
    fn test_option_names_round_trip() {
        for name in [
            "forward_key",
            "prone_key",
            "button_key.3",
            "movement_threshold",
            "sprint_threshold",
            "sprint_enabled",
            "prone_duration",
        ] {
            let parsed: OptionName = name.parse().unwrap();
            assert_eq!(parsed.to_string(), name);
        }
    }

    #[test]
    fn test_unknown_option_names() {
        for name in ["warp_key", "button_key.x", "prone_threshold", "deadzone", ""] {
            assert!(matches!(
                name.parse::<OptionName>(),
                Err(GatewayError::UnknownOption { .. })
            ));
        }
    }

    #[test]
    fn test_parse_values() {
        let name = OptionName::SprintEnabled;
        assert!(parse_flag(&name, "On").unwrap());
        assert!(!parse_flag(&name, "0").unwrap());
        assert!(parse_flag(&name, "maybe").is_err());

        let name = OptionName::Threshold(Gate::Jump);
        assert_eq!(parse_number(&name, " 0.25 ").unwrap(), 0.25);
        assert!(parse_number(&name, "high").is_err());
    }

    #[test]
    fn test_catalog_lists_every_fixed_option() {
        let catalog = OptionName::catalog();
        assert_eq!(catalog.len(), 8 + 1 + 4 + 2);
        assert!(catalog.contains(&"crouch_threshold".to_string()));
    }
}
