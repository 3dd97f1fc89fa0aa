//! Configuration management for the SpaceMouse gateway
//!
//! Handles loading, clamping and hot-reloading of the YAML configuration
//! file. Out-of-range values are clamped with a warning, never rejected.

pub mod watcher;

use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::device::replay::DEFAULT_POLL_HZ;
use crate::device::{AnalogSettings, AxisMapping};
use crate::engine::settings::{
    clamp_prone_secs, clamp_unit, DEFAULT_PRONE_DURATION_SECS,
};
use crate::engine::{Action, Engine, Gate, KeyBindings};

pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct AppConfig {
    pub device: DeviceConfig,
    pub bindings: BindingsConfig,
    pub thresholds: ThresholdsConfig,
    pub profiles: ProfilesConfig,
}

/// Where device readings come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Stream rows from `replay_file`
    #[default]
    Replay,
    /// No device; the engine only reacts to console commands
    None,
}

/// Device stream configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct DeviceConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay_file: Option<PathBuf>,
    #[serde(default = "default_poll_hz")]
    pub poll_hz: u32,
    #[serde(default)]
    pub axes: AxisMapping,
    #[serde(default = "default_deadzone")]
    pub deadzone: f64,
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            replay_file: None,
            poll_hz: default_poll_hz(),
            axes: AxisMapping::default(),
            deadzone: default_deadzone(),
            sensitivity: default_sensitivity(),
        }
    }
}

impl DeviceConfig {
    pub fn analog(&self) -> AnalogSettings {
        AnalogSettings::new(self.deadzone, self.sensitivity)
    }
}

/// Action keys plus per-button hot-keys
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct BindingsConfig {
    #[serde(flatten)]
    pub keys: KeyBindings,
    /// Key tapped by button `i` (0-based)
    #[serde(default = "default_button_keys")]
    pub buttons: Vec<String>,
}

impl Default for BindingsConfig {
    fn default() -> Self {
        Self {
            keys: KeyBindings::default(),
            buttons: default_button_keys(),
        }
    }
}

/// Gate thresholds and timing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ThresholdsConfig {
    #[serde(default = "default_half")]
    pub movement: f64,
    #[serde(default = "default_half")]
    pub jump: f64,
    #[serde(default = "default_half")]
    pub crouch: f64,
    #[serde(default = "default_sprint_threshold")]
    pub sprint: f64,
    #[serde(default = "default_true")]
    pub sprint_enabled: bool,
    /// Seconds `z` must stay down before crouch becomes prone
    #[serde(default = "default_prone_duration")]
    pub prone_duration: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            movement: default_half(),
            jump: default_half(),
            crouch: default_half(),
            sprint: default_sprint_threshold(),
            sprint_enabled: default_true(),
            prone_duration: default_prone_duration(),
        }
    }
}

impl ThresholdsConfig {
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

/// Profile store location and the profile applied at startup
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ProfilesConfig {
    /// Defaults to `<data dir>/profiles`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<String>,
}

impl AppConfig {
    /// Load configuration from file, clamping out-of-range values
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))
    }

    /// Parse YAML text; an empty document yields the defaults
    pub fn parse(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: AppConfig = serde_yaml::from_str(contents)?;
        Ok(config.normalized())
    }

    /// Save configuration to file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// JSON schema of the configuration file
    pub fn schema_json() -> Result<String> {
        let schema = schemars::schema_for!(AppConfig);
        serde_json::to_string_pretty(&schema).context("Failed to serialize config schema")
    }

    /// Clamp every numeric field into range, warning about each change
    pub fn normalized(mut self) -> Self {
        let analog = self.device.analog();
        if analog.deadzone != self.device.deadzone {
            warn!(
                "device.deadzone {} out of range, using {}",
                self.device.deadzone, analog.deadzone
            );
            self.device.deadzone = analog.deadzone;
        }
        if analog.sensitivity != self.device.sensitivity {
            warn!(
                "device.sensitivity {} out of range, using {}",
                self.device.sensitivity, analog.sensitivity
            );
            self.device.sensitivity = analog.sensitivity;
        }

        let poll_hz = self.device.poll_hz.clamp(1, 1000);
        if poll_hz != self.device.poll_hz {
            warn!("device.poll_hz {} out of range, using {}", self.device.poll_hz, poll_hz);
            self.device.poll_hz = poll_hz;
        }

        for gate in Gate::ALL {
            let slot = self.thresholds.slot(gate);
            let clamped = clamp_unit(*slot).unwrap_or_else(|| match gate {
                Gate::Sprint => default_sprint_threshold(),
                _ => default_half(),
            });
            if clamped != *slot {
                warn!("thresholds.{} {} out of range, using {}", gate.as_str(), slot, clamped);
                *slot = clamped;
            }
        }

        let prone = clamp_prone_secs(self.thresholds.prone_duration)
            .unwrap_or(DEFAULT_PRONE_DURATION_SECS);
        if prone != self.thresholds.prone_duration {
            warn!(
                "thresholds.prone_duration {} out of range, using {}",
                self.thresholds.prone_duration, prone
            );
            self.thresholds.prone_duration = prone;
        }

        self
    }

    /// Push bindings and thresholds into a running engine
    pub fn apply_to(&self, engine: &Engine) {
        for action in Action::ALL {
            engine.set_key(action, self.bindings.keys.get(action));
        }
        engine.replace_button_keys(self.bindings.buttons.iter().cloned().map(Some));
        for gate in Gate::ALL {
            engine.set_threshold(gate, self.thresholds.get(gate));
        }
        engine.set_sprint_enabled(self.thresholds.sprint_enabled);
        engine.set_prone_duration(self.thresholds.prone_duration);
        debug!("Configuration applied to engine");
    }
}

// Default value functions
fn default_poll_hz() -> u32 { DEFAULT_POLL_HZ }
fn default_deadzone() -> f64 { AnalogSettings::default().deadzone }
fn default_sensitivity() -> f64 { AnalogSettings::default().sensitivity }
fn default_button_keys() -> Vec<String> { vec!["1".to_string(), "2".to_string()] }
fn default_half() -> f64 { 0.5 }
fn default_sprint_threshold() -> f64 { 0.9 }
fn default_true() -> bool { true }
fn default_prone_duration() -> f64 { DEFAULT_PRONE_DURATION_SECS }
