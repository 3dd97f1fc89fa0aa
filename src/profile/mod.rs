//! Named profiles persisted as JSON documents
//!
//! A profile is a full snapshot of the engine's tunables (bindings,
//! thresholds, sprint flag, prone duration, button keys). The store keeps one
//! `<name>.json` file per profile in a single directory. The `default`
//! profile always exists: it is listed even without a file, loads as the
//! built-in defaults until saved, and cannot be deleted or renamed.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::engine::settings::DEFAULT_PRONE_DURATION_SECS;
use crate::engine::{Action, Engine, Gate, KeyBindings, Thresholds};
use crate::error::GatewayError;

/// Name of the protected profile
pub const DEFAULT_PROFILE: &str = "default";

const EXTENSION: &str = "json";

/// Movement keys, one per direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementKeys {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
}

impl Default for MovementKeys {
    fn default() -> Self {
        let keys = KeyBindings::default();
        Self {
            forward: keys.forward,
            backward: keys.backward,
            left: keys.left,
            right: keys.right,
        }
    }
}

/// Snapshot of every engine tunable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub movement_keys: MovementKeys,
    pub jump_key: String,
    pub crouch_key: String,
    pub sprint_key: String,
    pub prone_key: String,
    pub movement_threshold: f64,
    pub jump_threshold: f64,
    pub crouch_threshold: f64,
    pub sprint_threshold: f64,
    pub sprint_enabled: bool,
    /// Seconds
    pub prone_duration: f64,
    /// Key per button slot; `null` leaves the slot unbound
    pub button_keys: Vec<Option<String>>,
    /// Process this profile is meant for; stored only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl Default for Profile {
    fn default() -> Self {
        let keys = KeyBindings::default();
        let thresholds = Thresholds::default();
        Self {
            movement_keys: MovementKeys::default(),
            jump_key: keys.jump,
            crouch_key: keys.crouch,
            sprint_key: keys.sprint,
            prone_key: keys.prone,
            movement_threshold: thresholds.movement,
            jump_threshold: thresholds.jump,
            crouch_threshold: thresholds.crouch,
            sprint_threshold: thresholds.sprint,
            sprint_enabled: true,
            prone_duration: DEFAULT_PRONE_DURATION_SECS,
            button_keys: vec![Some("1".to_string()), Some("2".to_string())],
            process: None,
            saved_at: None,
        }
    }
}

impl Profile {
    /// Snapshot the engine's current settings
    pub fn capture(engine: &Engine) -> Self {
        let settings = engine.settings();
        let keys = settings.bindings;
        let thresholds = settings.thresholds;

        Self {
            movement_keys: MovementKeys {
                forward: keys.forward,
                backward: keys.backward,
                left: keys.left,
                right: keys.right,
            },
            jump_key: keys.jump,
            crouch_key: keys.crouch,
            sprint_key: keys.sprint,
            prone_key: keys.prone,
            movement_threshold: thresholds.movement,
            jump_threshold: thresholds.jump,
            crouch_threshold: thresholds.crouch,
            sprint_threshold: thresholds.sprint,
            sprint_enabled: settings.sprint_enabled,
            prone_duration: settings.prone_duration.as_secs_f64(),
            button_keys: capture_button_keys(engine),
            process: None,
            saved_at: None,
        }
    }

    pub fn key(&self, action: Action) -> &str {
        match action {
            Action::Forward => &self.movement_keys.forward,
            Action::Backward => &self.movement_keys.backward,
            Action::Left => &self.movement_keys.left,
            Action::Right => &self.movement_keys.right,
            Action::Jump => &self.jump_key,
            Action::Crouch => &self.crouch_key,
            Action::Sprint => &self.sprint_key,
            Action::Prone => &self.prone_key,
        }
    }

    pub fn threshold(&self, gate: Gate) -> f64 {
        match gate {
            Gate::Movement => self.movement_threshold,
            Gate::Jump => self.jump_threshold,
            Gate::Crouch => self.crouch_threshold,
            Gate::Sprint => self.sprint_threshold,
        }
    }

    /// Apply through the engine setters; out-of-range values are clamped there
    pub fn apply(&self, engine: &Engine) {
        for action in Action::ALL {
            engine.set_key(action, self.key(action));
        }
        for gate in Gate::ALL {
            engine.set_threshold(gate, self.threshold(gate));
        }
        engine.set_sprint_enabled(self.sprint_enabled);
        engine.set_prone_duration(self.prone_duration);
        engine.replace_button_keys(self.button_keys.iter().cloned());
    }

    fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse profile JSON")
    }

    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize profile")
    }
}

/// Configured slot keys, placeholders as `None`, trailing placeholders dropped
fn capture_button_keys(engine: &Engine) -> Vec<Option<String>> {
    let mut keys: Vec<Option<String>> = engine
        .button_bindings()
        .into_iter()
        .map(|b| b.configured.then_some(b.key))
        .collect();
    while keys.last().is_some_and(Option::is_none) {
        keys.pop();
    }
    keys
}

/// Directory of `<name>.json` profiles
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File backing `name`. Names must be plain file stems.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, GatewayError> {
        let valid = !name.trim().is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\', ':'])
            && !name.chars().any(char::is_control);
        if !valid {
            return Err(GatewayError::InvalidProfileName {
                name: name.to_string(),
            });
        }
        Ok(self.dir.join(format!("{}.{}", name, EXTENSION)))
    }

    /// Profile names sorted, `default` first and always present
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        if fs::try_exists(&self.dir).await.unwrap_or(false) {
            let mut entries = fs::read_dir(&self.dir)
                .await
                .with_context(|| format!("Failed to read profile directory: {}", self.dir.display()))?;

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if stem != DEFAULT_PROFILE {
                        names.push(stem.to_string());
                    }
                }
            }
        }

        names.sort();
        names.insert(0, DEFAULT_PROFILE.to_string());
        Ok(names)
    }

    pub async fn exists(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    /// Load a profile. `default` without a file yields the built-in defaults.
    pub async fn load(&self, name: &str) -> Result<Profile> {
        let path = self.path_for(name)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            if name == DEFAULT_PROFILE {
                debug!("No saved default profile, using built-in defaults");
                return Ok(Profile::default());
            }
            return Err(GatewayError::UnknownProfile {
                name: name.to_string(),
            }
            .into());
        }

        let json = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read profile: {}", path.display()))?;
        let profile = Profile::from_json(&json)
            .with_context(|| format!("Invalid profile file: {}", path.display()))?;

        debug!("Profile '{}' loaded from {}", name, path.display());
        Ok(profile)
    }

    /// Write `profile` under `name`, stamping `saved_at`
    pub async fn save(&self, name: &str, profile: &Profile) -> Result<()> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create profile directory: {}", self.dir.display()))?;

        let mut profile = profile.clone();
        profile.saved_at = Some(Utc::now());
        fs::write(&path, profile.to_json()?)
            .await
            .with_context(|| format!("Failed to write profile: {}", path.display()))?;

        info!("Profile '{}' saved", name);
        Ok(())
    }

    pub async fn rename(&self, old: &str, new: &str) -> Result<()> {
        if old == DEFAULT_PROFILE {
            return Err(GatewayError::ProtectedProfile {
                name: old.to_string(),
                operation: "renamed",
            }
            .into());
        }
        let from = self.path_for(old)?;
        let to = self.path_for(new)?;
        if old == new {
            return Ok(());
        }

        if !fs::try_exists(&from).await.unwrap_or(false) {
            return Err(GatewayError::UnknownProfile {
                name: old.to_string(),
            }
            .into());
        }
        if fs::try_exists(&to).await.unwrap_or(false) || new == DEFAULT_PROFILE {
            anyhow::bail!("Profile '{}' already exists", new);
        }

        fs::rename(&from, &to)
            .await
            .with_context(|| format!("Failed to rename profile '{}' to '{}'", old, new))?;
        info!("Profile '{}' renamed to '{}'", old, new);
        Ok(())
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        if name == DEFAULT_PROFILE {
            return Err(GatewayError::ProtectedProfile {
                name: name.to_string(),
                operation: "deleted",
            }
            .into());
        }
        let path = self.path_for(name)?;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(GatewayError::UnknownProfile {
                name: name.to_string(),
            }
            .into());
        }

        fs::remove_file(&path)
            .await
            .with_context(|| format!("Failed to delete profile: {}", path.display()))?;
        info!("Profile '{}' deleted", name);
        Ok(())
    }

    /// Copy an external profile file into the store as `name`
    pub async fn import(&self, source: impl AsRef<Path>, name: &str) -> Result<Profile> {
        let source = source.as_ref();
        let json = fs::read_to_string(source)
            .await
            .with_context(|| format!("Failed to read profile: {}", source.display()))?;
        let profile = Profile::from_json(&json)
            .with_context(|| format!("Invalid profile file: {}", source.display()))?;

        self.save(name, &profile).await?;
        Ok(profile)
    }

    /// Write profile `name` to an external file
    pub async fn export(&self, name: &str, target: impl AsRef<Path>) -> Result<()> {
        let target = target.as_ref();
        let profile = self.load(name).await?;
        fs::write(target, profile.to_json()?)
            .await
            .with_context(|| format!("Failed to export profile to {}", target.display()))?;

        info!("Profile '{}' exported to {}", name, target.display());
        Ok(())
    }

    /// Associate `name` with a process and persist it
    pub async fn link_process(&self, name: &str, process: &str) -> Result<()> {
        let mut profile = self.load(name).await?;
        profile.process = Some(process.to_string());
        self.save(name, &profile).await
    }
}
