//! Application path management for portable and installed modes.
//!
//! ## Mode Detection
//!
//! - **Portable mode**: If a `.portable` marker file exists next to the
//!   executable, config, profiles and logs live in the same directory.
//! - **Installed mode** (default): Data is stored under the platform data
//!   directory (`%APPDATA%\SpaceMouse GW`, `~/.local/share/SpaceMouse GW`).

use std::path::{Path, PathBuf};
use tracing::debug;

/// Application name used for directories in installed mode
const APP_NAME: &str = "SpaceMouse GW";

/// Application paths for config, profiles, and logs.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Path to the configuration file
    pub config: PathBuf,
    /// Directory holding `<name>.json` profiles
    pub profiles_dir: PathBuf,
    /// Path to the logs directory
    pub logs_dir: PathBuf,
    /// Whether running in portable mode (config next to exe)
    pub is_portable: bool,
}

impl AppPaths {
    /// Detect the appropriate paths based on environment.
    ///
    /// In debug builds a `config.yaml` in the working directory wins, so
    /// running from a checkout uses the checkout's files.
    ///
    /// Called before logging is initialized; nothing here logs.
    pub fn detect() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));

        #[cfg(debug_assertions)]
        {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            if cwd.join("config.yaml").exists() {
                return Self::rooted_at(&cwd, true);
            }
        }

        if exe_dir.join(".portable").exists() {
            Self::rooted_at(&exe_dir, true)
        } else {
            let app_data = dirs::data_dir().unwrap_or_else(|| exe_dir.clone()).join(APP_NAME);
            Self::rooted_at(&app_data, false)
        }
    }

    /// Paths with every file under `base`
    pub fn rooted_at(base: &Path, is_portable: bool) -> Self {
        Self {
            config: base.join("config.yaml"),
            profiles_dir: base.join("profiles"),
            logs_dir: base.join("logs"),
            is_portable,
        }
    }

    /// Use `config` as the configuration file; profiles and logs follow it
    pub fn with_config(config: impl Into<PathBuf>) -> Self {
        let config = config.into();
        let base = match config.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self {
            config,
            ..Self::rooted_at(&base, true)
        }
    }

    /// Get the base directory (for displaying in logs)
    pub fn base_dir(&self) -> PathBuf {
        self.config
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        for dir in [&self.profiles_dir, &self.logs_dir] {
            if !dir.exists() {
                debug!("Creating directory: {}", dir.display());
                std::fs::create_dir_all(dir)?;
            }
        }

        if let Some(config_parent) = self.config.parent() {
            if !config_parent.as_os_str().is_empty() && !config_parent.exists() {
                debug!("Creating config directory: {}", config_parent.display());
                std::fs::create_dir_all(config_parent)?;
            }
        }

        Ok(())
    }
}
