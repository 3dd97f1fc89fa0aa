//! Configuration file watcher for hot-reload support
//!
//! Watches the directory holding the config file rather than the file itself,
//! so editors that save by replacing the file are still picked up. A burst of
//! events for one save produces a single reload.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::AppConfig;

/// Time allowed for an editor to finish writing before the file is re-read
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Config watcher that monitors file changes and sends reload notifications
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<AppConfig>,
}

impl ConfigWatcher {
    /// Load the config at `config_path` and start watching it
    pub async fn new(config_path: impl Into<PathBuf>) -> Result<(Self, AppConfig)> {
        let config_path: PathBuf = config_path.into();
        let (tx, rx) = mpsc::channel(10);

        let initial_config = AppConfig::load(&config_path)
            .await
            .context("Failed to load initial config")?;

        if config_path.file_name().is_none() {
            anyhow::bail!("Config path has no file name: {}", config_path.display());
        }
        let watch_dir = match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        // notify callbacks run on their own OS thread, outside the runtime
        let runtime_handle = tokio::runtime::Handle::current();
        let reload_pending = Arc::new(AtomicBool::new(false));
        let reload_path = config_path.clone();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    error!("Watch error: {}", e);
                    return;
                }
            };

            if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                return;
            }
            if !event.paths.iter().any(|p| is_config_event(p, &reload_path)) {
                return;
            }
            if reload_pending.swap(true, Ordering::AcqRel) {
                return;
            }
            debug!("Config file changed: {:?}", event.paths);

            let config_path = reload_path.clone();
            let tx = tx.clone();
            let pending = reload_pending.clone();
            runtime_handle.spawn(async move {
                tokio::time::sleep(DEBOUNCE).await;
                pending.store(false, Ordering::Release);

                match AppConfig::load(&config_path).await {
                    Ok(new_config) => {
                        info!("Configuration reloaded");
                        if let Err(e) = tx.send(new_config).await {
                            error!("Failed to send config update: {}", e);
                        }
                    }
                    Err(e) => {
                        warn!("Failed to reload config (keeping old config): {:#}", e);
                    }
                }
            });
        })?;

        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config directory: {}", watch_dir.display()))?;

        info!("Config file watcher started for: {}", config_path.display());

        Ok((
            Self {
                _watcher: watcher,
                rx,
            },
            initial_config,
        ))
    }

    /// Wait for the next config update
    /// Returns None if the watcher has been closed
    pub async fn next_config(&mut self) -> Option<AppConfig> {
        self.rx.recv().await
    }
}

/// True when `path` names a file the watcher would react to
pub fn is_config_event(path: &Path, config_path: &Path) -> bool {
    path.file_name().is_some() && path.file_name() == config_path.file_name()
}
