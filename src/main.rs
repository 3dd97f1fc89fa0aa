//! SpaceMouse GW - 6DOF controller to keyboard gateway
//!
//! Reads device samples, maps them to held keys through the engine and keeps
//! the configuration hot-reloaded. Every held key is released when the device
//! goes away and again on shutdown.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use spacemouse_gw::cli::{self, Console, Outcome, ReplCommand};
use spacemouse_gw::config::{AppConfig, ConfigWatcher, DeviceConfig, ProviderKind};
use spacemouse_gw::device::{DeviceEvent, DeviceProvider, ReplayProvider};
use spacemouse_gw::engine::Engine;
use spacemouse_gw::paths::AppPaths;
use spacemouse_gw::profile::{ProfileStore, DEFAULT_PROFILE};
use spacemouse_gw::sink::ConsoleSink;

/// SpaceMouse GW - play keyboard games with a 6DOF controller
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults to the application data directory)
    #[arg(short, long, env = "SPACEMOUSE_GW_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit console logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Replay this CSV recording instead of the configured device
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Profile to apply at startup (overrides profiles.active)
    #[arg(short, long)]
    profile: Option<String>,

    /// Start the interactive console
    #[arg(long)]
    repl: bool,

    /// Exit once the device stream ends
    #[arg(long)]
    once: bool,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    print_schema: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if args.print_schema {
        println!("{}", AppConfig::schema_json()?);
        return Ok(());
    }

    let paths = match &args.config {
        Some(config) => AppPaths::with_config(config),
        None => AppPaths::detect(),
    };
    let logs_dir = match paths.ensure_directories() {
        Ok(()) => Some(paths.logs_dir.as_path()),
        Err(e) => {
            eprintln!("Cannot create application directories, file logging disabled: {}", e);
            None
        }
    };

    let _log_guard = init_logging(&args.log_level, args.log_json, logs_dir)?;

    info!("Starting SpaceMouse GW v{}...", env!("CARGO_PKG_VERSION"));
    info!(
        "Data directory: {} ({})",
        paths.base_dir().display(),
        if paths.is_portable { "portable" } else { "installed" }
    );
    info!("Configuration file: {}", paths.config.display());

    if !paths.config.exists() {
        AppConfig::default().save(&paths.config).await?;
        info!("No configuration found, wrote defaults to {}", paths.config.display());
    }

    let (config_watcher, config) = ConfigWatcher::new(paths.config.clone()).await?;
    info!("Configuration loaded with hot-reload enabled");

    let engine = Arc::new(Engine::new(Arc::new(ConsoleSink::default())));
    config.apply_to(&engine);

    let store = ProfileStore::new(
        config
            .profiles
            .directory
            .clone()
            .unwrap_or_else(|| paths.profiles_dir.clone()),
    );
    let active_profile = args
        .profile
        .clone()
        .or_else(|| config.profiles.active.clone())
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string());
    let active_profile = apply_startup_profile(&engine, &store, active_profile).await;

    let console = Console::new(engine.clone(), store, active_profile);
    run_app(engine, config, config_watcher, console, &args).await?;

    info!("SpaceMouse GW shutdown complete");
    Ok(())
}

/// Apply the startup profile if it exists. Returns the profile now active.
async fn apply_startup_profile(engine: &Engine, store: &ProfileStore, name: String) -> String {
    match store.exists(&name).await {
        Ok(true) => match store.load(&name).await {
            Ok(profile) => {
                profile.apply(engine);
                info!("Profile '{}' applied", name);
                name
            }
            Err(e) => {
                warn!("Failed to load profile '{}', using config values: {:#}", name, e);
                DEFAULT_PROFILE.to_string()
            }
        },
        Ok(false) => {
            if name != DEFAULT_PROFILE {
                warn!("Profile '{}' not found, using config values", name);
            }
            DEFAULT_PROFILE.to_string()
        }
        Err(e) => {
            warn!("Invalid profile '{}': {:#}", name, e);
            DEFAULT_PROFILE.to_string()
        }
    }
}

/// Spawn the configured device provider. `None` when there is no device.
fn start_device(
    device: &DeviceConfig,
    replay_override: Option<&Path>,
    tx: mpsc::Sender<DeviceEvent>,
) -> Option<JoinHandle<()>> {
    let replay_file = replay_override
        .map(Path::to_path_buf)
        .or_else(|| match device.provider {
            ProviderKind::Replay => device.replay_file.clone(),
            ProviderKind::None => None,
        });

    let Some(replay_file) = replay_file else {
        match device.provider {
            ProviderKind::Replay => warn!("device.replay_file is not set, running without a device"),
            ProviderKind::None => info!("No device configured"),
        }
        return None;
    };

    let provider = ReplayProvider::from_file(replay_file.clone(), device.poll_hz);
    info!(
        "Device provider '{}' started ({}, every {:?})",
        provider.name(),
        replay_file.display(),
        provider.poll_interval()
    );

    Some(tokio::spawn(async move {
        if let Err(e) = provider.run(tx).await {
            error!("Device provider '{}' failed: {:#}", provider.name(), e);
        }
    }))
}

async fn run_app(
    engine: Arc<Engine>,
    config: AppConfig,
    mut config_watcher: ConfigWatcher,
    mut console: Console,
    args: &Args,
) -> Result<()> {
    let mut device = config.device.clone();
    let mut analog = device.analog();

    let (device_tx, mut device_rx) = mpsc::channel::<DeviceEvent>(256);
    let device_task = start_device(&device, args.replay.as_deref(), device_tx);

    let (repl_tx, mut repl_rx) = mpsc::channel::<ReplCommand>(16);
    if args.repl {
        cli::spawn_repl(repl_tx).context("Failed to start console")?;
        println!("{}", "Type 'help' for commands".dimmed());
    } else {
        drop(repl_tx);
    }

    let mut ticker = tokio::time::interval(tick_period(device.poll_hz));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    info!("Ready");

    loop {
        tokio::select! {
            Some(event) = device_rx.recv() => match event {
                DeviceEvent::Sample(state) => {
                    engine.update(&state.to_sample(device.axes, &analog));
                }
                DeviceEvent::Disconnected { reason } => {
                    warn!("Device disconnected: {}", reason);
                    engine.release_all();
                    if args.once {
                        break;
                    }
                }
            },

            _ = ticker.tick() => engine.tick(),

            Some(command) = repl_rx.recv() => match console.execute(command).await {
                Outcome::Continue(text) => {
                    if !text.is_empty() {
                        println!("{}", text);
                    }
                }
                Outcome::Exit => {
                    info!("Console exit requested");
                    break;
                }
            },

            Some(new_config) = config_watcher.next_config() => {
                info!("Configuration file changed, applying");
                console.apply_config(&new_config).await;
                if new_config.device.provider != device.provider
                    || new_config.device.replay_file != device.replay_file
                {
                    warn!("Device provider changes take effect after a restart");
                }
                if new_config.device.poll_hz != device.poll_hz {
                    ticker = tokio::time::interval(tick_period(new_config.device.poll_hz));
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                }
                device = new_config.device;
                analog = device.analog();
                debug!("Device mapping: {:?}, {:?}", device.axes, analog);
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }
        }
    }

    info!("Shutting down...");
    engine.release_all();
    if let Some(task) = device_task {
        task.abort();
    }

    Ok(())
}

fn tick_period(poll_hz: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(poll_hz.clamp(1, 1000)))
}

fn init_logging(level: &str, json: bool, logs_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let console_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed()
    };

    let (file_layer, guard) = match logs_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "spacemouse-gw.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
}
