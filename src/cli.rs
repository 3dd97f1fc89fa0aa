//! Interactive console
//!
//! The prompt runs on its own OS thread (rustyline blocks) and forwards
//! parsed commands to the main loop over a channel. The main loop executes
//! them against the engine and profile store through [`Console`].

use anyhow::Result;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::engine::{CrouchProneState, Engine, OptionName};
use crate::profile::{Profile, ProfileStore, DEFAULT_PROFILE};

const PROMPT: &str = "spacemouse> ";

/// A console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Status,
    Set { name: String, value: String },
    Release,
    Options,
    ProfileList,
    ProfileLoad(String),
    /// Save the current settings; `None` saves over the active profile
    ProfileSave(Option<String>),
    ProfileDelete(String),
    ProfileRename { old: String, new: String },
    ProfileImport { path: PathBuf, name: String },
    ProfileExport { name: String, path: PathBuf },
    ProfileLink { process: String },
    Help,
    Exit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ReplCommand>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, rest)) = words.split_first() else {
        return Ok(None);
    };

    let command = match (head, rest) {
        ("status" | "s", []) => ReplCommand::Status,
        ("set", [name, value @ ..]) if !value.is_empty() => ReplCommand::Set {
            name: name.to_string(),
            value: value.join(" "),
        },
        ("release", []) => ReplCommand::Release,
        ("options", []) => ReplCommand::Options,
        ("profile" | "p", args) => parse_profile(args)?,
        ("help" | "?", _) => ReplCommand::Help,
        ("exit" | "quit", []) => ReplCommand::Exit,
        ("set", _) => return Err("usage: set <option> <value>".to_string()),
        _ => return Err(format!("unknown command '{}', try 'help'", head)),
    };
    Ok(Some(command))
}

fn parse_profile(args: &[&str]) -> Result<ReplCommand, String> {
    let command = match args {
        ["list"] | [] => ReplCommand::ProfileList,
        ["load", name] => ReplCommand::ProfileLoad(name.to_string()),
        ["save"] => ReplCommand::ProfileSave(None),
        ["save", name] => ReplCommand::ProfileSave(Some(name.to_string())),
        ["delete", name] => ReplCommand::ProfileDelete(name.to_string()),
        ["rename", old, new] => ReplCommand::ProfileRename {
            old: old.to_string(),
            new: new.to_string(),
        },
        ["import", path, name] => ReplCommand::ProfileImport {
            path: PathBuf::from(path),
            name: name.to_string(),
        },
        ["export", name, path] => ReplCommand::ProfileExport {
            name: name.to_string(),
            path: PathBuf::from(path),
        },
        ["link", process] => ReplCommand::ProfileLink {
            process: process.to_string(),
        },
        _ => return Err("usage: profile list|load|save|delete|rename|import|export|link".to_string()),
    };
    Ok(command)
}

/// Start the prompt thread. It ends on `exit`, EOF, Ctrl-C or when the
/// receiving side is gone.
pub fn spawn_repl(tx: mpsc::Sender<ReplCommand>) -> Result<JoinHandle<()>> {
    let handle = std::thread::Builder::new()
        .name("repl".to_string())
        .spawn(move || {
            let mut rl = match DefaultEditor::new() {
                Ok(rl) => rl,
                Err(e) => {
                    warn!("Console unavailable: {}", e);
                    return;
                }
            };

            loop {
                let command = match rl.readline(PROMPT) {
                    Ok(line) => {
                        let _ = rl.add_history_entry(line.as_str());
                        match parse_command(&line) {
                            Ok(Some(command)) => command,
                            Ok(None) => continue,
                            Err(message) => {
                                println!("{}", message.red());
                                continue;
                            }
                        }
                    }
                    Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => ReplCommand::Exit,
                    Err(e) => {
                        warn!("Console read failed: {}", e);
                        ReplCommand::Exit
                    }
                };

                let exit = command == ReplCommand::Exit;
                if tx.blocking_send(command).is_err() || exit {
                    debug!("Console thread exiting");
                    break;
                }
            }
        })?;

    Ok(handle)
}

/// What the main loop should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Print this and keep going
    Continue(String),
    Exit,
}

/// Executes console commands against the engine and profile store
pub struct Console {
    engine: Arc<Engine>,
    store: ProfileStore,
    active_profile: String,
}

impl Console {
    pub fn new(engine: Arc<Engine>, store: ProfileStore, active_profile: impl Into<String>) -> Self {
        Self {
            engine,
            store,
            active_profile: active_profile.into(),
        }
    }

    pub fn active_profile(&self) -> &str {
        &self.active_profile
    }

    /// Apply a reloaded configuration, then the active profile on top of it.
    /// A profile that can no longer be loaded falls back to `default`.
    pub async fn apply_config(&mut self, config: &AppConfig) {
        config.apply_to(&self.engine);

        let name = self.active_profile.clone();
        let reverted = match self.store.exists(&name).await {
            Ok(true) => match self.store.load(&name).await {
                Ok(profile) => {
                    profile.apply(&self.engine);
                    info!("Profile '{}' re-applied over the reloaded configuration", name);
                    false
                }
                Err(e) => {
                    warn!("Failed to reload profile '{}': {:#}", name, e);
                    true
                }
            },
            Ok(false) => name != DEFAULT_PROFILE,
            Err(e) => {
                warn!("Invalid profile '{}': {:#}", name, e);
                true
            }
        };

        if reverted {
            warn!("Profile '{}' unavailable, active profile is now '{}'", name, DEFAULT_PROFILE);
            self.active_profile = DEFAULT_PROFILE.to_string();
        }
    }

    /// Run one command. Command failures are reported in the output, not as errors.
    pub async fn execute(&mut self, command: ReplCommand) -> Outcome {
        if command == ReplCommand::Exit {
            return Outcome::Exit;
        }
        match self.run(command).await {
            Ok(text) => Outcome::Continue(text),
            Err(e) => Outcome::Continue(format!("{} {:#}", "error:".red().bold(), e)),
        }
    }

    async fn run(&mut self, command: ReplCommand) -> Result<String> {
        let text = match command {
            ReplCommand::Status => self.status(),
            ReplCommand::Set { name, value } => {
                self.engine.set_option(&name, &value)?;
                format!("{} {} = {}", "✓".green(), name, value)
            }
            ReplCommand::Release => {
                let released = self.engine.release_all();
                if released.is_empty() {
                    "nothing held".to_string()
                } else {
                    format!("released {}", released.join(", ").yellow())
                }
            }
            ReplCommand::Options => OptionName::catalog().join("\n"),
            ReplCommand::ProfileList => self
                .store
                .list()
                .await?
                .into_iter()
                .map(|name| {
                    if name == self.active_profile {
                        format!("* {}", name.green().bold())
                    } else {
                        format!("  {}", name)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"),
            ReplCommand::ProfileLoad(name) => {
                let profile = self.store.load(&name).await?;
                profile.apply(&self.engine);
                self.active_profile = name;
                format!("{} profile '{}' loaded", "✓".green(), self.active_profile)
            }
            ReplCommand::ProfileSave(name) => {
                let name = name.unwrap_or_else(|| self.active_profile.clone());
                let mut profile = Profile::capture(&self.engine);
                if let Ok(existing) = self.store.load(&name).await {
                    profile.process = existing.process;
                }
                self.store.save(&name, &profile).await?;
                self.active_profile = name;
                format!("{} profile '{}' saved", "✓".green(), self.active_profile)
            }
            ReplCommand::ProfileDelete(name) => {
                self.store.delete(&name).await?;
                if name == self.active_profile {
                    let profile = self.store.load(DEFAULT_PROFILE).await?;
                    profile.apply(&self.engine);
                    self.active_profile = DEFAULT_PROFILE.to_string();
                }
                format!("{} profile '{}' deleted", "✓".green(), name)
            }
            ReplCommand::ProfileRename { old, new } => {
                self.store.rename(&old, &new).await?;
                if old == self.active_profile {
                    self.active_profile = new.clone();
                }
                format!("{} profile '{}' renamed to '{}'", "✓".green(), old, new)
            }
            ReplCommand::ProfileImport { path, name } => {
                self.store.import(&path, &name).await?;
                format!("{} imported '{}' from {}", "✓".green(), name, path.display())
            }
            ReplCommand::ProfileExport { name, path } => {
                self.store.export(&name, &path).await?;
                format!("{} exported '{}' to {}", "✓".green(), name, path.display())
            }
            ReplCommand::ProfileLink { process } => {
                self.store.link_process(&self.active_profile, &process).await?;
                format!(
                    "{} profile '{}' linked to {}",
                    "✓".green(),
                    self.active_profile,
                    process
                )
            }
            ReplCommand::Help => help_text(),
            ReplCommand::Exit => String::new(),
        };
        Ok(text)
    }

    fn status(&self) -> String {
        let held = self.engine.held_keys();
        let settings = self.engine.settings();
        let list = |keys: &[String]| {
            if keys.is_empty() {
                "-".dimmed().to_string()
            } else {
                keys.join(", ").yellow().to_string()
            }
        };
        let gesture = match self.engine.gesture_state() {
            CrouchProneState::Idle => "idle",
            CrouchProneState::Pending { .. } => "pending",
            CrouchProneState::CrouchHeld { .. } => "crouch",
            CrouchProneState::ProneHeld { .. } => "prone",
        };

        let t = settings.thresholds;
        [
            format!("{:<10}{}", "Profile:".bold(), self.active_profile.cyan()),
            format!("{:<10}{}", "Movement:".bold(), list(&held.movement)),
            format!("{:<10}{}", "Actions:".bold(), list(&held.actions)),
            format!("{:<10}{}", "Buttons:".bold(), list(&held.buttons)),
            format!("{:<10}{}", "Gesture:".bold(), gesture),
            format!(
                "{:<10}movement {:.2}, jump {:.2}, crouch {:.2}, sprint {:.2}{}",
                "Gates:".bold(),
                t.movement,
                t.jump,
                t.crouch,
                t.sprint,
                if settings.sprint_enabled { "" } else { " (sprint off)" }
            ),
        ]
        .join("\n")
    }
}

fn help_text() -> String {
    [
        "status                       held keys and thresholds",
        "set <option> <value>         change a setting (see 'options')",
        "release                      release every held key",
        "options                      list option names",
        "profile list                 list saved profiles",
        "profile load <name>          apply a profile",
        "profile save [<name>]        save current settings",
        "profile delete <name>        delete a profile",
        "profile rename <old> <new>   rename a profile",
        "profile import <file> <name> copy a profile file into the store",
        "profile export <name> <file> write a profile to a file",
        "profile link <process>       associate the active profile with a process",
        "exit                         quit",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Sample;
    use crate::sink::RecordingSink;
    use tempfile::TempDir;

    fn console() -> (TempDir, Console, Arc<Engine>) {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(Engine::new(Arc::new(RecordingSink::new())));
        let store = ProfileStore::new(dir.path());
        let console = Console::new(engine.clone(), store, DEFAULT_PROFILE);
        (dir, console, engine)
    }

    fn text(outcome: Outcome) -> String {
        match outcome {
            Outcome::Continue(text) => text,
            Outcome::Exit => panic!("unexpected exit"),
        }
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("   "), Ok(None));
        assert_eq!(parse_command("status"), Ok(Some(ReplCommand::Status)));
        assert_eq!(
            parse_command("set jump_key page up"),
            Ok(Some(ReplCommand::Set {
                name: "jump_key".to_string(),
                value: "page up".to_string()
            }))
        );
        assert_eq!(
            parse_command("profile rename a b"),
            Ok(Some(ReplCommand::ProfileRename {
                old: "a".to_string(),
                new: "b".to_string()
            }))
        );
        assert_eq!(parse_command("profile save"), Ok(Some(ReplCommand::ProfileSave(None))));
        assert_eq!(parse_command("quit"), Ok(Some(ReplCommand::Exit)));
        assert!(parse_command("set jump_key").is_err());
        assert!(parse_command("profile load").is_err());
        assert!(parse_command("teleport").is_err());
    }

    #[tokio::test]
    async fn test_set_and_status() {
        let (_dir, mut console, engine) = console();

        text(console.execute(ReplCommand::Set {
            name: "forward_key".to_string(),
            value: "up".to_string(),
        }).await);
        engine.update(&Sample::new(0.0, 1.0, 0.0));

        let status = text(console.execute(ReplCommand::Status).await);
        assert!(status.contains("up"));
        assert!(status.contains("shift"));

        let error = text(console.execute(ReplCommand::Set {
            name: "bogus".to_string(),
            value: "1".to_string(),
        }).await);
        assert!(error.contains("Unknown option"));
    }

    #[tokio::test]
    async fn test_release_command() {
        let (_dir, mut console, engine) = console();
        engine.update(&Sample::new(1.0, 0.0, 0.0));

        let output = text(console.execute(ReplCommand::Release).await);
        assert!(output.contains("released"));
        assert!(engine.active_keys().is_empty());
    }

    #[tokio::test]
    async fn test_profile_round_trip() {
        let (_dir, mut console, engine) = console();

        engine.set_option("jump_key", "F").unwrap();
        text(console.execute(ReplCommand::ProfileSave(Some("sniper".to_string()))).await);
        assert_eq!(console.active_profile(), "sniper");

        engine.set_option("jump_key", "space").unwrap();
        text(console.execute(ReplCommand::ProfileLoad("sniper".to_string())).await);
        assert_eq!(engine.settings().bindings.jump, "F");

        text(console.execute(ReplCommand::ProfileDelete("sniper".to_string())).await);
        assert_eq!(console.active_profile(), DEFAULT_PROFILE);
        assert_eq!(engine.settings().bindings.jump, "space");

        let output = text(console.execute(ReplCommand::ProfileDelete(DEFAULT_PROFILE.to_string())).await);
        assert!(output.contains("protected"));
    }

    #[tokio::test]
    async fn test_config_reload_keeps_active_profile_bindings() {
        let (dir, mut console, engine) = console();

        engine.set_option("jump_key", "F").unwrap();
        text(console.execute(ReplCommand::ProfileSave(Some("sniper".to_string()))).await);

        let reloaded = AppConfig::parse("bindings:\n  jump: G\n  forward: i\n").unwrap();
        console.apply_config(&reloaded).await;
        assert_eq!(console.active_profile(), "sniper");
        assert_eq!(engine.settings().bindings.jump, "F");
        assert_eq!(engine.settings().bindings.forward, "w");

        std::fs::remove_file(dir.path().join("sniper.json")).unwrap();
        console.apply_config(&reloaded).await;
        assert_eq!(console.active_profile(), DEFAULT_PROFILE);
        assert_eq!(engine.settings().bindings.jump, "G");
        assert_eq!(engine.settings().bindings.forward, "i");
    }

    #[tokio::test]
    async fn test_exit() {
        let (_dir, mut console, _engine) = console();
        assert_eq!(console.execute(ReplCommand::Exit).await, Outcome::Exit);
    }
}
