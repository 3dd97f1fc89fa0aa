//! Key-injection sinks
//!
//! The engine never talks to the operating system directly. Every key
//! transition goes through a [`KeySink`], which is the seam where an OS-level
//! injector plugs in. The sink is not required to deduplicate: the engine
//! keeps its own active-key bookkeeping and only emits real transitions.

use serde::Serialize;
use std::fmt;

pub mod console;
pub mod recording;

pub use console::ConsoleSink;
pub use recording::RecordingSink;

/// Key injection trait - all key outputs implement this
///
/// Note: All methods take &self (not &mut self) to support Arc<dyn KeySink>.
/// Sinks should use interior mutability for any state they keep.
pub trait KeySink: Send + Sync {
    /// Get the sink name (e.g., "console", "recording")
    fn name(&self) -> &str;

    /// Press the key and keep it down
    fn hold(&self, key: &str);

    /// Let go of a key previously held
    fn release(&self, key: &str);

    /// Press then immediately release the key
    fn tap(&self, key: &str);
}

/// A single event delivered to a sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "key", rename_all = "lowercase")]
pub enum KeyEvent {
    Hold(String),
    Release(String),
    Tap(String),
}

impl KeyEvent {
    /// Key symbol carried by the event
    pub fn key(&self) -> &str {
        match self {
            KeyEvent::Hold(key) | KeyEvent::Release(key) | KeyEvent::Tap(key) => key,
        }
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyEvent::Hold(key) => write!(f, "hold({})", key),
            KeyEvent::Release(key) => write!(f, "release({})", key),
            KeyEvent::Tap(key) => write!(f, "tap({})", key),
        }
    }
}
