//! Console sink - logs every key transition instead of injecting it

use super::{KeyEvent, KeySink};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// ConsoleSink logs all key transitions to console/logs
///
/// This is useful for:
/// - Tuning thresholds without a game in the foreground
/// - Checking a profile before pointing it at a real injector
/// - Development without an OS-level key injector
pub struct ConsoleSink {
    name: String,
    /// Event counter for debugging
    event_count: AtomicU64,
}

impl ConsoleSink {
    /// Create a new ConsoleSink with a given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            event_count: AtomicU64::new(0),
        }
    }

    /// Number of key events logged so far
    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::Relaxed)
    }

    fn log(&self, event: KeyEvent) {
        let n = self.event_count.fetch_add(1, Ordering::Relaxed) + 1;
        info!("⌨️  [{}] #{} {}", self.name, n, event);
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new("console")
    }
}

impl KeySink for ConsoleSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn hold(&self, key: &str) {
        self.log(KeyEvent::Hold(key.to_string()));
    }

    fn release(&self, key: &str) {
        self.log(KeyEvent::Release(key.to_string()));
    }

    fn tap(&self, key: &str) {
        self.log(KeyEvent::Tap(key.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_sink_counts_events() {
        let sink = ConsoleSink::new("test");
        assert_eq!(sink.name(), "test");

        sink.hold("w");
        sink.release("w");
        sink.tap("1");

        assert_eq!(sink.event_count(), 3);
    }
}
