//! In-memory sink that records every event in order

use super::{KeyEvent, KeySink};
use parking_lot::Mutex;

/// Records key events for later inspection
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<KeyEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event recorded so far
    pub fn events(&self) -> Vec<KeyEvent> {
        self.events.lock().clone()
    }

    /// Remove and return every event recorded so far
    pub fn take(&self) -> Vec<KeyEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    fn push(&self, event: KeyEvent) {
        self.events.lock().push(event);
    }
}

impl KeySink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn hold(&self, key: &str) {
        self.push(KeyEvent::Hold(key.to_string()));
    }

    fn release(&self, key: &str) {
        self.push(KeyEvent::Release(key.to_string()));
    }

    fn tap(&self, key: &str) {
        self.push(KeyEvent::Tap(key.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_in_order_and_take_drains() {
        let sink = RecordingSink::new();
        sink.hold("w");
        sink.tap("1");
        sink.release("w");

        assert_eq!(
            sink.take(),
            vec![
                KeyEvent::Hold("w".to_string()),
                KeyEvent::Tap("1".to_string()),
                KeyEvent::Release("w".to_string()),
            ]
        );
        assert!(sink.is_empty());
    }
}
