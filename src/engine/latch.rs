//! Single-key threshold latch (sprint, jump)

use super::keys::{ActiveKeys, KeyOwner};

/// Whether `value` is past `threshold`.
///
/// Strictly greater (or strictly less than `-threshold` when inverted): a
/// value sitting exactly on the threshold is not engaged. NaN is never engaged.
pub fn engaged(value: f64, threshold: f64, inverted: bool) -> bool {
    if inverted {
        value < -threshold
    } else {
        value > threshold
    }
}

/// Holds one key while its input is past a threshold, releases it otherwise.
/// No hysteresis band.
#[derive(Debug)]
pub struct ActionLatch {
    owner: KeyOwner,
    /// Key actually held, which may differ from the current binding after a rebind
    held: Option<String>,
}

impl ActionLatch {
    pub fn new(owner: KeyOwner) -> Self {
        Self { owner, held: None }
    }

    /// Feed one reading. Returns whether the latch is held afterwards.
    pub fn update(
        &mut self,
        value: f64,
        threshold: f64,
        inverted: bool,
        key: &str,
        keys: &mut ActiveKeys,
    ) -> bool {
        self.set(engaged(value, threshold, inverted), key, keys)
    }

    /// Drive the latch from an already-evaluated condition
    pub fn set(&mut self, on: bool, key: &str, keys: &mut ActiveKeys) -> bool {
        if !on {
            self.release(keys);
            return false;
        }
        if self.held.as_deref() == Some(key) {
            return true;
        }

        self.release(keys);
        keys.hold(self.owner, key);
        self.held = Some(key.to_string());
        true
    }

    /// Release the held key, if any
    pub fn release(&mut self, keys: &mut ActiveKeys) {
        if let Some(key) = self.held.take() {
            keys.release(self.owner, &key);
        }
    }

    pub fn held_key(&self) -> Option<&str> {
        self.held.as_deref()
    }

    /// Forget the held key without emitting anything
    pub fn reset(&mut self) {
        self.held = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{KeyEvent, RecordingSink};
    use std::sync::Arc;

    #[test]
    fn test_engaged_is_strict() {
        assert!(engaged(0.6, 0.5, false));
        assert!(!engaged(0.5, 0.5, false));
        assert!(!engaged(-0.6, 0.5, false));

        assert!(engaged(-0.6, 0.5, true));
        assert!(!engaged(-0.5, 0.5, true));
        assert!(!engaged(0.6, 0.5, true));

        assert!(!engaged(f64::NAN, 0.5, false));
        assert!(!engaged(f64::NAN, 0.5, true));
    }

    #[test]
    fn test_latch_holds_and_releases_once() {
        let sink = Arc::new(RecordingSink::new());
        let mut keys = ActiveKeys::new(sink.clone());
        let mut jump = ActionLatch::new(KeyOwner::Jump);

        assert!(jump.update(0.8, 0.5, false, "space", &mut keys));
        assert!(jump.update(0.9, 0.5, false, "space", &mut keys));
        assert!(!jump.update(0.5, 0.5, false, "space", &mut keys));
        assert!(!jump.update(0.1, 0.5, false, "space", &mut keys));

        assert_eq!(
            sink.take(),
            vec![
                KeyEvent::Hold("space".into()),
                KeyEvent::Release("space".into())
            ]
        );
    }

    #[test]
    fn test_rebind_while_held_swaps_keys() {
        let sink = Arc::new(RecordingSink::new());
        let mut keys = ActiveKeys::new(sink.clone());
        let mut sprint = ActionLatch::new(KeyOwner::Sprint);

        sprint.update(1.0, 0.9, false, "shift", &mut keys);
        sprint.update(1.0, 0.9, false, "ctrl", &mut keys);
        assert_eq!(sprint.held_key(), Some("ctrl"));

        sprint.update(0.0, 0.9, false, "ctrl", &mut keys);
        assert_eq!(
            sink.take(),
            vec![
                KeyEvent::Hold("shift".into()),
                KeyEvent::Release("shift".into()),
                KeyEvent::Hold("ctrl".into()),
                KeyEvent::Release("ctrl".into()),
            ]
        );
    }
}
