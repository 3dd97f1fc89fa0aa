//! Button edge tracker
//!
//! Turns the device's button vector into key taps. Only transitions matter:
//! a press (0→1) taps the bound key, a release (1→0) sends a trailing key
//! release. The binding table grows to the widest vector seen and never
//! shrinks, so bindings survive a device that briefly reports fewer buttons.

use serde::Serialize;
use tracing::{debug, trace};

use super::keys::{ActiveKeys, KeyOwner};

/// Key bound to one button slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonBinding {
    pub key: String,
    /// False for auto-generated placeholders; placeholders emit nothing
    pub configured: bool,
}

impl ButtonBinding {
    pub fn configured(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            configured: true,
        }
    }

    /// Placeholder label for slot `index`: its 1-based position
    pub fn placeholder(index: usize) -> Self {
        Self {
            key: (index + 1).to_string(),
            configured: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct ButtonEdgeTracker {
    bindings: Vec<ButtonBinding>,
    pressed: Vec<bool>,
}

impl ButtonEdgeTracker {
    /// Tracker with the given keys bound to slots `0..keys.len()`
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let bindings: Vec<ButtonBinding> = keys.into_iter().map(ButtonBinding::configured).collect();
        let pressed = vec![false; bindings.len()];
        Self { bindings, pressed }
    }

    fn grow_to(&mut self, len: usize) {
        while self.bindings.len() < len {
            let index = self.bindings.len();
            trace!("Button slot {} added with placeholder binding", index);
            self.bindings.push(ButtonBinding::placeholder(index));
        }
        if self.pressed.len() < len {
            self.pressed.resize(len, false);
        }
    }

    /// Feed the current button vector. Slots beyond the vector read as released.
    pub fn update(&mut self, buttons: &[bool], keys: &mut ActiveKeys) {
        self.grow_to(buttons.len());

        for index in 0..self.bindings.len() {
            let now = buttons.get(index).copied().unwrap_or(false);
            if now == self.pressed[index] {
                continue;
            }
            self.pressed[index] = now;

            let binding = &self.bindings[index];
            if !binding.configured {
                trace!("Button {} changed on unbound slot", index);
                continue;
            }
            if now {
                debug!("Button {} pressed -> tap({})", index, binding.key);
                keys.tap(KeyOwner::Button(index), &binding.key);
            } else {
                debug!("Button {} released -> release({})", index, binding.key);
                keys.release_untracked(&binding.key);
            }
        }
    }

    /// Bind `key` to slot `index`, growing the table as needed.
    /// Takes effect at the slot's next transition.
    pub fn set_key(&mut self, index: usize, key: impl Into<String>) {
        self.grow_to(index + 1);
        self.bindings[index] = ButtonBinding::configured(key);
    }

    /// Replace the whole binding table. `None` and every slot past the end
    /// of `keys` become placeholders; the table keeps its grown length.
    pub fn replace_keys<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let keys: Vec<Option<String>> = keys.into_iter().collect();
        self.grow_to(keys.len());
        for (index, binding) in self.bindings.iter_mut().enumerate() {
            *binding = match keys.get(index).cloned().flatten() {
                Some(key) => ButtonBinding::configured(key),
                None => ButtonBinding::placeholder(index),
            };
        }
        debug!("Button table replaced ({} configured)", keys.iter().flatten().count());
    }

    pub fn bindings(&self) -> &[ButtonBinding] {
        &self.bindings
    }

    /// Keys of configured slots currently pressed
    pub fn pressed_keys(&self) -> Vec<String> {
        self.bindings
            .iter()
            .zip(&self.pressed)
            .filter(|(b, pressed)| b.configured && **pressed)
            .map(|(b, _)| b.key.clone())
            .collect()
    }

    /// Mark every slot released without emitting anything
    pub fn reset(&mut self) {
        self.pressed.iter_mut().for_each(|p| *p = false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{KeyEvent, RecordingSink};
    use std::sync::Arc;

    fn rig(keys: &[&str]) -> (ButtonEdgeTracker, ActiveKeys, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        (
            ButtonEdgeTracker::with_keys(keys.iter().copied()),
            ActiveKeys::new(sink.clone()),
            sink,
        )
    }

    #[test]
    fn test_press_taps_and_release_releases() {
        let (mut tracker, mut keys, sink) = rig(&["1", "2"]);

        tracker.update(&[true, false], &mut keys);
        tracker.update(&[true, false], &mut keys);
        tracker.update(&[false, false], &mut keys);

        assert_eq!(
            sink.take(),
            vec![KeyEvent::Tap("1".into()), KeyEvent::Release("1".into())]
        );
        assert!(keys.is_empty());
    }

    #[test]
    fn test_growth_preserves_bindings() {
        let (mut tracker, mut keys, sink) = rig(&["q"]);
        tracker.set_key(1, "e");

        tracker.update(&[false], &mut keys);
        tracker.update(&[false, false, false], &mut keys);
        tracker.update(&[false, false], &mut keys);

        assert_eq!(tracker.bindings().len(), 3);
        assert_eq!(tracker.bindings()[0], ButtonBinding::configured("q"));
        assert_eq!(tracker.bindings()[1], ButtonBinding::configured("e"));
        assert_eq!(tracker.bindings()[2], ButtonBinding::placeholder(2));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_shrinking_vector_releases_missing_slots() {
        let (mut tracker, mut keys, sink) = rig(&["1", "2"]);

        tracker.update(&[false, true], &mut keys);
        tracker.update(&[false], &mut keys);

        assert_eq!(
            sink.take(),
            vec![KeyEvent::Tap("2".into()), KeyEvent::Release("2".into())]
        );
    }

    #[test]
    fn test_placeholder_slots_are_inert_until_bound() {
        let (mut tracker, mut keys, sink) = rig(&[]);

        tracker.update(&[true], &mut keys);
        tracker.update(&[false], &mut keys);
        assert!(sink.is_empty());

        tracker.set_key(0, "f");
        tracker.update(&[true], &mut keys);
        assert_eq!(sink.take(), vec![KeyEvent::Tap("f".into())]);
    }

    #[test]
    fn test_rebind_mid_press_applies_at_next_transition() {
        let (mut tracker, mut keys, sink) = rig(&["1"]);

        tracker.update(&[true], &mut keys);
        tracker.set_key(0, "g");
        tracker.update(&[true], &mut keys);
        tracker.update(&[false], &mut keys);

        assert_eq!(
            sink.take(),
            vec![KeyEvent::Tap("1".into()), KeyEvent::Release("g".into())]
        );
    }

    #[test]
    fn test_replace_keys_resets_stale_slots() {
        let (mut tracker, mut keys, sink) = rig(&["1", "2"]);
        tracker.set_key(3, "g");

        tracker.replace_keys([Some("q".to_string()), None]);

        assert_eq!(
            tracker.bindings(),
            &[
                ButtonBinding::configured("q"),
                ButtonBinding::placeholder(1),
                ButtonBinding::placeholder(2),
                ButtonBinding::placeholder(3),
            ]
        );

        tracker.update(&[false, true, false, true], &mut keys);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_pressed_keys_snapshot() {
        let (mut tracker, mut keys, _sink) = rig(&["1", "2"]);

        tracker.update(&[true, false, true], &mut keys);
        assert_eq!(tracker.pressed_keys(), vec!["1".to_string()]);

        tracker.reset();
        assert!(tracker.pressed_keys().is_empty());
    }
}
