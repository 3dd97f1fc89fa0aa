//! Active key bookkeeping
//!
//! Mirrors the OS key state produced by this engine. A key is down iff at
//! least one owner holds it; the sink sees `hold` only on the first owner
//! and `release` only when the last owner lets go. Two actions bound to the
//! same key therefore never release each other's key.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, trace};

use super::direction::Direction;
use crate::sink::KeySink;

/// Engine component holding a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyOwner {
    Movement(Direction),
    Sprint,
    Jump,
    Crouch,
    Prone,
    Button(usize),
}

/// Grouping used by the held-key snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCategory {
    Movement,
    Action,
    Button,
}

impl KeyOwner {
    pub fn category(&self) -> KeyCategory {
        match self {
            KeyOwner::Movement(_) => KeyCategory::Movement,
            KeyOwner::Sprint | KeyOwner::Jump | KeyOwner::Crouch | KeyOwner::Prone => {
                KeyCategory::Action
            }
            KeyOwner::Button(_) => KeyCategory::Button,
        }
    }
}

/// The set of keys currently held down, with their owners
pub struct ActiveKeys {
    sink: Arc<dyn KeySink>,
    holders: BTreeMap<String, BTreeSet<KeyOwner>>,
}

impl ActiveKeys {
    pub fn new(sink: Arc<dyn KeySink>) -> Self {
        Self {
            sink,
            holders: BTreeMap::new(),
        }
    }

    /// Hold `key` on behalf of `owner`. Returns true if a `hold` was emitted.
    pub fn hold(&mut self, owner: KeyOwner, key: &str) -> bool {
        let owners = self.holders.entry(key.to_string()).or_default();
        if !owners.insert(owner) {
            return false;
        }
        if owners.len() > 1 {
            trace!("{} already down, now shared with {:?}", key, owner);
            return false;
        }

        debug!("hold({}) by {:?}", key, owner);
        self.sink.hold(key);
        true
    }

    /// Drop `owner`'s hold on `key`. Returns true if a `release` was emitted.
    pub fn release(&mut self, owner: KeyOwner, key: &str) -> bool {
        let Some(owners) = self.holders.get_mut(key) else {
            return false;
        };
        if !owners.remove(&owner) {
            return false;
        }
        if !owners.is_empty() {
            return false;
        }

        self.holders.remove(key);
        debug!("release({}) by {:?}", key, owner);
        self.sink.release(key);
        true
    }

    /// Press-and-release pulse. Suppressed while another owner holds the key,
    /// since the pulse's release would lift a key the engine still counts as down.
    pub fn tap(&mut self, owner: KeyOwner, key: &str) -> bool {
        if self.is_held(key) {
            debug!("tap({}) by {:?} suppressed: key is held", key, owner);
            return false;
        }

        debug!("tap({}) by {:?}", key, owner);
        self.sink.tap(key);
        true
    }

    /// Release a key the engine does not track, covering keys left down by
    /// an external tool. Skipped while an owner holds the key.
    pub fn release_untracked(&mut self, key: &str) -> bool {
        if self.is_held(key) {
            return false;
        }

        debug!("release({}) (untracked)", key);
        self.sink.release(key);
        true
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.holders.contains_key(key)
    }

    /// Keys currently down, sorted
    pub fn held_keys(&self) -> Vec<String> {
        self.holders.keys().cloned().collect()
    }

    /// Keys with at least one owner in `category`
    pub fn held_in(&self, category: KeyCategory) -> Vec<String> {
        self.holders
            .iter()
            .filter(|(_, owners)| owners.iter().any(|o| o.category() == category))
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    /// Release every held key exactly once and forget all owners
    pub fn release_all(&mut self) -> Vec<String> {
        let released: Vec<String> = std::mem::take(&mut self.holders).into_keys().collect();
        for key in &released {
            debug!("release({}) (release_all)", key);
            self.sink.release(key);
        }
        released
    }
}
