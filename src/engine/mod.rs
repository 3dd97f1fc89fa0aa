//! Input-to-key mapping engine
//!
//! Turns one device sample per tick into key transitions:
//!
//! 1. [`direction`] quantizes `(x, y)` into up to two movement keys
//! 2. [`latch`] holds sprint (stick magnitude) and jump (`z` up)
//! 3. [`crouch_prone`] decides between crouch and prone from how long `z` stays down
//! 4. [`buttons`] taps hot-keys on button edges
//!
//! All of it runs under one lock, to completion, before the next sample is
//! accepted. The only notion of time is one clock reading per update,
//! compared against stored deadlines; nothing runs in the background.

pub mod buttons;
pub mod clock;
pub mod crouch_prone;
pub mod direction;
pub mod keys;
pub mod latch;
pub mod settings;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::error::GatewayResult;
use crate::sink::KeySink;

pub use buttons::{ButtonBinding, ButtonEdgeTracker};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use crouch_prone::{CrouchProneDisambiguator, CrouchProneState, GestureTiming};
pub use direction::{directions, Direction, DirectionSet, MovementLatch};
pub use keys::{ActiveKeys, KeyCategory, KeyOwner};
pub use latch::ActionLatch;
pub use settings::{Action, Gate, KeyBindings, OptionName, Settings, Thresholds};

/// One polled reading, already projected onto the engine's three axes.
///
/// `x`/`y` drive movement and sprint, `z` drives jump (up) and crouch/prone (down).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub buttons: Vec<bool>,
}

impl Sample {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            buttons: Vec::new(),
        }
    }

    pub fn with_buttons(mut self, buttons: impl Into<Vec<bool>>) -> Self {
        self.buttons = buttons.into();
        self
    }

    /// Axes with non-finite components replaced by 0.0 (below every threshold)
    pub fn axes(&self) -> (f64, f64, f64) {
        let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
        (finite(self.x), finite(self.y), finite(self.z))
    }
}

/// Snapshot of held keys grouped by what holds them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeldKeys {
    pub movement: Vec<String>,
    pub actions: Vec<String>,
    /// Keys of configured buttons currently pressed
    pub buttons: Vec<String>,
}

impl HeldKeys {
    pub fn is_empty(&self) -> bool {
        self.movement.is_empty() && self.actions.is_empty() && self.buttons.is_empty()
    }
}

/// Everything guarded by the engine lock
struct EngineCore {
    settings: Settings,
    keys: ActiveKeys,
    movement: MovementLatch,
    sprint: ActionLatch,
    jump: ActionLatch,
    gesture: CrouchProneDisambiguator,
    buttons: ButtonEdgeTracker,
    /// Last z seen, replayed by `tick` so gesture deadlines fire without samples
    last_z: f64,
    samples: u64,
}

impl EngineCore {
    fn timing(&self) -> GestureTiming {
        GestureTiming {
            threshold: self.settings.thresholds.crouch,
            prone_duration: self.settings.prone_duration,
        }
    }

    fn process(&mut self, sample: &Sample, now: Duration) {
        let (x, y, z) = sample.axes();
        let thresholds = self.settings.thresholds;
        self.samples += 1;
        trace!("sample #{} x={:.3} y={:.3} z={:.3}", self.samples, x, y, z);

        let wanted = direction::directions(x, y, thresholds.movement);
        self.movement
            .update(wanted, &self.settings.bindings, &mut self.keys);

        let magnitude = (x * x + y * y).sqrt();
        let sprinting =
            self.settings.sprint_enabled && latch::engaged(magnitude, thresholds.sprint, false);
        self.sprint
            .set(sprinting, &self.settings.bindings.sprint, &mut self.keys);

        self.jump.update(
            z,
            thresholds.jump,
            false,
            &self.settings.bindings.jump,
            &mut self.keys,
        );

        self.last_z = z;
        let timing = self.timing();
        self.gesture
            .update(z, now, timing, &self.settings.bindings, &mut self.keys);

        self.buttons.update(&sample.buttons, &mut self.keys);
    }

    fn tick(&mut self, now: Duration) {
        let timing = self.timing();
        self.gesture
            .update(self.last_z, now, timing, &self.settings.bindings, &mut self.keys);
    }

    fn release_all(&mut self) -> Vec<String> {
        let released = self.keys.release_all();
        self.movement.reset();
        self.sprint.reset();
        self.jump.reset();
        self.gesture.reset();
        self.buttons.reset();
        self.last_z = 0.0;
        released
    }
}

/// The mapping engine façade.
///
/// `update` must have a single caller at a time; `release_all` and the
/// setters may be called from any context and serialize on the same lock.
pub struct Engine {
    clock: Arc<dyn Clock>,
    core: Mutex<EngineCore>,
}

impl Engine {
    /// Engine with default settings on the system monotonic clock
    pub fn new(sink: Arc<dyn KeySink>) -> Self {
        Self::with_clock(sink, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(sink: Arc<dyn KeySink>, clock: Arc<dyn Clock>) -> Self {
        info!("Mapping engine created (sink: {})", sink.name());
        Self {
            clock,
            core: Mutex::new(EngineCore {
                settings: Settings::default(),
                keys: ActiveKeys::new(sink),
                movement: MovementLatch::new(),
                sprint: ActionLatch::new(KeyOwner::Sprint),
                jump: ActionLatch::new(KeyOwner::Jump),
                gesture: CrouchProneDisambiguator::new(),
                buttons: ButtonEdgeTracker::with_keys(["1", "2"]),
                last_z: 0.0,
                samples: 0,
            }),
        }
    }

    /// Process one sample and emit the resulting key transitions
    pub fn update(&self, sample: &Sample) {
        let mut core = self.core.lock();
        let now = self.clock.now();
        core.process(sample, now);
    }

    /// Advance gesture deadlines without a new sample
    pub fn tick(&self) {
        let mut core = self.core.lock();
        let now = self.clock.now();
        core.tick(now);
    }

    /// Release every held key and return all state to initial.
    ///
    /// Must be called when the device stream is lost, otherwise keys stay down.
    pub fn release_all(&self) -> Vec<String> {
        let released = self.core.lock().release_all();
        if !released.is_empty() {
            info!("Released {} held key(s): {}", released.len(), released.join(", "));
        }
        released
    }

    /// Held keys grouped by movement / action / button
    pub fn held_keys(&self) -> HeldKeys {
        let core = self.core.lock();
        HeldKeys {
            movement: core.keys.held_in(KeyCategory::Movement),
            actions: core.keys.held_in(KeyCategory::Action),
            buttons: core.buttons.pressed_keys(),
        }
    }

    /// Every key currently down, sorted
    pub fn active_keys(&self) -> Vec<String> {
        self.core.lock().keys.held_keys()
    }

    pub fn settings(&self) -> Settings {
        self.core.lock().settings.clone()
    }

    pub fn button_bindings(&self) -> Vec<ButtonBinding> {
        self.core.lock().buttons.bindings().to_vec()
    }

    pub fn gesture_state(&self) -> CrouchProneState {
        self.core.lock().gesture.state().clone()
    }

    pub fn set_key(&self, action: Action, key: impl Into<String>) {
        let key = key.into();
        debug!("{} key -> {}", action.as_str(), key);
        self.core.lock().settings.bindings.set(action, key);
    }

    pub fn set_button_key(&self, index: usize, key: impl Into<String>) {
        let key = key.into();
        debug!("button {} key -> {}", index, key);
        self.core.lock().buttons.set_key(index, key);
    }

    /// Replace every button binding; `None` and slots past the list are unbound
    pub fn replace_button_keys<I>(&self, keys: I)
    where
        I: IntoIterator<Item = Option<String>>,
    {
        self.core.lock().buttons.replace_keys(keys);
    }

    /// Set a threshold, clamped to `[0, 1]`. Returns the value in effect.
    pub fn set_threshold(&self, gate: Gate, value: f64) -> f64 {
        let applied = self.core.lock().settings.set_threshold(gate, value);
        debug!("{} threshold -> {:.2}", gate.as_str(), applied);
        applied
    }

    pub fn set_sprint_enabled(&self, enabled: bool) {
        debug!("sprint enabled -> {}", enabled);
        self.core.lock().settings.sprint_enabled = enabled;
    }

    /// Set the prone duration in seconds (minimum 0.05s). Returns the duration in effect.
    pub fn set_prone_duration(&self, secs: f64) -> Duration {
        let applied = self.core.lock().settings.set_prone_duration(secs);
        debug!("prone duration -> {:?}", applied);
        applied
    }

    /// Set an option from the flat option table by name
    pub fn set_option(&self, name: &str, value: &str) -> GatewayResult<()> {
        let option: OptionName = name.parse()?;
        match option {
            OptionName::Key(action) => self.set_key(action, value),
            OptionName::ButtonKey(index) => self.set_button_key(index, value),
            OptionName::Threshold(gate) => {
                let v = settings::parse_number(&option, value)?;
                self.set_threshold(gate, v);
            }
            OptionName::SprintEnabled => {
                self.set_sprint_enabled(settings::parse_flag(&option, value)?);
            }
            OptionName::ProneDuration => {
                let v = settings::parse_number(&option, value)?;
                self.set_prone_duration(v);
            }
        }
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let released = self.core.get_mut().release_all();
        if !released.is_empty() {
            debug!("Engine dropped, released {:?}", released);
        }
    }
}
