//! Crouch / prone gesture disambiguation
//!
//! One axis (z pushed down) drives two mutually exclusive keys. A short push
//! becomes a crouch held for as long as the push lasted; a push held past the
//! prone duration becomes a prone held for one more prone duration. The
//! machine is advanced once per sample against a monotonic clock reading, so
//! every transition is a pure function of `(state, z, now)`.
//!
//! ```text
//!   Idle ──z down──▶ Pending(t0) ──z up──────────────▶ CrouchHeld(now + (now - t0))
//!                        │
//!                        └──now - t0 ≥ prone_duration─▶ ProneHeld(now + prone_duration)
//!   CrouchHeld / ProneHeld ──deadline reached──▶ Idle
//! ```
//!
//! Once resolved, a gesture runs to its deadline: z is ignored until `Idle`.

use std::time::Duration;
use tracing::debug;

use super::keys::{ActiveKeys, KeyOwner};
use super::latch::engaged;
use super::settings::KeyBindings;

/// Gesture state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CrouchProneState {
    #[default]
    Idle,
    /// Axis pushed past the crouch threshold at `started_at`, outcome undecided
    Pending { started_at: Duration },
    /// Crouch key down until `release_at`
    CrouchHeld { key: String, release_at: Duration },
    /// Prone key down until `release_at`
    ProneHeld { key: String, release_at: Duration },
}

impl CrouchProneState {
    pub fn is_idle(&self) -> bool {
        matches!(self, CrouchProneState::Idle)
    }
}

/// Timing parameters for one update
#[derive(Debug, Clone, Copy)]
pub struct GestureTiming {
    /// Crouch threshold; z below `-threshold` counts as pushed down
    pub threshold: f64,
    /// How long z must stay down to become prone, and how long prone is held
    pub prone_duration: Duration,
}

#[derive(Debug, Default)]
pub struct CrouchProneDisambiguator {
    state: CrouchProneState,
}

impl CrouchProneDisambiguator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &CrouchProneState {
        &self.state
    }

    /// Advance the machine with the latest z reading taken at `now`
    pub fn update(
        &mut self,
        z: f64,
        now: Duration,
        timing: GestureTiming,
        bindings: &KeyBindings,
        keys: &mut ActiveKeys,
    ) {
        let pushed = engaged(z, timing.threshold, true);

        self.state = match std::mem::take(&mut self.state) {
            CrouchProneState::Idle if pushed => {
                debug!("Crouch/prone gesture started");
                CrouchProneState::Pending { started_at: now }
            }
            CrouchProneState::Idle => CrouchProneState::Idle,

            CrouchProneState::Pending { started_at } => {
                let elapsed = now.saturating_sub(started_at);
                if !pushed {
                    // Mirror the push length back as the crouch length
                    let key = bindings.crouch.clone();
                    let release_at = now.saturating_add(elapsed);
                    debug!("Gesture resolved to crouch ({:?})", elapsed);
                    keys.hold(KeyOwner::Crouch, &key);
                    if release_at <= now {
                        keys.release(KeyOwner::Crouch, &key);
                        CrouchProneState::Idle
                    } else {
                        CrouchProneState::CrouchHeld { key, release_at }
                    }
                } else if elapsed >= timing.prone_duration {
                    let key = bindings.prone.clone();
                    debug!("Gesture resolved to prone after {:?}", elapsed);
                    keys.hold(KeyOwner::Prone, &key);
                    CrouchProneState::ProneHeld {
                        key,
                        release_at: now.saturating_add(timing.prone_duration),
                    }
                } else {
                    CrouchProneState::Pending { started_at }
                }
            }

            CrouchProneState::CrouchHeld { key, release_at } if now >= release_at => {
                keys.release(KeyOwner::Crouch, &key);
                CrouchProneState::Idle
            }
            CrouchProneState::ProneHeld { key, release_at } if now >= release_at => {
                keys.release(KeyOwner::Prone, &key);
                CrouchProneState::Idle
            }
            held => held,
        };
    }

    /// Return to `Idle` without emitting anything (the caller already released keys)
    pub fn reset(&mut self) {
        self.state = CrouchProneState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{KeyEvent, RecordingSink};
    use std::sync::Arc;

    const TICK: Duration = Duration::from_millis(5);

    struct Rig {
        machine: CrouchProneDisambiguator,
        keys: ActiveKeys,
        sink: Arc<RecordingSink>,
        bindings: KeyBindings,
        timing: GestureTiming,
        now: Duration,
        /// (time, event) log
        log: Vec<(Duration, KeyEvent)>,
    }

    impl Rig {
        fn new() -> Self {
            let sink = Arc::new(RecordingSink::new());
            Self {
                machine: CrouchProneDisambiguator::new(),
                keys: ActiveKeys::new(sink.clone()),
                sink,
                bindings: KeyBindings::default(),
                timing: GestureTiming {
                    threshold: 0.5,
                    prone_duration: Duration::from_millis(800),
                },
                now: Duration::ZERO,
                log: Vec::new(),
            }
        }

        /// Feed `z` every tick for `span`
        fn feed(&mut self, z: f64, span: Duration) {
            let end = self.now + span;
            while self.now < end {
                self.step(z);
                self.now += TICK;
            }
        }

        fn step(&mut self, z: f64) {
            self.machine
                .update(z, self.now, self.timing, &self.bindings, &mut self.keys);
            for event in self.sink.take() {
                self.log.push((self.now, event));
            }
        }
    }

    #[test]
    fn test_short_push_resolves_to_crouch_of_same_length() {
        let mut rig = Rig::new();

        rig.feed(-1.0, Duration::from_millis(300));
        rig.feed(0.0, Duration::from_millis(600));

        assert_eq!(
            rig.log,
            vec![
                (Duration::from_millis(300), KeyEvent::Hold("c".into())),
                (Duration::from_millis(600), KeyEvent::Release("c".into())),
            ]
        );
        assert!(rig.machine.state().is_idle());
    }

    #[test]
    fn test_long_push_resolves_to_bounded_prone() {
        let mut rig = Rig::new();

        rig.feed(-1.0, Duration::from_millis(2000));

        let prone: Vec<_> = rig.log.iter().take(2).cloned().collect();
        assert_eq!(
            prone,
            vec![
                (Duration::from_millis(800), KeyEvent::Hold("x".into())),
                (Duration::from_millis(1600), KeyEvent::Release("x".into())),
            ]
        );
        assert!(rig.log.iter().all(|(_, e)| e.key() != "c"));
    }

    #[test]
    fn test_prone_runs_to_completion_after_release() {
        let mut rig = Rig::new();

        rig.feed(-1.0, Duration::from_millis(805));
        rig.feed(0.0, Duration::from_millis(1000));

        assert_eq!(
            rig.log,
            vec![
                (Duration::from_millis(800), KeyEvent::Hold("x".into())),
                (Duration::from_millis(1600), KeyEvent::Release("x".into())),
            ]
        );
    }

    #[test]
    fn test_new_push_ignored_while_crouch_held() {
        let mut rig = Rig::new();

        rig.feed(-1.0, Duration::from_millis(100));
        rig.feed(0.0, Duration::from_millis(20));
        // Crouch held until 200ms; pushing again in the meantime starts nothing
        rig.feed(-1.0, Duration::from_millis(60));

        assert!(matches!(
            rig.machine.state(),
            CrouchProneState::CrouchHeld { .. }
        ));
        assert_eq!(rig.log.len(), 1);
    }

    #[test]
    fn test_crouch_and_prone_never_overlap() {
        let mut rig = Rig::new();
        let pattern = [(-1.0, 150), (0.0, 400), (-1.0, 1200), (0.2, 300), (-0.9, 50), (0.0, 900)];

        for (z, ms) in pattern {
            rig.feed(z, Duration::from_millis(ms));
            assert!(!(rig.keys.is_held("c") && rig.keys.is_held("x")));
        }
    }

    #[test]
    fn test_zero_length_push_taps_crouch() {
        let mut rig = Rig::new();

        rig.step(-1.0);
        rig.step(0.0);

        assert_eq!(
            rig.log,
            vec![
                (Duration::ZERO, KeyEvent::Hold("c".into())),
                (Duration::ZERO, KeyEvent::Release("c".into())),
            ]
        );
        assert!(rig.machine.state().is_idle());
    }
}
