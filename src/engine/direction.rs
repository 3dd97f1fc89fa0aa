//! Eight-way direction quantizer
//!
//! Maps a 2-axis vector onto the four movement keys. The full circle is cut
//! into eight half-open sectors of width π/4 anchored on the cardinal axes:
//!
//! ```text
//!   [-π/8,  π/8)   right            [-3π/8, -π/8)  right + backward
//!   [ π/8, 3π/8)   right + forward  [-5π/8,-3π/8)  backward
//!   [3π/8, 5π/8)   forward          [-7π/8,-5π/8)  left + backward
//!   [5π/8, 7π/8)   left + forward   everything else (|angle| ≥ 7π/8) left
//! ```
//!
//! The wrap sector yields `left` alone. Existing profiles depend on this exact
//! table, boundaries included, so it must not be "tidied up".

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

use super::keys::{ActiveKeys, KeyOwner};
use super::settings::KeyBindings;

/// One of the four movement keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Forward,
        Direction::Backward,
        Direction::Left,
        Direction::Right,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Direction::Forward => 0b0001,
            Direction::Backward => 0b0010,
            Direction::Left => 0b0100,
            Direction::Right => 0b1000,
        }
    }

    fn index(self) -> usize {
        match self {
            Direction::Forward => 0,
            Direction::Backward => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of directions, at most two of which are ever produced together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct DirectionSet(u8);

impl DirectionSet {
    pub const EMPTY: DirectionSet = DirectionSet(0);

    pub fn from_slice(directions: &[Direction]) -> Self {
        let mut set = Self::EMPTY;
        for &d in directions {
            set.insert(d);
        }
        set
    }

    pub fn insert(&mut self, direction: Direction) {
        self.0 |= direction.bit();
    }

    pub fn contains(&self, direction: Direction) -> bool {
        self.0 & direction.bit() != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Direction> + '_ {
        Direction::ALL.into_iter().filter(move |d| self.contains(*d))
    }
}

/// Sector table in units of π/8: `[lo, hi)` and the directions it yields.
/// The wrap sector is whatever none of these rows match.
const SECTORS: [(i8, i8, &[Direction]); 7] = [
    (-1, 1, &[Direction::Right]),
    (1, 3, &[Direction::Right, Direction::Forward]),
    (3, 5, &[Direction::Forward]),
    (5, 7, &[Direction::Left, Direction::Forward]),
    (-7, -5, &[Direction::Left, Direction::Backward]),
    (-5, -3, &[Direction::Backward]),
    (-3, -1, &[Direction::Right, Direction::Backward]),
];

fn bound(eighths: i8) -> f64 {
    f64::from(eighths) * PI / 8.0
}

/// Directions for an angle in radians, as returned by `atan2`
pub fn sector(angle: f64) -> DirectionSet {
    SECTORS
        .iter()
        .find(|(lo, hi, _)| bound(*lo) <= angle && angle < bound(*hi))
        .map(|(_, _, dirs)| DirectionSet::from_slice(dirs))
        .unwrap_or_else(|| DirectionSet::from_slice(&[Direction::Left]))
}

/// Quantize `(x, y)` into movement directions.
///
/// Both axes inside `threshold` is the dead zone and yields no direction.
/// Non-finite components count as centered.
pub fn directions(x: f64, y: f64, threshold: f64) -> DirectionSet {
    let x = if x.is_finite() { x } else { 0.0 };
    let y = if y.is_finite() { y } else { 0.0 };

    if x.abs() < threshold && y.abs() < threshold {
        return DirectionSet::EMPTY;
    }

    sector(y.atan2(x))
}

/// Tracks which movement keys are down and diffs them against new directions
#[derive(Debug, Default)]
pub struct MovementLatch {
    /// Key held per direction, indexed by `Direction::index`
    held: [Option<String>; 4],
}

impl MovementLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the held movement keys in line with `wanted`.
    ///
    /// Releases go out before holds. A direction whose binding changed while
    /// held is released under its old key and held under the new one.
    pub fn update(&mut self, wanted: DirectionSet, bindings: &KeyBindings, keys: &mut ActiveKeys) {
        for direction in Direction::ALL {
            let slot = &mut self.held[direction.index()];
            let stale = match slot {
                Some(key) => !wanted.contains(direction) || key != bindings.key_for(direction),
                None => false,
            };
            if stale {
                if let Some(key) = slot.take() {
                    keys.release(KeyOwner::Movement(direction), &key);
                }
            }
        }

        for direction in wanted.iter() {
            let slot = &mut self.held[direction.index()];
            if slot.is_none() {
                let key = bindings.key_for(direction);
                keys.hold(KeyOwner::Movement(direction), key);
                *slot = Some(key.to_string());
            }
        }
    }

    /// Directions currently held
    pub fn held(&self) -> DirectionSet {
        let mut set = DirectionSet::EMPTY;
        for direction in Direction::ALL {
            if self.held[direction.index()].is_some() {
                set.insert(direction);
            }
        }
        set
    }

    /// Forget held keys without emitting anything (the caller already released them)
    pub fn reset(&mut self) {
        self.held = Default::default();
    }
}
