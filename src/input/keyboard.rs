//! Keyboard direction keys
//!
//! Keeps the set of currently held direction keys and derives an intent from
//! it. Diagonals are normalized so that holding two keys is not faster than
//! holding one.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::Intent;

/// A direction key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Unit contribution of this key as (x, y)
    fn contribution(self) -> (f32, f32) {
        match self {
            Direction::Up => (0.0, 1.0),
            Direction::Down => (0.0, -1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}

/// Error returned for a key name that is not a direction key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a direction key: '{0}'")]
pub struct UnknownKey(pub String);

impl FromStr for Direction {
    type Err = UnknownKey;

    /// Accepts arrow key names and WASD, case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "arrowup" | "w" => Ok(Direction::Up),
            "down" | "arrowdown" | "s" => Ok(Direction::Down),
            "left" | "arrowleft" | "a" => Ok(Direction::Left),
            "right" | "arrowright" | "d" => Ok(Direction::Right),
            _ => Err(UnknownKey(s.to_string())),
        }
    }
}

/// Set of currently held direction keys
#[derive(Debug, Clone, Default)]
pub struct HeldKeys {
    held: HashSet<Direction>,
}

impl HeldKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key press. Returns false on auto-repeat of an already held key.
    pub fn press(&mut self, direction: Direction) -> bool {
        self.held.insert(direction)
    }

    /// Record a key release. Returns false if the key was not held.
    pub fn release(&mut self, direction: Direction) -> bool {
        self.held.remove(&direction)
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn is_held(&self, direction: Direction) -> bool {
        self.held.contains(&direction)
    }

    /// Sum of held key contributions, normalized to unit length on diagonals
    pub fn intent(&self) -> Intent {
        let (x, y) = self
            .held
            .iter()
            .map(|d| d.contribution())
            .fold((0.0, 0.0), |(ax, ay), (dx, dy)| (ax + dx, ay + dy));

        if x != 0.0 && y != 0.0 {
            let norm = (x * x + y * y).sqrt();
            Intent::new(x / norm, y / norm)
        } else {
            Intent::new(x, y)
        }
    }
}
