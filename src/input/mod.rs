//! Operator input sources
//!
//! Each source turns raw device input into an [`Intent`]: keyboard direction
//! keys, pointer/touch drags against the on-screen joystick, and the first
//! analog stick of a game controller.

pub mod gamepad;
pub mod keyboard;
pub mod pointer;

use std::fmt;

pub use keyboard::{Direction, HeldKeys};
pub use pointer::{Point, PointerGeometry};

/// Operator's desired direction and speed, independent of vehicle geometry
///
/// `y` is forward (+) / backward (-), `x` is right (+) / left (-).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Intent {
    pub x: f32,
    pub y: f32,
}

impl Intent {
    pub const ZERO: Intent = Intent { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// Input channel currently authorized to set the intent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InputSource {
    #[default]
    None,
    Keyboard,
    Pointer,
    Gamepad,
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputSource::None => "none",
            InputSource::Keyboard => "keyboard",
            InputSource::Pointer => "pointer",
            InputSource::Gamepad => "gamepad",
        };
        f.write_str(name)
    }
}
