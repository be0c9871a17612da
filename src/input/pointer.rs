//! Pointer/touch drag against the on-screen joystick

use serde::{Deserialize, Serialize};

use super::Intent;

/// A screen position in pixels (y grows downward)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Fixed joystick geometry: visual center and maximum drag radius
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PointerGeometry {
    #[serde(default = "default_center")]
    pub center_x: f32,
    #[serde(default = "default_center")]
    pub center_y: f32,
    #[serde(default = "default_radius")]
    pub radius: f32,
}

impl Default for PointerGeometry {
    fn default() -> Self {
        Self {
            center_x: default_center(),
            center_y: default_center(),
            radius: default_radius(),
        }
    }
}

impl PointerGeometry {
    /// Intent for a drag point
    ///
    /// Offset from the center divided by the radius, Y inverted. Each axis is
    /// clamped to [-1, 1] on its own, so a far diagonal drag yields (1, 1)
    /// rather than a vector rescaled onto the unit circle.
    pub fn intent_at(&self, point: Point) -> Intent {
        let x = (point.x - self.center_x) / self.radius;
        let y = -(point.y - self.center_y) / self.radius;
        Intent::new(x.clamp(-1.0, 1.0), y.clamp(-1.0, 1.0))
    }
}

fn default_center() -> f32 { 75.0 }
fn default_radius() -> f32 { 75.0 }
