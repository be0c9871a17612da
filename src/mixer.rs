//! Differential-drive (arcade) mixing
//!
//! Turns an operator intent vector into left/right wheel speeds. `y` is the
//! forward/back throttle and `x` the turn bias; the bias is added to one wheel
//! and subtracted from the other, then each side is clamped so neither wheel
//! is asked for more than it can give.

use serde::{Deserialize, Serialize};

use crate::input::Intent;

/// Default wheel speed magnitude published at full deflection
pub const DEFAULT_MAX_SPEED: i32 = 100;

/// Left/right wheel speed command published on the control topic
///
/// Serializes as `{"left": <int>, "right": <int>}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelCommand {
    pub left: i32,
    pub right: i32,
}

impl WheelCommand {
    /// Both wheels stopped
    pub const STOP: WheelCommand = WheelCommand { left: 0, right: 0 };

    /// JSON payload for the control topic
    pub fn to_payload(&self) -> Vec<u8> {
        // Two integer fields cannot fail to serialize
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Mix an intent vector into wheel speeds bounded by `max_speed`
///
/// Non-finite components are treated as zero so the function is total.
pub fn mix(intent: Intent, max_speed: i32) -> WheelCommand {
    let x = finite_or_zero(intent.x);
    let y = finite_or_zero(intent.y);
    let max_speed = max_speed.saturating_abs();

    let left = (y + x).clamp(-1.0, 1.0);
    let right = (y - x).clamp(-1.0, 1.0);

    WheelCommand {
        left: scale(left, max_speed),
        right: scale(right, max_speed),
    }
}

fn scale(value: f32, max_speed: i32) -> i32 {
    let scaled = (value * max_speed as f32).round() as i32;
    scaled.clamp(-max_speed, max_speed)
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
