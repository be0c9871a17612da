//! Analog stick processing (deadzone, normalization, inversion)

/// Default per-axis deadzone for the drive stick
pub const DEFAULT_DEADZONE: f32 = 0.15;

/// Apply a per-axis deadzone with linear rescaling of the remaining range
///
/// Values inside the deadzone map to zero; `[deadzone..1.0]` maps onto
/// `[0.0..1.0]` with the sign restored.
///
/// # Arguments
/// * `value` - Raw axis value (-1.0 to 1.0)
/// * `deadzone` - Deadzone width in [0.0, 1.0)
pub fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if !value.is_finite() || value.abs() < deadzone {
        return 0.0;
    }

    let sign = value.signum();
    let normalized = (value.abs() - deadzone) / (1.0 - deadzone);

    sign * normalized.min(1.0)
}

/// Stick sample after deadzone processing, in intent orientation
///
/// Gamepads report screen-style Y (down is positive); the drive intent wants
/// forward positive, so Y is inverted here.
pub fn process_stick(raw_x: f32, raw_y: f32, deadzone: f32) -> (f32, f32) {
    let x = apply_deadzone(raw_x, deadzone);
    let y = apply_deadzone(raw_y, deadzone);
    (x, -y)
}

/// Clamp a stick position to the unit circle
///
/// Only positions outside the circle are scaled back to magnitude 1.0;
/// interior positions are preserved exactly.
/// - At (0.5, 0.5): magnitude 0.707, output unchanged
/// - At (1, 1): magnitude 1.414, output (0.707, 0.707)
pub fn radial_clamp(x: f32, y: f32) -> (f32, f32) {
    let magnitude = (x * x + y * y).sqrt();

    if magnitude <= 1.0 {
        (x, y)
    } else {
        (x / magnitude, y / magnitude)
    }
}
