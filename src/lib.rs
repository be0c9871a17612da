//! car-teleop - remote control panel for a differential-drive vehicle
//!
//! Operator inputs (keyboard, virtual joystick pad, gamepad, button bank) are
//! arbitrated into a single intent, mixed into left/right wheel speeds and
//! published over MQTT. Vehicle telemetry comes back on a status topic.

pub mod arbiter;
pub mod cli;
pub mod command;
pub mod config;
pub mod input;
pub mod mixer;
pub mod panel;
pub mod telemetry;
pub mod transport;
