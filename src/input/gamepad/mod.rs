//! Gamepad input support using GilRs
//!
//! The first connected controller's left stick drives the vehicle. Sampling
//! runs on its own thread; deadzone processing happens in the panel so the
//! tuning can be hot-reloaded.

pub mod analog;
pub mod diagnostics;
pub mod provider;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::GamepadConfig;

pub use analog::{apply_deadzone, process_stick, DEFAULT_DEADZONE};
pub use diagnostics::print_gamepad_diagnostics;
pub use provider::{GamepadPoller, StickSample, StickTick};

/// Start the stick poller if gamepad input is enabled
///
/// # Returns
/// Running poller, or None if disabled or the poll thread could not start
pub fn init(config: &GamepadConfig, tick_tx: mpsc::UnboundedSender<StickTick>) -> Option<GamepadPoller> {
    if !config.enabled {
        info!("Gamepad input disabled in config");
        return None;
    }

    match GamepadPoller::start(config.poll_hz, tick_tx) {
        Ok(poller) => {
            info!("✅ Gamepad polling at {} Hz", config.poll_hz);
            Some(poller)
        }
        Err(e) => {
            warn!("Failed to start gamepad poller: {}. Continuing without gamepad.", e);
            None
        }
    }
}
