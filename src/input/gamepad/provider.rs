//! GilRs stick poller
//!
//! Polls the first connected controller's left stick once per tick on a
//! dedicated thread (gilrs is not `Send`) and forwards samples to the main
//! loop over a channel.

use std::time::Duration;

use anyhow::Result;
use gilrs::{Axis, Event, EventType, Gilrs};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One raw reading of the drive stick
///
/// Y follows the HID convention (down is positive), as the host input layer
/// reports it; [`process_stick`](super::analog::process_stick) flips it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StickSample {
    pub x: f32,
    pub y: f32,
}

/// Poll result for one tick: `None` when no controller is connected
pub type StickTick = Option<StickSample>;

/// Background poller for the drive stick
pub struct GamepadPoller {
    shutdown_tx: Option<std::sync::mpsc::Sender<()>>,
}

impl GamepadPoller {
    /// Start polling at `poll_hz` ticks per second
    ///
    /// Samples are sent on every tick while a controller is connected. A
    /// single `None` is sent when the last controller goes away. The poll
    /// keeps running with zero controllers and picks up hot-plugged ones.
    pub fn start(poll_hz: u32, tick_tx: mpsc::UnboundedSender<StickTick>) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = std::sync::mpsc::channel::<()>();
        let period = Duration::from_secs_f64(1.0 / f64::from(poll_hz.max(1)));

        std::thread::Builder::new()
            .name("gamepad-poll".to_string())
            .spawn(move || Self::poll_loop(period, tick_tx, shutdown_rx))?;

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
        })
    }

    fn poll_loop(
        period: Duration,
        tick_tx: mpsc::UnboundedSender<StickTick>,
        shutdown_rx: std::sync::mpsc::Receiver<()>,
    ) {
        // Initialize gilrs in this thread (not Send-safe)
        let mut gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("GilRs initialized");
                g
            },
            Err(e) => {
                warn!("Failed to initialize GilRs: {:?}. Continuing without gamepad.", e);
                return;
            },
        };

        let mut had_controller = false;

        loop {
            match shutdown_rx.try_recv() {
                Ok(()) | Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                    info!("Gamepad poller shutting down");
                    break;
                },
                Err(std::sync::mpsc::TryRecvError::Empty) => {},
            }

            // Drain events so gilrs updates its cached state
            while let Some(Event { id, event, .. }) = gilrs.next_event() {
                match event {
                    EventType::Connected => {
                        info!("🎮 Gamepad connected: \"{}\"", gilrs.gamepad(id).name());
                    },
                    EventType::Disconnected => {
                        info!("🎮 Gamepad disconnected: {:?}", id);
                    },
                    _ => {},
                }
            }

            let tick = Self::read_first_stick(&gilrs);
            let send = match tick {
                Some(_) => true,
                None => had_controller,
            };
            had_controller = tick.is_some();

            if send && tick_tx.send(tick).is_err() {
                debug!("Stick receiver dropped, stopping gamepad poll");
                return;
            }

            std::thread::sleep(period);
        }
    }

    /// Left stick of the first connected controller, Y in HID convention
    fn read_first_stick(gilrs: &Gilrs) -> StickTick {
        gilrs
            .gamepads()
            .find(|(_, gp)| gp.is_connected())
            .map(|(_, gp)| StickSample {
                x: gp.value(Axis::LeftStickX),
                // gilrs reports up as positive
                y: -gp.value(Axis::LeftStickY),
            })
    }

    /// Stop the poll thread
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            info!("Gamepad poller shutdown requested");
        }
    }
}

impl Drop for GamepadPoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}
