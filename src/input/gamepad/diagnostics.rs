//! Gamepad diagnostics for troubleshooting detection and stick drift

use gilrs::{Axis, Event, EventType, Gilrs};
use std::thread;
use std::time::Duration;
use tracing::info;

use super::analog::process_stick;

/// Print every detected gamepad with its raw and deadzone-filtered drive stick
///
/// The first connected controller is the one that drives the vehicle.
pub fn print_gamepad_diagnostics(deadzone: f32) {
    info!("=== Gamepad Diagnostics ===");
    info!("Platform: {}", std::env::consts::OS);
    info!("Initializing gilrs...");

    let mut gilrs = match Gilrs::new() {
        Ok(g) => {
            info!("✅ gilrs initialized successfully");
            g
        }
        Err(e) => {
            info!("❌ Failed to initialize GilRs: {:?}", e);
            info!("This may indicate missing system libraries or permissions issues.");
            return;
        }
    };

    info!("⏳ Waiting for gamepads to connect (3 seconds)...");

    let start = std::time::Instant::now();
    let wait_duration = Duration::from_secs(3);

    while start.elapsed() < wait_duration {
        while let Some(Event { event, .. }) = gilrs.next_event() {
            match event {
                EventType::Connected => info!("   📶 Gamepad connection detected..."),
                EventType::Disconnected => info!("   📵 Gamepad disconnection detected..."),
                _ => {}
            }
        }
        thread::sleep(Duration::from_millis(100));
    }

    let gamepads: Vec<_> = gilrs.gamepads().filter(|(_, gp)| gp.is_connected()).collect();

    if gamepads.is_empty() {
        info!("⚠️  No gamepads detected");
        info!("   Keyboard and pointer input remain available.");
        return;
    }

    info!("✅ Found {} gamepad(s):", gamepads.len());

    for (index, (id, gamepad)) in gamepads.iter().enumerate() {
        let role = if index == 0 { " (drives the vehicle)" } else { "" };
        info!("📋 Gamepad {:?}{}", id, role);
        info!("   Name: \"{}\"", gamepad.name());
        info!("   Power Info: {:?}", gamepad.power_info());

        let raw_x = gamepad.value(Axis::LeftStickX);
        let raw_y = -gamepad.value(Axis::LeftStickY);
        let (x, y) = process_stick(raw_x, raw_y, deadzone);
        info!("   🕹️  Left stick raw: ({:.3}, {:.3})", raw_x, raw_y);
        info!("   🕹️  After deadzone {:.2}: ({:.3}, {:.3})", deadzone, x, y);
        if (raw_x != 0.0 || raw_y != 0.0) && x == 0.0 && y == 0.0 {
            info!("   💡 Stick drift is absorbed by the deadzone");
        }
    }

    info!("=== End Diagnostics ===");
}
