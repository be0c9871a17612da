//! Tests for the control panel

use super::*;
use crate::config::TopicsConfig;
use crate::input::gamepad::StickSample;
use crate::input::PointerGeometry;
use crate::telemetry::PLACEHOLDER;
use crate::transport::ConsoleTransport;
use tokio::sync::mpsc;

type Events = mpsc::UnboundedReceiver<TransportEvent>;

fn make_panel() -> (ControlPanel<ConsoleTransport>, Events) {
    let (tx, rx) = mpsc::unbounded_channel();
    let panel = ControlPanel::new(ConsoleTransport::new(tx), AppConfig::default());
    (panel, rx)
}

/// Feed every pending transport event into the panel
fn pump(panel: &mut ControlPanel<ConsoleTransport>, rx: &mut Events) {
    while let Ok(event) = rx.try_recv() {
        panel.handle(PanelEvent::Transport(event));
    }
}

fn connected_panel() -> (ControlPanel<ConsoleTransport>, Events) {
    let (mut panel, mut rx) = make_panel();
    panel.handle(PanelEvent::ToggleConnect { url: None });
    pump(&mut panel, &mut rx);
    assert_eq!(panel.state(), ConnectionState::Connected);
    (panel, rx)
}

fn last_payload(panel: &ControlPanel<ConsoleTransport>) -> String {
    let (topic, payload) = panel.transport().last_publish().expect("nothing published");
    assert_eq!(topic, "car/control");
    String::from_utf8(payload.to_vec()).unwrap()
}

#[test]
fn test_publish_while_disconnected_is_dropped() {
    let (mut panel, _rx) = make_panel();

    panel.handle(PanelEvent::KeyDown(Direction::Up));

    assert_eq!(panel.transport().publish_count(), 0);
    assert_eq!(panel.log().len(), 1);
    assert!(panel.log().contains(CONNECT_FIRST));
    assert_eq!(panel.last_command(), None);
    // Intent still tracks the keys
    assert_eq!(panel.intent(), Intent::new(0.0, 1.0));
}

#[test]
fn test_connect_first_warnings_fold() {
    let (mut panel, _rx) = make_panel();

    panel.handle(PanelEvent::KeyDown(Direction::Up));
    panel.handle(PanelEvent::KeyUp(Direction::Up));
    panel.handle(PanelEvent::Button(DriveCommand::Left));

    assert_eq!(panel.log().len(), 1);
    assert_eq!(panel.log().last().unwrap().repeats, 3);
}

#[test]
fn test_connect_flow_subscribes_to_status() {
    let (mut panel, mut rx) = make_panel();

    panel.handle(PanelEvent::ToggleConnect { url: None });
    assert_eq!(panel.state(), ConnectionState::Connecting);
    assert!(panel.transport().subscriptions().is_empty());

    pump(&mut panel, &mut rx);
    assert_eq!(panel.state(), ConnectionState::Connected);
    assert_eq!(panel.transport().connect_count(), 1);
    assert_eq!(panel.transport().subscriptions(), &["car/status".to_string()]);
    assert!(panel.log().contains("Connected"));
}

#[test]
fn test_connect_uses_explicit_url() {
    let (mut panel, _rx) = make_panel();

    panel.handle(PanelEvent::ToggleConnect {
        url: Some("wss://broker.example:8884/mqtt".to_string()),
    });
    assert_eq!(panel.state(), ConnectionState::Connecting);
    assert!(panel.log().contains("wss://broker.example:8884/mqtt"));
}

#[test]
fn test_invalid_url_stays_disconnected() {
    let (mut panel, _rx) = make_panel();

    panel.handle(PanelEvent::ToggleConnect {
        url: Some("localhost:9001".to_string()),
    });

    assert_eq!(panel.state(), ConnectionState::Disconnected);
    assert_eq!(panel.transport().connect_count(), 0);
    assert!(panel.log().contains("Connection failed"));
}

#[test]
fn test_keyboard_diagonal_publishes_mixed_command() {
    let (mut panel, _rx) = connected_panel();

    panel.handle(PanelEvent::KeyDown(Direction::Up));
    assert_eq!(last_payload(&panel), r#"{"left":100,"right":100}"#);

    panel.handle(PanelEvent::KeyDown(Direction::Right));
    assert_eq!(last_payload(&panel), r#"{"left":100,"right":0}"#);
    assert_eq!(panel.last_command(), Some(WheelCommand { left: 100, right: 0 }));
    assert_eq!(panel.active_source(), InputSource::Keyboard);
    assert!(panel.log().contains(r#"→ CMD: {"left":100,"right":0}"#));
}

#[test]
fn test_pointer_release_publishes_stop() {
    let (mut panel, _rx) = connected_panel();

    // Default pad is centered at (75, 75) with radius 75
    panel.handle(PanelEvent::PointerDown(Point::new(75.0, 0.0)));
    assert_eq!(last_payload(&panel), r#"{"left":100,"right":100}"#);

    panel.handle(PanelEvent::PointerMove(Point::new(150.0, 75.0)));
    assert_eq!(last_payload(&panel), r#"{"left":100,"right":-100}"#);

    panel.handle(PanelEvent::PointerUp);
    assert_eq!(last_payload(&panel), r#"{"left":0,"right":0}"#);
    assert_eq!(panel.active_source(), InputSource::None);
    assert_eq!(panel.transport().publish_count(), 3);
}

#[test]
fn test_pointer_move_without_drag_is_ignored() {
    let (mut panel, _rx) = connected_panel();

    panel.handle(PanelEvent::PointerMove(Point::new(0.0, 0.0)));
    panel.handle(PanelEvent::PointerUp);
    assert_eq!(panel.transport().publish_count(), 0);
}

#[test]
fn test_button_publishes_token() {
    let (mut panel, _rx) = connected_panel();

    panel.handle(PanelEvent::Button(DriveCommand::Forward));
    assert_eq!(last_payload(&panel), "forward");

    panel.handle(PanelEvent::Button(DriveCommand::Backward));
    assert_eq!(last_payload(&panel), "backward");

    // Buttons bypass the mixer and leave the intent alone
    assert_eq!(panel.last_command(), None);
    assert!(panel.intent().is_zero());
}

#[test]
fn test_repeated_button_presses_each_get_a_line() {
    let (mut panel, _rx) = connected_panel();
    let before = panel.log().len();

    panel.handle(PanelEvent::Button(DriveCommand::Forward));
    panel.handle(PanelEvent::Button(DriveCommand::Forward));

    assert_eq!(panel.transport().publish_count(), 2);
    assert_eq!(panel.log().len(), before + 2);
    assert!(panel.log().tail(2).all(|l| l.text == "→ CMD: forward" && l.repeats == 1));
}

#[test]
fn test_repeated_key_commands_each_get_a_line() {
    let (mut panel, _rx) = connected_panel();
    let before = panel.log().len();

    // Press and release twice: up, stop, up, stop
    panel.handle(PanelEvent::KeyDown(Direction::Up));
    panel.handle(PanelEvent::KeyUp(Direction::Up));
    panel.handle(PanelEvent::KeyDown(Direction::Up));
    panel.handle(PanelEvent::KeyUp(Direction::Up));
    panel.handle(PanelEvent::PointerDown(Point::new(75.0, 75.0)));
    panel.handle(PanelEvent::PointerUp);
    panel.handle(PanelEvent::PointerDown(Point::new(75.0, 75.0)));

    assert_eq!(panel.transport().publish_count(), 7);
    assert_eq!(panel.log().len(), before + 7);
}

#[test]
fn test_engaged_gamepad_stream_folds() {
    let (mut panel, _rx) = connected_panel();

    panel.handle(PanelEvent::GamepadTick(Some(StickSample { x: 0.0, y: -1.0 })));
    let before = panel.log().len();
    for _ in 0..50 {
        panel.handle(PanelEvent::GamepadTick(Some(StickSample { x: 0.0, y: 0.0 })));
    }

    // Every tick is published, the log grows by one line
    assert_eq!(panel.transport().publish_count(), 51);
    assert_eq!(panel.log().len(), before + 1);
    let last = panel.log().last().unwrap();
    assert_eq!(last.text, r#"→ CMD: {"left":0,"right":0}"#);
    assert_eq!(last.repeats, 50);
}

#[test]
fn test_gamepad_drives_then_stops_on_disconnect() {
    let (mut panel, _rx) = connected_panel();

    // Idle stick publishes nothing
    panel.handle(PanelEvent::GamepadTick(Some(StickSample { x: 0.0, y: 0.0 })));
    assert_eq!(panel.transport().publish_count(), 0);

    // Stick pushed fully up (HID y is down-positive)
    panel.handle(PanelEvent::GamepadTick(Some(StickSample { x: 0.0, y: -1.0 })));
    assert_eq!(last_payload(&panel), r#"{"left":100,"right":100}"#);
    assert_eq!(panel.active_source(), InputSource::Gamepad);

    // Engaged stick at rest keeps publishing
    panel.handle(PanelEvent::GamepadTick(Some(StickSample { x: 0.0, y: 0.0 })));
    assert_eq!(last_payload(&panel), r#"{"left":0,"right":0}"#);

    panel.handle(PanelEvent::GamepadTick(Some(StickSample { x: 0.0, y: -1.0 })));
    panel.handle(PanelEvent::GamepadTick(None));
    assert_eq!(last_payload(&panel), r#"{"left":0,"right":0}"#);
    assert_eq!(panel.active_source(), InputSource::None);
    assert!(panel.log().contains("Gamepad disconnected"));
}

#[test]
fn test_status_json_updates_view() {
    let (mut panel, mut rx) = connected_panel();

    panel.transport().inject("car/status", br#"{"speed":42}"#).unwrap();
    pump(&mut panel, &mut rx);

    assert_eq!(panel.status().speed, "42");
    assert_eq!(panel.status().battery, PLACEHOLDER);
    assert_eq!(panel.status().status, PLACEHOLDER);
    assert!(panel.log().contains(r#"← [car/status] {"speed":42}"#));
}

#[test]
fn test_status_raw_text_is_kept() {
    let (mut panel, mut rx) = connected_panel();

    panel.transport().inject("car/status", br#"{"battery":80,"statu":"ok"}"#).unwrap();
    panel.transport().inject("car/status", b"OK").unwrap();
    pump(&mut panel, &mut rx);

    assert_eq!(panel.status().raw.as_deref(), Some("OK"));
    assert!(panel.log().contains("← [car/status] OK"));
    // Fields from the last good payload remain
    assert_eq!(panel.status().battery, "80");
    assert_eq!(panel.status().status, "ok");
}

#[test]
fn test_message_on_other_topic_only_logged() {
    let (mut panel, mut rx) = connected_panel();

    panel.transport().inject("car/debug", br#"{"speed":7}"#).unwrap();
    pump(&mut panel, &mut rx);

    assert_eq!(panel.status(), &StatusView::default());
    assert!(panel.log().contains("← [car/debug]"));
}

#[test]
fn test_connection_lost_blocks_publish() {
    let (mut panel, mut rx) = connected_panel();
    let session = panel.session.unwrap();

    panel.handle(PanelEvent::Transport(TransportEvent::new(
        session,
        TransportEventKind::ConnectionLost("socket closed".to_string()),
    )));
    assert_eq!(panel.state(), ConnectionState::Lost);
    assert!(panel.log().contains("Connection lost: socket closed"));

    panel.handle(PanelEvent::KeyDown(Direction::Up));
    assert_eq!(panel.transport().publish_count(), 0);
    assert!(panel.log().contains(CONNECT_FIRST));

    // Reconnect from Lost
    panel.handle(PanelEvent::ToggleConnect { url: None });
    pump(&mut panel, &mut rx);
    assert_eq!(panel.state(), ConnectionState::Connected);
    assert_eq!(panel.transport().connect_count(), 2);
}

#[test]
fn test_connect_failure_returns_to_disconnected() {
    let (mut panel, mut rx) = make_panel();

    panel.handle(PanelEvent::ToggleConnect { url: None });
    let session = panel.session.unwrap();
    // Drop the console transport's immediate success
    while rx.try_recv().is_ok() {}

    panel.handle(PanelEvent::Transport(TransportEvent::new(
        session,
        TransportEventKind::ConnectFailed("not authorized".to_string()),
    )));

    assert_eq!(panel.state(), ConnectionState::Disconnected);
    assert!(panel.session.is_none());
    assert!(panel.log().contains("Connection failed: not authorized"));
}

#[test]
fn test_stale_session_events_are_ignored() {
    let (mut panel, mut rx) = connected_panel();
    let old_session = panel.session.unwrap();

    panel.handle(PanelEvent::ToggleConnect { url: None });
    assert_eq!(panel.state(), ConnectionState::Disconnected);
    panel.handle(PanelEvent::ToggleConnect { url: None });
    pump(&mut panel, &mut rx);
    assert_eq!(panel.state(), ConnectionState::Connected);

    panel.handle(PanelEvent::Transport(TransportEvent::new(
        old_session,
        TransportEventKind::ConnectionLost("late".to_string()),
    )));
    assert_eq!(panel.state(), ConnectionState::Connected);
    assert!(!panel.log().contains("late"));
}

#[test]
fn test_toggle_while_connecting_disconnects() {
    let (mut panel, _rx) = make_panel();

    panel.handle(PanelEvent::ToggleConnect { url: None });
    assert_eq!(panel.state(), ConnectionState::Connecting);

    panel.handle(PanelEvent::ToggleConnect { url: None });
    assert_eq!(panel.state(), ConnectionState::Disconnected);
    assert_eq!(panel.transport().disconnect_count(), 1);
}

#[test]
fn test_disconnect_when_idle_is_noop() {
    let (mut panel, _rx) = make_panel();

    panel.handle(PanelEvent::Disconnect);
    assert_eq!(panel.transport().disconnect_count(), 0);
    assert!(panel.log().contains("Not connected"));
}

#[test]
fn test_reconfigure_changes_max_speed() {
    let (mut panel, _rx) = connected_panel();

    let control = ControlConfig {
        max_speed: 50,
        ..ControlConfig::default()
    };
    panel.handle(PanelEvent::Reconfigure(control));
    assert_eq!(panel.config().control.max_speed, 50);

    panel.handle(PanelEvent::KeyDown(Direction::Down));
    assert_eq!(last_payload(&panel), r#"{"left":-50,"right":-50}"#);
}

#[test]
fn test_reconfigure_rejects_invalid_settings() {
    let (mut panel, _rx) = make_panel();

    let control = ControlConfig {
        deadzone: 1.5,
        ..ControlConfig::default()
    };
    panel.handle(PanelEvent::Reconfigure(control));
    assert_eq!(panel.config().control.deadzone, 0.15);
    assert!(panel.log().contains("Ignoring control settings"));
}

#[test]
fn test_reconfigure_moves_pointer_pad() {
    let (mut panel, _rx) = connected_panel();

    let control = ControlConfig {
        pointer: PointerGeometry { center_x: 0.0, center_y: 0.0, radius: 10.0 },
        ..ControlConfig::default()
    };
    panel.handle(PanelEvent::Reconfigure(control));

    panel.handle(PanelEvent::PointerDown(Point::new(0.0, -10.0)));
    assert_eq!(last_payload(&panel), r#"{"left":100,"right":100}"#);
}

#[test]
fn test_custom_topics() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let config = AppConfig {
        topics: TopicsConfig {
            control: "rover/cmd".to_string(),
            status: "rover/state".to_string(),
        },
        ..AppConfig::default()
    };
    let mut panel = ControlPanel::new(ConsoleTransport::new(tx), config);

    panel.handle(PanelEvent::ToggleConnect { url: None });
    pump(&mut panel, &mut rx);
    assert_eq!(panel.transport().subscriptions(), &["rover/state".to_string()]);

    panel.handle(PanelEvent::Button(DriveCommand::Right));
    assert_eq!(panel.transport().last_publish(), Some(("rover/cmd", &b"right"[..])));
}

#[test]
fn test_shutdown_stops_vehicle_and_disconnects() {
    let (mut panel, _rx) = connected_panel();

    panel.handle(PanelEvent::KeyDown(Direction::Up));
    panel.shutdown();

    assert_eq!(last_payload(&panel), r#"{"left":0,"right":0}"#);
    assert_eq!(panel.state(), ConnectionState::Disconnected);
    assert_eq!(panel.transport().disconnect_count(), 1);
}

#[test]
fn test_shutdown_when_idle_does_nothing() {
    let (mut panel, _rx) = make_panel();

    panel.shutdown();
    assert_eq!(panel.transport().publish_count(), 0);
    assert!(panel.log().is_empty());
}

/// Transport whose publishes drain on a background task, like a real
/// client's network loop
struct QueuedTransport {
    events: mpsc::UnboundedSender<TransportEvent>,
    queue: Option<mpsc::UnboundedSender<Vec<u8>>>,
    task: Option<JoinHandle<()>>,
    closing: Option<JoinHandle<()>>,
    delivered: std::sync::Arc<std::sync::Mutex<Vec<Vec<u8>>>>,
}

impl QueuedTransport {
    fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self {
            events,
            queue: None,
            task: None,
            closing: None,
            delivered: Default::default(),
        }
    }
}

impl Transport for QueuedTransport {
    fn connect(&mut self, _request: ConnectRequest) -> Result<SessionId, crate::transport::TransportError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let delivered = self.delivered.clone();
        self.task = Some(tokio::spawn(async move {
            while let Some(payload) = rx.recv().await {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                delivered.lock().unwrap().push(payload);
            }
        }));
        self.queue = Some(tx);
        let _ = self.events.send(TransportEvent::new(1, TransportEventKind::Connected));
        Ok(1)
    }

    fn disconnect(&mut self) -> Result<(), crate::transport::TransportError> {
        self.queue = None;
        self.closing = self.task.take();
        Ok(())
    }

    fn subscribe(&mut self, _topic: &str) -> Result<(), crate::transport::TransportError> {
        Ok(())
    }

    fn publish(&mut self, _topic: &str, payload: Vec<u8>) -> Result<(), crate::transport::TransportError> {
        let queue = self.queue.as_ref().ok_or(crate::transport::TransportError::NotConnected)?;
        queue
            .send(payload)
            .map_err(|e| crate::transport::TransportError::Client(e.to_string()))
    }

    fn take_closing(&mut self) -> Option<JoinHandle<()>> {
        self.closing.take()
    }
}

#[tokio::test]
async fn test_shutdown_hands_back_task_that_flushes_stop() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let transport = QueuedTransport::new(tx);
    let delivered = transport.delivered.clone();
    let mut panel = ControlPanel::new(transport, AppConfig::default());

    panel.handle(PanelEvent::ToggleConnect { url: None });
    while let Ok(event) = rx.try_recv() {
        panel.handle(PanelEvent::Transport(event));
    }
    assert_eq!(panel.state(), ConnectionState::Connected);

    panel.handle(PanelEvent::KeyDown(Direction::Up));
    let closing = panel.shutdown().expect("no closing task");
    assert_eq!(panel.state(), ConnectionState::Disconnected);

    tokio::time::timeout(std::time::Duration::from_secs(2), closing)
        .await
        .expect("closing task hung")
        .unwrap();

    let delivered = delivered.lock().unwrap();
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[1], br#"{"left":0,"right":0}"#.to_vec());
}
