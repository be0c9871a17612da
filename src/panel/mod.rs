//! Control panel
//!
//! Owns the intent arbiter, the connection state machine, the telemetry view
//! and the operator log. Every host input arrives as a [`PanelEvent`] through
//! [`ControlPanel::handle`], which runs to completion before the next event;
//! nothing here blocks or needs a lock.
//!
//! Each intent write is mixed into a wheel command and published on the
//! control topic, but only while connected. Otherwise the command is dropped
//! and the operator is told to connect first; nothing is queued.
//!
//! Every publish gets its own log line, except the gamepad stream: an
//! engaged gamepad publishes on every poll tick, so identical consecutive
//! commands from it fold into one line with a repeat count.

pub mod log;

#[cfg(test)]
mod tests;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::arbiter::InputArbiter;
use crate::command::DriveCommand;
use crate::config::{AppConfig, ControlConfig};
use crate::input::gamepad::StickTick;
use crate::input::{Direction, InputSource, Intent, Point};
use crate::mixer::{mix, WheelCommand};
use crate::telemetry::{StatusUpdate, StatusView};
use crate::transport::{
    BrokerAddress, ConnectRequest, ConnectionState, SessionId, Transport, TransportEvent, TransportEventKind,
};

pub use log::{LogKind, LogLine, OperatorLog};

/// Logged when a command is dropped because there is no connection
pub const CONNECT_FIRST: &str = "Please connect to the broker first";

/// Host input delivered to the panel
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    /// Connect button: connects when idle, disconnects when engaged
    ToggleConnect { url: Option<String> },
    Disconnect,
    KeyDown(Direction),
    KeyUp(Direction),
    PointerDown(Point),
    PointerMove(Point),
    PointerUp,
    GamepadTick(StickTick),
    Button(DriveCommand),
    Transport(TransportEvent),
    Reconfigure(ControlConfig),
}

pub struct ControlPanel<T: Transport> {
    transport: T,
    config: AppConfig,
    arbiter: InputArbiter,
    state: ConnectionState,
    session: Option<SessionId>,
    status: StatusView,
    log: OperatorLog,
    last_command: Option<WheelCommand>,
}

impl<T: Transport> ControlPanel<T> {
    pub fn new(transport: T, config: AppConfig) -> Self {
        let arbiter = InputArbiter::new(config.control.pointer, config.control.deadzone);
        Self {
            transport,
            config,
            arbiter,
            state: ConnectionState::Disconnected,
            session: None,
            status: StatusView::default(),
            log: OperatorLog::new(false),
            last_command: None,
        }
    }

    /// Print log lines to the terminal as they are appended
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.log.set_echo(echo);
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn intent(&self) -> Intent {
        self.arbiter.intent()
    }

    pub fn active_source(&self) -> InputSource {
        self.arbiter.active()
    }

    pub fn status(&self) -> &StatusView {
        &self.status
    }

    pub fn log(&self) -> &OperatorLog {
        &self.log
    }

    /// Last wheel command handed to the transport
    pub fn last_command(&self) -> Option<WheelCommand> {
        self.last_command
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Dispatch one event
    pub fn handle(&mut self, event: PanelEvent) {
        match event {
            PanelEvent::ToggleConnect { url } => self.toggle_connect(url),
            PanelEvent::Disconnect => self.disconnect(),
            PanelEvent::KeyDown(direction) => {
                let intent = self.arbiter.key_down(direction);
                self.drive(intent, false);
            },
            PanelEvent::KeyUp(direction) => {
                let intent = self.arbiter.key_up(direction);
                self.drive(intent, false);
            },
            PanelEvent::PointerDown(point) => {
                let intent = self.arbiter.pointer_down(point);
                self.drive(intent, false);
            },
            PanelEvent::PointerMove(point) => {
                if let Some(intent) = self.arbiter.pointer_move(point) {
                    self.drive(intent, false);
                }
            },
            PanelEvent::PointerUp => {
                if let Some(intent) = self.arbiter.pointer_up() {
                    self.drive(intent, false);
                }
            },
            PanelEvent::GamepadTick(Some(sample)) => {
                if let Some(intent) = self.arbiter.gamepad_tick(sample) {
                    self.drive(intent, true);
                }
            },
            PanelEvent::GamepadTick(None) => {
                if let Some(intent) = self.arbiter.gamepad_lost() {
                    self.log.info("Gamepad disconnected, stopping");
                    self.drive(intent, false);
                }
            },
            PanelEvent::Button(command) => {
                self.publish(command.as_str().as_bytes().to_vec(), false);
            },
            PanelEvent::Transport(event) => self.on_transport(event),
            PanelEvent::Reconfigure(control) => self.reconfigure(control),
        }
    }

    /// Stop the vehicle and close the session
    ///
    /// Returns the transport's closing task, if any. The stop command is only
    /// queued here; awaiting the task makes sure it reached the broker.
    pub fn shutdown(&mut self) -> Option<JoinHandle<()>> {
        if self.state.is_connected() {
            self.publish(WheelCommand::STOP.to_payload(), false);
        }
        if self.state.is_engaged() {
            self.disconnect();
        }
        self.transport.take_closing()
    }

    /// Mix and publish; `stream` marks per-tick gamepad output
    fn drive(&mut self, intent: Intent, stream: bool) {
        let command = mix(intent, self.config.control.max_speed);
        if self.publish(command.to_payload(), stream) {
            self.last_command = Some(command);
        }
    }

    /// Fire-and-forget publish on the control topic
    fn publish(&mut self, payload: Vec<u8>, stream: bool) -> bool {
        if !self.state.is_connected() {
            self.log.append_folded(LogKind::Warning, CONNECT_FIRST.to_string(), !stream);
            return false;
        }

        let text = String::from_utf8_lossy(&payload).into_owned();
        match self.transport.publish(&self.config.topics.control, payload) {
            Ok(()) => {
                let line = format!("→ CMD: {}", text);
                if stream {
                    self.log.append_folded(LogKind::Outbound, line, false);
                } else {
                    self.log.outbound(line);
                }
                true
            },
            Err(e) => {
                let line = format!("Publish failed, command dropped: {}", e);
                self.log.append_folded(LogKind::Warning, line, !stream);
                false
            },
        }
    }

    fn toggle_connect(&mut self, url: Option<String>) {
        if self.state.is_engaged() {
            self.disconnect();
            return;
        }

        let url = url.unwrap_or_else(|| self.config.broker.url.clone());
        let address = match BrokerAddress::parse(&url) {
            Ok(address) => address,
            Err(e) => {
                self.log.warning(format!("Connection failed: {}", e));
                return;
            },
        };

        let request = ConnectRequest {
            address,
            client_id: format!("{}-{}", self.config.broker.client_prefix, Utc::now().timestamp_millis()),
            credentials: self.config.credentials.clone(),
        };

        match self.transport.connect(request) {
            Ok(session) => {
                self.session = Some(session);
                self.transition(ConnectionState::Connecting);
                self.log.info(format!("Connecting to {} ...", url));
            },
            Err(e) => {
                self.log.warning(format!("Connection failed: {}", e));
            },
        }
    }

    fn disconnect(&mut self) {
        if !self.state.is_engaged() {
            self.log.info("Not connected");
            return;
        }

        if let Err(e) = self.transport.disconnect() {
            warn!("Transport disconnect failed: {}", e);
        }
        self.session = None;
        self.transition(ConnectionState::Disconnected);
        self.log.info("Disconnected");
    }

    fn on_transport(&mut self, event: TransportEvent) {
        if self.session != Some(event.session) {
            debug!("Ignoring event from stale session {}: {:?}", event.session, event.kind);
            return;
        }

        match event.kind {
            TransportEventKind::Connected => {
                self.transition(ConnectionState::Connected);
                self.log.info("✅ Connected");

                let topic = self.config.topics.status.clone();
                if let Err(e) = self.transport.subscribe(&topic) {
                    self.log.warning(format!("Subscribe to {} failed: {}", topic, e));
                }
            },
            TransportEventKind::ConnectFailed(reason) => {
                self.session = None;
                self.transition(ConnectionState::Disconnected);
                self.log.warning(format!("Connection failed: {}", reason));
            },
            TransportEventKind::ConnectionLost(reason) => {
                self.session = None;
                self.transition(ConnectionState::Lost);
                self.log.warning(format!("⚠️ Connection lost: {}", reason));
            },
            TransportEventKind::Message { topic, payload } => {
                let text = String::from_utf8_lossy(&payload).into_owned();
                self.log.inbound(format!("← [{}] {}", topic, text));

                if topic == self.config.topics.status && self.status.apply(&text) != StatusUpdate::Parsed {
                    debug!("Status payload is not a JSON object, showing raw text");
                }
            },
        }
    }

    fn reconfigure(&mut self, control: ControlConfig) {
        if let Err(e) = control.validate() {
            self.log.warning(format!("Ignoring control settings: {:#}", e));
            return;
        }

        self.arbiter.set_tuning(control.pointer, control.deadzone);
        self.config.control = control;
        self.log.info(format!(
            "Control settings updated (max speed {}, deadzone {:.2})",
            control.max_speed, control.deadzone
        ));
    }

    fn transition(&mut self, next: ConnectionState) {
        use ConnectionState::*;

        let expected = matches!(
            (self.state, next),
            (Disconnected | Lost, Connecting)
                | (Connecting, Connected)
                | (Connecting | Connected, Disconnected)
                | (Connected, Lost)
        );
        if !expected {
            warn!("Unexpected connection transition: {:?} -> {:?}", self.state, next);
        }

        info!("Connection state: {} -> {}", self.state, next);
        self.state = next;
    }
}
