//! Messaging transport between the panel and the vehicle
//!
//! The panel talks to the broker only through the [`Transport`] trait. All
//! calls return immediately; outcomes (connection established, failed or
//! lost, inbound messages) come back later as [`TransportEvent`]s that the
//! main loop feeds into the panel.

pub mod address;
pub mod console;
pub mod mqtt;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;

pub use address::{AddressError, BrokerAddress, Scheme};
pub use console::ConsoleTransport;
pub use mqtt::MqttTransport;

/// Identifies one connect attempt; events from older sessions are stale
pub type SessionId = u64;

/// Broker credentials, injected from configuration or the environment
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Everything the transport needs to open a session
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectRequest {
    pub address: BrokerAddress,
    pub client_id: String,
    pub credentials: Option<Credentials>,
}

/// What happened on a session
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEventKind {
    /// Broker accepted the connection
    Connected,
    /// Connect attempt did not succeed (unreachable, auth rejected, ...)
    ConnectFailed(String),
    /// Established connection dropped
    ConnectionLost(String),
    /// Inbound message on a subscribed topic
    Message { topic: String, payload: Vec<u8> },
}

/// A transport notification tagged with the session that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct TransportEvent {
    pub session: SessionId,
    pub kind: TransportEventKind,
}

impl TransportEvent {
    pub fn new(session: SessionId, kind: TransportEventKind) -> Self {
        Self { session, kind }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no active broker session")]
    NotConnected,
    #[error("broker client rejected request: {0}")]
    Client(String),
}

/// Connection lifecycle as seen by the panel
///
/// `Disconnected -> Connecting -> Connected -> Lost -> Disconnected`, with
/// `Connecting -> Disconnected` on failure and `Connected -> Disconnected` on
/// an operator disconnect. `Lost` behaves like `Disconnected` for every
/// purpose except display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Lost,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Whether a connect toggle should disconnect rather than connect
    pub fn is_engaged(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }

    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Lost => "disconnected (connection lost)",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Publish/subscribe client used by the panel
///
/// Implementations must not block: publishes are fire-and-forget and a
/// command the client cannot take right now is dropped with an error.
pub trait Transport {
    /// Start connecting. Any previous session is closed first.
    fn connect(&mut self, request: ConnectRequest) -> Result<SessionId, TransportError>;

    /// Close the current session, if any
    fn disconnect(&mut self) -> Result<(), TransportError>;

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Background work still flushing the session closed by the last
    /// `disconnect`. Awaiting it guarantees queued publishes went out.
    fn take_closing(&mut self) -> Option<JoinHandle<()>> {
        None
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self, request: ConnectRequest) -> Result<SessionId, TransportError> {
        (**self).connect(request)
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        (**self).disconnect()
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        (**self).subscribe(topic)
    }

    fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        (**self).publish(topic, payload)
    }

    fn take_closing(&mut self) -> Option<JoinHandle<()>> {
        (**self).take_closing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials {
            username: "pilot".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("pilot"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_connection_state_predicates() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Lost.is_connected());
        assert!(ConnectionState::Connecting.is_engaged());
        assert!(!ConnectionState::Lost.is_engaged());
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }
}
