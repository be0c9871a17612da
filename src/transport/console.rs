//! Console transport - logs traffic instead of talking to a broker
//!
//! This is useful for:
//! - Driving the panel without a broker (`--dry-run`)
//! - Checking which payloads the inputs produce
//! - Tests that need a transport with observable side effects

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{ConnectRequest, SessionId, Transport, TransportError, TransportEvent, TransportEventKind};

/// ConsoleTransport accepts every connect and logs every publish
pub struct ConsoleTransport {
    events: mpsc::UnboundedSender<TransportEvent>,
    next_session: SessionId,
    session: Option<SessionId>,
    connect_count: u64,
    disconnect_count: u64,
    publish_count: u64,
    subscriptions: Vec<String>,
    last_publish: Option<(String, Vec<u8>)>,
}

impl ConsoleTransport {
    pub fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self {
            events,
            next_session: 1,
            session: None,
            connect_count: 0,
            disconnect_count: 0,
            publish_count: 0,
            subscriptions: Vec::new(),
            last_publish: None,
        }
    }

    pub fn connect_count(&self) -> u64 {
        self.connect_count
    }

    pub fn disconnect_count(&self) -> u64 {
        self.disconnect_count
    }

    pub fn publish_count(&self) -> u64 {
        self.publish_count
    }

    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    /// Topic and payload of the most recent publish
    pub fn last_publish(&self) -> Option<(&str, &[u8])> {
        self.last_publish
            .as_ref()
            .map(|(topic, payload)| (topic.as_str(), payload.as_slice()))
    }

    /// Inject an inbound message on the current session, as if the broker sent it
    pub fn inject(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        let session = self.session.ok_or(TransportError::NotConnected)?;
        self.emit(
            session,
            TransportEventKind::Message {
                topic: topic.to_string(),
                payload: payload.to_vec(),
            },
        );
        Ok(())
    }

    fn emit(&self, session: SessionId, kind: TransportEventKind) {
        if self.events.send(TransportEvent::new(session, kind)).is_err() {
            warn!("⚠️  ConsoleTransport event receiver dropped");
        }
    }
}

impl Transport for ConsoleTransport {
    fn connect(&mut self, request: ConnectRequest) -> Result<SessionId, TransportError> {
        let session = self.next_session;
        self.next_session += 1;
        self.session = Some(session);
        self.connect_count += 1;
        self.subscriptions.clear();

        info!(
            "🔌 ConsoleTransport 'connecting' to {} as {} (session {})",
            request.address, request.client_id, session
        );
        self.emit(session, TransportEventKind::Connected);
        Ok(session)
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        if let Some(session) = self.session.take() {
            self.disconnect_count += 1;
            info!("🛑 ConsoleTransport session {} closed ({} publishes so far)", session, self.publish_count);
        }
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        if self.session.is_none() {
            return Err(TransportError::NotConnected);
        }
        debug!("ConsoleTransport subscribe: {}", topic);
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.session.is_none() {
            return Err(TransportError::NotConnected);
        }

        self.publish_count += 1;
        debug!(
            topic = topic,
            payload = %String::from_utf8_lossy(&payload),
            publish_count = self.publish_count,
            "ConsoleTransport publish"
        );
        self.last_publish = Some((topic.to_string(), payload));
        Ok(())
    }
}
