//! MQTT over WebSocket transport (rumqttc)
//!
//! Each connect spawns one event-loop task that forwards broker events as
//! [`TransportEvent`]s. The task stops at the first connection error: there
//! is no automatic reconnect, the operator reconnects by hand. After a
//! graceful disconnect the task keeps running until the queued requests and
//! the DISCONNECT packet are written; [`Transport::take_closing`] hands it
//! out so shutdown can wait for that.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ConnectRequest, SessionId, Transport, TransportError, TransportEvent, TransportEventKind};

/// Capacity of the client request queue; full queue drops publishes
const REQUEST_CAPACITY: usize = 64;

const KEEP_ALIVE: Duration = Duration::from_secs(60);

struct ActiveSession {
    id: SessionId,
    client: AsyncClient,
    task: JoinHandle<()>,
}

/// rumqttc-backed [`Transport`]
pub struct MqttTransport {
    events: mpsc::UnboundedSender<TransportEvent>,
    next_session: SessionId,
    active: Option<ActiveSession>,
    closing: Option<JoinHandle<()>>,
}

impl MqttTransport {
    /// Create a transport that reports on `events`
    pub fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self {
            events,
            next_session: 1,
            active: None,
            closing: None,
        }
    }

    fn options(request: &ConnectRequest) -> MqttOptions {
        let url = request.address.ws_url();
        let mut options = MqttOptions::new(request.client_id.clone(), url, request.address.port);
        options.set_keep_alive(KEEP_ALIVE);

        if request.address.scheme.is_secure() {
            options.set_transport(rumqttc::Transport::wss_with_default_config());
        } else {
            options.set_transport(rumqttc::Transport::Ws);
        }

        if let Some(creds) = &request.credentials {
            options.set_credentials(creds.username.clone(), creds.password.clone());
        }

        options
    }

    /// Drive one session's event loop until it ends
    async fn run_session(
        session: SessionId,
        mut eventloop: EventLoop,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) {
        let mut connected = false;

        loop {
            let kind = match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    debug!("MQTT ConnAck: {:?}", ack);
                    connected = true;
                    TransportEventKind::Connected
                },
                Ok(Event::Incoming(Packet::Publish(publish))) => TransportEventKind::Message {
                    topic: publish.topic,
                    payload: publish.payload.to_vec(),
                },
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    debug!("MQTT session {} closed by operator", session);
                    break;
                },
                Ok(_) => continue,
                Err(e) => {
                    let reason = e.to_string();
                    if connected {
                        warn!("MQTT connection lost: {}", reason);
                        let _ = events.send(TransportEvent::new(
                            session,
                            TransportEventKind::ConnectionLost(reason),
                        ));
                    } else {
                        warn!("MQTT connect failed: {}", reason);
                        let _ = events.send(TransportEvent::new(
                            session,
                            TransportEventKind::ConnectFailed(reason),
                        ));
                    }
                    break;
                },
            };

            if events.send(TransportEvent::new(session, kind)).is_err() {
                debug!("Transport event receiver dropped, stopping session {}", session);
                break;
            }
        }
    }

    fn client(&self) -> Result<&AsyncClient, TransportError> {
        self.active
            .as_ref()
            .map(|s| &s.client)
            .ok_or(TransportError::NotConnected)
    }
}

impl Transport for MqttTransport {
    fn connect(&mut self, request: ConnectRequest) -> Result<SessionId, TransportError> {
        if self.active.is_some() {
            self.disconnect()?;
        }

        let session = self.next_session;
        self.next_session += 1;

        info!("🔌 Connecting to MQTT broker at {} (session {})", request.address, session);

        let (client, eventloop) = AsyncClient::new(Self::options(&request), REQUEST_CAPACITY);
        let task = tokio::spawn(Self::run_session(session, eventloop, self.events.clone()));

        self.active = Some(ActiveSession {
            id: session,
            client,
            task,
        });

        Ok(session)
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        let Some(session) = self.active.take() else {
            return Ok(());
        };

        info!("Disconnecting MQTT session {}", session.id);
        match session.client.try_disconnect() {
            Ok(()) => self.closing = Some(session.task),
            Err(e) => {
                // Queue full or loop already gone: stop the loop outright
                debug!("Graceful disconnect failed ({}), aborting session task", e);
                session.task.abort();
            },
        }
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        self.client()?
            .try_subscribe(topic, QoS::AtLeastOnce)
            .map_err(|e| TransportError::Client(e.to_string()))
    }

    fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        self.client()?
            .try_publish(topic, QoS::AtMostOnce, false, payload)
            .map_err(|e| TransportError::Client(e.to_string()))
    }

    fn take_closing(&mut self) -> Option<JoinHandle<()>> {
        self.closing.take()
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        if let Some(session) = self.active.take() {
            session.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::BrokerAddress;

    fn request(url: &str) -> ConnectRequest {
        ConnectRequest {
            address: BrokerAddress::parse(url).unwrap(),
            client_id: "car-teleop-test".to_string(),
            credentials: None,
        }
    }

    #[test]
    fn test_publish_without_session_is_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut transport = MqttTransport::new(tx);

        assert!(matches!(
            transport.publish("car/control", b"forward".to_vec()),
            Err(TransportError::NotConnected)
        ));
        assert!(transport.disconnect().is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_broker_reports_connect_failed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut transport = MqttTransport::new(tx);

        // Port 1 on loopback refuses connections
        let session = transport.connect(request("ws://127.0.0.1:1/mqtt")).unwrap();

        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for transport event")
            .expect("event channel closed");

        assert_eq!(event.session, session);
        assert!(matches!(event.kind, TransportEventKind::ConnectFailed(_)));
    }

    #[tokio::test]
    async fn test_sessions_get_fresh_ids() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut transport = MqttTransport::new(tx);

        let first = transport.connect(request("ws://127.0.0.1:1")).unwrap();
        let second = transport.connect(request("ws://127.0.0.1:1")).unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_disconnect_hands_out_session_task() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut transport = MqttTransport::new(tx);
        assert!(transport.take_closing().is_none());

        transport.connect(request("ws://127.0.0.1:1/mqtt")).unwrap();
        transport.publish("car/control", b"{\"left\":0,\"right\":0}".to_vec()).unwrap();
        transport.disconnect().unwrap();

        let closing = transport.take_closing().expect("session task handed out");
        let finished = tokio::time::timeout(Duration::from_secs(10), closing).await;
        assert!(finished.is_ok(), "session task did not finish");
        assert!(transport.take_closing().is_none());
    }
}
