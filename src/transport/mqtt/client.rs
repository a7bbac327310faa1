//! Impure I/O operations for the rumqttc client
//!
//! Spawns and supervises the rumqttc event loop, confirms the CONNACK before
//! handing a client out, and guards publishes with the live connection state.

use super::connection::{configure_mqtt_options, ConnectionState, MqttError};
use super::message_handler::{EventRoute, MessageHandler};
use crate::config::SessionPersistence;
use crate::protocol::{validate_publish_topic, QualityOfService};
use crate::transport::{ConnectRequest, MqttConnector, MqttPublisher};
use async_trait::async_trait;
use bytes::Bytes;
use rumqttc::{AsyncClient, EventLoop};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Request queue depth between the client handle and the event loop
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10;

/// Pause between event-loop polls after a network error; rumqttc
/// re-establishes the session on the next poll
const POLL_ERROR_PAUSE: Duration = Duration::from_secs(1);

/// How long `disconnect` waits for the DISCONNECT to be flushed
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// Builds rumqttc clients (MQTT v3.1.1)
#[derive(Debug, Clone)]
pub struct RumqttcConnector {
    channel_capacity: usize,
}

impl Default for RumqttcConnector {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl RumqttcConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many requests may queue between publishers and the event loop
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Wait for connection confirmation (ConnAck) with timeout
    async fn wait_for_connection_confirmation(
        mut state_rx: watch::Receiver<ConnectionState>,
        timeout: Duration,
    ) -> Result<(), MqttError> {
        let timeout_result = tokio::time::timeout(timeout, async {
            loop {
                let state = state_rx.borrow_and_update().clone();
                match state {
                    ConnectionState::Connected => return Ok(()),
                    ConnectionState::Disconnected(reason) => {
                        return Err(MqttError::ConnectionFailed(reason.into()));
                    }
                    ConnectionState::Connecting => {}
                }
                if state_rx.changed().await.is_err() {
                    return Err(MqttError::ConnectionFailed(
                        "event loop stopped before CONNACK".into(),
                    ));
                }
            }
        })
        .await;

        match timeout_result {
            Ok(result) => result,
            Err(_) => Err(MqttError::ConnectionFailed(
                format!("no CONNACK received within {}s", timeout.as_secs_f32()).into(),
            )),
        }
    }
}

#[async_trait]
impl MqttConnector for RumqttcConnector {
    type Client = RumqttcClient;

    /// rumqttc keeps in-flight state in memory only
    fn supports_persistence(&self, persistence: &SessionPersistence) -> bool {
        matches!(persistence, SessionPersistence::Memory)
    }

    async fn connect(&self, request: &ConnectRequest) -> Result<RumqttcClient, MqttError> {
        let settings = configure_mqtt_options(request)?;
        let (client, event_loop) = AsyncClient::new(settings.options, self.channel_capacity);

        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            server_uri = %request.server_uri,
            client_id = %request.client_id,
            "Connecting to MQTT broker"
        );

        let handle = tokio::spawn(supervise_event_loop(
            request.client_id.clone(),
            event_loop,
            state_tx,
            shutdown_rx,
        ));

        if let Err(e) =
            Self::wait_for_connection_confirmation(state_rx.clone(), settings.connection_timeout)
                .await
        {
            let _ = shutdown_tx.send(true);
            handle.abort();
            error!(server_uri = %request.server_uri, "MQTT connect failed: {}", e);
            return Err(e);
        }

        info!(server_uri = %request.server_uri, "MQTT session established");

        Ok(RumqttcClient {
            client_id: request.client_id.clone(),
            client,
            state_rx,
            shutdown_tx,
            event_loop_handle: Mutex::new(Some(handle)),
        })
    }
}

/// Drive the event loop until shutdown. Before the first CONNACK any error
/// ends the loop so that `connect` can report it; afterwards errors only mark
/// the state as disconnected and polling resumes.
async fn supervise_event_loop(
    client_id: String,
    mut event_loop: EventLoop,
    state_tx: watch::Sender<ConnectionState>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut established = false;

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    debug!(%client_id, "Shutdown signal received, stopping event loop");
                    break;
                }
            }
            event = event_loop.poll() => {
                match event {
                    Ok(event) => match MessageHandler::route_mqtt_event(&event) {
                        EventRoute::ConnectionAcknowledged { session_present } => {
                            established = true;
                            debug!(%client_id, session_present, "CONNACK received");
                            let _ = state_tx.send(ConnectionState::Connected);
                        }
                        EventRoute::ConnectionRefused(code) => {
                            let _ = state_tx.send(ConnectionState::Disconnected(format!(
                                "connection refused: {code}"
                            )));
                            if !established {
                                break;
                            }
                        }
                        EventRoute::DisconnectSent => {
                            let _ = state_tx.send(ConnectionState::Disconnected(
                                "client disconnected".to_string(),
                            ));
                            break;
                        }
                        EventRoute::DisconnectReceived => {
                            warn!(%client_id, "Broker closed the session");
                            let _ = state_tx.send(ConnectionState::Disconnected(
                                "disconnected by broker".to_string(),
                            ));
                        }
                        EventRoute::PublishAcknowledged { packet_id } => {
                            tracing::trace!(target: "mqtt_transport", packet_id, "Publish acknowledged");
                        }
                        EventRoute::InfrastructureEvent(event_str) => {
                            tracing::trace!(target: "mqtt_transport", "MQTT event: {}", event_str);
                        }
                        EventRoute::OutgoingEvent => {}
                    },
                    Err(e) => {
                        let _ = state_tx.send(ConnectionState::Disconnected(e.to_string()));
                        if !established {
                            break;
                        }
                        warn!(%client_id, "MQTT event loop error: {}", e);
                        if !interruptible_sleep(shutdown_rx.clone(), POLL_ERROR_PAUSE).await {
                            break;
                        }
                    }
                }
            }
        }
    }

    debug!(%client_id, "MQTT event loop stopped");
}

/// Sleep unless shutdown is signalled first; false means shutdown
async fn interruptible_sleep(mut shutdown_rx: watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        changed = shutdown_rx.changed() => {
            changed.is_ok() && !*shutdown_rx.borrow()
        }
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Connected rumqttc client
///
/// `AsyncClient` is a cheap handle onto the event loop's request queue and
/// is safe to use from many tasks at once.
pub struct RumqttcClient {
    client_id: String,
    client: AsyncClient,
    state_rx: watch::Receiver<ConnectionState>,
    shutdown_tx: watch::Sender<bool>,
    event_loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl RumqttcClient {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Get current connection state
    pub fn connection_state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    fn check_connection_state(&self) -> Result<(), MqttError> {
        let state = self.connection_state();
        if state != ConnectionState::Connected {
            return Err(MqttError::NotConnected { state });
        }
        Ok(())
    }
}

#[async_trait]
impl MqttPublisher for RumqttcClient {
    async fn publish(
        &self,
        topic: &str,
        payload: Bytes,
        qos: QualityOfService,
        retain: bool,
    ) -> Result<(), MqttError> {
        // publish_bytes skips rumqttc's own topic check
        validate_publish_topic(topic).map_err(|e| MqttError::PublishFailed(Box::new(e)))?;
        self.check_connection_state()?;

        self.client
            .publish_bytes(topic, qos.into(), retain, payload)
            .await
            .map_err(|e| MqttError::PublishFailed(Box::new(e)))
    }

    fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    async fn disconnect(&self) -> Result<(), MqttError> {
        let Some(handle) = self.event_loop_handle.lock().await.take() else {
            return Ok(());
        };

        let result = self
            .client
            .disconnect()
            .await
            .map_err(|e| MqttError::DisconnectFailed(Box::new(e)));

        // The event loop stops by itself once DISCONNECT is on the wire
        match tokio::time::timeout(DISCONNECT_GRACE, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) if !e.is_cancelled() => {
                warn!("MQTT event loop ended with error: {}", e);
            }
            Ok(Err(_)) => {}
            Err(_) => {
                warn!("MQTT event loop didn't stop in time, forcing shutdown");
                let _ = self.shutdown_tx.send(true);
            }
        }

        info!(client_id = %self.client_id, "MQTT client disconnected");
        result
    }
}

impl Drop for RumqttcClient {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Ok(mut guard) = self.event_loop_handle.try_lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}
