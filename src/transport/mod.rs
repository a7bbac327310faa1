//! MQTT client capability
//!
//! The adapter never speaks the MQTT protocol itself. It resolves a
//! [`ConnectRequest`], hands it to an [`MqttConnector`], and issues publishes
//! through the [`MqttPublisher`] it gets back. The production implementation
//! lives in [`mqtt`] on top of rumqttc; [`crate::testing`] provides a
//! recording mock.

use crate::config::{ConnectOptions, SessionPersistence};
use crate::protocol::QualityOfService;
use bytes::Bytes;

pub mod mqtt;

pub use mqtt::MqttError;

/// Everything a connector needs to build and connect one client
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectRequest {
    /// `<scheme>://<host>:<port>`
    pub server_uri: String,
    pub client_id: String,
    pub persistence: SessionPersistence,
    /// `None` connects with the library defaults
    pub options: Option<ConnectOptions>,
}

/// Builds a client and performs the CONNECT handshake
#[async_trait::async_trait]
pub trait MqttConnector: Send + Sync {
    type Client: MqttPublisher + 'static;

    /// Whether clients from this connector can keep session state in
    /// `persistence`. Checked when the builder is created, before any connect.
    fn supports_persistence(&self, _persistence: &SessionPersistence) -> bool {
        true
    }

    /// Construct a client bound to the requested persistence and connect it.
    /// Returns only once the broker has accepted the session.
    async fn connect(&self, request: &ConnectRequest) -> Result<Self::Client, MqttError>;
}

/// A connected client that can publish
///
/// Implementations must tolerate concurrent `publish` calls through a shared
/// reference; callers add no locking of their own.
#[async_trait::async_trait]
pub trait MqttPublisher: Send + Sync {
    /// Publish one message
    async fn publish(
        &self,
        topic: &str,
        payload: Bytes,
        qos: QualityOfService,
        retain: bool,
    ) -> Result<(), MqttError>;

    /// Check if the session is currently up
    fn is_connected(&self) -> bool;

    /// Close the session
    async fn disconnect(&self) -> Result<(), MqttError>;
}

/// Type alias for the production connector
pub type MqttTransport = mqtt::RumqttcConnector;
