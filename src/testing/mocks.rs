//! Mock implementations for testing
//!
//! Provides a recording connector and client so the adapter can be exercised
//! without an MQTT broker.

use crate::config::SessionPersistence;
use crate::protocol::{validate_publish_topic, QualityOfService};
use crate::transport::mqtt::ConnectionState;
use crate::transport::{ConnectRequest, MqttConnector, MqttError, MqttPublisher};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// One recorded publish call
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    /// QoS ordinal as sent on the wire
    pub qos: u8,
    pub retain: bool,
}

/// Mock client recording every publish
#[derive(Debug)]
pub struct MockClient {
    pub published_messages: Arc<Mutex<Vec<PublishedMessage>>>,
    pub should_fail: bool,
    connected: AtomicBool,
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            published_messages: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
            connected: AtomicBool::new(true),
        }
    }

    pub fn with_publish_failure() -> Self {
        Self {
            should_fail: true,
            ..Self::new()
        }
    }

    pub async fn get_published_messages(&self) -> Vec<PublishedMessage> {
        self.published_messages.lock().await.clone()
    }

    pub async fn clear_history(&self) {
        self.published_messages.lock().await.clear();
    }
}

#[async_trait]
impl MqttPublisher for MockClient {
    async fn publish(
        &self,
        topic: &str,
        payload: Bytes,
        qos: QualityOfService,
        retain: bool,
    ) -> Result<(), MqttError> {
        if self.should_fail {
            return Err(MqttError::PublishFailed("Mock publish failure".into()));
        }
        validate_publish_topic(topic).map_err(|e| MqttError::PublishFailed(Box::new(e)))?;
        if !self.is_connected() {
            return Err(MqttError::NotConnected {
                state: ConnectionState::Disconnected("mock client disconnected".to_string()),
            });
        }

        self.published_messages.lock().await.push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            qos: qos.level(),
            retain,
        });
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) -> Result<(), MqttError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Mock connector counting connect attempts
///
/// Clones share their counters, so a test can keep one handle while the
/// builder owns another.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    connect_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<ConnectRequest>>>,
    pub should_fail: bool,
    pub connect_delay: Option<Duration>,
    /// Refuse every persistence but `Memory`, like the rumqttc connector
    pub memory_only: bool,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    /// Hold every connect open for `delay`, widening the window for races
    pub fn with_connect_delay(delay: Duration) -> Self {
        Self {
            connect_delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn memory_only() -> Self {
        Self {
            memory_only: true,
            ..Default::default()
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }

    pub async fn get_requests(&self) -> Vec<ConnectRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl MqttConnector for MockConnector {
    type Client = MockClient;

    fn supports_persistence(&self, persistence: &SessionPersistence) -> bool {
        !self.memory_only || matches!(persistence, SessionPersistence::Memory)
    }

    async fn connect(&self, request: &ConnectRequest) -> Result<Self::Client, MqttError> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());

        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail {
            return Err(MqttError::ConnectionFailed("Mock connect failure".into()));
        }
        Ok(MockClient::new())
    }
}
