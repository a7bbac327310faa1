//! Maps one outbound message to one MQTT publish

use crate::config::{ConfigError, PublishPolicy};
use crate::error::{AdapterError, AdapterResult};
use crate::protocol::{OutboundMessage, TOPIC_HEADER};
use crate::transport::MqttPublisher;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Publishes messages with a fixed QoS and retain flag
pub struct PublishAdapter<P: MqttPublisher> {
    client: Arc<P>,
    policy: PublishPolicy,
}

impl<P: MqttPublisher> Clone for PublishAdapter<P> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            policy: self.policy.clone(),
        }
    }
}

impl<P: MqttPublisher> PublishAdapter<P> {
    pub fn new(client: Arc<P>, policy: PublishPolicy) -> Result<Self, ConfigError> {
        policy.validate()?;
        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &PublishPolicy {
        &self.policy
    }

    /// Topic for `message`: the `mqtt_topic` header when present, otherwise
    /// the configured topic
    pub fn resolve_topic<'a>(&'a self, message: &'a OutboundMessage) -> AdapterResult<&'a str> {
        match message.header(TOPIC_HEADER) {
            None => Ok(&self.policy.topic),
            Some(Value::String(topic)) => Ok(topic),
            Some(other) => Err(AdapterError::header_type(
                TOPIC_HEADER,
                json_kind(other),
            )),
        }
    }

    /// Publish `message` once. Only byte payloads are accepted.
    pub async fn handle(&self, message: &OutboundMessage) -> AdapterResult<()> {
        let payload = message
            .payload
            .as_bytes()
            .ok_or_else(|| AdapterError::payload_type(message.payload.kind()))?;
        let topic = self.resolve_topic(message)?;

        debug!(
            topic = %topic,
            qos = self.policy.qos.level(),
            retain = self.policy.retain,
            size = payload.len(),
            "Publishing message"
        );

        self.client
            .publish(topic, payload.clone(), self.policy.qos, self.policy.retain)
            .await
            .map_err(AdapterError::Publish)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
