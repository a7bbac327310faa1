//! Inbound message shape consumed by the publish adapter
//!
//! A message is a payload plus a string-keyed header map. Only the raw byte
//! payload is publishable; the other payload kinds exist so that producers
//! handing over the wrong shape get a typed error instead of a silent
//! conversion.

use bytes::Bytes;
use serde_json::Value;
use std::collections::HashMap;

/// Header that overrides the configured topic for a single message
pub const TOPIC_HEADER: &str = "mqtt_topic";

/// Header map carried alongside a payload
pub type MessageHeaders = HashMap<String, Value>;

/// Message payload as handed over by the producer
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Raw bytes, published as-is
    Bytes(Bytes),
    /// UTF-8 text
    Text(String),
    /// Structured JSON value
    Json(Value),
}

impl Payload {
    /// Short name of the payload kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Bytes(_) => "bytes",
            Payload::Text(_) => "text",
            Payload::Json(_) => "json",
        }
    }

    /// Borrow the raw bytes if this is a byte payload
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Payload::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Payload {
    fn from(bytes: &'static [u8]) -> Self {
        Payload::Bytes(Bytes::from_static(bytes))
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

/// One unit handed to the adapter by the routing substrate
///
/// # Examples
/// ```
/// use mqtt_outbound::protocol::{OutboundMessage, TOPIC_HEADER};
///
/// let message = OutboundMessage::new(b"hello".to_vec()).with_header(TOPIC_HEADER, "dogs");
/// assert_eq!(message.header(TOPIC_HEADER).and_then(|v| v.as_str()), Some("dogs"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub payload: Payload,
    pub headers: MessageHeaders,
}

impl OutboundMessage {
    /// Message without headers
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            payload: payload.into(),
            headers: MessageHeaders::new(),
        }
    }

    /// Message with a prepared header map
    pub fn with_headers(payload: impl Into<Payload>, headers: MessageHeaders) -> Self {
        Self {
            payload: payload.into(),
            headers,
        }
    }

    /// Add or replace a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_byte_conversions_produce_byte_payloads() {
        assert_eq!(
            Payload::from(b"abc".to_vec()),
            Payload::Bytes(Bytes::from_static(b"abc"))
        );
        assert_eq!(Payload::from(&b"abc"[..]).kind(), "bytes");
        assert_eq!(Payload::from(Bytes::from_static(b"x")).kind(), "bytes");
    }

    #[test]
    fn test_text_and_json_are_not_bytes() {
        let text = Payload::from("hello");
        assert_eq!(text.kind(), "text");
        assert!(text.as_bytes().is_none());

        let json = Payload::from(json!({"a": 1}));
        assert_eq!(json.kind(), "json");
        assert!(json.as_bytes().is_none());
    }

    #[test]
    fn test_new_message_has_no_headers() {
        let message = OutboundMessage::new(b"x".to_vec());
        assert!(message.headers.is_empty());
        assert!(message.header(TOPIC_HEADER).is_none());
    }

    #[test]
    fn test_with_header_replaces_existing_value() {
        let message = OutboundMessage::new(b"x".to_vec())
            .with_header(TOPIC_HEADER, "first")
            .with_header(TOPIC_HEADER, "second");
        assert_eq!(message.headers.len(), 1);
        assert_eq!(message.header(TOPIC_HEADER), Some(&json!("second")));
    }

    #[test]
    fn test_with_headers_keeps_map() {
        let mut headers = MessageHeaders::new();
        headers.insert("priority".to_string(), json!(5));
        let message = OutboundMessage::with_headers(b"x".to_vec(), headers);
        assert_eq!(message.header("priority"), Some(&json!(5)));
    }
}
