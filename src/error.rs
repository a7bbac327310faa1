//! Error taxonomy for the adapter
//!
//! Every operation either fully succeeds or fails with one of these kinds,
//! surfaced synchronously to the immediate caller.

use crate::config::ConfigError;
use crate::transport::mqtt::MqttError;
use thiserror::Error;

/// Errors surfaced by the connection builder and the publish adapter
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Invalid or contradictory static configuration
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The MQTT session could not be established
    #[error("Connection error: {0}")]
    Connection(#[source] MqttError),

    /// The message payload is not raw bytes
    #[error("Payload type error: payload must be raw bytes, found {found}")]
    PayloadType { found: &'static str },

    /// A recognized header carries a value of the wrong type
    #[error("Header type error: header '{header}' must be a string, found {found}")]
    HeaderType { header: String, found: String },

    /// The underlying publish call failed
    #[error("Publish error: {0}")]
    Publish(#[source] MqttError),
}

impl AdapterError {
    /// Create a payload type error for the given payload kind
    pub fn payload_type(found: &'static str) -> Self {
        Self::PayloadType { found }
    }

    /// Create a header type error
    pub fn header_type<S: Into<String>>(header: S, found: S) -> Self {
        Self::HeaderType {
            header: header.into(),
            found: found.into(),
        }
    }

    /// True for errors that stem from static configuration and will not go
    /// away by trying again
    pub fn is_configuration(&self) -> bool {
        matches!(self, AdapterError::Configuration(_))
    }
}

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;
