//! Outbound MQTT adapter
//!
//! Takes byte-payload messages from an in-process producer and publishes them
//! to an MQTT broker with a configurable topic, quality of service and retain
//! flag.
//!
//! # Overview
//!
//! - [`config`] - Static connection and publish settings, loaded from TOML
//! - [`adapter`] - The connection builder and the publish adapter
//! - [`transport`] - The MQTT client capability and its rumqttc implementation
//! - [`protocol`] - Outbound messages and quality-of-service levels
//! - [`observability`] - Structured logging
//! - [`testing`] - Recording mocks of the client capability
//!
//! # Quick Start
//!
//! ```rust
//! use mqtt_outbound::adapter::{ConnectionBuilder, PublishAdapter};
//! use mqtt_outbound::config::{ConnectionConfig, PublishPolicy};
//! use mqtt_outbound::protocol::{OutboundMessage, TOPIC_HEADER};
//! use mqtt_outbound::testing::MockConnector;
//!
//! # tokio_test::block_on(async {
//! let connection = ConnectionConfig::new("m2m.eclipse.org");
//! let builder = ConnectionBuilder::new(&connection, MockConnector::new())?;
//!
//! let adapter = PublishAdapter::new(builder.client().await?, PublishPolicy::new("cats"))?;
//!
//! // Published to "cats"
//! adapter.handle(&OutboundMessage::new(b"hello".to_vec())).await?;
//!
//! // Published to "dogs" for this message only
//! let message = OutboundMessage::new(b"woof".to_vec()).with_header(TOPIC_HEADER, "dogs");
//! adapter.handle(&message).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod testing;
pub mod transport;

pub use adapter::{ConnectionBuilder, PublishAdapter};
pub use config::{AdapterConfig, ConfigError, ConnectionConfig, PublishPolicy};
pub use error::{AdapterError, AdapterResult};
pub use protocol::*;
pub use transport::{ConnectRequest, MqttConnector, MqttPublisher};
