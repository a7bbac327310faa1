//! rumqttc-backed implementation of the MQTT client capability
//!
//! # Architecture
//!
//! - [`connection`] - Pure option building and server URI parsing
//! - [`message_handler`] - Pure routing of event-loop events
//! - [`client`] - Impure I/O: event-loop supervision, CONNACK wait, publish
//!
//! # Usage
//!
//! ```rust,no_run
//! use mqtt_outbound::config::SessionPersistence;
//! use mqtt_outbound::protocol::QualityOfService;
//! use mqtt_outbound::transport::mqtt::RumqttcConnector;
//! use mqtt_outbound::transport::{ConnectRequest, MqttConnector, MqttPublisher};
//!
//! # tokio_test::block_on(async {
//! let request = ConnectRequest {
//!     server_uri: "tcp://localhost:1883".to_string(),
//!     client_id: "example".to_string(),
//!     persistence: SessionPersistence::Memory,
//!     options: None,
//! };
//!
//! let client = RumqttcConnector::new().connect(&request).await?;
//! client
//!     .publish("cats", bytes::Bytes::from_static(b"hello"), QualityOfService::AtMostOnce, false)
//!     .await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod client;
pub mod connection;
pub mod message_handler;

// Re-export public types for convenience
pub use client::{RumqttcClient, RumqttcConnector};
pub use connection::{
    configure_mqtt_options, parse_server_uri, ClientSettings, ConnectionState, MqttError,
    ServerAddress,
};
pub use message_handler::{EventRoute, MessageHandler};
