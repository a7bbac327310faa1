//! Outbound MQTT adapter
//!
//! [`ConnectionBuilder`] turns static connection settings into one shared,
//! connected client. [`PublishAdapter`] turns each outbound message into a
//! single publish on that client.

pub mod connection_builder;
pub mod publish_adapter;

pub use connection_builder::{
    build_server_uri, default_client_id, derive_connect_options, generate_client_id,
    resolve_connect_request, ConnectionBuilder, MAX_CLIENT_ID_LENGTH,
};
pub use publish_adapter::PublishAdapter;
