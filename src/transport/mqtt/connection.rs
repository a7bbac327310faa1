//! Pure connection configuration for the rumqttc client
//!
//! Turns a [`ConnectRequest`] into rumqttc options without touching the
//! network, so every mapping rule can be tested in isolation.

use crate::config::{has_text, ConnectOptions, Scheme, SessionPersistence};
use crate::transport::ConnectRequest;
use rumqttc::{LastWill, MqttOptions, Transport as RumqttcTransport};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Keep-alive used when the request does not specify one
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

/// How long to wait for CONNACK when the request does not specify it
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection state for the rumqttc client
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// CONNECT sent, waiting for the broker
    Connecting,
    /// CONNACK received, publishes are accepted
    Connected,
    /// Disconnected with reason
    Disconnected(String),
}

/// Errors raised by the MQTT client capability
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Publishing failed: {0}")]
    PublishFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Disconnect failed: {0}")]
    DisconnectFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Invalid server URI: {0}")]
    InvalidServerUri(String),
    #[error("Unsupported session persistence: {0:?}")]
    UnsupportedPersistence(SessionPersistence),
    #[error("Not connected - current state: {state:?}")]
    NotConnected { state: ConnectionState },
    /// One failure handed to every caller that waited on the same attempt
    #[error(transparent)]
    Shared(Arc<MqttError>),
}

impl MqttError {
    /// The underlying error, looking through any sharing
    pub fn root(&self) -> &MqttError {
        match self {
            MqttError::Shared(inner) => inner.root(),
            other => other,
        }
    }
}

/// rumqttc options plus the settings rumqttc does not hold itself
#[derive(Debug)]
pub struct ClientSettings {
    pub options: MqttOptions,
    pub connection_timeout: Duration,
}

/// Host, port and scheme extracted from a server URI
#[derive(Debug, Clone, PartialEq)]
pub struct ServerAddress {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

/// Parse `<scheme>://<host>:<port>`
pub fn parse_server_uri(server_uri: &str) -> Result<ServerAddress, MqttError> {
    let invalid = || MqttError::InvalidServerUri(server_uri.to_string());

    let url = Url::parse(server_uri).map_err(|_| invalid())?;
    let scheme = Scheme::parse(url.scheme()).map_err(|_| invalid())?;
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(invalid)?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let port = url.port().ok_or_else(invalid)?;

    Ok(ServerAddress { scheme, host, port })
}

/// Pure function to configure rumqttc options from a connect request
pub fn configure_mqtt_options(request: &ConnectRequest) -> Result<ClientSettings, MqttError> {
    // rumqttc keeps in-flight state in memory only
    if request.persistence != SessionPersistence::Memory {
        return Err(MqttError::UnsupportedPersistence(request.persistence.clone()));
    }

    let address = parse_server_uri(&request.server_uri)?;
    let mut mqtt_options = MqttOptions::new(&request.client_id, &address.host, address.port);

    if address.scheme == Scheme::Ssl {
        mqtt_options.set_transport(RumqttcTransport::tls_with_default_config());
    }

    mqtt_options.set_keep_alive(DEFAULT_KEEP_ALIVE);
    let mut connection_timeout = DEFAULT_CONNECTION_TIMEOUT;

    if let Some(options) = &request.options {
        apply_connect_options(&mut mqtt_options, options);
        if let Some(secs) = options.connection_timeout_secs {
            connection_timeout = Duration::from_secs(secs);
        }
    }

    Ok(ClientSettings {
        options: mqtt_options,
        connection_timeout,
    })
}

fn apply_connect_options(mqtt_options: &mut MqttOptions, options: &ConnectOptions) {
    if let Some(clean_session) = options.clean_session {
        mqtt_options.set_clean_session(clean_session);
    }

    let username = options.username.as_deref().filter(|u| has_text(u));
    let password = options
        .password
        .as_ref()
        .map(|p| p.expose())
        .filter(|p| has_text(p));
    if username.is_some() || password.is_some() {
        mqtt_options.set_credentials(username.unwrap_or_default(), password.unwrap_or_default());
    }

    if let Some(secs) = options.keep_alive_secs {
        mqtt_options.set_keep_alive(Duration::from_secs(secs));
    }

    if let Some(will) = &options.last_will {
        mqtt_options.set_last_will(LastWill::new(
            &will.topic,
            will.payload.as_bytes().to_vec(),
            will.qos.into(),
            will.retain,
        ));
    }
}
