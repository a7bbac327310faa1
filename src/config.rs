//! Configuration for the outbound MQTT adapter
//!
//! Two sections: `[connection]` describes how to reach and authenticate with
//! the broker, `[publish]` describes where and how messages are published.
//! Both are plain data; the adapter components validate them before any
//! network activity.

use crate::protocol::{validate_publish_topic, QualityOfService, TopicError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default MQTT port for plain TCP
pub const DEFAULT_PORT: i64 = 1883;

/// Complete adapter configuration as loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdapterConfig {
    pub connection: ConnectionConfig,
    pub publish: PublishPolicy,
}

/// Broker connection parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionConfig {
    /// Broker host name or address
    pub host: String,
    /// Broker port (must be positive)
    #[serde(default = "default_port")]
    pub port: i64,
    /// Transport scheme: `tcp` or `ssl`
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Forces the `ssl` scheme regardless of `protocol`
    #[serde(default)]
    pub use_ssl: bool,
    /// Client identifier; generated from the user name and clock when absent
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<Secret>,
    /// Environment variable holding the password, read at load time when
    /// `password` is not set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
    /// Where in-flight session state is kept; in memory when absent
    #[serde(default)]
    pub persistence: Option<SessionPersistence>,
    /// Explicit connect options; mutually exclusive with
    /// `clean_session` / `username` / `password`
    #[serde(default)]
    pub connect_options: Option<ConnectOptions>,
    #[serde(default)]
    pub clean_session: Option<bool>,
}

fn default_port() -> i64 {
    DEFAULT_PORT
}

fn default_protocol() -> String {
    Scheme::Tcp.as_str().to_string()
}

impl ConnectionConfig {
    /// Connection to `host` with every other setting at its default
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            protocol: default_protocol(),
            use_ssl: false,
            client_id: None,
            username: None,
            password: None,
            password_env: None,
            persistence: None,
            connect_options: None,
            clean_session: None,
        }
    }

    /// Connection to `host:port` authenticated with the given credentials
    pub fn with_credentials(
        host: impl Into<String>,
        port: i64,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            port,
            username: Some(username.into()),
            password: Some(Secret::new(password)),
            ..Self::new(host)
        }
    }

    /// True when any of clean-session / username / password is given
    pub fn has_session_overrides(&self) -> bool {
        self.clean_session.is_some()
            || self.username.as_deref().is_some_and(has_text)
            || self.password.as_ref().is_some_and(|p| has_text(p.expose()))
    }

    /// Check the static rules, in order: scheme, client id, host, port and
    /// connect-options exclusivity
    pub fn validate(&self) -> Result<(), ConfigError> {
        Scheme::parse(&self.protocol)?;

        if let Some(client_id) = &self.client_id {
            if !has_text(client_id) {
                return Err(ConfigError::MissingClientId);
            }
        }

        if !has_text(&self.host) {
            return Err(ConfigError::MissingHost);
        }

        self.port_number()?;

        if self.connect_options.is_some() && self.has_session_overrides() {
            return Err(ConfigError::ConflictingConnectOptions);
        }

        Ok(())
    }

    /// Port as a TCP port number
    pub fn port_number(&self) -> Result<u16, ConfigError> {
        if self.port <= 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        u16::try_from(self.port).map_err(|_| ConfigError::InvalidPort(self.port))
    }
}

/// Transport scheme of the broker address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Plain TCP
    Tcp,
    /// TLS over TCP
    Ssl,
}

impl Scheme {
    /// Parse a configured scheme; accepts `tcp`/`ssl` in any case, with or
    /// without a trailing `://`
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let trimmed = value.trim();
        let name = trimmed.strip_suffix("://").unwrap_or(trimmed);
        if name.eq_ignore_ascii_case("tcp") {
            Ok(Scheme::Tcp)
        } else if name.eq_ignore_ascii_case("ssl") {
            Ok(Scheme::Ssl)
        } else {
            Err(ConfigError::InvalidProtocol(value.to_string()))
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Tcp => "tcp",
            Scheme::Ssl => "ssl",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a client keeps in-flight session state
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionPersistence {
    /// Non-durable, lost on restart
    #[default]
    Memory,
    /// Durable, kept under the given directory
    Directory(PathBuf),
}

/// Options applied to the CONNECT handshake
///
/// Fields left as `None` fall back to the client library defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConnectOptions {
    #[serde(default)]
    pub clean_session: Option<bool>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<Secret>,
    /// Keep-alive interval in seconds
    #[serde(default)]
    pub keep_alive_secs: Option<u64>,
    /// How long to wait for the broker's CONNACK, in seconds
    #[serde(default)]
    pub connection_timeout_secs: Option<u64>,
    #[serde(default)]
    pub last_will: Option<LastWill>,
}

/// Message the broker publishes on our behalf if the connection drops
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LastWill {
    pub topic: String,
    pub payload: String,
    #[serde(default)]
    pub qos: QualityOfService,
    #[serde(default)]
    pub retain: bool,
}

/// Static publish settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishPolicy {
    /// Topic used unless a message carries a topic override header
    pub topic: String,
    #[serde(default)]
    pub qos: QualityOfService,
    #[serde(default)]
    pub retain: bool,
}

impl PublishPolicy {
    /// Policy publishing to `topic` at the lowest QoS without retain
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            qos: QualityOfService::default(),
            retain: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !has_text(&self.topic) {
            return Err(ConfigError::MissingTopic);
        }
        validate_publish_topic(&self.topic).map_err(|reason| ConfigError::InvalidTopic {
            topic: self.topic.clone(),
            reason,
        })
    }
}

/// A credential that never shows up in logs or debug output
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, for handing to the client library only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

// Serialized form is redacted; configs printed back out never carry the password
impl Serialize for Secret {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid protocol '{0}': must be either 'tcp' or 'ssl'")]
    InvalidProtocol(String),
    #[error("Invalid client_id: must be non-empty")]
    MissingClientId,
    #[error("Generated client_id '{client_id}' exceeds {max} characters")]
    ClientIdTooLong { client_id: String, max: usize },
    #[error("Invalid host: must be non-empty")]
    MissingHost,
    #[error("Invalid port {0}: must be a positive integer no greater than 65535")]
    InvalidPort(i64),
    #[error(
        "Invalid connect options: specify either connect_options or any of \
         clean_session/username/password, but not both"
    )]
    ConflictingConnectOptions,
    #[error("Invalid topic: must be non-empty")]
    MissingTopic,
    #[error("Invalid topic '{topic}': {reason}")]
    InvalidTopic { topic: String, reason: TopicError },
    #[error("Unsupported session persistence {0:?}: the MQTT client keeps session state in memory only")]
    UnsupportedPersistence(SessionPersistence),
    #[error("Invalid quality of service '{0}': expected AT_MOST_ONCE, AT_LEAST_ONCE or EXACTLY_ONCE (0, 1 or 2)")]
    InvalidQos(String),
}

impl AdapterConfig {
    /// Load configuration from a TOML file, resolve the password environment
    /// variable and validate both sections
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: AdapterConfig = toml::from_str(content)?;

        config.resolve_env_vars()?;
        config.connection.validate()?;
        config.publish.validate()?;

        Ok(config)
    }

    fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        if self.connection.password.is_none() {
            if let Some(env_name) = &self.connection.password_env {
                let password = std::env::var(env_name)
                    .map_err(|_| ConfigError::EnvVarNotFound(env_name.clone()))?;
                self.connection.password = Some(Secret::new(password));
            }
        }
        Ok(())
    }
}

/// A string has text when it contains something other than whitespace
pub(crate) fn has_text(value: &str) -> bool {
    !value.trim().is_empty()
}
