//! Builds the single connected MQTT client for the process
//!
//! All configuration rules are checked in [`ConnectionBuilder::new`], before
//! anything touches the network. The connect itself happens on first use of
//! [`ConnectionBuilder::client`]. Callers that race for it wait on a single
//! attempt and all get its outcome, success or failure.

use crate::config::{ConfigError, ConnectOptions, ConnectionConfig, Scheme};
use crate::error::{AdapterError, AdapterResult};
use crate::mqtt_span;
use crate::transport::{ConnectRequest, MqttConnector, MqttError, MqttPublisher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{info, warn, Instrument};

/// MQTT v3 ceiling on client identifier length, enforced on generated ids
pub const MAX_CLIENT_ID_LENGTH: usize = 23;

/// How much of the user name goes into a generated client id
const USER_NAME_PREFIX_LENGTH: usize = 10;

/// Owns the connector and the lazily connected client
pub struct ConnectionBuilder<C: MqttConnector> {
    connector: C,
    request: ConnectRequest,
    client: OnceCell<Arc<C::Client>>,
    /// Held for the length of a connect attempt; keeps the last failure
    last_failure: Mutex<Option<Arc<MqttError>>>,
    failed_attempts: AtomicU64,
}

impl<C: MqttConnector> ConnectionBuilder<C> {
    /// Validate `config` and resolve the connect request. No network activity.
    pub fn new(config: &ConnectionConfig, connector: C) -> Result<Self, ConfigError> {
        let request = resolve_connect_request(config)?;
        if !connector.supports_persistence(&request.persistence) {
            return Err(ConfigError::UnsupportedPersistence(request.persistence));
        }

        Ok(Self {
            connector,
            request,
            client: OnceCell::new(),
            last_failure: Mutex::new(None),
            failed_attempts: AtomicU64::new(0),
        })
    }

    /// The resolved parameters the connector will be called with
    pub fn request(&self) -> &ConnectRequest {
        &self.request
    }

    /// The connected client, connecting on first call
    ///
    /// Callers that arrive while a connect is in flight wait for it and get
    /// its result, so one outage costs one attempt. A call made after a
    /// failed attempt has finished starts a new one. Nothing retries on its
    /// own.
    pub async fn client(&self) -> AdapterResult<Arc<C::Client>> {
        if let Some(client) = self.client.get() {
            return Ok(Arc::clone(client));
        }

        let failures_before = self.failed_attempts.load(Ordering::Acquire);
        let mut last_failure = self.last_failure.lock().await;

        if let Some(client) = self.client.get() {
            return Ok(Arc::clone(client));
        }
        // The attempt we waited on failed
        if self.failed_attempts.load(Ordering::Acquire) != failures_before {
            if let Some(error) = last_failure.as_ref() {
                return Err(AdapterError::Connection(MqttError::Shared(Arc::clone(error))));
            }
        }

        let span = mqtt_span!(
            operation = "connect",
            server_uri = %self.request.server_uri,
            client_id = %self.request.client_id
        );
        async {
            match self.connector.connect(&self.request).await {
                Ok(client) => {
                    let client = Arc::new(client);
                    // Only set under the attempt lock, after the cell was seen empty
                    let _ = self.client.set(Arc::clone(&client));
                    info!("MQTT client connected");
                    Ok(client)
                }
                Err(error) => {
                    warn!(error = %error, "MQTT connect failed");
                    let error = Arc::new(error);
                    *last_failure = Some(Arc::clone(&error));
                    self.failed_attempts.fetch_add(1, Ordering::Release);
                    Err(AdapterError::Connection(MqttError::Shared(error)))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// The client if it has already been connected
    pub fn get(&self) -> Option<Arc<C::Client>> {
        self.client.get().cloned()
    }

    /// Disconnect the client if one was built
    pub async fn shutdown(&self) -> AdapterResult<()> {
        match self.client.get() {
            Some(client) => client.disconnect().await.map_err(AdapterError::Connection),
            None => Ok(()),
        }
    }
}

/// Validate the config and turn it into a connect request
pub fn resolve_connect_request(config: &ConnectionConfig) -> Result<ConnectRequest, ConfigError> {
    config.validate()?;

    let scheme = Scheme::parse(&config.protocol)?;
    let port = config.port_number()?;
    let client_id = match &config.client_id {
        Some(client_id) => client_id.clone(),
        None => default_client_id()?,
    };

    Ok(ConnectRequest {
        server_uri: build_server_uri(scheme, config.use_ssl, &config.host, port),
        client_id,
        persistence: config.persistence.clone().unwrap_or_default(),
        options: derive_connect_options(config),
    })
}

/// `<scheme>://<host>:<port>`; `use_ssl` forces the ssl scheme
pub fn build_server_uri(scheme: Scheme, use_ssl: bool, host: &str, port: u16) -> String {
    let scheme = if use_ssl { Scheme::Ssl } else { scheme };
    let host = host.trim();
    if host.contains(':') && !host.starts_with('[') {
        format!("{scheme}://[{host}]:{port}")
    } else {
        format!("{scheme}://{host}:{port}")
    }
}

/// Options synthesized from clean-session / username / password when any is
/// given, otherwise the explicit options, otherwise none
pub fn derive_connect_options(config: &ConnectionConfig) -> Option<ConnectOptions> {
    if config.has_session_overrides() {
        Some(ConnectOptions {
            clean_session: config.clean_session,
            username: config.username.clone(),
            password: config.password.clone(),
            ..Default::default()
        })
    } else {
        config.connect_options.clone()
    }
}

/// Client id from the local user name and the current time
pub fn default_client_id() -> Result<String, ConfigError> {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_default();
    generate_client_id(&user, chrono::Utc::now().timestamp_millis())
}

/// First ten characters of `user` followed by `epoch_millis`
pub fn generate_client_id(user: &str, epoch_millis: i64) -> Result<String, ConfigError> {
    let prefix: String = user.chars().take(USER_NAME_PREFIX_LENGTH).collect();
    let client_id = format!("{prefix}{epoch_millis}");

    if client_id.chars().count() > MAX_CLIENT_ID_LENGTH {
        return Err(ConfigError::ClientIdTooLong {
            client_id,
            max: MAX_CLIENT_ID_LENGTH,
        });
    }
    Ok(client_id)
}
