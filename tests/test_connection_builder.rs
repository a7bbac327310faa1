//! Connection builder behavior against the mock connector
//!
//! Covers eager validation, server address resolution and the
//! connect-at-most-once guarantee under concurrent first use, including
//! when the broker is down.

use mqtt_outbound::adapter::{ConnectionBuilder, MAX_CLIENT_ID_LENGTH};
use mqtt_outbound::config::{ConfigError, ConnectOptions, ConnectionConfig};
use mqtt_outbound::error::AdapterError;
use mqtt_outbound::testing::MockConnector;
use mqtt_outbound::transport::MqttError;
use std::sync::Arc;
use std::time::Duration;

fn config() -> ConnectionConfig {
    ConnectionConfig::new("m2m.eclipse.org")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_calls_connect_once() {
    let connector = MockConnector::with_connect_delay(Duration::from_millis(50));
    let builder = Arc::new(ConnectionBuilder::new(&config(), connector.clone()).unwrap());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let builder = Arc::clone(&builder);
            tokio::spawn(async move { builder.client().await })
        })
        .collect();

    let clients: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(connector.connect_count(), 1);
    for client in &clients[1..] {
        assert!(Arc::ptr_eq(&clients[0], client));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_calls_share_one_failure() {
    let mut connector = MockConnector::with_connect_failure();
    connector.connect_delay = Some(Duration::from_millis(50));
    let builder = Arc::new(ConnectionBuilder::new(&config(), connector.clone()).unwrap());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let builder = Arc::clone(&builder);
            tokio::spawn(async move { builder.client().await })
        })
        .collect();

    for joined in futures::future::join_all(handles).await {
        match joined.unwrap() {
            Err(AdapterError::Connection(e)) => {
                assert!(matches!(e.root(), MqttError::ConnectionFailed(_)), "{e}")
            }
            Err(e) => panic!("unexpected error {e}"),
            Ok(_) => panic!("connect should fail"),
        }
    }
    assert_eq!(connector.connect_count(), 1);
    assert!(builder.get().is_none());

    // Once the shared attempt is over, the next call tries again
    assert!(builder.client().await.is_err());
    assert_eq!(connector.connect_count(), 2);
}

#[tokio::test]
async fn test_concurrent_failures_on_one_task() {
    let mut connector = MockConnector::with_connect_failure();
    connector.connect_delay = Some(Duration::from_millis(20));
    let builder = ConnectionBuilder::new(&config(), connector.clone()).unwrap();

    let (a, b, c) = tokio::join!(builder.client(), builder.client(), builder.client());

    assert!(a.is_err() && b.is_err() && c.is_err());
    assert_eq!(connector.connect_count(), 1);
}

#[tokio::test]
async fn test_concurrent_first_calls_on_one_task() {
    let connector = MockConnector::with_connect_delay(Duration::from_millis(20));
    let builder = ConnectionBuilder::new(&config(), connector.clone()).unwrap();

    let (a, b, c) = tokio::join!(builder.client(), builder.client(), builder.client());
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

    assert_eq!(connector.connect_count(), 1);
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&b, &c));
}

#[tokio::test]
async fn test_failed_connect_is_not_cached() {
    let connector = MockConnector::with_connect_failure();
    let builder = ConnectionBuilder::new(&config(), connector.clone()).unwrap();

    assert!(matches!(
        builder.client().await,
        Err(AdapterError::Connection(_))
    ));
    assert!(matches!(
        builder.client().await,
        Err(AdapterError::Connection(_))
    ));

    // Each call is a fresh attempt; the builder never retries on its own
    assert_eq!(connector.connect_count(), 2);
}

#[test]
fn test_use_ssl_overrides_protocol() {
    for protocol in ["tcp", "TCP", "ssl", "tcp://"] {
        let builder = ConnectionBuilder::new(
            &ConnectionConfig {
                protocol: protocol.to_string(),
                use_ssl: true,
                port: 8883,
                ..config()
            },
            MockConnector::new(),
        )
        .unwrap();
        assert_eq!(builder.request().server_uri, "ssl://m2m.eclipse.org:8883");
    }
}

#[test]
fn test_generated_client_id_is_within_limit() {
    let builder = ConnectionBuilder::new(&config(), MockConnector::new()).unwrap();
    let client_id = &builder.request().client_id;
    assert!(!client_id.is_empty());
    assert!(client_id.chars().count() <= MAX_CLIENT_ID_LENGTH);
}

#[test]
fn test_validation_happens_before_connect() {
    let cases: Vec<(ConnectionConfig, fn(&ConfigError) -> bool)> = vec![
        (
            ConnectionConfig {
                port: 0,
                ..config()
            },
            |e| matches!(e, ConfigError::InvalidPort(0)),
        ),
        (
            ConnectionConfig {
                port: -1,
                ..config()
            },
            |e| matches!(e, ConfigError::InvalidPort(-1)),
        ),
        (
            ConnectionConfig {
                protocol: "mqtt".to_string(),
                ..config()
            },
            |e| matches!(e, ConfigError::InvalidProtocol(_)),
        ),
        (
            ConnectionConfig {
                host: " ".to_string(),
                ..config()
            },
            |e| matches!(e, ConfigError::MissingHost),
        ),
        (
            ConnectionConfig {
                client_id: Some(String::new()),
                ..config()
            },
            |e| matches!(e, ConfigError::MissingClientId),
        ),
        (
            ConnectionConfig {
                clean_session: Some(true),
                connect_options: Some(ConnectOptions::default()),
                ..config()
            },
            |e| matches!(e, ConfigError::ConflictingConnectOptions),
        ),
    ];

    for (config, expected) in cases {
        let connector = MockConnector::new();
        match ConnectionBuilder::new(&config, connector.clone()) {
            Err(e) => assert!(expected(&e), "unexpected error {e:?}"),
            Ok(_) => panic!("config should be rejected: {config:?}"),
        }
        assert_eq!(connector.connect_count(), 0);
    }
}

#[test]
fn test_blank_credentials_do_not_synthesize_options() {
    let builder = ConnectionBuilder::new(
        &ConnectionConfig {
            username: Some("   ".to_string()),
            connect_options: Some(ConnectOptions {
                keep_alive_secs: Some(5),
                ..Default::default()
            }),
            ..config()
        },
        MockConnector::new(),
    )
    .unwrap();

    let options = builder.request().options.as_ref().unwrap();
    assert_eq!(options.keep_alive_secs, Some(5));
    assert_eq!(options.username, None);
}
