//! Configuration loading and validation tests
//!
//! Tests focus on BEHAVIOR of configuration loading, validation, and error handling.

use mqtt_outbound::config::{AdapterConfig, ConfigError, SessionPersistence};
use mqtt_outbound::protocol::QualityOfService;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "{content}").unwrap();
    temp_file
}

#[test]
fn test_config_loads_successfully_from_valid_toml() {
    let temp_file = write_config(
        r#"
[connection]
host = "m2m.eclipse.org"
port = 8883
protocol = "ssl"
client_id = "sensor-7"

[publish]
topic = "cats"
qos = "AT_LEAST_ONCE"
retain = true
"#,
    );

    let config = AdapterConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.connection.host, "m2m.eclipse.org");
    assert_eq!(config.connection.port, 8883);
    assert_eq!(config.connection.protocol, "ssl");
    assert_eq!(config.connection.client_id.as_deref(), Some("sensor-7"));
    assert_eq!(config.publish.topic, "cats");
    assert_eq!(config.publish.qos, QualityOfService::AtLeastOnce);
    assert!(config.publish.retain);
}

#[test]
fn test_config_defaults() {
    let temp_file = write_config(
        r#"
[connection]
host = "localhost"

[publish]
topic = "cats"
"#,
    );

    let config = AdapterConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.connection.port, 1883);
    assert_eq!(config.connection.protocol, "tcp");
    assert!(!config.connection.use_ssl);
    assert_eq!(config.connection.client_id, None);
    assert_eq!(config.connection.persistence, None);
    assert_eq!(config.publish.qos, QualityOfService::AtMostOnce);
    assert!(!config.publish.retain);
}

#[test]
fn test_numeric_qos_and_directory_persistence() {
    let temp_file = write_config(
        r#"
[connection]
host = "localhost"
persistence = { directory = "/var/lib/mqtt-outbound" }

[publish]
topic = "cats"
qos = 2
"#,
    );

    let config = AdapterConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.publish.qos, QualityOfService::ExactlyOnce);
    assert_eq!(
        config.connection.persistence,
        Some(SessionPersistence::Directory(PathBuf::from(
            "/var/lib/mqtt-outbound"
        )))
    );
}

#[test]
fn test_unknown_qos_is_rejected() {
    for qos in ["3", "-1", "\"SOMETIMES\""] {
        let temp_file = write_config(&format!(
            "[connection]\nhost = \"localhost\"\n\n[publish]\ntopic = \"cats\"\nqos = {qos}\n"
        ));
        assert!(
            AdapterConfig::load_from_file(temp_file.path()).is_err(),
            "qos {qos} should be rejected"
        );
    }
}

#[test]
fn test_missing_topic_is_rejected() {
    let temp_file = write_config(
        r#"
[connection]
host = "localhost"

[publish]
qos = 1
"#,
    );

    let result = AdapterConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_blank_topic_is_rejected() {
    let temp_file = write_config(
        r#"
[connection]
host = "localhost"

[publish]
topic = "  "
"#,
    );

    let result = AdapterConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::MissingTopic)));
}

#[test]
fn test_invalid_ports_are_rejected() {
    for port in [0, -1, 65536] {
        let temp_file = write_config(&format!(
            "[connection]\nhost = \"localhost\"\nport = {port}\n\n[publish]\ntopic = \"cats\"\n"
        ));

        match AdapterConfig::load_from_file(temp_file.path()) {
            Err(ConfigError::InvalidPort(p)) => {
                assert_eq!(p, port);
                assert!(ConfigError::InvalidPort(p).to_string().contains(&port.to_string()));
            }
            other => panic!("port {port}: unexpected result {other:?}"),
        }
    }
}

#[test]
fn test_unknown_protocol_is_rejected() {
    let temp_file = write_config(
        r#"
[connection]
host = "localhost"
protocol = "ws"

[publish]
topic = "cats"
"#,
    );

    let result = AdapterConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::InvalidProtocol(p)) if p == "ws"));
}

#[test]
fn test_connect_options_conflict_with_credentials() {
    let temp_file = write_config(
        r#"
[connection]
host = "localhost"
username = "andy"

[connection.connect_options]
keep_alive_secs = 10

[publish]
topic = "cats"
"#,
    );

    let result = AdapterConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::ConflictingConnectOptions)));
}

#[test]
fn test_password_from_environment() {
    std::env::set_var("MQTT_OUTBOUND_TEST_PASSWORD", "s3cret");
    let temp_file = write_config(
        r#"
[connection]
host = "localhost"
username = "andy"
password_env = "MQTT_OUTBOUND_TEST_PASSWORD"

[publish]
topic = "cats"
"#,
    );

    let config = AdapterConfig::load_from_file(temp_file.path()).unwrap();
    let password = config.connection.password.as_ref().unwrap();
    assert_eq!(password.expose(), "s3cret");

    // Never printed
    assert!(!format!("{config:?}").contains("s3cret"));
    assert!(!toml::to_string(&config).unwrap().contains("s3cret"));
}

#[test]
fn test_missing_password_env_var() {
    let temp_file = write_config(
        r#"
[connection]
host = "localhost"
password_env = "MQTT_OUTBOUND_TEST_UNSET_VARIABLE"

[publish]
topic = "cats"
"#,
    );

    let result = AdapterConfig::load_from_file(temp_file.path());
    assert!(
        matches!(result, Err(ConfigError::EnvVarNotFound(name)) if name == "MQTT_OUTBOUND_TEST_UNSET_VARIABLE")
    );
}

#[test]
fn test_config_file_not_found() {
    let result = AdapterConfig::load_from_file(Path::new("/nonexistent/mqtt-outbound.toml"));
    assert!(matches!(result, Err(ConfigError::FileRead(_))));
}

#[test]
fn test_malformed_toml() {
    let temp_file = write_config("[connection\nhost = ");
    let result = AdapterConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}
