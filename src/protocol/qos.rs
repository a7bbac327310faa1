//! MQTT quality-of-service levels
//!
//! The ordinal of each level is what goes on the wire, so the mapping is
//! spelled out explicitly rather than derived from declaration order.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Delivery guarantee requested for a published message
///
/// # Examples
/// ```
/// use mqtt_outbound::protocol::QualityOfService;
///
/// let qos: QualityOfService = "AT_LEAST_ONCE".parse().unwrap();
/// assert_eq!(qos.level(), 1);
/// assert_eq!(QualityOfService::default(), QualityOfService::AtMostOnce);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "QosRepr", into = "String")]
pub enum QualityOfService {
    /// Fire and forget
    #[default]
    AtMostOnce = 0,
    /// Acknowledged delivery, may duplicate
    AtLeastOnce = 1,
    /// Four-way handshake, delivered once
    ExactlyOnce = 2,
}

impl QualityOfService {
    /// Wire ordinal (0, 1 or 2)
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Canonical configuration name
    pub fn as_str(self) -> &'static str {
        match self {
            QualityOfService::AtMostOnce => "AT_MOST_ONCE",
            QualityOfService::AtLeastOnce => "AT_LEAST_ONCE",
            QualityOfService::ExactlyOnce => "EXACTLY_ONCE",
        }
    }
}

impl TryFrom<u8> for QualityOfService {
    type Error = ConfigError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(QualityOfService::AtMostOnce),
            1 => Ok(QualityOfService::AtLeastOnce),
            2 => Ok(QualityOfService::ExactlyOnce),
            other => Err(ConfigError::InvalidQos(other.to_string())),
        }
    }
}

impl FromStr for QualityOfService {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "AT_MOST_ONCE" | "0" => Ok(QualityOfService::AtMostOnce),
            "AT_LEAST_ONCE" | "1" => Ok(QualityOfService::AtLeastOnce),
            "EXACTLY_ONCE" | "2" => Ok(QualityOfService::ExactlyOnce),
            _ => Err(ConfigError::InvalidQos(s.to_string())),
        }
    }
}

impl fmt::Display for QualityOfService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<QualityOfService> for String {
    fn from(qos: QualityOfService) -> Self {
        qos.as_str().to_string()
    }
}

impl From<QualityOfService> for rumqttc::QoS {
    fn from(qos: QualityOfService) -> Self {
        match qos {
            QualityOfService::AtMostOnce => rumqttc::QoS::AtMostOnce,
            QualityOfService::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
            QualityOfService::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
        }
    }
}

/// Configuration accepts either a level name or the numeric ordinal
#[derive(Deserialize)]
#[serde(untagged)]
enum QosRepr {
    Level(i64),
    Name(String),
}

impl TryFrom<QosRepr> for QualityOfService {
    type Error = ConfigError;

    fn try_from(repr: QosRepr) -> Result<Self, Self::Error> {
        match repr {
            QosRepr::Level(level) => u8::try_from(level)
                .map_err(|_| ConfigError::InvalidQos(level.to_string()))
                .and_then(QualityOfService::try_from),
            QosRepr::Name(name) => name.parse(),
        }
    }
}
