//! Publish topic validation
//!
//! MQTT 3.1.1 forbids wildcards and NUL in topic names used for PUBLISH, and
//! requires at least one character. A broker that receives such a PUBLISH
//! closes the session, so topics are checked before they reach the wire.

use thiserror::Error;

/// Longest topic a UTF-8 encoded MQTT string can carry, in bytes
pub const MAX_TOPIC_LENGTH: usize = 65_535;

pub fn validate_publish_topic(topic: &str) -> Result<(), TopicError> {
    if topic.is_empty() {
        return Err(TopicError::Empty);
    }

    if topic.len() > MAX_TOPIC_LENGTH {
        return Err(TopicError::TooLong(topic.len()));
    }

    for ch in topic.chars() {
        match ch {
            '+' | '#' => return Err(TopicError::Wildcard(ch)),
            '\0' => return Err(TopicError::NulCharacter),
            _ => {}
        }
    }

    Ok(())
}

/// Why a topic cannot be published to
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopicError {
    #[error("Topic cannot be empty")]
    Empty,
    #[error("Topic contains wildcard '{0}', which is only allowed in subscriptions")]
    Wildcard(char),
    #[error("Topic contains a NUL character")]
    NulCharacter,
    #[error("Topic is {0} bytes, longer than {MAX_TOPIC_LENGTH}")]
    TooLong(usize),
}
