//! Message, quality-of-service and topic types shared by the adapter and transport

pub mod messages;
pub mod qos;
pub mod topics;

pub use messages::*;
pub use qos::QualityOfService;
pub use topics::{validate_publish_topic, TopicError};
