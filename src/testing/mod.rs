//! Testing utilities and mock implementations
//!
//! Mock MQTT capability for exercising the adapter without a broker.

pub mod mocks;

pub use mocks::*;
