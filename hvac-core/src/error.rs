//! Error types for the thermostat model
//!
//! Decoding a register dump or parsing a setting name can fail; everything
//! else in this crate is infallible.
//!
//! ```rust,ignore
//! use hvac_core::{ThermostatData, ThermostatError};
//!
//! match ThermostatData::from_json(&body) {
//!     Err(ThermostatError::InvalidLength { actual, .. }) => { /* ... */ }
//!     _ => {}
//! }
//! ```

use thiserror::Error;

/// Errors that can occur while interpreting thermostat data
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThermostatError {
    /// The device answered with nothing
    #[error("No data received from thermostat")]
    EmptyResponse,

    /// The register dump has the wrong number of entries
    #[error("Invalid data length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// The payload is not shaped like a register dump
    #[error("Unexpected response format: {0}")]
    UnexpectedFormat(String),

    /// A setting name that maps to no register value
    #[error("Unknown {kind} '{value}'")]
    UnknownValue { kind: &'static str, value: String },
}

impl ThermostatError {
    /// Create an unknown-value error
    pub fn unknown(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownValue {
            kind,
            value: value.into(),
        }
    }
}
