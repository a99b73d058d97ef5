use hvac_core::ThermostatError;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by [`ThermostatClient`](crate::ThermostatClient)
#[derive(Error, Debug)]
pub enum ClientError {
    /// The device could not be read; details are logged, not returned
    #[error("Device is offline")]
    Offline,

    /// The proxy answered with a non-success status
    #[error("Server returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Decode(#[from] ThermostatError),

    /// A register write kept failing after all retries
    #[error("Failed to update thermostat {parameter} settings: {message}")]
    WriteFailed {
        parameter: &'static str,
        message: String,
    },
}

impl ClientError {
    /// Build a status error from a failed response
    pub(crate) fn status(status: StatusCode) -> Self {
        Self::Status {
            status,
            message: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }
}
