// HVAC Core Library
//
// Thermostat register model, error types and the retry helper shared by the
// client adapter and the CLI.

pub mod error;
pub mod retry;
pub mod thermostat;

pub use error::ThermostatError;
pub use retry::{retry, retry_with_delay, RETRY_DELAY};
pub use thermostat::{
    EditableSettings, FanStatus, PowerOn, RegisterWrite, SystemMode, ThermostatData,
    ThermostatInfo,
};
