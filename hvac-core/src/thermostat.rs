//! Thermostat register model.
//!
//! `GET /read` returns a dump of 12 integer registers. Only a few of them
//! carry user-facing state:
//!
//! | index | meaning                              |
//! |-------|--------------------------------------|
//! | 0     | room temperature in tenths of a °C   |
//! | 2     | set-point temperature                |
//! | 3     | fan status                           |
//! | 4     | power state                          |
//! | 5     | system mode                          |
//! | 8     | set-point limits, packed             |
//!
//! Writes go to `PUT /set/{register}` with `{"value": n}`. The write
//! register numbers differ from the read indices, see [`RegisterWrite`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::ThermostatError;

/// Number of registers in a `/read` dump
pub const REGISTER_COUNT: usize = 12;

/// Write register for the set-point temperature
pub const SET_POINT_REGISTER: u16 = 3;
/// Write register for the fan status
pub const FAN_STATUS_REGISTER: u16 = 4;
/// Write register for the system mode
pub const SYSTEM_MODE_REGISTER: u16 = 6;
/// Write register for the packed set-point limits
pub const LIMITS_REGISTER: u16 = 9;

const LIMIT_MASK: i64 = 0x1f;

/// Split the packed limits register into `(lower, upper)`
pub fn decode_limits(raw: i64) -> (u8, u8) {
    ((raw & LIMIT_MASK) as u8, ((raw >> 8) & LIMIT_MASK) as u8)
}

/// Pack lower and upper limits into one register value
pub fn encode_limits(lower: u8, upper: u8) -> i64 {
    (i64::from(lower) & LIMIT_MASK) | ((i64::from(upper) & LIMIT_MASK) << 8)
}

/// Fan speed setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanStatus {
    Low,
    Mid,
    High,
    AutoLow,
    AutoMid,
    AutoHigh,
    AutoStop,
}

impl FanStatus {
    pub const ALL: [FanStatus; 7] = [
        FanStatus::Low,
        FanStatus::Mid,
        FanStatus::High,
        FanStatus::AutoLow,
        FanStatus::AutoMid,
        FanStatus::AutoHigh,
        FanStatus::AutoStop,
    ];

    /// Decode a register value. Unknown codes read as `AutoStop`.
    pub fn from_register(value: i64) -> Self {
        match value {
            1 => FanStatus::Low,
            2 => FanStatus::Mid,
            3 => FanStatus::High,
            4 => FanStatus::AutoLow,
            5 => FanStatus::AutoMid,
            6 => FanStatus::AutoHigh,
            _ => FanStatus::AutoStop,
        }
    }

    pub fn register_value(self) -> i64 {
        match self {
            FanStatus::Low => 1,
            FanStatus::Mid => 2,
            FanStatus::High => 3,
            FanStatus::AutoLow => 4,
            FanStatus::AutoMid => 5,
            FanStatus::AutoHigh => 6,
            FanStatus::AutoStop => 7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FanStatus::Low => "low",
            FanStatus::Mid => "mid",
            FanStatus::High => "high",
            FanStatus::AutoLow => "auto_low",
            FanStatus::AutoMid => "auto_mid",
            FanStatus::AutoHigh => "auto_high",
            FanStatus::AutoStop => "auto_stop",
        }
    }
}

impl fmt::Display for FanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FanStatus {
    type Err = ThermostatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ThermostatError::unknown("fan status", s))
    }
}

/// Heating/cooling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemMode {
    Cool,
    Heat,
    Ventilation,
    AutoCool,
    AutoHeat,
}

impl SystemMode {
    pub const ALL: [SystemMode; 5] = [
        SystemMode::Cool,
        SystemMode::Heat,
        SystemMode::Ventilation,
        SystemMode::AutoCool,
        SystemMode::AutoHeat,
    ];

    /// Decode a register value. Unknown codes read as `AutoCool`.
    pub fn from_register(value: i64) -> Self {
        match value {
            1 => SystemMode::Cool,
            2 => SystemMode::Heat,
            3 => SystemMode::Ventilation,
            5 => SystemMode::AutoHeat,
            _ => SystemMode::AutoCool,
        }
    }

    pub fn register_value(self) -> i64 {
        match self {
            SystemMode::Cool => 1,
            SystemMode::Heat => 2,
            SystemMode::Ventilation => 3,
            SystemMode::AutoCool => 4,
            SystemMode::AutoHeat => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SystemMode::Cool => "cool",
            SystemMode::Heat => "heat",
            SystemMode::Ventilation => "ventilation",
            SystemMode::AutoCool => "auto_cool",
            SystemMode::AutoHeat => "auto_heat",
        }
    }
}

impl fmt::Display for SystemMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemMode {
    type Err = ThermostatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ThermostatError::unknown("system mode", s))
    }
}

/// Power state. Read-only: there is no write register for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerOn {
    Off,
    On,
    Previous,
}

impl PowerOn {
    /// Decode a register value. Unknown codes read as `Previous`.
    pub fn from_register(value: i64) -> Self {
        match value {
            0 => PowerOn::Off,
            1 => PowerOn::On,
            _ => PowerOn::Previous,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PowerOn::Off => "off",
            PowerOn::On => "on",
            PowerOn::Previous => "previous",
        }
    }
}

impl fmt::Display for PowerOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A register as an integer; integral floats such as `5.0` are accepted
fn register_int(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() <= i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Decoded thermostat state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermostatData {
    /// Room temperature in °C
    pub temperature: f64,
    pub set_point_temp: i64,
    pub fan_status: FanStatus,
    pub power_on: PowerOn,
    pub system_mode: SystemMode,
    pub set_point_lower_limit: u8,
    pub set_point_upper_limit: u8,
}

impl ThermostatData {
    /// Decode a register dump. Missing (null) registers take the value the
    /// device reports after a reset.
    pub fn from_registers(registers: &[Option<i64>]) -> Result<Self, ThermostatError> {
        if registers.len() != REGISTER_COUNT {
            return Err(ThermostatError::InvalidLength {
                expected: REGISTER_COUNT,
                actual: registers.len(),
            });
        }

        let (lower, upper) = decode_limits(registers[8].unwrap_or(0));
        Ok(Self {
            temperature: registers[0].unwrap_or(0) as f64 / 10.0,
            set_point_temp: registers[2].unwrap_or(0),
            fan_status: FanStatus::from_register(registers[3].unwrap_or(1)),
            power_on: PowerOn::from_register(registers[4].unwrap_or(0)),
            system_mode: SystemMode::from_register(registers[5].unwrap_or(1)),
            set_point_lower_limit: lower,
            set_point_upper_limit: upper,
        })
    }

    /// Decode the JSON body of `GET /read`
    pub fn from_json(body: &Value) -> Result<Self, ThermostatError> {
        match body {
            Value::Null => Err(ThermostatError::EmptyResponse),
            Value::Array(items) => {
                let registers: Vec<Option<i64>> = items.iter().map(register_int).collect();
                let mut data = Self::from_registers(&registers)?;
                // The temperature keeps any fractional tenths the device sends.
                data.temperature = items[0].as_f64().unwrap_or(0.0) / 10.0;
                Ok(data)
            }
            other => Err(ThermostatError::UnexpectedFormat(format!(
                "expected a register array, got {}",
                other
            ))),
        }
    }
}

/// The subset of state a user can change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditableSettings {
    pub set_point_temp: i64,
    pub system_mode: SystemMode,
    pub fan_status: FanStatus,
    pub set_point_lower_limit: u8,
    pub set_point_upper_limit: u8,
}

impl From<&ThermostatData> for EditableSettings {
    fn from(data: &ThermostatData) -> Self {
        Self {
            set_point_temp: data.set_point_temp,
            system_mode: data.system_mode,
            fan_status: data.fan_status,
            set_point_lower_limit: data.set_point_lower_limit,
            set_point_upper_limit: data.set_point_upper_limit,
        }
    }
}

impl EditableSettings {
    /// Register writes needed to move `current` to these settings, in the
    /// order they must be sent: set-point, fan, mode, limits.
    pub fn changes_from(&self, current: &ThermostatData) -> Vec<RegisterWrite> {
        let mut writes = Vec::new();

        if self.set_point_temp != current.set_point_temp {
            writes.push(RegisterWrite {
                register: SET_POINT_REGISTER,
                value: self.set_point_temp,
                parameter: "setPointTemp",
            });
        }
        if self.fan_status != current.fan_status {
            writes.push(RegisterWrite {
                register: FAN_STATUS_REGISTER,
                value: self.fan_status.register_value(),
                parameter: "fanStatus",
            });
        }
        if self.system_mode != current.system_mode {
            writes.push(RegisterWrite {
                register: SYSTEM_MODE_REGISTER,
                value: self.system_mode.register_value(),
                parameter: "systemMode",
            });
        }
        if self.set_point_lower_limit != current.set_point_lower_limit
            || self.set_point_upper_limit != current.set_point_upper_limit
        {
            writes.push(RegisterWrite {
                register: LIMITS_REGISTER,
                value: encode_limits(self.set_point_lower_limit, self.set_point_upper_limit),
                parameter: "setPointLimits",
            });
        }

        writes
    }
}

/// One `PUT /set/{register}` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    pub register: u16,
    pub value: i64,
    /// Name of the setting, used in error messages
    pub parameter: &'static str,
}

impl RegisterWrite {
    /// Device path for this write
    pub fn path(&self) -> String {
        format!("/set/{}", self.register)
    }

    /// Request body for this write
    pub fn body(&self) -> Value {
        serde_json::json!({ "value": self.value })
    }
}

/// Device identity from `GET /info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThermostatInfo {
    pub serial_number: String,
}

impl ThermostatInfo {
    /// Placeholder shown when the device cannot be reached
    pub fn unknown() -> Self {
        Self {
            serial_number: "Unknown".to_string(),
        }
    }
}
