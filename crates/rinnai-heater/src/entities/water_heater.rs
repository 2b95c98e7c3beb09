//! Water heater control surface.
//!
//! The device has no "set temperature" endpoint. A new target is reached by
//! pressing `inc`/`dec` once per row of the discrete temperature table.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use tracing::{debug, error};

use super::{now, EntityKind, EntityOptions, EntitySnapshot, EntityValue};
use crate::error::{HeaterError, HeaterResult};
use crate::fields::{nearest_temperature_index, DeviceClass, TEMPERATURES};
use crate::heater::{Command, RinnaiHeater};
use crate::state::DeviceIdentity;

pub const MIN_TEMP: f64 = 35.0;
pub const MAX_TEMP: f64 = 60.0;
pub const PRECISION_WHOLE: f64 = 1.0;
pub const TEMPERATURE_UNIT: &str = "°C";

/// Status code the device reports while switched off.
const STATUS_OFF: &str = "11";

/// Operation modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Gas,
    Off,
}

impl Operation {
    pub const ALL: [Operation; 2] = [Operation::Gas, Operation::Off];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gas => "gas",
            Self::Off => "off",
        }
    }
}

impl FromStr for Operation {
    type Err = HeaterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gas" => Ok(Self::Gas),
            "off" => Ok(Self::Off),
            other => Err(HeaterError::UnsupportedOperation(format!(
                "operation mode '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed number of table rows between the current target row and the row
/// nearest to `target_celsius`. Positive means `inc`.
pub fn plan_steps(current_index: usize, target_celsius: f64) -> i64 {
    let target_index = nearest_temperature_index(target_celsius * 100.0);
    target_index as i64 - current_index as i64
}

#[derive(Debug, Clone)]
pub struct WaterHeaterEntity {
    heater: RinnaiHeater,
    unique_id: String,
    name: String,
    options: EntityOptions,
}

impl WaterHeaterEntity {
    pub fn new(heater: RinnaiHeater, identity: &DeviceIdentity) -> Self {
        let name = heater.name().to_string();
        Self {
            heater,
            unique_id: format!("{}_{}", identity.serial_number, identity.mac_address),
            name,
            options: EntityOptions {
                device_class: Some(DeviceClass::Temperature),
                unit: Some(TEMPERATURE_UNIT),
                ..EntityOptions::default()
            },
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &EntityOptions {
        &self.options
    }

    pub fn heater(&self) -> &RinnaiHeater {
        &self.heater
    }

    pub fn available(&self) -> bool {
        self.heater.with_state(|s| s.contains("status"))
    }

    /// Outlet water temperature in °C.
    pub fn current_temperature(&self) -> Option<f64> {
        self.heater
            .get("water_outlet_temperature")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .map(|v| v / 100.0)
    }

    /// Row of the temperature table the device is set to.
    pub fn target_index(&self) -> HeaterResult<Option<usize>> {
        let Some(code) = self.heater.get("target_temperature_raw") else {
            return Ok(None);
        };
        TEMPERATURES
            .iter()
            .position(|(c, _)| *c == code.trim())
            .map(Some)
            .ok_or(HeaterError::UnknownTemperature(code))
    }

    /// Target temperature in °C.
    pub fn target_temperature(&self) -> HeaterResult<Option<f64>> {
        Ok(self
            .target_index()?
            .map(|i| f64::from(TEMPERATURES[i].1) / 100.0))
    }

    pub fn is_on(&self) -> HeaterResult<bool> {
        self.heater
            .with_state(|s| s.require("status").map(|v| v != STATUS_OFF))
    }

    pub fn current_operation(&self) -> HeaterResult<Operation> {
        Ok(if self.is_on()? {
            Operation::Gas
        } else {
            Operation::Off
        })
    }

    /// Step the target towards `celsius`. Returns the signed number of
    /// commands sent.
    ///
    /// Commands go out one at a time; the first failure aborts the rest.
    pub async fn set_temperature(&self, celsius: f64) -> HeaterResult<i64> {
        if !celsius.is_finite() {
            return Err(HeaterError::UnknownTemperature(celsius.to_string()));
        }
        let Some(current) = self.target_index()? else {
            error!("Target temperature is unknown");
            return Err(HeaterError::MissingField(
                "target_temperature_raw".to_string(),
            ));
        };

        let steps = plan_steps(current, celsius);
        debug!(
            requested = celsius,
            current_index = current,
            steps,
            "set_temperature"
        );

        let command = if steps > 0 {
            Command::Increase
        } else {
            Command::Decrease
        };
        for _ in 0..steps.unsigned_abs() {
            self.heater.send(command).await?;
        }
        Ok(steps)
    }

    /// Switch on if off. Returns whether a command was sent.
    pub async fn turn_on(&self) -> HeaterResult<bool> {
        if self.is_on()? {
            return Ok(false);
        }
        self.heater.lig().await?;
        Ok(true)
    }

    /// Switch off if on. Returns whether a command was sent.
    pub async fn turn_off(&self) -> HeaterResult<bool> {
        if !self.is_on()? {
            return Ok(false);
        }
        self.heater.lig().await?;
        Ok(true)
    }

    pub async fn set_operation_mode(&self, mode: Operation) -> HeaterResult<bool> {
        match mode {
            Operation::Gas => self.turn_on().await,
            Operation::Off => self.turn_off().await,
        }
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        let operation = self.current_operation().ok();
        let target = self.target_temperature().ok().flatten();

        let mut attributes = Map::new();
        attributes.insert("current_temperature".into(), json!(self.current_temperature()));
        attributes.insert("temperature".into(), json!(target));
        attributes.insert("min_temp".into(), json!(MIN_TEMP));
        attributes.insert("max_temp".into(), json!(MAX_TEMP));
        attributes.insert("target_temp_step".into(), json!(PRECISION_WHOLE));
        attributes.insert(
            "operation_list".into(),
            json!(Operation::ALL.map(|o| o.as_str())),
        );

        EntitySnapshot {
            unique_id: self.unique_id.clone(),
            name: self.name.clone(),
            kind: EntityKind::WaterHeater,
            available: self.available(),
            state: operation.map(|o| EntityValue::Text(o.to_string())),
            unit: Some(TEMPERATURE_UNIT.to_string()),
            attributes,
            timestamp: now(),
        }
    }
}
