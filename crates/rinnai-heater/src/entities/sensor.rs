use serde::Serialize;
use serde_json::{json, Map};
use tracing::debug;

use super::{humanize, now, EntityKind, EntityOptions, EntitySnapshot, EntityValue};
use crate::fields::{DeviceClass, FieldSpec};
use crate::heater::RinnaiHeater;

/// Long-term statistics class of a numeric sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
    TotalIncreasing,
}

/// Numeric or text sensor backed by one field.
#[derive(Debug, Clone)]
pub struct SensorEntity {
    heater: RinnaiHeater,
    key: &'static str,
    unique_id: String,
    name: String,
    scale: Option<f64>,
    value_options: Option<&'static [(&'static str, &'static str)]>,
    state_class: Option<StateClass>,
    precision: Option<usize>,
    options: EntityOptions,
}

impl SensorEntity {
    pub fn new(heater: RinnaiHeater, serial_number: &str, spec: &FieldSpec) -> Self {
        let options = EntityOptions::from(spec);

        let (state_class, precision) = match spec.scale {
            Some(scale) => {
                let class = match spec.device_class {
                    Some(DeviceClass::Water) | Some(DeviceClass::Energy) => {
                        StateClass::TotalIncreasing
                    }
                    _ => StateClass::Measurement,
                };
                (Some(class), Some(display_precision(scale)))
            }
            None => (None, None),
        };

        Self {
            heater,
            key: spec.name,
            unique_id: format!("{}_{}", serial_number, spec.name),
            name: humanize(spec.name),
            scale: spec.scale,
            value_options: spec.options,
            state_class,
            precision,
            options,
        }
    }

    pub fn key(&self) -> &str {
        self.key
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

    pub fn state_class(&self) -> Option<StateClass> {
        self.state_class
    }

    /// Suggested number of decimals for display. The state itself is not
    /// rounded.
    pub fn precision(&self) -> Option<usize> {
        self.precision
    }

    pub fn available(&self) -> bool {
        self.heater.with_state(|s| s.contains(self.key))
    }

    /// Current value: option label, raw text, or scaled number.
    pub fn value(&self) -> Option<EntityValue> {
        let raw = self.heater.get(self.key)?;

        if let Some(options) = self.value_options {
            let label = options
                .iter()
                .find(|(code, _)| *code == raw)
                .map(|(_, label)| label.to_string())
                .unwrap_or(raw);
            return Some(EntityValue::Text(label));
        }

        let Some(scale) = self.scale else {
            return Some(EntityValue::Text(raw));
        };

        match raw.trim().parse::<f64>() {
            Ok(v) => Some(EntityValue::Number(v * scale)),
            Err(_) => {
                debug!(key = self.key, "non-numeric value '{}'", raw);
                None
            }
        }
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        let mut attributes = Map::new();
        if let Some(class) = self.options.device_class {
            attributes.insert("device_class".into(), json!(class));
        }
        if let Some(class) = self.state_class {
            attributes.insert("state_class".into(), json!(class));
        }

        EntitySnapshot {
            unique_id: self.unique_id.clone(),
            name: self.name.clone(),
            kind: EntityKind::Sensor,
            available: self.available(),
            state: self.value(),
            unit: self.options.unit.map(str::to_string),
            attributes,
            timestamp: now(),
        }
    }
}

/// Number of zeros in the decimal form of the scale factor:
/// `0.1` → 1, `0.01` → 2, `1` → 0.
fn display_precision(scale: f64) -> usize {
    format!("{}", scale).matches('0').count()
}
