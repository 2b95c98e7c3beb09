use serde_json::{json, Map};

use super::{humanize, now, EntityKind, EntityOptions, EntitySnapshot, EntityValue};
use crate::fields::FieldSpec;
use crate::heater::RinnaiHeater;

/// On/off flag backed by one field; `"1"` means on.
#[derive(Debug, Clone)]
pub struct BinarySensorEntity {
    heater: RinnaiHeater,
    key: &'static str,
    unique_id: String,
    name: String,
    options: EntityOptions,
}

impl BinarySensorEntity {
    pub fn new(heater: RinnaiHeater, serial_number: &str, spec: &FieldSpec) -> Self {
        Self {
            heater,
            key: spec.name,
            unique_id: format!("{}_{}", serial_number, spec.name),
            name: humanize(spec.name),
            options: EntityOptions::from(spec),
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

    pub fn available(&self) -> bool {
        self.heater.with_state(|s| s.contains(self.key))
    }

    pub fn is_on(&self) -> Option<bool> {
        self.heater
            .with_state(|s| s.get(self.key).map(|v| v.trim() == "1"))
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        let mut attributes = Map::new();
        if let Some(class) = self.options.device_class {
            attributes.insert("device_class".into(), json!(class));
        }

        EntitySnapshot {
            unique_id: self.unique_id.clone(),
            name: self.name.clone(),
            kind: EntityKind::BinarySensor,
            available: self.available(),
            state: self.is_on().map(EntityValue::Bool),
            unit: None,
            attributes,
            timestamp: now(),
        }
    }
}
