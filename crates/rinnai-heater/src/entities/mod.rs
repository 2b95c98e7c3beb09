//! Entities exposed to the host.
//!
//! One tagged variant per entity kind. Presentation options are resolved
//! from the field table when an entity is constructed; at runtime an entity
//! only reads the shared device state through its [`RinnaiHeater`] handle.

mod binary_sensor;
mod button;
mod sensor;
mod water_heater;

pub use binary_sensor::BinarySensorEntity;
pub use button::{ButtonEntity, ButtonKind};
pub use sensor::{SensorEntity, StateClass};
pub use water_heater::{plan_steps, Operation, WaterHeaterEntity};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::HeaterResult;
use crate::fields::{all_fields, DeviceClass, FieldSpec, Platform};
use crate::heater::{RinnaiHeater, Subscription};
use crate::state::DeviceInfo;

/// Entity kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Sensor,
    BinarySensor,
    Button,
    WaterHeater,
}

/// Presentation options shared by every kind, defaults already applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityOptions {
    pub device_class: Option<DeviceClass>,
    pub unit: Option<&'static str>,
    pub icon: Option<&'static str>,
    pub enabled_by_default: bool,
    /// Shown under the diagnostic category
    pub diagnostic: bool,
}

impl Default for EntityOptions {
    fn default() -> Self {
        Self {
            device_class: None,
            unit: None,
            icon: None,
            enabled_by_default: true,
            diagnostic: false,
        }
    }
}

impl From<&FieldSpec> for EntityOptions {
    fn from(spec: &FieldSpec) -> Self {
        Self {
            device_class: spec.device_class,
            unit: spec.unit,
            icon: spec.icon,
            enabled_by_default: spec.enabled,
            diagnostic: spec.debug,
        }
    }
}

/// State value handed to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl std::fmt::Display for EntityValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{}", v),
            Self::Bool(true) => f.write_str("on"),
            Self::Bool(false) => f.write_str("off"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// What an attached entity reports after each update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySnapshot {
    pub unique_id: String,
    pub name: String,
    pub kind: EntityKind,
    pub available: bool,
    pub state: Option<EntityValue>,
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    pub timestamp: i64,
}

/// Callback receiving snapshots of attached entities.
pub type SnapshotSink = Arc<dyn Fn(&EntitySnapshot) -> anyhow::Result<()> + Send + Sync>;

/// Any entity.
#[derive(Debug, Clone)]
pub enum Entity {
    Sensor(SensorEntity),
    BinarySensor(BinarySensorEntity),
    Button(ButtonEntity),
    WaterHeater(WaterHeaterEntity),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Sensor(_) => EntityKind::Sensor,
            Self::BinarySensor(_) => EntityKind::BinarySensor,
            Self::Button(_) => EntityKind::Button,
            Self::WaterHeater(_) => EntityKind::WaterHeater,
        }
    }

    pub fn unique_id(&self) -> &str {
        match self {
            Self::Sensor(e) => e.unique_id(),
            Self::BinarySensor(e) => e.unique_id(),
            Self::Button(e) => e.unique_id(),
            Self::WaterHeater(e) => e.unique_id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Sensor(e) => e.name(),
            Self::BinarySensor(e) => e.name(),
            Self::Button(e) => e.name(),
            Self::WaterHeater(e) => e.name(),
        }
    }

    pub fn options(&self) -> &EntityOptions {
        match self {
            Self::Sensor(e) => e.options(),
            Self::BinarySensor(e) => e.options(),
            Self::Button(e) => e.options(),
            Self::WaterHeater(e) => e.options(),
        }
    }

    pub fn available(&self) -> bool {
        match self {
            Self::Sensor(e) => e.available(),
            Self::BinarySensor(e) => e.available(),
            Self::Button(e) => e.available(),
            Self::WaterHeater(e) => e.available(),
        }
    }

    pub fn heater(&self) -> &RinnaiHeater {
        match self {
            Self::Sensor(e) => e.heater(),
            Self::BinarySensor(e) => e.heater(),
            Self::Button(e) => e.heater(),
            Self::WaterHeater(e) => e.heater(),
        }
    }

    pub fn device_info(&self) -> HeaterResult<DeviceInfo> {
        self.heater().device_info()
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        match self {
            Self::Sensor(e) => e.snapshot(),
            Self::BinarySensor(e) => e.snapshot(),
            Self::Button(e) => e.snapshot(),
            Self::WaterHeater(e) => e.snapshot(),
        }
    }

    /// Subscribe this entity to heater updates; `sink` gets a fresh
    /// snapshot on every notification.
    pub fn attach(&self, sink: SnapshotSink) -> HeaterResult<Subscription> {
        let entity = self.clone();
        self.heater().subscribe(move || sink(&entity.snapshot()))
    }
}

/// Build every entity for a heater whose identity is already known.
///
/// Order: sensors, binary sensors, buttons, water heater.
pub fn build_entities(heater: &RinnaiHeater) -> HeaterResult<Vec<Entity>> {
    let identity = heater.identity()?;
    let fields = all_fields();
    let mut entities = Vec::new();

    for spec in fields.iter().filter(|f| f.platform == Platform::Sensor) {
        entities.push(Entity::Sensor(SensorEntity::new(
            heater.clone(),
            &identity.serial_number,
            spec,
        )));
    }
    for spec in fields.iter().filter(|f| f.platform == Platform::BinarySensor) {
        entities.push(Entity::BinarySensor(BinarySensorEntity::new(
            heater.clone(),
            &identity.serial_number,
            spec,
        )));
    }
    for kind in [ButtonKind::Increase, ButtonKind::Decrease] {
        entities.push(Entity::Button(ButtonEntity::new(
            heater.clone(),
            &identity.serial_number,
            kind,
        )));
    }
    entities.push(Entity::WaterHeater(WaterHeaterEntity::new(
        heater.clone(),
        &identity,
    )));

    Ok(entities)
}

/// Human-readable name from a field key: `water_flow` → `Water flow`,
/// `fanSpeed` → `Fan speed`.
pub fn humanize(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    for c in key.chars() {
        if c == '_' {
            spaced.push(' ');
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower {
            spaced.push(' ');
        }
        prev_lower = c.is_lowercase();
        spaced.push(c);
    }

    let lower = spaced.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("water_flow"), "Water flow");
        assert_eq!(humanize("status"), "Status");
        assert_eq!(humanize("ChargerWorkstate"), "Charger workstate");
        assert_eq!(humanize("temperature_increase"), "Temperature increase");
        assert_eq!(humanize(""), "");
    }

    #[test]
    fn test_options_from_spec() {
        let spec = FieldSpec::sensor(6, "fan_diagnostic").scale(0.1).debug();
        let options = EntityOptions::from(&spec);
        assert!(options.diagnostic);
        assert!(options.enabled_by_default);
        assert_eq!(options.unit, None);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(EntityValue::Number(42.5).to_string(), "42.5");
        assert_eq!(EntityValue::Bool(true).to_string(), "on");
        assert_eq!(EntityValue::Text("x".into()).to_string(), "x");
    }

    #[test]
    fn test_build_entities_order_and_ids() {
        let heater = crate::test_support::heater_with_bus(&[(19, "SN7"), (25, "aa:bb")]);
        let entities = build_entities(&heater).unwrap();

        let fields = all_fields();
        let sensors = fields.iter().filter(|f| f.platform == Platform::Sensor).count();
        let binaries = fields.len() - sensors;
        assert_eq!(entities.len(), sensors + binaries + 3);

        assert_eq!(entities[0].kind(), EntityKind::Sensor);
        assert_eq!(entities[sensors].kind(), EntityKind::BinarySensor);
        assert_eq!(entities[sensors + binaries].kind(), EntityKind::Button);
        assert_eq!(entities.last().map(Entity::kind), Some(EntityKind::WaterHeater));

        let mut ids: Vec<&str> = entities.iter().map(Entity::unique_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), entities.len());

        let info = entities[0].device_info().unwrap();
        assert_eq!(info.identifiers, vec![("rinnai_heater".to_string(), "SN7".to_string())]);
    }

    #[test]
    fn test_build_entities_requires_identity() {
        let heater = crate::test_support::heater_with_bus(&[(19, "SN7")]);
        assert!(build_entities(&heater).is_err());
    }

    #[test]
    fn test_value_serializes_untagged() {
        let json = serde_json::to_value(EntityValue::Number(1.5)).unwrap();
        assert_eq!(json, serde_json::json!(1.5));
        let json = serde_json::to_value(EntityValue::Bool(false)).unwrap();
        assert_eq!(json, serde_json::json!(false));
    }
}
