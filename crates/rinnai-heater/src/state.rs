//! Current device state and the positional mapper that fills it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{HeaterError, HeaterResult};
use crate::fields::{Endpoint, FieldSpec};

/// Integration domain, used in device identifiers.
pub const DOMAIN: &str = "rinnai_heater";

/// Manufacturer reported in device info.
pub const MANUFACTURER: &str = "Rinnai";

/// Latest raw value of every field seen so far, keyed by field name.
///
/// Values are kept exactly as the device sent them; scaling happens at the
/// entity layer. The map only grows through [`DeviceState::apply`] and is
/// emptied wholesale when a fetch fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceState {
    values: HashMap<String, String>,
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project a split response onto the field names of `table`.
    ///
    /// Every position is checked before anything is written, so a response
    /// shorter than the table leaves the state untouched and returns
    /// [`HeaterError::OutOfRange`] for the first position that does not fit.
    /// Keys not named by the table are never touched.
    pub fn apply(
        &mut self,
        endpoint: Endpoint,
        raw: &[String],
        table: &[FieldSpec],
    ) -> HeaterResult<usize> {
        if let Some(spec) = table.iter().find(|s| s.position >= raw.len()) {
            return Err(HeaterError::OutOfRange {
                endpoint,
                position: spec.position,
                len: raw.len(),
            });
        }

        for spec in table {
            self.values
                .insert(spec.name.to_string(), raw[spec.position].clone());
        }
        Ok(table.len())
    }

    /// Drop every value; entities reading the state become unavailable.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Like [`get`](Self::get) but a missing key is an error.
    pub fn require(&self, name: &str) -> HeaterResult<&str> {
        self.get(name)
            .ok_or_else(|| HeaterError::MissingField(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Fields as a plain map, for serialization and display.
    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.values
    }

    /// Stable identity of the device.
    ///
    /// Fails with [`HeaterError::MissingField`] until a bus response has
    /// populated non-blank `serial_number` and `mac_address`.
    pub fn identity(&self) -> HeaterResult<DeviceIdentity> {
        let non_blank = |name: &str| -> HeaterResult<String> {
            match self.require(name)?.trim() {
                "" => Err(HeaterError::MissingField(name.to_string())),
                v => Ok(v.to_string()),
            }
        };
        Ok(DeviceIdentity {
            serial_number: non_blank("serial_number")?,
            mac_address: non_blank("mac_address")?,
            model: self.get("model").map(str::to_string),
        })
    }
}

/// Identity fields read from the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub serial_number: String,
    pub mac_address: String,
    /// Not present in any field table today; kept for firmwares that report it
    pub model: Option<String>,
}

impl DeviceIdentity {
    /// Device info block for the host's device registry.
    pub fn device_info(&self, name: &str) -> DeviceInfo {
        DeviceInfo {
            connections: vec![("mac".to_string(), self.mac_address.clone())],
            identifiers: vec![(DOMAIN.to_string(), self.serial_number.clone())],
            name: name.to_string(),
            model: self.model.clone(),
            manufacturer: MANUFACTURER.to_string(),
            serial_number: self.serial_number.clone(),
        }
    }
}

/// Device registry entry every entity points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub connections: Vec<(String, String)>,
    pub identifiers: Vec<(String, String)>,
    pub name: String,
    pub model: Option<String>,
    pub manufacturer: String,
    pub serial_number: String,
}

/// Split a response body into positional values.
///
/// Trailing whitespace (the firmware ends bodies with a newline) is dropped;
/// everything else, including empty fields, is kept verbatim.
pub fn split_response(body: &str) -> Vec<String> {
    body.trim_end().split(',').map(str::to_string).collect()
}
