//! Field tables for the positional CSV protocol.
//!
//! The device answers every endpoint with a flat comma-separated list. Values
//! carry no names; a field is identified purely by its zero-based position,
//! so each endpoint kind has a static table mapping positions to field names
//! together with the presentation metadata the entities need.

use serde::{Deserialize, Serialize};

/// Device endpoints, one per URL path on the heater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// Primary status feed
    Bus,
    /// Display mirror, a smaller subset of the bus
    Tela,
    /// Cumulative usage counters
    Consumo,
    /// Raise target temperature one step
    Inc,
    /// Lower target temperature one step
    Dec,
    /// Toggle on/off
    Lig,
}

impl Endpoint {
    /// URL path segment for this endpoint.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Bus => "bus",
            Self::Tela => "tela_",
            Self::Consumo => "consumo",
            Self::Inc => "inc",
            Self::Dec => "dec",
            Self::Lig => "lig",
        }
    }

    /// Field table used to decode this endpoint's response.
    ///
    /// Command endpoints answer with the display payload.
    pub fn table(&self) -> &'static [FieldSpec] {
        match self {
            Self::Bus => BUS_FIELDS,
            Self::Consumo => CONSUMO_FIELDS,
            Self::Tela | Self::Inc | Self::Dec | Self::Lig => TELA_FIELDS,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Entity platform a field is exposed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Sensor,
    BinarySensor,
}

/// Device class hint for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Current,
    Duration,
    Energy,
    Frequency,
    Gas,
    SignalStrength,
    Temperature,
    VolumeFlowRate,
    Water,
    // Binary sensor classes
    Heat,
    Running,
}

/// One entry of a field table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Zero-based position in the CSV response
    pub position: usize,
    /// Field name, key in the device state
    pub name: &'static str,
    /// Multiplier applied to the raw value
    pub scale: Option<f64>,
    /// Unit of measurement after scaling
    pub unit: Option<&'static str>,
    pub platform: Platform,
    pub device_class: Option<DeviceClass>,
    /// Entity enabled when first registered
    pub enabled: bool,
    pub icon: Option<&'static str>,
    /// Raw value to label mapping for enumerated fields
    pub options: Option<&'static [(&'static str, &'static str)]>,
    /// Diagnostic field
    pub debug: bool,
}

impl FieldSpec {
    pub const fn sensor(position: usize, name: &'static str) -> Self {
        Self {
            position,
            name,
            scale: None,
            unit: None,
            platform: Platform::Sensor,
            device_class: None,
            enabled: true,
            icon: None,
            options: None,
            debug: false,
        }
    }

    pub const fn binary(position: usize, name: &'static str) -> Self {
        Self {
            platform: Platform::BinarySensor,
            ..Self::sensor(position, name)
        }
    }

    pub const fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub const fn unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    pub const fn class(mut self, class: DeviceClass) -> Self {
        self.device_class = Some(class);
        self
    }

    pub const fn icon(mut self, icon: &'static str) -> Self {
        self.icon = Some(icon);
        self
    }

    pub const fn options(mut self, options: &'static [(&'static str, &'static str)]) -> Self {
        self.options = Some(options);
        self
    }

    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub const fn debug(mut self) -> Self {
        self.debug = true;
        self
    }
}

use DeviceClass::*;

/// Status bus (`/bus`).
pub static BUS_FIELDS: &[FieldSpec] = &[
    FieldSpec::sensor(0, "status"),
    FieldSpec::sensor(1, "error"),
    FieldSpec::sensor(3, "actuations").scale(1.0),
    FieldSpec::sensor(4, "burning").scale(1.0).unit("h").class(Duration),
    FieldSpec::sensor(5, "standby").scale(1.0).unit("h").class(Duration),
    FieldSpec::sensor(6, "fan_diagnostic").scale(0.1).debug(),
    FieldSpec::sensor(7, "fan_speed").scale(0.1).unit("Hz").class(Frequency),
    FieldSpec::sensor(8, "pov_current").scale(0.1).unit("mA").class(Current),
    FieldSpec::sensor(9, "power").scale(0.1).unit("kcal/min").class(Energy),
    FieldSpec::sensor(10, "water_inlet_temperature").scale(0.01).unit("°C").class(Temperature),
    FieldSpec::sensor(11, "water_outlet_temperature").scale(0.01).unit("°C").class(Temperature),
    FieldSpec::sensor(12, "water_flow").scale(0.01).unit("L/min").class(VolumeFlowRate),
    FieldSpec::sensor(13, "water_flow_start").scale(0.01).unit("L/min").class(VolumeFlowRate),
    FieldSpec::sensor(14, "water_flow_stop").scale(0.01).unit("L/min").class(VolumeFlowRate),
    FieldSpec::sensor(15, "target_temperature").scale(0.01).unit("°C").class(Temperature),
    FieldSpec::sensor(16, "device_ip").debug(),
    FieldSpec::sensor(17, "device_ip_priority").debug(),
    FieldSpec::sensor(18, "target_temperature_raw").debug(),
    FieldSpec::sensor(19, "serial_number").debug(),
    FieldSpec::sensor(20, "uptime").unit("s").class(Duration),
    FieldSpec::sensor(25, "mac_address").debug(),
    FieldSpec::sensor(37, "wifi_signal").unit("dB").class(SignalStrength).debug(),
];

/// Display mirror (`/tela_`), also the payload of every command endpoint.
pub static TELA_FIELDS: &[FieldSpec] = &[
    FieldSpec::sensor(0, "status"),
    FieldSpec::sensor(1, "error"),
    FieldSpec::sensor(2, "target_temperature_raw").debug(),
    FieldSpec::sensor(3, "water_outlet_temperature").scale(0.01).unit("°C").class(Temperature),
    FieldSpec::sensor(4, "water_flow").scale(0.01).unit("L/min").class(VolumeFlowRate),
    FieldSpec::binary(5, "burner").class(Heat).icon("mdi:fire"),
    FieldSpec::binary(6, "water_demand").class(Running).icon("mdi:water-pump"),
];

/// Consumption counters (`/consumo`).
pub static CONSUMO_FIELDS: &[FieldSpec] = &[
    FieldSpec::sensor(0, "water_consumption").scale(1.0).unit("L").class(Water),
    FieldSpec::sensor(1, "gas_consumption").scale(0.001).unit("m³").class(Gas),
    FieldSpec::sensor(2, "energy_consumption").scale(0.01).unit("kWh").class(Energy),
];

/// Every field across all tables, first occurrence wins on duplicate names.
pub fn all_fields() -> Vec<&'static FieldSpec> {
    let mut fields: Vec<&'static FieldSpec> = Vec::new();
    for spec in BUS_FIELDS.iter().chain(TELA_FIELDS).chain(CONSUMO_FIELDS) {
        if !fields.iter().any(|f| f.name == spec.name) {
            fields.push(spec);
        }
    }
    fields
}

/// Look up a field by name across all tables.
pub fn find_field(name: &str) -> Option<&'static FieldSpec> {
    BUS_FIELDS
        .iter()
        .chain(TELA_FIELDS)
        .chain(CONSUMO_FIELDS)
        .find(|f| f.name == name)
}

/// Discrete target temperatures the heater steps through, in hundredths of
/// a degree, keyed by the raw code reported as `target_temperature_raw`.
/// Ordered; one `inc`/`dec` moves exactly one row.
pub static TEMPERATURES: &[(&str, u32)] = &[
    ("1", 3500),
    ("2", 3600),
    ("3", 3700),
    ("4", 3800),
    ("5", 3900),
    ("6", 4000),
    ("7", 4100),
    ("8", 4200),
    ("9", 4300),
    ("10", 4400),
    ("11", 4500),
    ("12", 4600),
    ("13", 4700),
    ("14", 4800),
    ("15", 5000),
    ("16", 5500),
    ("17", 6000),
];

/// Temperature in hundredths of a degree for a raw code.
pub fn temperature_for_code(code: &str) -> Option<u32> {
    TEMPERATURES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, t)| *t)
}

/// Index of the table row closest to `centi` (hundredths of a degree).
/// Ties resolve to the lower row, infinities to the table ends and NaN to
/// the first row.
pub fn nearest_temperature_index(centi: f64) -> usize {
    if centi == f64::INFINITY {
        return TEMPERATURES.len() - 1;
    }
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, (_, t)) in TEMPERATURES.iter().enumerate() {
        let distance = (f64::from(*t) - centi).abs();
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}
