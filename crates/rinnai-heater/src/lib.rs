//! Rinnai Water Heater Client
//!
//! Polls a Rinnai water heater over its plain HTTP interface and exposes the
//! device as a set of entities.
//!
//! ## Protocol
//!
//! | Endpoint   | Kind    | Decoded with        |
//! |------------|---------|---------------------|
//! | `/bus`     | read    | [`fields::BUS_FIELDS`] |
//! | `/consumo` | read    | [`fields::CONSUMO_FIELDS`] |
//! | `/tela_`   | read    | [`fields::TELA_FIELDS`] |
//! | `/inc`     | command | [`fields::TELA_FIELDS`] |
//! | `/dec`     | command | [`fields::TELA_FIELDS`] |
//! | `/lig`     | command | [`fields::TELA_FIELDS`] |
//!
//! Every response is a comma-separated list of values; the field table maps
//! positions to named fields in the shared [`DeviceState`].
//!
//! ## Architecture
//!
//! - **RinnaiHeater**: shared handle owning transport, state, observers and
//!   the poll timer
//! - **Transport**: one GET per endpoint (HTTP in production)
//! - **Entities**: sensors, binary sensors, buttons and the water heater,
//!   all reading the shared state
//! - **HeaterEntry**: setup/unload lifecycle of one configured heater

pub mod config;
pub mod entities;
pub mod error;
pub mod fields;
pub mod heater;
pub mod notifier;
pub mod poller;
pub mod setup;
pub mod state;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use config::{env_vars, HeaterConfig};
pub use entities::{
    build_entities, BinarySensorEntity, ButtonEntity, ButtonKind, Entity, EntityKind,
    EntitySnapshot, EntityValue, Operation, SensorEntity, SnapshotSink, WaterHeaterEntity,
};
pub use error::{HeaterError, HeaterResult};
pub use fields::{Endpoint, FieldSpec};
pub use heater::{Command, RefreshReport, RinnaiHeater, Subscription};
pub use poller::{TimerState, TimerStats};
pub use setup::{setup_entry, setup_entry_with_transport, HeaterEntry};
pub use state::{DeviceIdentity, DeviceInfo, DeviceState};
pub use transport::{HttpTransport, Transport};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
