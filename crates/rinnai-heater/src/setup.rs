//! Config entry lifecycle: setup, attach, unload, reload.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::HeaterConfig;
use crate::entities::{build_entities, Entity, SnapshotSink};
use crate::error::{HeaterError, HeaterResult};
use crate::heater::{RinnaiHeater, Subscription};
use crate::transport::{HttpTransport, Transport};

/// One configured heater with its entities.
pub struct HeaterEntry {
    config: HeaterConfig,
    heater: RinnaiHeater,
    unique_id: String,
    entities: Vec<Entity>,
    subscriptions: Vec<Subscription>,
    /// Caller-supplied transport, reused on reload; `None` means HTTP
    /// built from the config.
    injected: Option<Arc<dyn Transport>>,
}

/// Set up a heater over HTTP.
pub async fn setup_entry(config: HeaterConfig) -> HeaterResult<HeaterEntry> {
    config.validate()?;
    let transport = HttpTransport::from_config(&config)?;
    setup(config, Arc::new(transport), None).await
}

/// Set up a heater over any transport.
///
/// The initial bus fetch must succeed and yield the device identity,
/// otherwise the entry is [`HeaterError::NotReady`].
pub async fn setup_entry_with_transport(
    config: HeaterConfig,
    transport: Arc<dyn Transport>,
) -> HeaterResult<HeaterEntry> {
    setup(config, transport.clone(), Some(transport)).await
}

async fn setup(
    config: HeaterConfig,
    transport: Arc<dyn Transport>,
    injected: Option<Arc<dyn Transport>>,
) -> HeaterResult<HeaterEntry> {
    config.validate()?;
    let heater =
        RinnaiHeater::with_transport(config.name.clone(), config.scan_interval(), transport);

    if let Err(e) = heater.bus().await {
        warn!(host = %config.host, "Initial fetch failed: {}", e);
        return Err(HeaterError::NotReady(e.to_string()));
    }

    let identity = heater
        .identity()
        .map_err(|e| HeaterError::NotReady(e.to_string()))?;
    let entities = build_entities(&heater).map_err(|e| HeaterError::NotReady(e.to_string()))?;

    info!(
        serial = %identity.serial_number,
        entities = entities.len(),
        "Set up {}",
        config.title()
    );

    Ok(HeaterEntry {
        config,
        heater,
        unique_id: identity.serial_number,
        entities,
        subscriptions: Vec::new(),
        injected,
    })
}

impl HeaterEntry {
    /// Serial number of the device.
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn title(&self) -> String {
        self.config.title()
    }

    pub fn config(&self) -> &HeaterConfig {
        &self.config
    }

    pub fn heater(&self) -> &RinnaiHeater {
        &self.heater
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, unique_id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.unique_id() == unique_id)
    }

    /// Number of entities currently attached.
    pub fn attached(&self) -> usize {
        self.subscriptions.len()
    }

    /// Attach every entity to `sink`. The first attach starts polling.
    ///
    /// Attaching an already attached entry is a no-op.
    pub fn attach(&mut self, sink: SnapshotSink) -> HeaterResult<usize> {
        if !self.subscriptions.is_empty() {
            return Ok(0);
        }

        let mut subscriptions = Vec::with_capacity(self.entities.len());
        for entity in &self.entities {
            // dropping the partial set on error detaches what was attached
            subscriptions.push(entity.attach(sink.clone())?);
        }
        self.subscriptions = subscriptions;
        Ok(self.subscriptions.len())
    }

    /// Detach every entity, stopping the poll timer.
    pub fn unload(&mut self) -> usize {
        let count = self.subscriptions.len();
        self.subscriptions.clear();
        info!(serial = %self.unique_id, "Unloaded {}", self.config.title());
        count
    }

    /// Unload, then set the entry up again with new options.
    ///
    /// An entry set up over a caller-supplied transport keeps it; an HTTP
    /// entry gets a new client for the new options.
    pub async fn reload(mut self, config: HeaterConfig) -> HeaterResult<HeaterEntry> {
        self.unload();
        match self.injected.take() {
            Some(transport) => setup_entry_with_transport(config, transport).await,
            None => setup_entry(config).await,
        }
    }
}

impl std::fmt::Debug for HeaterEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaterEntry")
            .field("unique_id", &self.unique_id)
            .field("host", &self.config.host)
            .field("entities", &self.entities.len())
            .field("attached", &self.subscriptions.len())
            .finish()
    }
}
