//! Shared helpers for unit tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{HeaterError, HeaterResult};
use crate::fields::Endpoint;
use crate::heater::RinnaiHeater;
use crate::transport::Transport;

/// Transport that never reaches the device.
pub(crate) struct OfflineTransport;

#[async_trait]
impl Transport for OfflineTransport {
    async fn get(&self, _endpoint: Endpoint) -> HeaterResult<String> {
        Err(HeaterError::Connection("offline".into()))
    }

    fn base_url(&self) -> &str {
        "http://offline"
    }
}

/// Transport answering every endpoint from a fixed body map and recording
/// the order of requests.
#[derive(Default)]
pub(crate) struct RecordingTransport {
    bodies: Mutex<Vec<(Endpoint, String)>>,
    pub(crate) calls: Mutex<Vec<Endpoint>>,
}

impl RecordingTransport {
    pub(crate) fn with(bodies: &[(Endpoint, &str)]) -> Self {
        Self {
            bodies: Mutex::new(bodies.iter().map(|(e, b)| (*e, b.to_string())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn set(&self, endpoint: Endpoint, body: &str) {
        let mut bodies = self.bodies.lock();
        bodies.retain(|(e, _)| *e != endpoint);
        bodies.push((endpoint, body.to_string()));
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn get(&self, endpoint: Endpoint) -> HeaterResult<String> {
        self.calls.lock().push(endpoint);
        self.bodies
            .lock()
            .iter()
            .find(|(e, _)| *e == endpoint)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| HeaterError::Connection(format!("no body for /{}", endpoint)))
    }

    fn base_url(&self) -> &str {
        "http://recording"
    }
}

pub(crate) fn offline_heater() -> RinnaiHeater {
    RinnaiHeater::with_transport("test", Duration::from_secs(15), Arc::new(OfflineTransport))
}

/// Heater with the state preloaded from a bus response whose positions are
/// empty except for `values`.
pub(crate) fn heater_with_bus(values: &[(usize, &str)]) -> RinnaiHeater {
    let heater = offline_heater();
    let mut raw = vec![String::new(); 38];
    for (i, v) in values {
        raw[*i] = v.to_string();
    }
    heater
        .update(Endpoint::Bus, &raw, false)
        .expect("bus table fits 38 values");
    heater
}

/// Display response in table order.
pub(crate) fn tela(status: &str, raw_target: &str, burner: &str) -> String {
    format!("{},0,{},3850,120,{},1", status, raw_target, burner)
}
