//! Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rinnai_heater::{Endpoint, HeaterError, HeaterResult, RinnaiHeater, Transport};

pub const SERIAL: &str = "RN0042";
pub const MAC: &str = "a0:b1:c2:d3:e4:f5";

/// Transport answering from a per-endpoint body table.
///
/// Every request records its endpoint and, when a latency is set, sleeps
/// before answering so overlapping requests would be visible in
/// [`ScriptedTransport::max_in_flight`].
#[derive(Default)]
pub struct ScriptedTransport {
    bodies: Mutex<HashMap<Endpoint, String>>,
    calls: Mutex<Vec<Endpoint>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn answer(self, endpoint: Endpoint, body: impl Into<String>) -> Self {
        self.bodies.lock().insert(endpoint, body.into());
        self
    }

    /// Replace (or remove, with `None`) the body for one endpoint.
    pub fn set(&self, endpoint: Endpoint, body: Option<&str>) {
        let mut bodies = self.bodies.lock();
        match body {
            Some(b) => bodies.insert(endpoint, b.to_string()),
            None => bodies.remove(&endpoint),
        };
    }

    pub fn calls(&self) -> Vec<Endpoint> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, endpoint: Endpoint) -> HeaterResult<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().push(endpoint);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let body = self.bodies.lock().get(&endpoint).cloned();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        body.ok_or_else(|| HeaterError::Connection(format!("connection refused on /{}", endpoint)))
    }

    fn base_url(&self) -> &str {
        "http://scripted"
    }
}

/// Bus response carrying the device identity.
pub fn bus_body() -> String {
    let mut raw = vec!["0".to_string(); 38];
    raw[0] = "1".into();
    raw[11] = "4250".into();
    raw[19] = SERIAL.into();
    raw[25] = MAC.into();
    raw.join(",")
}

/// Display response: status, error, target code, outlet temp, flow, burner, demand.
pub fn tela_body(status: &str, raw_target: &str) -> String {
    format!("{},0,{},3850,120,1,1\n", status, raw_target)
}

pub fn consumo_body() -> &'static str {
    "1520,3400,875"
}

/// Transport answering every endpoint, commands with `tela_body(status, raw_target)`.
pub fn device(status: &str, raw_target: &str) -> ScriptedTransport {
    let tela = tela_body(status, raw_target);
    ScriptedTransport::new()
        .answer(Endpoint::Bus, bus_body())
        .answer(Endpoint::Consumo, consumo_body())
        .answer(Endpoint::Tela, tela.clone())
        .answer(Endpoint::Inc, tela.clone())
        .answer(Endpoint::Dec, tela.clone())
        .answer(Endpoint::Lig, tela)
}

pub fn heater(transport: Arc<ScriptedTransport>) -> RinnaiHeater {
    RinnaiHeater::with_transport("Kitchen", Duration::from_secs(15), transport)
}

/// Observer counting its invocations.
pub fn counter() -> (Arc<AtomicUsize>, impl Fn() -> anyhow::Result<()> + Send + Sync + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    (count, move || {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

/// Let spawned tasks run to completion on a paused clock.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
