//! Heater context: transport, device state, observers and poll timer.
//!
//! [`RinnaiHeater`] is the object entities are built around. It is cheap to
//! clone; all clones share one device state, one request lock and one timer.
//!
//! ## Request flow
//!
//! ```text
//! timer tick ─┐
//! command ────┼─► request lock ─► GET /<endpoint> ─► split ─► apply(table) ─► notify
//! setup ──────┘         │
//!                       └─ on failure: clear state, return error
//! ```

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::HeaterConfig;
use crate::error::{HeaterError, HeaterResult};
use crate::fields::Endpoint;
use crate::notifier::{ObserverId, ObserverRegistry};
use crate::poller::{PollTimer, TimerState, TimerStats};
use crate::state::{split_response, DeviceIdentity, DeviceInfo, DeviceState};
use crate::transport::{HttpTransport, Transport};

/// Endpoint sequence of one refresh cycle.
pub const REFRESH_SEQUENCE: [Endpoint; 3] = [Endpoint::Bus, Endpoint::Consumo, Endpoint::Tela];

/// Device commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Target temperature one step up
    Increase,
    /// Target temperature one step down
    Decrease,
    /// Power on/off toggle
    Toggle,
}

impl Command {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::Increase => Endpoint::Inc,
            Self::Decrease => Endpoint::Dec,
            Self::Toggle => Endpoint::Lig,
        }
    }
}

/// Result of one refresh cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub succeeded: Vec<Endpoint>,
    pub failed: Vec<(Endpoint, String)>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

struct Inner {
    name: String,
    transport: Arc<dyn Transport>,
    /// Held for a whole request/response round-trip
    request_lock: tokio::sync::Mutex<()>,
    state: RwLock<DeviceState>,
    observers: ObserverRegistry,
    timer: PollTimer,
    /// Serializes observer count changes with timer start/stop
    lifecycle: Mutex<()>,
}

/// Shared handle to one heater.
#[derive(Clone)]
pub struct RinnaiHeater {
    inner: Arc<Inner>,
}

impl RinnaiHeater {
    /// Build a heater talking HTTP to the configured host.
    pub fn new(config: &HeaterConfig) -> HeaterResult<Self> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::with_transport(
            config.name.clone(),
            config.scan_interval(),
            Arc::new(transport),
        ))
    }

    /// Build a heater over any transport.
    pub fn with_transport(
        name: impl Into<String>,
        scan_interval: Duration,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                transport,
                request_lock: tokio::sync::Mutex::new(()),
                state: RwLock::new(DeviceState::new()),
                observers: ObserverRegistry::new(),
                timer: PollTimer::new(scan_interval),
                lifecycle: Mutex::new(()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn base_url(&self) -> &str {
        self.inner.transport.base_url()
    }

    pub fn scan_interval(&self) -> Duration {
        self.inner.timer.period()
    }

    // ========== Transport ==========

    /// Fetch one endpoint and split the body into positional values.
    ///
    /// At most one request is in flight per heater; callers queue on the
    /// request lock in arrival order. Any transport failure clears the
    /// device state before the error is returned.
    pub async fn request(&self, endpoint: Endpoint) -> HeaterResult<Vec<String>> {
        debug!(endpoint = %endpoint, "requesting /{}", endpoint);

        let _guard = self.inner.request_lock.lock().await;
        match self.inner.transport.get(endpoint).await {
            Ok(body) => Ok(split_response(&body)),
            Err(e) => {
                warn!(endpoint = %endpoint, host = %self.base_url(), "Error fetching /{} data: {}", endpoint, e);
                self.inner.state.write().clear();
                Err(e)
            }
        }
    }

    // ========== Parser / notifier ==========

    /// Merge a split response into the device state using the endpoint's
    /// field table, then optionally notify observers.
    pub fn update(&self, endpoint: Endpoint, raw: &[String], notify: bool) -> HeaterResult<usize> {
        let written = self
            .inner
            .state
            .write()
            .apply(endpoint, raw, endpoint.table())?;

        if notify {
            self.notify()?;
        }
        Ok(written)
    }

    /// Invoke every observer once.
    pub fn notify(&self) -> HeaterResult<usize> {
        self.inner.observers.notify().map_err(HeaterError::Observer)
    }

    /// Request, parse and notify for one endpoint.
    pub async fn fetch(&self, endpoint: Endpoint) -> HeaterResult<usize> {
        let raw = self.request(endpoint).await?;
        self.update(endpoint, &raw, true)
    }

    pub async fn bus(&self) -> HeaterResult<usize> {
        self.fetch(Endpoint::Bus).await
    }

    pub async fn tela(&self) -> HeaterResult<usize> {
        self.fetch(Endpoint::Tela).await
    }

    pub async fn consumo(&self) -> HeaterResult<usize> {
        self.fetch(Endpoint::Consumo).await
    }

    // ========== Commands ==========

    /// Send a command; the reply is decoded with the display table.
    pub async fn send(&self, command: Command) -> HeaterResult<usize> {
        info!(command = ?command, "sending command");
        self.fetch(command.endpoint()).await
    }

    pub async fn inc(&self) -> HeaterResult<usize> {
        self.send(Command::Increase).await
    }

    pub async fn dec(&self) -> HeaterResult<usize> {
        self.send(Command::Decrease).await
    }

    pub async fn lig(&self) -> HeaterResult<usize> {
        self.send(Command::Toggle).await
    }

    // ========== Poller ==========

    /// One poll cycle: bus, consumption, display.
    ///
    /// A failing step is logged and the next one still runs.
    pub async fn refresh(&self) -> RefreshReport {
        let mut report = RefreshReport::default();
        for endpoint in REFRESH_SEQUENCE {
            match self.fetch(endpoint).await {
                Ok(_) => report.succeeded.push(endpoint),
                Err(e) => {
                    warn!(endpoint = %endpoint, "Error reading heater data: {}", e);
                    report.failed.push((endpoint, e.to_string()));
                }
            }
        }
        report
    }

    /// Register an observer.
    ///
    /// The first registration starts the poll timer. Dropping (or
    /// cancelling) the returned [`Subscription`] unregisters; the last
    /// unregistration stops the timer. Must be called within a tokio runtime.
    pub fn subscribe<F>(&self, observer: F) -> HeaterResult<Subscription>
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let _guard = self.inner.lifecycle.lock();
        let (id, count) = self.inner.observers.register(Arc::new(observer));

        if count == 1 {
            let weak = Arc::downgrade(&self.inner);
            let started = self.inner.timer.start(move || match weak.upgrade() {
                Some(inner) => {
                    let heater = RinnaiHeater { inner };
                    tokio::spawn(async move {
                        heater.refresh().await;
                    });
                    true
                }
                None => false,
            });
            if let Err(e) = started {
                self.inner.observers.unregister(id);
                return Err(e);
            }
        }

        debug!(observers = count, "observer added");
        Ok(Subscription {
            heater: Arc::downgrade(&self.inner),
            id: Some(id),
        })
    }

    fn unsubscribe(inner: &Inner, id: ObserverId) -> bool {
        let _guard = inner.lifecycle.lock();
        match inner.observers.unregister(id) {
            Some(0) => {
                inner.timer.stop();
                info!(heater = %inner.name, "last observer removed, polling stopped");
                true
            }
            Some(remaining) => {
                debug!(observers = remaining, "observer removed");
                true
            }
            None => false,
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.len()
    }

    pub fn timer_state(&self) -> TimerState {
        self.inner.timer.state()
    }

    pub fn timer_stats(&self) -> TimerStats {
        self.inner.timer.stats()
    }

    // ========== State ==========

    /// Copy of the current device state.
    pub fn state(&self) -> DeviceState {
        self.inner.state.read().clone()
    }

    /// Run `f` against the current device state without copying it.
    pub fn with_state<R>(&self, f: impl FnOnce(&DeviceState) -> R) -> R {
        f(&self.inner.state.read())
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.inner.state.read().get(name).map(str::to_string)
    }

    pub fn identity(&self) -> HeaterResult<DeviceIdentity> {
        self.inner.state.read().identity()
    }

    pub fn device_info(&self) -> HeaterResult<DeviceInfo> {
        Ok(self.identity()?.device_info(&self.inner.name))
    }
}

impl std::fmt::Debug for RinnaiHeater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RinnaiHeater")
            .field("name", &self.inner.name)
            .field("base_url", &self.base_url())
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Observer registration handle. Unregisters on drop.
#[must_use = "dropping a subscription unregisters the observer"]
pub struct Subscription {
    heater: Weak<Inner>,
    id: Option<ObserverId>,
}

impl Subscription {
    pub fn id(&self) -> Option<ObserverId> {
        self.id
    }

    /// Unregister now. Returns `false` if already unregistered.
    pub fn cancel(mut self) -> bool {
        self.release()
    }

    fn release(&mut self) -> bool {
        match (self.id.take(), self.heater.upgrade()) {
            (Some(id), Some(inner)) => RinnaiHeater::unsubscribe(&inner, id),
            _ => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
