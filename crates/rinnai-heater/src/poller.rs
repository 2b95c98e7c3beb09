//! Periodic poll timer.
//!
//! The timer only schedules; each tick hands off to a callback that spawns
//! the actual refresh. A tick therefore never waits for the previous
//! refresh, it simply queues behind it on the transport lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::{HeaterError, HeaterResult};

/// Timer lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    Stopped,
    Running,
}

/// Start/stop/tick counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimerStats {
    pub starts: u64,
    pub stops: u64,
    pub ticks: u64,
}

/// Owner of the background tick task.
pub struct PollTimer {
    period: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
    starts: AtomicU64,
    stops: AtomicU64,
    ticks: Arc<AtomicU64>,
}

impl PollTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            handle: Mutex::new(None),
            starts: AtomicU64::new(0),
            stops: AtomicU64::new(0),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn state(&self) -> TimerState {
        if self.handle.lock().is_some() {
            TimerState::Running
        } else {
            TimerState::Stopped
        }
    }

    pub fn stats(&self) -> TimerStats {
        TimerStats {
            starts: self.starts.load(Ordering::SeqCst),
            stops: self.stops.load(Ordering::SeqCst),
            ticks: self.ticks.load(Ordering::SeqCst),
        }
    }

    /// Stopped → Running. The first tick fires one period from now.
    ///
    /// `on_tick` returns `false` once its owner is gone, which ends the task.
    /// Returns `Ok(false)` if the timer was already running. Must be called
    /// from within a tokio runtime.
    pub fn start<F>(&self, on_tick: F) -> HeaterResult<bool>
    where
        F: Fn() -> bool + Send + 'static,
    {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return Ok(false);
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| HeaterError::Other(anyhow::anyhow!("poll timer needs a runtime: {}", e)))?;

        let period = self.period;
        let first_tick = Instant::now() + period;
        let ticks = self.ticks.clone();
        *handle = Some(runtime.spawn(async move {
            let mut interval = interval_at(first_tick, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                ticks.fetch_add(1, Ordering::SeqCst);
                debug!("poll timer tick");
                if !on_tick() {
                    break;
                }
            }
        }));

        self.starts.fetch_add(1, Ordering::SeqCst);
        info!(period_ms = period.as_millis() as u64, "poll timer started");
        Ok(true)
    }

    /// Running → Stopped. Returns `false` if the timer was not running.
    ///
    /// Refreshes already spawned by earlier ticks run to completion.
    pub fn stop(&self) -> bool {
        match self.handle.lock().take() {
            Some(handle) => {
                handle.abort();
                self.stops.fetch_add(1, Ordering::SeqCst);
                info!("poll timer stopped");
                true
            }
            None => false,
        }
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}
