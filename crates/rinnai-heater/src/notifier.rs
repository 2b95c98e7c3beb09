//! Observer registry.
//!
//! Observers are plain callbacks with no payload; they re-read the device
//! state themselves. Notification runs synchronously in registration order.

use std::sync::Arc;

use parking_lot::Mutex;

/// Callback invoked after every successful state update.
pub type ObserverFn = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// Identifier handed out on registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

#[derive(Default)]
struct Inner {
    next_id: u64,
    observers: Vec<(ObserverId, ObserverFn)>,
}

/// Ordered set of observers.
#[derive(Default)]
pub struct ObserverRegistry {
    inner: Mutex<Inner>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer. Returns its id and the observer count after insertion.
    pub fn register(&self, observer: ObserverFn) -> (ObserverId, usize) {
        let mut inner = self.inner.lock();
        let id = ObserverId(inner.next_id);
        inner.next_id += 1;
        inner.observers.push((id, observer));
        (id, inner.observers.len())
    }

    /// Remove an observer. Returns the remaining count, or `None` if the id
    /// was not registered (already removed).
    pub fn unregister(&self, id: ObserverId) -> Option<usize> {
        let mut inner = self.inner.lock();
        let index = inner.observers.iter().position(|(i, _)| *i == id)?;
        inner.observers.remove(index);
        Some(inner.observers.len())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every observer in registration order.
    ///
    /// The first failing observer stops the pass and its error is returned.
    /// The registry lock is not held while callbacks run, so an observer may
    /// unsubscribe itself.
    pub fn notify(&self) -> anyhow::Result<usize> {
        let observers: Vec<ObserverFn> = self
            .inner
            .lock()
            .observers
            .iter()
            .map(|(_, f)| Arc::clone(f))
            .collect();

        for observer in &observers {
            observer()?;
        }
        Ok(observers.len())
    }
}
