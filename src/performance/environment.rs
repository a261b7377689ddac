//! Signal sources for the performance monitor.
//!
//! An [`Environment`] supplies the current [`ClassifierSignals`] snapshot and
//! lets callers register listeners for the change notifications a browser
//! host would emit (resize, pointer and reduced-motion media queries, network
//! information changes). Listeners are explicit registration/removal pairs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::signals::ClassifierSignals;

/// Kind of environment change that should trigger re-evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentChange {
    Resize,
    PointerCapability,
    ReducedMotion,
    Network,
}

/// Callback registered with an environment
pub type EnvironmentListener = Arc<dyn Fn(EnvironmentChange) + Send + Sync>;

/// Handle returned by [`Environment::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

/// Host environment the classifier reads from
pub trait Environment: Send + Sync {
    /// Take a fresh snapshot of every signal
    fn snapshot(&self) -> ClassifierSignals;

    /// Register a listener for change notifications
    fn add_listener(&self, listener: EnvironmentListener) -> ListenerId;

    /// Remove a listener; unknown ids are ignored
    fn remove_listener(&self, id: ListenerId);
}

/// Environment with a fixed snapshot that never changes
#[derive(Debug, Clone, Copy)]
pub struct StaticEnvironment {
    signals: ClassifierSignals,
}

impl StaticEnvironment {
    pub fn new(signals: ClassifierSignals) -> Self {
        Self { signals }
    }
}

impl Environment for StaticEnvironment {
    fn snapshot(&self) -> ClassifierSignals {
        self.signals
    }

    fn add_listener(&self, _listener: EnvironmentListener) -> ListenerId {
        ListenerId(0)
    }

    fn remove_listener(&self, _id: ListenerId) {}
}

/// In-memory environment driven by explicit updates
///
/// Each mutation stores the new signals and then fires the given change to
/// every registered listener. Listeners run outside the internal locks, so a
/// listener may read [`Environment::snapshot`] or remove itself.
pub struct ManualEnvironment {
    signals: Mutex<ClassifierSignals>,
    listeners: Mutex<BTreeMap<ListenerId, EnvironmentListener>>,
    next_id: AtomicU64,
}

impl ManualEnvironment {
    pub fn new(signals: ClassifierSignals) -> Self {
        Self {
            signals: Mutex::new(signals),
            listeners: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Replace the whole snapshot and notify listeners
    pub fn set_signals(&self, signals: ClassifierSignals, change: EnvironmentChange) {
        self.update(change, |current| *current = signals);
    }

    /// Mutate the snapshot in place and notify listeners
    pub fn update<F>(&self, change: EnvironmentChange, mutate: F)
    where
        F: FnOnce(&mut ClassifierSignals),
    {
        {
            let mut signals = self
                .signals
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            mutate(&mut signals);
        }
        self.fire(change);
    }

    /// Notify listeners without changing any signal
    pub fn fire(&self, change: EnvironmentChange) {
        let listeners: Vec<EnvironmentListener> = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect();

        log::debug!(
            "[Environment] {:?} change, notifying {} listener(s)",
            change,
            listeners.len()
        );

        for listener in listeners {
            listener(change);
        }
    }

    /// Number of currently registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl Default for ManualEnvironment {
    fn default() -> Self {
        Self::new(ClassifierSignals::default())
    }
}

impl Environment for ManualEnvironment {
    fn snapshot(&self) -> ClassifierSignals {
        *self
            .signals
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn add_listener(&self, listener: EnvironmentListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, listener);
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&id);
    }
}
