// PerformanceMonitor: republishes classifier output on environment changes
//
// Each subscription owns its last published output and one environment
// listener. On every change notification the subscription re-snapshots the
// environment, evaluates, and calls back only when the output differs
// field-by-field from what it last published.
//
// Callbacks run with no lock held, so a callback may fire the environment,
// read its own subscription, or dispose it. Notifications are expected to
// come from one dispatcher at a time; `dispose` waits for callbacks already
// running on other threads before it returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::thread::{self, ThreadId};

use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::classifier::{evaluate, ClassifierOutput};
use super::environment::{Environment, EnvironmentChange, ListenerId};
use crate::telemetry;

type OutputCallback = Box<dyn Fn(ClassifierOutput) + Send + Sync>;

/// Liveness flag plus the threads currently inside `refresh`
struct DispatchGate {
    active: bool,
    in_flight: Vec<ThreadId>,
}

/// Per-subscription state: callback plus the last published output
struct Observer {
    callback: OutputCallback,
    last: Mutex<Option<ClassifierOutput>>,
    gate: Mutex<DispatchGate>,
    idle: Condvar,
}

/// Marks one dispatch as running until dropped
struct InFlight<'a> {
    observer: &'a Observer,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let current = thread::current().id();
        let mut gate = self.observer.lock_gate();
        if let Some(position) = gate.in_flight.iter().position(|id| *id == current) {
            gate.in_flight.swap_remove(position);
        }
        self.observer.idle.notify_all();
    }
}

impl Observer {
    fn new(callback: OutputCallback) -> Self {
        Self {
            callback,
            last: Mutex::new(None),
            gate: Mutex::new(DispatchGate {
                active: true,
                in_flight: Vec::new(),
            }),
            idle: Condvar::new(),
        }
    }

    fn lock_gate(&self) -> MutexGuard<'_, DispatchGate> {
        self.gate
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_last(&self) -> MutexGuard<'_, Option<ClassifierOutput>> {
        self.last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self) -> Option<InFlight<'_>> {
        let mut gate = self.lock_gate();
        if !gate.active {
            return None;
        }
        gate.in_flight.push(thread::current().id());
        Some(InFlight { observer: self })
    }

    /// Stop future dispatches and wait out those running on other threads
    ///
    /// A dispatch on the calling thread is the caller's own callback, so it
    /// is not waited for.
    fn deactivate(&self) {
        let current = thread::current().id();
        let mut gate = self.lock_gate();
        gate.active = false;
        while gate.in_flight.iter().any(|id| *id != current) {
            gate = self
                .idle
                .wait(gate)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Evaluate a fresh snapshot and publish it if it changed
    fn refresh(&self, environment: &dyn Environment, change: Option<EnvironmentChange>) {
        let Some(_in_flight) = self.enter() else {
            return;
        };
        let output = evaluate(&environment.snapshot());

        {
            let mut last = self.lock_last();
            if *last == Some(output) {
                return;
            }

            match (change, last.as_ref()) {
                (Some(change), Some(previous)) => log::info!(
                    "[Performance] {:?} change moved tier {} -> {}",
                    change,
                    previous.tier.as_str(),
                    output.tier.as_str()
                ),
                _ => log::debug!("[Performance] initial tier {}", output.tier.as_str()),
            }
            *last = Some(output);
        }

        telemetry::hub().record_tier(output.tier);
        (self.callback)(output);
    }
}

/// Subscribes observers to classifier output for one environment
#[derive(Clone)]
pub struct PerformanceMonitor {
    environment: Arc<dyn Environment>,
}

impl PerformanceMonitor {
    pub fn new(environment: Arc<dyn Environment>) -> Self {
        Self { environment }
    }

    /// Evaluate the environment as it is right now
    pub fn current(&self) -> ClassifierOutput {
        evaluate(&self.environment.snapshot())
    }

    /// Register `callback` for classifier output
    ///
    /// The callback runs immediately with the current output and again
    /// whenever an environment change yields a different output. The
    /// returned [`Subscription`] detaches the environment listener when
    /// disposed or dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(ClassifierOutput) + Send + Sync + 'static,
    {
        let observer = Arc::new(Observer::new(Box::new(callback)));

        observer.refresh(self.environment.as_ref(), None);

        let weak_observer: Weak<Observer> = Arc::downgrade(&observer);
        let weak_environment: Weak<dyn Environment> = Arc::downgrade(&self.environment);
        let listener = self.environment.add_listener(Arc::new(move |change| {
            if let (Some(observer), Some(environment)) =
                (weak_observer.upgrade(), weak_environment.upgrade())
            {
                observer.refresh(environment.as_ref(), Some(change));
            }
        }));

        Subscription {
            environment: Arc::clone(&self.environment),
            observer,
            listener,
            disposed: AtomicBool::new(false),
        }
    }

    /// Subscribe and expose the outputs as an async stream
    ///
    /// The stream yields the current output first. It ends once the
    /// returned subscription is dropped.
    pub fn output_stream(&self) -> (Subscription, UnboundedReceiverStream<ClassifierOutput>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(move |output| {
            let _ = tx.send(output);
        });
        (subscription, UnboundedReceiverStream::new(rx))
    }
}

/// Disposer for a [`PerformanceMonitor::subscribe`] registration
pub struct Subscription {
    environment: Arc<dyn Environment>,
    observer: Arc<Observer>,
    listener: ListenerId,
    disposed: AtomicBool,
}

impl Subscription {
    /// Deregister the callback and detach the environment listener
    ///
    /// No callback starts after this returns, and callbacks already running
    /// on other threads have finished. Calling this more than once is a
    /// no-op.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.observer.deactivate();
        self.environment.remove_listener(self.listener);
        log::debug!("[Performance] subscription {:?} disposed", self.listener);
    }

    pub fn is_active(&self) -> bool {
        !self.disposed.load(Ordering::SeqCst)
    }

    /// Last output delivered to the callback
    pub fn last_output(&self) -> Option<ClassifierOutput> {
        *self.observer.lock_last()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::classifier::PerformanceTier;
    use crate::performance::environment::ManualEnvironment;
    use crate::performance::signals::{ClassifierSignals, EffectiveConnectionType};
    use futures::StreamExt;

    fn desktop_signals() -> ClassifierSignals {
        ClassifierSignals {
            viewport_width_px: 1920,
            is_touch_or_coarse_pointer: false,
            cpu_core_count: 8,
            device_memory_gib: 8.0,
            network_save_data_requested: false,
            network_effective_type: EffectiveConnectionType::FourG,
            prefers_reduced_motion: false,
        }
    }

    fn recording_monitor() -> (
        Arc<ManualEnvironment>,
        PerformanceMonitor,
        Arc<Mutex<Vec<ClassifierOutput>>>,
    ) {
        let env = Arc::new(ManualEnvironment::new(desktop_signals()));
        let monitor = PerformanceMonitor::new(env.clone());
        (env, monitor, Arc::new(Mutex::new(Vec::new())))
    }

    fn recorder(
        seen: &Arc<Mutex<Vec<ClassifierOutput>>>,
    ) -> impl Fn(ClassifierOutput) + Send + Sync + 'static {
        let seen = Arc::clone(seen);
        move |output| seen.lock().unwrap().push(output)
    }

    #[test]
    fn test_subscribe_publishes_immediately() {
        let (env, monitor, seen) = recording_monitor();
        let subscription = monitor.subscribe(recorder(&seen));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].tier, PerformanceTier::High);
        assert_eq!(subscription.last_output(), Some(seen[0]));
        assert_eq!(env.listener_count(), 1);
    }

    #[test]
    fn test_change_with_new_output_notifies() {
        let (env, monitor, seen) = recording_monitor();
        let _subscription = monitor.subscribe(recorder(&seen));

        env.update(EnvironmentChange::Resize, |s| s.viewport_width_px = 600);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].tier, PerformanceTier::Low);
        assert!(!seen[1].allow_smooth_scroll);
    }

    #[test]
    fn test_unchanged_output_is_suppressed() {
        let (env, monitor, seen) = recording_monitor();
        let _subscription = monitor.subscribe(recorder(&seen));

        // Still a wide desktop viewport: same output
        env.update(EnvironmentChange::Resize, |s| s.viewport_width_px = 1600);
        env.fire(EnvironmentChange::Network);

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_dispose_detaches_listener() {
        let (env, monitor, seen) = recording_monitor();
        let subscription = monitor.subscribe(recorder(&seen));

        subscription.dispose();
        assert!(!subscription.is_active());
        assert_eq!(env.listener_count(), 0);

        env.update(EnvironmentChange::ReducedMotion, |s| {
            s.prefers_reduced_motion = true
        });
        assert_eq!(seen.lock().unwrap().len(), 1);

        // Second dispose is harmless
        subscription.dispose();
        assert_eq!(env.listener_count(), 0);
    }

    #[test]
    fn test_drop_disposes_subscription() {
        let (env, monitor, seen) = recording_monitor();
        {
            let _subscription = monitor.subscribe(recorder(&seen));
            assert_eq!(env.listener_count(), 1);
        }
        assert_eq!(env.listener_count(), 0);
    }

    #[test]
    fn test_subscriptions_are_independent() {
        let (env, monitor, first_seen) = recording_monitor();
        let second_seen = Arc::new(Mutex::new(Vec::new()));

        let first = monitor.subscribe(recorder(&first_seen));
        let _second = monitor.subscribe(recorder(&second_seen));
        first.dispose();

        env.update(EnvironmentChange::Network, |s| {
            s.network_save_data_requested = true
        });

        assert_eq!(first_seen.lock().unwrap().len(), 1);
        let second_seen = second_seen.lock().unwrap();
        assert_eq!(second_seen.len(), 2);
        assert_eq!(second_seen[1].particle_budget, 0);
    }

    #[test]
    fn test_set_signals_replaces_snapshot() {
        let (env, monitor, seen) = recording_monitor();
        let _subscription = monitor.subscribe(recorder(&seen));

        let mid_range = ClassifierSignals {
            cpu_core_count: 6,
            device_memory_gib: 6.0,
            ..desktop_signals()
        };
        env.set_signals(mid_range, EnvironmentChange::Resize);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].tier, PerformanceTier::Medium);
        assert_eq!(seen[1].particle_budget, 10);
        assert_eq!(env.snapshot(), mid_range);
    }

    #[test]
    fn test_callback_may_reenter_environment() {
        let (env, monitor, seen) = recording_monitor();
        let reentrant_env = Arc::clone(&env);
        let record = recorder(&seen);
        let subscription = Arc::new(Mutex::new(None::<Arc<Subscription>>));
        let own_subscription = Arc::clone(&subscription);

        let handle = Arc::new(monitor.subscribe(move |output| {
            record(output);
            if output.tier == PerformanceTier::Low {
                // Same output again: must be suppressed, not deadlock
                reentrant_env.fire(EnvironmentChange::Resize);
                if let Some(own) = own_subscription.lock().unwrap().as_ref() {
                    assert_eq!(own.last_output(), Some(output));
                }
            }
        }));
        *subscription.lock().unwrap() = Some(Arc::clone(&handle));

        env.update(EnvironmentChange::Network, |s| {
            s.network_save_data_requested = true
        });

        let seen_now = seen.lock().unwrap().clone();
        assert_eq!(seen_now.len(), 2);
        assert_eq!(seen_now[1].tier, PerformanceTier::Low);

        subscription.lock().unwrap().take();
        handle.dispose();
        assert_eq!(env.listener_count(), 0);
    }

    #[test]
    fn test_callback_may_dispose_own_subscription() {
        let (env, monitor, seen) = recording_monitor();
        let record = recorder(&seen);
        let slot = Arc::new(Mutex::new(None::<Arc<Subscription>>));
        let own_slot = Arc::clone(&slot);

        let handle = Arc::new(monitor.subscribe(move |output| {
            record(output);
            if let Some(own) = own_slot.lock().unwrap().take() {
                own.dispose();
            }
        }));
        *slot.lock().unwrap() = Some(Arc::clone(&handle));

        env.update(EnvironmentChange::Resize, |s| s.viewport_width_px = 500);
        assert!(!handle.is_active());
        assert_eq!(env.listener_count(), 0);

        env.update(EnvironmentChange::Resize, |s| s.viewport_width_px = 1920);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_dispose_waits_for_running_callback() {
        use std::sync::atomic::AtomicUsize;
        use std::sync::mpsc as std_mpsc;
        use std::time::Duration;

        let (env, monitor, _) = recording_monitor();
        let (entered_tx, entered_rx) = std_mpsc::channel();
        let entered_tx = Mutex::new(entered_tx);
        let finished = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));

        let callback_finished = Arc::clone(&finished);
        let callback_calls = Arc::clone(&calls);
        let subscription = monitor.subscribe(move |output| {
            callback_calls.fetch_add(1, Ordering::SeqCst);
            if output.tier == PerformanceTier::Low {
                entered_tx.lock().unwrap().send(()).unwrap();
                std::thread::sleep(Duration::from_millis(100));
                callback_finished.fetch_add(1, Ordering::SeqCst);
            }
        });

        let dispatcher_env = Arc::clone(&env);
        let dispatcher = std::thread::spawn(move || {
            dispatcher_env.update(EnvironmentChange::ReducedMotion, |s| {
                s.prefers_reduced_motion = true
            });
        });

        entered_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("callback started");
        subscription.dispose();
        assert_eq!(finished.load(Ordering::SeqCst), 1);

        dispatcher.join().expect("dispatcher thread");
        env.update(EnvironmentChange::ReducedMotion, |s| {
            s.prefers_reduced_motion = false
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_output_stream_yields_changes() {
        let (env, monitor, _) = recording_monitor();
        let (subscription, mut stream) = monitor.output_stream();

        env.update(EnvironmentChange::PointerCapability, |s| {
            s.is_touch_or_coarse_pointer = true
        });

        let first = stream.next().await.expect("initial output");
        let second = stream.next().await.expect("changed output");
        assert_eq!(first.tier, PerformanceTier::High);
        assert_eq!(second.tier, PerformanceTier::Low);

        drop(subscription);
        assert_eq!(env.listener_count(), 0);
    }
}
