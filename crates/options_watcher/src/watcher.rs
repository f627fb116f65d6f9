//! OptionsWatcher - interval polling with race-free start/stop.
//!
//! The polling thread exists only while there is at least one subscriber
//! and one registered option; every mutating call re-evaluates the
//! stopped/running state machine. One mutex guards the tracked-option map
//! and the destructing flag; a condition variable makes the interval sleep
//! interruptible so shutdown latency is bounded by signal delivery, not by
//! the polling interval.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use contracts::{DeviceOption, OptionId};
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, trace};

use crate::signal::{Signal, Subscription};

/// Aggregated change set delivered to subscribers: every option whose
/// value differed in one poll cycle, never split across deliveries.
pub type ChangedOptions = HashMap<OptionId, Arc<dyn DeviceOption>>;

struct RegisteredOption {
    option: Arc<dyn DeviceOption>,
    /// None until the first successful query; only the polling thread
    /// writes this afterwards.
    last_known: Option<f32>,
}

struct WatcherState {
    options: HashMap<OptionId, RegisteredOption>,
    destructing: bool,
}

struct Shared {
    state: Mutex<WatcherState>,
    wake: Condvar,
    on_values_changed: Signal<ChangedOptions>,
}

impl Shared {
    fn should_stop(&self, state: &WatcherState) -> bool {
        self.on_values_changed.subscriber_count() == 0
            || state.options.is_empty()
            || state.destructing
    }
}

/// Polls registered options on a fixed interval and raises one aggregated
/// change notification per cycle.
pub struct OptionsWatcher {
    interval: Duration,
    shared: Arc<Shared>,
    updater: Mutex<Option<JoinHandle<()>>>,
}

impl OptionsWatcher {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            shared: Arc::new(Shared {
                state: Mutex::new(WatcherState {
                    options: HashMap::new(),
                    destructing: false,
                }),
                wake: Condvar::new(),
                on_values_changed: Signal::new(),
            }),
            updater: Mutex::new(None),
        }
    }

    /// Track an option. The current value is unknown until the first poll;
    /// recording it then does not count as a change.
    pub fn register_option(&self, id: OptionId, option: Arc<dyn DeviceOption>) {
        {
            let mut state = self.shared.state.lock();
            state.options.insert(
                id,
                RegisteredOption {
                    option,
                    last_known: None,
                },
            );
        }
        self.maybe_start();
    }

    /// Stop tracking an option.
    pub fn unregister_option(&self, id: OptionId) {
        {
            let mut state = self.shared.state.lock();
            state.options.remove(&id);
        }
        self.maybe_stop();
    }

    /// Register a change callback. Dropping (or cancelling) the handle ends
    /// delivery; the polling thread notices on its next wake.
    pub fn subscribe(
        &self,
        callback: impl Fn(&ChangedOptions) + Send + Sync + 'static,
    ) -> Subscription<ChangedOptions> {
        let subscription = self.shared.on_values_changed.subscribe(callback);
        self.maybe_start();
        subscription
    }

    /// Whether the polling thread is currently alive.
    pub fn is_running(&self) -> bool {
        self.updater
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    fn should_start(&self) -> bool {
        let state = self.shared.state.lock();
        !self.shared.should_stop(&state)
    }

    fn maybe_start(&self) {
        let mut updater = self.updater.lock();

        match updater.as_ref() {
            Some(handle) if !handle.is_finished() => return,
            Some(_) => {
                // The previous thread exited on its own (e.g. all
                // subscriptions were cancelled); reap it before restarting.
                if let Some(handle) = updater.take() {
                    let _ = handle.join();
                }
            }
            None => {}
        }

        if !self.should_start() {
            return;
        }

        let shared = self.shared.clone();
        let interval = self.interval;
        debug!(interval_ms = interval.as_millis() as u64, "starting options watcher thread");
        *updater = Some(std::thread::spawn(move || {
            // Baseline pass: record current values without notifying.
            let _ = update_options(&shared);
            thread_loop(&shared, interval);
            trace!("options watcher thread exiting");
        }));
    }

    fn maybe_stop(&self) {
        let stop = {
            let state = self.shared.state.lock();
            self.shared.should_stop(&state)
        };
        if stop {
            self.stop();
        }
    }

    fn stop(&self) {
        self.shared.wake.notify_all();
        let handle = self.updater.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                // Watcher thread panicked; swallow, destruction must not throw.
                debug!("options watcher thread terminated abnormally");
            }
        }
    }
}

impl Drop for OptionsWatcher {
    fn drop(&mut self) {
        self.shared.state.lock().destructing = true;
        self.stop();
    }
}

fn thread_loop(shared: &Shared, interval: Duration) {
    // Re-checking should_stop every cycle because subscriptions can be
    // cancelled without the watcher knowing.
    loop {
        {
            let mut state = shared.state.lock();
            if shared.should_stop(&state) {
                break;
            }
            shared.wake.wait_for(&mut state, interval);
            if shared.should_stop(&state) {
                break;
            }
        }

        let updated = update_options(shared);

        // Stop may have been requested while querying; no notify then.
        {
            let state = shared.state.lock();
            if shared.should_stop(&state) {
                break;
            }
        }

        if !updated.is_empty() {
            shared.on_values_changed.raise(&updated);
        }
    }
}

/// Query every tracked option, record new values, return those that
/// changed. Individual query failures are skipped without aborting the
/// cycle (some options cannot be queried all the time, e.g. streaming
/// only).
fn update_options(shared: &Shared) -> ChangedOptions {
    let mut updated = ChangedOptions::new();

    let mut state: MutexGuard<'_, WatcherState> = shared.state.lock();
    if shared.should_stop(&state) {
        return updated;
    }

    let ids: Vec<OptionId> = state.options.keys().copied().collect();
    for id in ids {
        let Some(entry) = state.options.get_mut(&id) else {
            continue;
        };
        match entry.option.query() {
            Ok(value) => {
                let changed = matches!(entry.last_known, Some(previous) if previous != value);
                if entry.last_known != Some(value) {
                    entry.last_known = Some(value);
                }
                if changed {
                    updated.insert(id, entry.option.clone());
                }
            }
            Err(e) => {
                trace!(option = ?id, error = %e, "option query failed, skipped this cycle");
            }
        }

        // Stop promptly mid-cycle when requested.
        if shared.should_stop(&state) {
            break;
        }
    }

    updated
}
