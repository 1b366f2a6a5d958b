//! Countdown scheduler.
//!
//! Owns the lifecycle of the single active timer run and drives the timer
//! event buses.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ start/pause/    ┌──────────────────┐
//! │  Scheduler   │ resume/cancel   │  Mutex<Control>  │
//! │ (any thread) │────────────────▶│ state, remaining │
//! └──────┬───────┘                 └────────▲─────────┘
//!        │ spawn                            │ every 100ms
//!        ▼                                  │
//! ┌──────────────┐   ticks/finish  ┌────────┴─────────┐
//! │ worker thread│────────────────▶│  TimerListeners  │──▶ tray, panel, ...
//! └──────────────┘                 └──────────────────┘
//! ```
//!
//! # Guarantees
//!
//! - At most one run is Running or Paused; `start` during an active run is
//!   a no-op.
//! - Pause and cancel are observed within one checkpoint (100ms).
//! - Once `cancel` returns, the cancelled run emits no tick and no finish.
//!   `cancel` blocks until the worker thread exits, bounded by the cancel
//!   timeout; past the bound the worker is detached and a warning logged.
//!   A detached worker re-checks its run before every emit and stays silent.
//! - A worker still draining a finished run when the next run starts is kept
//!   and waited for by the next `cancel`.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()` or `.expect()` in production code
//! - Poisoned locks are recovered, callbacks run behind `catch_unwind`

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};
use tts_core::{validate_duration, ConfigResult, Tick, TimerSnapshot, TimerState};

mod listeners;
mod worker;

pub use listeners::{NotificationSink, Subscription, TimerListeners};

use crate::bus::ListenerId;
use worker::RunCallbacks;

/// Sleep between two state checks of the worker.
pub const CHECKPOINT: Duration = Duration::from_millis(100);

/// Checkpoints making up one nominal second.
pub const CHECKPOINTS_PER_SECOND: u32 = 10;

/// Default bound on how long `cancel` waits for the worker to exit.
pub const DEFAULT_CANCEL_TIMEOUT: Duration = Duration::from_secs(1);

// ============================================================================
// Options
// ============================================================================

/// Timing parameters of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    pub checkpoint: Duration,
    pub checkpoints_per_second: u32,
    pub cancel_timeout: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            checkpoint: CHECKPOINT,
            checkpoints_per_second: CHECKPOINTS_PER_SECOND,
            cancel_timeout: DEFAULT_CANCEL_TIMEOUT,
        }
    }
}

impl SchedulerOptions {
    /// Default timing with a custom cancel bound.
    pub fn with_cancel_timeout(cancel_timeout: Duration) -> Self {
        Self {
            cancel_timeout,
            ..Self::default()
        }
    }
}

// ============================================================================
// Shared State
// ============================================================================

/// State read by every thread and written under the lock.
#[derive(Debug, Default)]
pub(crate) struct Control {
    /// Incremented on every start; a worker only acts on its own generation
    generation: u64,
    state: TimerState,
    remaining: u64,
    total: u64,
}

#[derive(Debug)]
pub(crate) struct Shared {
    control: Mutex<Control>,
    listeners: TimerListeners,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Worker {
    generation: u64,
    handle: JoinHandle<()>,
    /// Disconnects when the worker thread exits
    done: mpsc::Receiver<()>,
}

// ============================================================================
// Scheduler
// ============================================================================

/// Cancellable, pausable one-second countdown with multi-observer events.
pub struct Scheduler {
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
    /// Workers of earlier runs still delivering their finish events
    draining: Mutex<Vec<Worker>>,
    options: SchedulerOptions,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_options(SchedulerOptions::default())
    }

    pub fn with_options(options: SchedulerOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                control: Mutex::new(Control::default()),
                listeners: TimerListeners::new(),
            }),
            worker: Mutex::new(None),
            draining: Mutex::new(Vec::new()),
            options,
        }
    }

    /// Starts a run of `total_seconds`.
    ///
    /// `on_tick` receives every tick of this run and `on_finish` runs once if
    /// the run reaches zero, both on the worker thread. Registered listeners
    /// are notified as well.
    ///
    /// Returns `Ok(false)` without touching the active run if one is already
    /// Running or Paused.
    ///
    /// # Errors
    ///
    /// - `ConfigError::NonPositiveDuration` for zero seconds
    /// - `ConfigError::DurationTooLarge` at or above 999 hours
    pub fn start<T, F>(&self, total_seconds: u64, on_tick: T, on_finish: F) -> ConfigResult<bool>
    where
        T: Fn(Tick) + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        let total_seconds = validate_duration(total_seconds)?;

        let generation = {
            let mut control = self.shared.lock();
            if control.state.is_active() {
                debug!(
                    state = control.state.label(),
                    remaining = control.remaining,
                    "Start ignored: a timer is already active"
                );
                return Ok(false);
            }
            control.generation += 1;
            control.state = TimerState::Running;
            control.remaining = total_seconds;
            control.total = total_seconds;
            control.generation
        };

        let shared = Arc::clone(&self.shared);
        let options = self.options;
        let callbacks = RunCallbacks {
            on_tick: Box::new(on_tick),
            on_finish: Box::new(on_finish),
        };
        let (done_tx, done_rx) = mpsc::channel::<()>();

        let spawned = thread::Builder::new()
            .name(format!("countdown-{generation}"))
            .spawn(move || {
                let _done = done_tx;
                worker::run(shared, generation, options, callbacks);
            });

        match spawned {
            Ok(handle) => {
                let previous = self.lock_worker().replace(Worker {
                    generation,
                    handle,
                    done: done_rx,
                });
                if let Some(previous) = previous {
                    self.retire(previous);
                }
                info!(generation, total_seconds, "Countdown started");
                Ok(true)
            }
            Err(e) => {
                error!(error = %e, "Failed to spawn countdown worker");
                let mut control = self.shared.lock();
                if control.generation == generation {
                    control.state = TimerState::Idle;
                }
                Ok(false)
            }
        }
    }

    /// Pauses the active run. Returns false if it was not Running.
    pub fn pause(&self) -> bool {
        self.set_paused(true)
    }

    /// Resumes a paused run. Returns false if it was not Paused.
    pub fn resume(&self) -> bool {
        self.set_paused(false)
    }

    /// Flips between Running and Paused.
    ///
    /// Returns the new paused flag, or `None` when no run is active.
    pub fn toggle_pause(&self) -> Option<bool> {
        let paused = {
            let mut control = self.shared.lock();
            match control.state {
                TimerState::Running => control.state = TimerState::Paused,
                TimerState::Paused => control.state = TimerState::Running,
                _ => return None,
            }
            control.state == TimerState::Paused
        };
        self.notify_paused(paused);
        Some(paused)
    }

    fn set_paused(&self, paused: bool) -> bool {
        let (from, to) = if paused {
            (TimerState::Running, TimerState::Paused)
        } else {
            (TimerState::Paused, TimerState::Running)
        };

        {
            let mut control = self.shared.lock();
            if control.state != from {
                return false;
            }
            control.state = to;
        }
        self.notify_paused(paused);
        true
    }

    fn notify_paused(&self, paused: bool) {
        debug!(paused, remaining = self.remaining(), "Pause state changed");
        self.shared.listeners.pauses.emit(&paused);
    }

    /// Cancels the active run and waits for its worker to exit.
    ///
    /// Returns true if a Running or Paused run was cancelled. Even when
    /// nothing was active, a worker still delivering its final events is
    /// waited for, so no finish notification can arrive after this returns.
    ///
    /// Called from a listener on the worker thread itself, the wait is
    /// skipped and the worker stops at its next checkpoint.
    pub fn cancel(&self) -> bool {
        let cancelled = {
            let mut control = self.shared.lock();
            if control.state.is_active() {
                control.state = TimerState::Cancelled;
                Some((control.generation, control.total))
            } else {
                None
            }
        };

        let draining = std::mem::take(&mut *self.lock_draining());
        for worker in draining {
            self.wait_for_exit(worker);
        }
        let worker = self.lock_worker().take();
        if let Some(worker) = worker {
            self.wait_for_exit(worker);
        }

        match cancelled {
            Some((generation, total)) => {
                info!(generation, total, "Countdown cancelled");
                self.shared.listeners.cancels.emit(&total);
                true
            }
            None => false,
        }
    }

    fn wait_for_exit(&self, worker: Worker) {
        if worker.handle.thread().id() == thread::current().id() {
            debug!(generation = worker.generation, "Cancel from worker thread, not waiting");
            return;
        }

        match worker.done.recv_timeout(self.options.cancel_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if worker.handle.join().is_err() {
                    warn!(generation = worker.generation, "Countdown worker panicked");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    generation = worker.generation,
                    timeout_ms = self.options.cancel_timeout.as_millis() as u64,
                    "Countdown worker did not exit in time; detaching it"
                );
            }
        }
    }

    /// Joins the worker of a finished run, or keeps it for the next
    /// `cancel` to wait on while it is still draining its finish events.
    fn retire(&self, worker: Worker) {
        if worker.handle.is_finished() {
            if worker.handle.join().is_err() {
                warn!(generation = worker.generation, "Countdown worker panicked");
            }
            return;
        }
        debug!(generation = worker.generation, "Previous worker still draining");
        let mut draining = self.lock_draining();
        draining.retain(|w| !w.handle.is_finished());
        draining.push(worker);
    }

    fn lock_draining(&self) -> MutexGuard<'_, Vec<Worker>> {
        self.draining.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True while a run is Running or Paused.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state().is_active()
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state() == TimerState::Paused
    }

    #[must_use]
    pub fn state(&self) -> TimerState {
        self.shared.lock().state
    }

    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.shared.lock().remaining
    }

    /// Consistent view of state, remaining and total.
    #[must_use]
    pub fn snapshot(&self) -> TimerSnapshot {
        let control = self.shared.lock();
        TimerSnapshot {
            state: control.state,
            remaining: control.remaining,
            total: control.total,
        }
    }

    pub fn options(&self) -> SchedulerOptions {
        self.options
    }

    /// Event buses of this scheduler.
    pub fn listeners(&self) -> &TimerListeners {
        &self.shared.listeners
    }

    pub fn add_tick_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Tick) + Send + Sync + 'static,
    {
        self.shared.listeners.ticks.add(listener)
    }

    pub fn remove_tick_listener(&self, id: ListenerId) -> bool {
        self.shared.listeners.ticks.remove(id)
    }

    pub fn add_pause_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&bool) + Send + Sync + 'static,
    {
        self.shared.listeners.pauses.add(listener)
    }

    pub fn remove_pause_listener(&self, id: ListenerId) -> bool {
        self.shared.listeners.pauses.remove(id)
    }

    pub fn add_finish_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&u64) + Send + Sync + 'static,
    {
        self.shared.listeners.finishes.add(listener)
    }

    pub fn remove_finish_listener(&self, id: ListenerId) -> bool {
        self.shared.listeners.finishes.remove(id)
    }

    pub fn add_cancel_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&u64) + Send + Sync + 'static,
    {
        self.shared.listeners.cancels.add(listener)
    }

    pub fn remove_cancel_listener(&self, id: ListenerId) -> bool {
        self.shared.listeners.cancels.remove(id)
    }

    /// Subscribes a sink to every timer event.
    pub fn attach(&self, sink: Arc<dyn NotificationSink>) -> Subscription {
        self.shared.listeners.attach(sink)
    }

    pub fn detach(&self, subscription: &Subscription) {
        self.shared.listeners.detach(subscription);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // An armed action must not outlive its scheduler.
        self.cancel();
    }
}
