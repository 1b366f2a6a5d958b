//! Timer controller: wires a validated configuration to the scheduler and
//! the executor, and publishes every action outcome.
//!
//! ```text
//! TimerConfiguration ──arm──▶ Scheduler.start ──finish──▶ ActionExecutor
//!                                                              │
//!                                   results bus ◀──────────────┘
//!                                 (tray, panel, CLI)
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};
use tts_core::format::tooltip;
use tts_core::{ActionOutcome, ActionResult, ConfigResult, TimerConfiguration};

use crate::bus::{ListenerBus, ListenerId};
use crate::executor::ActionExecutor;
use crate::scheduler::{Scheduler, SchedulerOptions};

/// What `arm` did with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArmOutcome {
    /// A countdown of `total_seconds` is now running.
    Started { total_seconds: u64 },
    /// The configuration was immediate and has already run.
    Executed(ActionResult),
    /// Another timer is active; nothing changed.
    AlreadyActive,
}

type ActiveSlot = Arc<Mutex<Option<TimerConfiguration>>>;

/// Owns the scheduler and runs the armed action when it finishes.
pub struct TimerController {
    scheduler: Scheduler,
    executor: Arc<ActionExecutor>,
    results: Arc<ListenerBus<ActionOutcome>>,
    active: ActiveSlot,
}

impl TimerController {
    pub fn new(executor: Arc<ActionExecutor>, options: SchedulerOptions) -> Self {
        Self {
            scheduler: Scheduler::with_options(options),
            executor,
            results: Arc::new(ListenerBus::new("result")),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Arms a validated configuration.
    ///
    /// Immediate configurations execute on the calling thread. Countdowns
    /// execute on the scheduler's worker thread when they reach zero. Either
    /// way the outcome is published on the results bus.
    ///
    /// # Errors
    ///
    /// Only an immediate execution can fail here, with the executor's error.
    pub fn arm(&self, config: TimerConfiguration) -> ConfigResult<ArmOutcome> {
        if config.is_immediate() {
            info!(action = %config.action(), "Executing immediately");
            let outcome = self.executor.execute(config.action(), config.selection());
            self.results.emit(&outcome);
            return outcome.map(ArmOutcome::Executed);
        }

        let mut active = lock(&self.active);
        if self.scheduler.is_running() {
            debug!("Arm ignored: a timer is already active");
            return Ok(ArmOutcome::AlreadyActive);
        }

        let total_seconds = config.total_seconds();
        let on_finish = {
            let executor = Arc::clone(&self.executor);
            let results = Arc::clone(&self.results);
            let slot = Arc::clone(&self.active);
            let action = config.action();
            let selection = config.selection().to_vec();
            move || {
                info!(%action, "Timer finished, executing action");
                let outcome = executor.execute(action, &selection);
                lock(&slot).take();
                results.emit(&outcome);
            }
        };

        if !self.scheduler.start(total_seconds, |_| {}, on_finish)? {
            return Ok(ArmOutcome::AlreadyActive);
        }

        info!(
            action = %config.action(),
            target = %config.target_description(),
            total_seconds,
            "Timer armed"
        );
        *active = Some(config);
        Ok(ArmOutcome::Started { total_seconds })
    }

    /// Cancels the active timer; its action will not run.
    pub fn cancel(&self) -> bool {
        let cancelled = self.scheduler.cancel();
        if cancelled {
            lock(&self.active).take();
        }
        cancelled
    }

    pub fn pause(&self) -> bool {
        self.scheduler.pause()
    }

    pub fn resume(&self) -> bool {
        self.scheduler.resume()
    }

    pub fn toggle_pause(&self) -> Option<bool> {
        self.scheduler.toggle_pause()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn executor(&self) -> &Arc<ActionExecutor> {
        &self.executor
    }

    /// Configuration of the active timer, if any.
    pub fn active_configuration(&self) -> Option<TimerConfiguration> {
        lock(&self.active).clone()
    }

    /// Subscribes to action outcomes.
    pub fn add_result_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ActionOutcome) + Send + Sync + 'static,
    {
        self.results.add(listener)
    }

    pub fn remove_result_listener(&self, id: ListenerId) -> bool {
        self.results.remove(id)
    }

    /// Tray-style status text for the active timer, `None` when idle.
    pub fn status_text(&self) -> Option<String> {
        let config = self.active_configuration()?;
        let snapshot = self.scheduler.snapshot();
        if !snapshot.state.is_active() {
            return None;
        }
        Some(tooltip(
            snapshot.tick(),
            snapshot.state.label(),
            config.action().label(),
            &config.target_description(),
        ))
    }
}

fn lock(slot: &ActiveSlot) -> MutexGuard<'_, Option<TimerConfiguration>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
