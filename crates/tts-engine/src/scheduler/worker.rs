//! The countdown worker: one dedicated thread per run.

use std::sync::Arc;
use std::thread;

use tracing::{debug, info, trace};
use tts_core::{Tick, TimerState};

use super::{SchedulerOptions, Shared};
use crate::bus::isolate;

/// Per-run callbacks handed to `Scheduler::start`.
pub(super) struct RunCallbacks {
    pub on_tick: Box<dyn Fn(Tick) + Send>,
    pub on_finish: Box<dyn FnOnce() + Send>,
}

/// Counts one run down to zero.
///
/// Each second is split into `CHECKPOINTS_PER_SECOND` sleeps. After every
/// sleep the worker re-reads the shared state, so pause and cancel are
/// observed within one checkpoint. Checkpoints spent paused do not count
/// towards the current second.
///
/// The worker exits as soon as it sees its run cancelled or replaced by a
/// newer generation.
pub(super) fn run(
    shared: Arc<Shared>,
    generation: u64,
    options: SchedulerOptions,
    callbacks: RunCallbacks,
) {
    let RunCallbacks { on_tick, on_finish } = callbacks;
    let mut checkpoints = 0u32;

    loop {
        thread::sleep(options.checkpoint);

        let tick = {
            let mut control = shared.lock();
            if control.generation != generation {
                debug!(generation, "Run superseded, worker exiting");
                return;
            }
            match control.state {
                TimerState::Running => {}
                TimerState::Paused => continue,
                state => {
                    debug!(generation, state = state.label(), "Run stopped, worker exiting");
                    return;
                }
            }

            checkpoints += 1;
            if checkpoints < options.checkpoints_per_second {
                continue;
            }
            checkpoints = 0;

            control.remaining = control.remaining.saturating_sub(1);
            if control.remaining == 0 {
                // Claimed under the lock: a cancel that acquires it later
                // sees Finished and only waits for this thread to drain.
                control.state = TimerState::Finished;
            }
            Tick::new(control.remaining, control.total)
        };

        trace!(generation, remaining = tick.remaining, total = tick.total, "Tick");
        isolate("on_tick", || on_tick(tick));
        // The final tick's run is already Finished and cannot be cancelled.
        if !tick.is_final() && !still_current(&shared, generation) {
            return;
        }
        shared.listeners.ticks.emit(&tick);

        if tick.is_final() {
            info!(generation, total = tick.total, "Countdown finished");
            shared.listeners.finishes.emit(&tick.total);
            isolate("on_finish", on_finish);
            return;
        }
    }
}

/// Re-checks the run after a callback ran outside the lock.
///
/// A `cancel` whose bounded wait expired has already returned; the detached
/// worker must not emit anything further.
fn still_current(shared: &Shared, generation: u64) -> bool {
    let control = shared.lock();
    let current = control.generation == generation && control.state != TimerState::Cancelled;
    if !current {
        debug!(generation, "Run cancelled during a callback, worker exiting");
    }
    current
}
