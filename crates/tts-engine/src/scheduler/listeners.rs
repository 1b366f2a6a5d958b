//! Timer event buses and the notification sink adapter.

use std::sync::Arc;

use tts_core::Tick;

use crate::bus::{ListenerBus, ListenerId};

/// Event buses owned by one scheduler.
#[derive(Debug)]
pub struct TimerListeners {
    /// One event per elapsed second, plus the final `(0, total)`
    pub ticks: ListenerBus<Tick>,
    /// New paused flag on every Running <-> Paused transition
    pub pauses: ListenerBus<bool>,
    /// Total seconds of a run that reached zero
    pub finishes: ListenerBus<u64>,
    /// Total seconds of a run that was cancelled
    pub cancels: ListenerBus<u64>,
}

impl TimerListeners {
    pub fn new() -> Self {
        Self {
            ticks: ListenerBus::new("tick"),
            pauses: ListenerBus::new("pause"),
            finishes: ListenerBus::new("finish"),
            cancels: ListenerBus::new("cancel"),
        }
    }
}

impl Default for TimerListeners {
    fn default() -> Self {
        Self::new()
    }
}

/// An observer of timer events, such as a tray icon or a status panel.
///
/// Every method has a no-op default, so sinks implement only what they
/// display. Methods are called from the countdown worker thread for ticks
/// and finishes, and from the caller's thread for pause and cancel.
pub trait NotificationSink: Send + Sync {
    fn on_tick(&self, _tick: Tick) {}

    fn on_pause_changed(&self, _paused: bool) {}

    fn on_finish(&self, _total: u64) {}

    fn on_cancel(&self, _total: u64) {}
}

/// Listener ids of an attached sink, used to detach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    tick: ListenerId,
    pause: ListenerId,
    finish: ListenerId,
    cancel: ListenerId,
}

impl TimerListeners {
    /// Subscribes `sink` to all four buses.
    pub fn attach(&self, sink: Arc<dyn NotificationSink>) -> Subscription {
        let s = Arc::clone(&sink);
        let tick = self.ticks.add(move |t| s.on_tick(*t));
        let s = Arc::clone(&sink);
        let pause = self.pauses.add(move |p| s.on_pause_changed(*p));
        let s = Arc::clone(&sink);
        let finish = self.finishes.add(move |total| s.on_finish(*total));
        let cancel = self.cancels.add(move |total| sink.on_cancel(*total));

        Subscription {
            tick,
            pause,
            finish,
            cancel,
        }
    }

    /// Removes every listener of a subscription.
    pub fn detach(&self, subscription: &Subscription) {
        self.ticks.remove(subscription.tick);
        self.pauses.remove(subscription.pause);
        self.finishes.remove(subscription.finish);
        self.cancels.remove(subscription.cancel);
    }
}
