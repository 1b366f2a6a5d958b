//! Multi-subscriber notification primitive.
//!
//! A `ListenerBus<E>` holds any number of callbacks and invokes every one of
//! them for each emitted event. Callbacks run on the emitting thread, which
//! for timer events is the countdown worker, not the thread that registered
//! them.
//!
//! # Failure Isolation
//!
//! A panicking listener is caught at the bus boundary and logged. The
//! remaining listeners still run and the emitter carries on.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

/// Identifies a registered listener for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Thread-safe list of event callbacks.
pub struct ListenerBus<E> {
    name: &'static str,
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, Listener<E>)>>,
}

impl<E> ListenerBus<E> {
    /// Creates an empty bus. `name` only appears in logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Registers a listener; it receives every event until removed.
    pub fn add<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Invokes every listener with `event`.
    ///
    /// The listener list is copied before dispatch, so listeners may add or
    /// remove listeners (including themselves) without deadlocking.
    ///
    /// Returns the number of listeners that completed without panicking.
    pub fn emit(&self, event: &E) -> usize {
        let snapshot: Vec<(ListenerId, Listener<E>)> = self.lock().clone();

        let mut delivered = 0;
        for (id, listener) in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    warn!(
                        bus = self.name,
                        listener = %id,
                        reason = panic_message(payload.as_ref()),
                        "Listener panicked; continuing with remaining listeners"
                    );
                }
            }
        }
        delivered
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(ListenerId, Listener<E>)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E> fmt::Debug for ListenerBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerBus")
            .field("name", &self.name)
            .field("listeners", &self.len())
            .finish()
    }
}

/// Runs a one-off callback with the same isolation as bus listeners.
///
/// Returns false if the callback panicked.
pub(crate) fn isolate<F: FnOnce()>(context: &'static str, f: F) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            warn!(
                context,
                reason = panic_message(payload.as_ref()),
                "Callback panicked; ignoring"
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}
