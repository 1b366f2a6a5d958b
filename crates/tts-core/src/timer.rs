//! Countdown run states and the values observers receive.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a countdown run.
///
/// ```text
/// Idle -> Running <-> Paused -> Finished | Cancelled
/// ```
///
/// `Finished` and `Cancelled` are terminal for a run; starting again creates
/// a new run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    #[default]
    Idle,
    Running,
    Paused,
    Cancelled,
    Finished,
}

impl TimerState {
    /// Returns true while a run is Running or Paused.
    ///
    /// Only one active run may exist at a time.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    /// Returns the display label for this state.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Running => "Running",
            Self::Paused => "Paused",
            Self::Cancelled => "Cancelled",
            Self::Finished => "Finished",
        }
    }
}

/// Payload of a tick notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    pub remaining: u64,
    pub total: u64,
}

impl Tick {
    pub fn new(remaining: u64, total: u64) -> Self {
        Self { remaining, total }
    }

    /// Remaining share of the run as a whole percentage (0 when total is 0).
    #[must_use]
    pub fn percent(&self) -> u64 {
        if self.total == 0 {
            return 0;
        }
        self.remaining.saturating_mul(100) / self.total
    }

    /// Remaining share of the run in `0.0..=1.0`, for progress rings.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.remaining as f64 / self.total as f64
    }

    #[must_use]
    pub fn is_final(&self) -> bool {
        self.remaining == 0
    }
}

/// Point-in-time view of the scheduler, safe to take from any thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub remaining: u64,
    pub total: u64,
}

impl TimerSnapshot {
    #[must_use]
    pub fn tick(&self) -> Tick {
        Tick::new(self.remaining, self.total)
    }
}
