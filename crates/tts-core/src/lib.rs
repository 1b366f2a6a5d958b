//! TTS Core - Shared types for the delayed action timer
//!
//! This crate provides the domain types shared between the scheduling
//! engine (tts-engine) and the command-line front end (tts).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod action;
pub mod config;
pub mod error;
pub mod format;
pub mod process;
pub mod result;
pub mod target;
pub mod timer;

// Re-exports for convenience
pub use action::{Action, PowerAction};
pub use config::{TimerConfiguration, TimerMode};
pub use error::{ConfigError, ConfigResult};
pub use process::{ImageBlob, ProcessEntry, ProcessGroup};
pub use result::{ActionOutcome, ActionResult, ResultKind, Severity};
pub use target::{
    resolve_specific_time, validate_duration, CountdownFields, FinishEstimate, TimerTarget,
    MAX_DURATION_SECS,
};
pub use timer::{Tick, TimerSnapshot, TimerState};
