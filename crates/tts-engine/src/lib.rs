//! tts engine - countdown scheduling and action execution
//!
//! This crate turns a validated `TimerConfiguration` into a performed action:
//! - `scheduler` - single-run countdown with pause, resume and cancel
//! - `processes` - process listing, grouping by name and termination
//! - `power` - shutdown, restart, lock and sleep requests
//! - `executor` - runs an action against the selected groups
//! - `controller` - arms configurations and publishes outcomes
//! - `settings` - user settings from TOML
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TimerController                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐ finish  ┌─────────────────────────┐    │
//! │  │    Scheduler    │────────▶│     ActionExecutor      │    │
//! │  │ (worker thread) │         │                         │    │
//! │  └────────┬────────┘         └──────┬────────────┬─────┘    │
//! │           │ ticks/pause             │            │          │
//! │           ▼                         ▼            ▼          │
//! │  ┌─────────────────┐   ┌─────────────────┐ ┌────────────┐   │
//! │  │ TimerListeners  │   │ ProcessRegistry │ │   Power    │   │
//! │  └─────────────────┘   └─────────────────┘ └────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()` in production code
//! - Listener and action callbacks are isolated with `catch_unwind`
//! - OS failures surface as values (`TerminateOutcome`, `PowerError`)

pub mod bus;
pub mod controller;
pub mod executor;
pub mod power;
pub mod processes;
pub mod scheduler;
pub mod settings;

pub use bus::{ListenerBus, ListenerId};
pub use controller::{ArmOutcome, TimerController};
pub use executor::ActionExecutor;
pub use power::{DryRunPower, PowerError, PowerFacility, SystemPower};
pub use processes::{
    group_processes, select_groups, DryRunProcesses, IconCache, IconError, IconProvider, NoIcons,
    ProcessFacility, ProcessRegistry, SysinfoProcesses, TerminateOutcome, TerminationReport,
};
pub use scheduler::{NotificationSink, Scheduler, SchedulerOptions, Subscription, TimerListeners};
pub use settings::{Settings, SettingsError};
