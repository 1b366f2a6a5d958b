//! Configuration errors following panic-free policy.
//!
//! Every variant is a rejection raised before any state change: the timer is
//! not armed and no action is executed.

use thiserror::Error;

/// Errors that reject a timer configuration or an action request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A countdown field is not a non-negative integer
    #[error("Invalid time input: {field} = {value:?}")]
    InvalidInput { field: &'static str, value: String },

    /// The countdown adds up to zero seconds
    #[error("Time must be greater than 0")]
    NonPositiveDuration,

    /// Specific-time mode without a chosen time of day
    #[error("Please pick a time")]
    NoTimeSelected,

    /// The duration reaches the 999 hour ceiling
    #[error("Timer cannot exceed 999 hours (got {seconds} seconds)")]
    DurationTooLarge { seconds: u64 },

    /// Process termination requested with nothing selected
    #[error("Please select at least one process")]
    NoTargetSelected,

    /// Action identifier not recognised
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// No running process group carries the requested name
    #[error("No running process named {0:?}")]
    NoMatchingProcess(String),
}

/// Result type for configuration and action requests.
pub type ConfigResult<T> = Result<T, ConfigError>;
