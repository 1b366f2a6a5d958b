//! The irreversible actions a timer can arm.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Action executed when a timer reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Terminate every PID of the selected process groups.
    #[default]
    TerminateProcess,
    Shutdown,
    Restart,
    Lock,
    Sleep,
}

impl Action {
    /// All actions in menu order.
    pub const ALL: [Action; 5] = [
        Action::TerminateProcess,
        Action::Shutdown,
        Action::Restart,
        Action::Lock,
        Action::Sleep,
    ];

    /// Returns the display label for this action.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::TerminateProcess => "Terminate Process",
            Self::Shutdown => "Shutdown",
            Self::Restart => "Restart",
            Self::Lock => "Lock",
            Self::Sleep => "Sleep",
        }
    }

    /// Returns the OS power request for system actions.
    ///
    /// `None` for [`Action::TerminateProcess`], which goes through the
    /// process registry instead.
    #[must_use]
    pub fn power(&self) -> Option<PowerAction> {
        match self {
            Self::TerminateProcess => None,
            Self::Shutdown => Some(PowerAction::Shutdown),
            Self::Restart => Some(PowerAction::Restart),
            Self::Lock => Some(PowerAction::Lock),
            Self::Sleep => Some(PowerAction::Sleep),
        }
    }

    /// Returns true if this action needs selected process groups.
    #[must_use]
    pub fn needs_targets(&self) -> bool {
        matches!(self, Self::TerminateProcess)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Action {
    type Err = ConfigError;

    /// Accepts labels and short names in any case, ignoring spaces,
    /// dashes and underscores ("Terminate Process", "terminate", "sleep").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "terminate" | "terminateprocess" | "kill" => Ok(Self::TerminateProcess),
            "shutdown" | "poweroff" => Ok(Self::Shutdown),
            "restart" | "reboot" => Ok(Self::Restart),
            "lock" => Ok(Self::Lock),
            "sleep" | "suspend" => Ok(Self::Sleep),
            _ => Err(ConfigError::UnknownAction(s.to_string())),
        }
    }
}

/// Fire-and-forget request issued to the OS power facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerAction {
    Shutdown,
    Restart,
    Lock,
    Sleep,
}

impl PowerAction {
    /// Progress message shown once the request has been issued.
    #[must_use]
    pub fn progress_message(&self) -> &'static str {
        match self {
            Self::Shutdown => "Shutting down system...",
            Self::Restart => "Restarting system...",
            Self::Lock => "Locking workstation...",
            Self::Sleep => "Putting system to sleep...",
        }
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Shutdown => "shutdown",
            Self::Restart => "restart",
            Self::Lock => "lock",
            Self::Sleep => "sleep",
        };
        f.write_str(name)
    }
}
