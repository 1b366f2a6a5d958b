//! Aggregated outcome of executing an action.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, PowerAction};

/// What the executor reports back.
///
/// `success` is an executor-level flag: a termination where some or even all
/// targets survived is still a successful execution, with the shortfall
/// visible in `count`/`total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(flatten)]
    pub kind: ResultKind,
}

/// Per-type result payload, serialized with a `type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResultKind {
    /// `count` groups out of `total` had at least one PID terminated.
    Termination { count: usize, total: usize },
    /// A fire-and-forget power request; `issued` is false only when the
    /// request could not even be handed to the OS.
    System { action: PowerAction, issued: bool },
}

/// How a result should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Partial,
    Failure,
}

/// Outcome published to observers once an armed action has run.
pub type ActionOutcome = Result<ActionResult, ConfigError>;

impl ActionResult {
    pub fn termination(count: usize, total: usize) -> Self {
        Self {
            success: true,
            kind: ResultKind::Termination { count, total },
        }
    }

    pub fn system(action: PowerAction, issued: bool) -> Self {
        Self {
            success: true,
            kind: ResultKind::System { action, issued },
        }
    }

    /// Distinguishes total failure from partial success.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self.kind {
            ResultKind::Termination { count, total } if count >= total => Severity::Success,
            ResultKind::Termination { count: 0, .. } => Severity::Failure,
            ResultKind::Termination { .. } => Severity::Partial,
            ResultKind::System { issued: true, .. } => Severity::Success,
            ResultKind::System { issued: false, .. } => Severity::Failure,
        }
    }

    /// User-facing summary line.
    #[must_use]
    pub fn message(&self) -> Cow<'static, str> {
        match self.kind {
            ResultKind::Termination { count, total } => match self.severity() {
                Severity::Success => Cow::Owned(format!("Successfully terminated {count} apps!")),
                Severity::Partial => Cow::Owned(format!("Terminated {count}/{total} apps.")),
                Severity::Failure => Cow::Borrowed("Failed to terminate selected apps."),
            },
            ResultKind::System { action, issued: true } => Cow::Borrowed(action.progress_message()),
            ResultKind::System { action, issued: false } => {
                Cow::Owned(format!("Failed to request {action}."))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_termination_messages() {
        let all = ActionResult::termination(2, 2);
        assert_eq!(all.severity(), Severity::Success);
        assert_eq!(all.message(), "Successfully terminated 2 apps!");

        let some = ActionResult::termination(1, 3);
        assert_eq!(some.severity(), Severity::Partial);
        assert_eq!(some.message(), "Terminated 1/3 apps.");

        let none = ActionResult::termination(0, 1);
        assert!(none.success);
        assert_eq!(none.severity(), Severity::Failure);
        assert_eq!(none.message(), "Failed to terminate selected apps.");
    }

    #[test]
    fn test_system_messages() {
        let issued = ActionResult::system(PowerAction::Shutdown, true);
        assert_eq!(issued.message(), "Shutting down system...");
        assert_eq!(issued.severity(), Severity::Success);

        let failed = ActionResult::system(PowerAction::Sleep, false);
        assert!(failed.success);
        assert_eq!(failed.severity(), Severity::Failure);
        assert_eq!(failed.message(), "Failed to request sleep.");
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(ActionResult::termination(1, 1)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": true, "type": "termination", "count": 1, "total": 1})
        );

        let json = serde_json::to_value(ActionResult::system(PowerAction::Lock, true)).unwrap();
        assert_eq!(json["type"], "system");
        assert_eq!(json["action"], "lock");
    }
}
