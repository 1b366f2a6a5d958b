//! Validated timer configuration, snapshotted at arm time.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{Action, ConfigError, ConfigResult, ProcessGroup, TimerTarget};

/// How the firing moment was specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    Countdown,
    SpecificTime,
    Immediate,
}

/// A fully validated request to run an action after `total_seconds`.
///
/// Construction is the only validation point: once built, the
/// configuration can be handed to the scheduler without further checks.
/// Selected groups are a snapshot and are not re-resolved when the OS
/// process table changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfiguration {
    mode: TimerMode,
    total_seconds: u64,
    action: Action,
    selection: Vec<ProcessGroup>,
}

impl TimerConfiguration {
    /// Resolves `target` against `now` and checks the action's requirements.
    ///
    /// Groups passed for a system action are dropped.
    ///
    /// # Errors
    ///
    /// Any resolver error, then `ConfigError::NoTargetSelected` when
    /// terminating with an empty selection.
    pub fn new(
        target: &TimerTarget,
        action: Action,
        selection: Vec<ProcessGroup>,
        now: NaiveDateTime,
    ) -> ConfigResult<Self> {
        let total_seconds = target.resolve(now)?;

        let selection = if action.needs_targets() {
            if selection.is_empty() {
                return Err(ConfigError::NoTargetSelected);
            }
            selection
        } else {
            Vec::new()
        };

        Ok(Self {
            mode: target.mode(),
            total_seconds,
            action,
            selection,
        })
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn total_seconds(&self) -> u64 {
        self.total_seconds
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn selection(&self) -> &[ProcessGroup] {
        &self.selection
    }

    #[must_use]
    pub fn is_immediate(&self) -> bool {
        self.mode == TimerMode::Immediate
    }

    /// Short description of what the action hits.
    ///
    /// One group gives its name, several give "N apps", system actions
    /// give "System".
    #[must_use]
    pub fn target_description(&self) -> String {
        if !self.action.needs_targets() {
            return "System".to_string();
        }
        match self.selection.as_slice() {
            [only] => only.name.clone(),
            groups => format!("{} apps", groups.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CountdownFields;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .and_then(|d| d.and_hms_opt(8, 30, 0))
            .unwrap()
    }

    fn countdown(s: u64) -> TimerTarget {
        TimerTarget::Countdown(CountdownFields::from_parts(0, 0, s))
    }

    #[test]
    fn test_terminate_requires_selection() {
        let result = TimerConfiguration::new(&countdown(5), Action::TerminateProcess, vec![], now());
        assert_eq!(result, Err(ConfigError::NoTargetSelected));
    }

    #[test]
    fn test_duration_errors_come_first() {
        let result = TimerConfiguration::new(&countdown(0), Action::TerminateProcess, vec![], now());
        assert_eq!(result, Err(ConfigError::NonPositiveDuration));
    }

    #[test]
    fn test_system_action_drops_selection() {
        let config = TimerConfiguration::new(
            &countdown(10),
            Action::Shutdown,
            vec![ProcessGroup::new("firefox")],
            now(),
        )
        .unwrap();
        assert!(config.selection().is_empty());
        assert_eq!(config.total_seconds(), 10);
        assert_eq!(config.mode(), TimerMode::Countdown);
        assert_eq!(config.target_description(), "System");
    }

    #[test]
    fn test_target_description() {
        let one = TimerConfiguration::new(
            &countdown(1),
            Action::TerminateProcess,
            vec![ProcessGroup::new("firefox")],
            now(),
        )
        .unwrap();
        assert_eq!(one.target_description(), "firefox");

        let many = TimerConfiguration::new(
            &countdown(1),
            Action::TerminateProcess,
            vec![ProcessGroup::new("a"), ProcessGroup::new("b"), ProcessGroup::new("c")],
            now(),
        )
        .unwrap();
        assert_eq!(many.target_description(), "3 apps");
    }

    #[test]
    fn test_immediate_configuration() {
        let config =
            TimerConfiguration::new(&TimerTarget::Immediate, Action::Lock, vec![], now()).unwrap();
        assert!(config.is_immediate());
        assert_eq!(config.total_seconds(), 0);
    }
}
