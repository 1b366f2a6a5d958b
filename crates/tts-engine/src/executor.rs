//! Action executor: performs the armed action and aggregates the outcome.

use std::sync::Arc;

use tracing::{info, warn};
use tts_core::{Action, ActionResult, ConfigError, ConfigResult, ProcessGroup};

use crate::power::PowerFacility;
use crate::processes::ProcessRegistry;

/// Runs actions against the process registry and the power facility.
pub struct ActionExecutor {
    registry: Arc<ProcessRegistry>,
    power: Arc<dyn PowerFacility>,
}

impl ActionExecutor {
    pub fn new(registry: Arc<ProcessRegistry>, power: Arc<dyn PowerFacility>) -> Self {
        Self { registry, power }
    }

    /// Executes `action`, using `selected` for process termination.
    ///
    /// A termination succeeds at executor level even when some or all groups
    /// survive; `count` out of `total` tells how many groups had at least one
    /// PID terminated. Power requests always report success; `issued` says
    /// whether the request reached the OS.
    ///
    /// # Errors
    ///
    /// - `ConfigError::NoTargetSelected` when terminating with no groups
    pub fn execute(&self, action: Action, selected: &[ProcessGroup]) -> ConfigResult<ActionResult> {
        match action.power() {
            None => self.terminate_groups(selected),
            Some(request) => {
                let issued = match self.power.request(request) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(action = %request, error = %e, "Power request failed");
                        false
                    }
                };
                Ok(ActionResult::system(request, issued))
            }
        }
    }

    fn terminate_groups(&self, selected: &[ProcessGroup]) -> ConfigResult<ActionResult> {
        if selected.is_empty() {
            return Err(ConfigError::NoTargetSelected);
        }

        let count = selected
            .iter()
            .filter(|group| {
                let any = self.registry.terminate(&group.pids);
                if !any {
                    warn!(group = %group.name, pids = group.len(), "No process of group terminated");
                }
                any
            })
            .count();

        info!(count, total = selected.len(), "Terminated process groups");
        Ok(ActionResult::termination(count, selected.len()))
    }

    pub fn registry(&self) -> &Arc<ProcessRegistry> {
        &self.registry
    }
}
