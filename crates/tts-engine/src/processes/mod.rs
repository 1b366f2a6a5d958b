//! Process registry: groups live OS processes by executable name.
//!
//! Every refresh is a fresh, best-effort snapshot. Nothing is merged with the
//! previous one and nothing is cached across callers except icons.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Per-PID failures are counted and logged, never propagated

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, info};
use tts_core::{ConfigError, ConfigResult, ProcessEntry, ProcessGroup};

mod facility;
mod icons;

pub use facility::{DryRunProcesses, ProcessFacility, SysinfoProcesses, TerminateOutcome};
pub use icons::{IconCache, IconError, IconProvider, NoIcons};

/// Outcome of terminating a batch of PIDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminationReport {
    pub terminated: Vec<u32>,
    pub failed: Vec<(u32, TerminateOutcome)>,
}

impl TerminationReport {
    /// True if at least one PID was terminated.
    ///
    /// Deliberately weak: a group with one survivor still counts.
    #[must_use]
    pub fn any_terminated(&self) -> bool {
        !self.terminated.is_empty()
    }

    #[must_use]
    pub fn attempted(&self) -> usize {
        self.terminated.len() + self.failed.len()
    }
}

/// Enumerates, groups and terminates OS processes.
pub struct ProcessRegistry {
    facility: Arc<dyn ProcessFacility>,
    icons: Arc<IconCache>,
}

impl ProcessRegistry {
    pub fn new(facility: Arc<dyn ProcessFacility>, icons: Arc<IconCache>) -> Self {
        Self { facility, icons }
    }

    /// Registry over the real OS process table without icons.
    pub fn system() -> Self {
        Self::new(Arc::new(SysinfoProcesses::new()), Arc::new(IconCache::default()))
    }

    /// Enumerates live processes and groups them by exact display name.
    ///
    /// Without `include_system_processes`, processes lacking an executable
    /// path are left out. Groups come back sorted case-insensitively by
    /// name, each with its cached icon if one exists.
    pub fn refresh(&self, include_system_processes: bool) -> Vec<ProcessGroup> {
        let entries = self.facility.list_processes();
        let mut groups = group_processes(&entries, include_system_processes);

        for group in &mut groups {
            group.icon = group.executable().and_then(|path| self.icons.get(path));
        }

        debug!(
            processes = entries.len(),
            groups = groups.len(),
            include_system_processes,
            "Process registry refreshed"
        );
        groups
    }

    /// Attempts every PID and returns true if at least one was terminated.
    pub fn terminate(&self, pids: &BTreeSet<u32>) -> bool {
        self.terminate_all(pids).any_terminated()
    }

    /// Attempts every PID, never stopping early, and reports each outcome.
    pub fn terminate_all(&self, pids: &BTreeSet<u32>) -> TerminationReport {
        let mut report = TerminationReport::default();

        for &pid in pids {
            let outcome = self.facility.terminate(pid);
            facility::log_outcome(pid, outcome);
            if outcome.is_success() {
                report.terminated.push(pid);
            } else {
                report.failed.push((pid, outcome));
            }
        }

        info!(
            attempted = report.attempted(),
            terminated = report.terminated.len(),
            failed = report.failed.len(),
            "Termination batch complete"
        );
        report
    }

    pub fn icons(&self) -> &IconCache {
        &self.icons
    }
}

/// Groups a process snapshot by exact display name.
///
/// Entries with an empty name are skipped. Sorting is case-insensitive with
/// the exact name as tie-breaker, so output order is deterministic.
pub fn group_processes(entries: &[ProcessEntry], include_system_processes: bool) -> Vec<ProcessGroup> {
    let mut by_name: HashMap<&str, ProcessGroup> = HashMap::new();

    for entry in entries {
        if entry.name.is_empty() {
            continue;
        }
        if !include_system_processes && !entry.has_executable() {
            continue;
        }
        by_name
            .entry(entry.name.as_str())
            .or_insert_with(|| ProcessGroup::new(entry.name.clone()))
            .push(entry);
    }

    let mut groups: Vec<ProcessGroup> = by_name.into_values().collect();
    groups.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    groups
}

/// Picks groups by case-insensitive name, in the order requested.
///
/// # Errors
///
/// - `ConfigError::NoMatchingProcess` for the first name without a group
pub fn select_groups<S: AsRef<str>>(groups: &[ProcessGroup], names: &[S]) -> ConfigResult<Vec<ProcessGroup>> {
    let mut selected: Vec<ProcessGroup> = Vec::with_capacity(names.len());

    for name in names {
        let name = name.as_ref();
        let matching = groups.iter().filter(|g| g.matches_name(name));

        let mut found = false;
        for group in matching {
            found = true;
            if !selected.iter().any(|s| s.name == group.name) {
                selected.push(group.clone());
            }
        }
        if !found {
            return Err(ConfigError::NoMatchingProcess(name.to_string()));
        }
    }
    Ok(selected)
}
