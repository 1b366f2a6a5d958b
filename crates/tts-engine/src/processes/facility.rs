//! OS process facility: enumerate live processes and terminate them.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Vanished or protected processes are reported as outcomes, not errors

use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, Signal, System};
use tracing::{debug, info, warn};
use tts_core::ProcessEntry;

/// Result of asking the OS to terminate one PID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateOutcome {
    Terminated,
    NotFound,
    AccessDenied,
    Zombie,
}

impl TerminateOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Terminated)
    }
}

impl fmt::Display for TerminateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Terminated => "terminated",
            Self::NotFound => "not found",
            Self::AccessDenied => "access denied",
            Self::Zombie => "zombie",
        };
        f.write_str(s)
    }
}

/// Boundary to the operating system's process table.
pub trait ProcessFacility: Send + Sync {
    /// Best-effort snapshot of every live process.
    fn list_processes(&self) -> Vec<ProcessEntry>;

    /// Requests termination of one process.
    fn terminate(&self, pid: u32) -> TerminateOutcome;
}

// ============================================================================
// sysinfo-backed facility
// ============================================================================

/// Process facility backed by the `sysinfo` crate.
///
/// Termination sends SIGTERM where signals exist and falls back to the
/// platform's kill otherwise.
pub struct SysinfoProcesses {
    system: Mutex<System>,
}

impl SysinfoProcesses {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, System> {
        self.system.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SysinfoProcesses {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessFacility for SysinfoProcesses {
    fn list_processes(&self) -> Vec<ProcessEntry> {
        let mut system = self.lock();
        system.refresh_all();

        // Linux reports every thread as a task entry too; only real
        // processes are listed.
        system
            .processes()
            .iter()
            .filter(|(_, process)| process.thread_kind().is_none())
            .map(|(pid, process)| {
                let executable = process
                    .exe()
                    .filter(|path| !path.as_os_str().is_empty())
                    .map(PathBuf::from);
                ProcessEntry::new(
                    pid.as_u32(),
                    process.name().to_string_lossy().into_owned(),
                    executable,
                )
            })
            .filter(|entry| !entry.name.is_empty())
            .collect()
    }

    fn terminate(&self, pid: u32) -> TerminateOutcome {
        let pid = Pid::from_u32(pid);
        let mut system = self.lock();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        let Some(process) = system.process(pid) else {
            return TerminateOutcome::NotFound;
        };
        // Signalling a thread id would hit its whole host process.
        if process.thread_kind().is_some() {
            debug!(%pid, "Refusing to terminate a thread");
            return TerminateOutcome::NotFound;
        }
        if process.status() == ProcessStatus::Zombie {
            return TerminateOutcome::Zombie;
        }

        let sent = process
            .kill_with(Signal::Term)
            .unwrap_or_else(|| process.kill());
        if sent {
            TerminateOutcome::Terminated
        } else {
            TerminateOutcome::AccessDenied
        }
    }
}

// ============================================================================
// Dry-run facility
// ============================================================================

/// Lists real processes but only logs terminations.
pub struct DryRunProcesses<F> {
    inner: F,
}

impl<F: ProcessFacility> DryRunProcesses<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F: ProcessFacility> ProcessFacility for DryRunProcesses<F> {
    fn list_processes(&self) -> Vec<ProcessEntry> {
        self.inner.list_processes()
    }

    fn terminate(&self, pid: u32) -> TerminateOutcome {
        info!(pid, "Dry run: would terminate process");
        TerminateOutcome::Terminated
    }
}

/// Logs the outcome of one termination attempt.
pub(crate) fn log_outcome(pid: u32, outcome: TerminateOutcome) {
    match outcome {
        TerminateOutcome::Terminated => debug!(pid, "Process terminated"),
        other => warn!(pid, outcome = %other, "Failed to terminate process"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<ProcessEntry>);

    impl ProcessFacility for Fixed {
        fn list_processes(&self) -> Vec<ProcessEntry> {
            self.0.clone()
        }

        fn terminate(&self, _pid: u32) -> TerminateOutcome {
            TerminateOutcome::AccessDenied
        }
    }

    #[test]
    fn test_outcome_success() {
        assert!(TerminateOutcome::Terminated.is_success());
        assert!(!TerminateOutcome::NotFound.is_success());
        assert!(!TerminateOutcome::AccessDenied.is_success());
        assert!(!TerminateOutcome::Zombie.is_success());
    }

    #[test]
    fn test_dry_run_never_touches_inner_terminate() {
        let facility = DryRunProcesses::new(Fixed(vec![ProcessEntry::new(7, "svc", None)]));
        assert_eq!(facility.list_processes().len(), 1);
        assert_eq!(facility.terminate(7), TerminateOutcome::Terminated);
    }

    #[test]
    fn test_sysinfo_lists_processes_not_threads() {
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
        let worker = std::thread::Builder::new()
            .name("tts-named-wrk".to_string())
            .spawn(move || {
                ready_tx.send(()).expect("signal ready");
                let _ = stop_rx.recv();
            })
            .expect("spawn named thread");
        ready_rx.recv().expect("thread started");

        let entries = SysinfoProcesses::new().list_processes();
        stop_tx.send(()).expect("stop thread");
        worker.join().expect("join thread");

        assert!(
            entries.iter().all(|e| e.name != "tts-named-wrk"),
            "threads must not be listed as processes"
        );
        let me = std::process::id();
        assert_eq!(entries.iter().filter(|e| e.pid == me).count(), 1);
    }

    #[test]
    fn test_sysinfo_lists_current_process() {
        let facility = SysinfoProcesses::new();
        let me = std::process::id();
        let entries = facility.list_processes();
        assert!(
            entries.iter().any(|e| e.pid == me),
            "current process should be enumerated"
        );
    }

    #[test]
    fn test_sysinfo_terminate_missing_pid() {
        let facility = SysinfoProcesses::new();
        // PIDs are far below this on every supported platform.
        assert_eq!(facility.terminate(999_999_999), TerminateOutcome::NotFound);
    }
}
