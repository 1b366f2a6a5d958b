//! Integration tests for the executor and the timer controller.
//!
//! The OS is replaced by in-memory facilities, so these tests never
//! terminate a real process or touch the power state.
//!
//! Tests CAN use `.unwrap()` and `.expect()`.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tts_core::{
    Action, ActionOutcome, ActionResult, ConfigError, CountdownFields, PowerAction,
    ProcessEntry, ProcessGroup, ResultKind, Severity, TimerConfiguration, TimerTarget,
};
use tts_engine::{
    group_processes, ActionExecutor, ArmOutcome, IconCache, PowerError, PowerFacility,
    ProcessFacility, ProcessRegistry, SchedulerOptions, TerminateOutcome, TimerController,
};

// ============================================================================
// Test Helpers
// ============================================================================

struct FakeProcesses {
    entries: Vec<ProcessEntry>,
    killable: BTreeSet<u32>,
    attempts: Mutex<Vec<u32>>,
}

impl FakeProcesses {
    fn new(killable: &[u32]) -> Self {
        let entry = |pid, name: &str| {
            ProcessEntry::new(pid, name, Some(PathBuf::from(format!("/usr/bin/{name}"))))
        };
        Self {
            entries: vec![
                entry(100, "editor"),
                entry(200, "browser"),
                entry(201, "browser"),
                entry(300, "player"),
            ],
            killable: killable.iter().copied().collect(),
            attempts: Mutex::new(Vec::new()),
        }
    }
}

impl ProcessFacility for FakeProcesses {
    fn list_processes(&self) -> Vec<ProcessEntry> {
        self.entries.clone()
    }

    fn terminate(&self, pid: u32) -> TerminateOutcome {
        self.attempts.lock().unwrap().push(pid);
        if self.killable.contains(&pid) {
            TerminateOutcome::Terminated
        } else {
            TerminateOutcome::AccessDenied
        }
    }
}

#[derive(Default)]
struct FakePower {
    requests: Mutex<Vec<PowerAction>>,
    fail: bool,
}

impl PowerFacility for FakePower {
    fn request(&self, action: PowerAction) -> Result<(), PowerError> {
        self.requests.lock().unwrap().push(action);
        if self.fail {
            Err(PowerError::Unsupported(action))
        } else {
            Ok(())
        }
    }
}

struct Harness {
    processes: Arc<FakeProcesses>,
    power: Arc<FakePower>,
    executor: Arc<ActionExecutor>,
}

fn harness(killable: &[u32], power: FakePower) -> Harness {
    let processes = Arc::new(FakeProcesses::new(killable));
    let power = Arc::new(power);
    let registry = Arc::new(ProcessRegistry::new(
        processes.clone(),
        Arc::new(IconCache::default()),
    ));
    let executor = Arc::new(ActionExecutor::new(registry, power.clone()));
    Harness {
        processes,
        power,
        executor,
    }
}

fn groups(h: &Harness, names: &[&str]) -> Vec<ProcessGroup> {
    let all = group_processes(&h.processes.list_processes(), false);
    all.into_iter()
        .filter(|g| names.contains(&g.name.as_str()))
        .collect()
}

fn fast_options() -> SchedulerOptions {
    SchedulerOptions {
        checkpoint: Duration::from_millis(2),
        checkpoints_per_second: 10,
        cancel_timeout: Duration::from_secs(2),
    }
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 18)
        .unwrap()
        .and_hms_opt(22, 0, 0)
        .unwrap()
}

fn countdown(h: u64, m: u64, s: u64) -> TimerTarget {
    TimerTarget::Countdown(CountdownFields::from_parts(h, m, s))
}

fn result_channel(controller: &TimerController) -> mpsc::Receiver<ActionOutcome> {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    controller.add_result_listener(move |outcome| {
        let _ = tx.lock().unwrap().send(outcome.clone());
    });
    rx
}

// ============================================================================
// Executor Tests
// ============================================================================

#[test]
fn test_terminate_counts_groups_with_any_pid_terminated() {
    // browser keeps one survivor but still counts as terminated
    let h = harness(&[100, 200], FakePower::default());
    let selected = groups(&h, &["editor", "browser", "player"]);

    let result = h
        .executor
        .execute(Action::TerminateProcess, &selected)
        .expect("selection is not empty");

    assert_eq!(result, ActionResult::termination(2, 3));
    assert_eq!(result.severity(), Severity::Partial);
    assert_eq!(result.message(), "Terminated 2/3 apps.");
    let attempts: BTreeSet<u32> = h.processes.attempts.lock().unwrap().iter().copied().collect();
    assert_eq!(attempts, BTreeSet::from([100, 200, 201, 300]));
}

#[test]
fn test_terminate_all_failing_is_still_success() {
    let h = harness(&[], FakePower::default());
    let selected = groups(&h, &["editor", "player"]);

    let result = h.executor.execute(Action::TerminateProcess, &selected).unwrap();

    assert!(result.success);
    assert_eq!(result.kind, ResultKind::Termination { count: 0, total: 2 });
    assert_eq!(result.severity(), Severity::Failure);
    assert_eq!(result.message(), "Failed to terminate selected apps.");
}

#[test]
fn test_terminate_empty_selection_is_rejected() {
    let h = harness(&[100], FakePower::default());
    assert_eq!(
        h.executor.execute(Action::TerminateProcess, &[]),
        Err(ConfigError::NoTargetSelected)
    );
    assert!(h.processes.attempts.lock().unwrap().is_empty());
}

#[test]
fn test_power_request_reports_issued() {
    let h = harness(&[], FakePower::default());
    let result = h.executor.execute(Action::Lock, &[]).unwrap();

    assert_eq!(result, ActionResult::system(PowerAction::Lock, true));
    assert_eq!(*h.power.requests.lock().unwrap(), vec![PowerAction::Lock]);
}

#[test]
fn test_failed_power_request_is_not_issued() {
    let h = harness(
        &[],
        FakePower {
            fail: true,
            ..FakePower::default()
        },
    );
    let result = h.executor.execute(Action::Shutdown, &[]).unwrap();

    assert!(result.success);
    assert_eq!(
        result.kind,
        ResultKind::System {
            action: PowerAction::Shutdown,
            issued: false
        }
    );
}

// ============================================================================
// Controller Tests
// ============================================================================

#[test]
fn test_countdown_terminates_selection_on_finish() {
    let h = harness(&[100], FakePower::default());
    let controller = TimerController::new(h.executor.clone(), fast_options());
    let results = result_channel(&controller);

    let config = TimerConfiguration::new(
        &countdown(0, 0, 2),
        Action::TerminateProcess,
        groups(&h, &["editor"]),
        now(),
    )
    .expect("valid configuration");

    assert_eq!(
        controller.arm(config).unwrap(),
        ArmOutcome::Started { total_seconds: 2 }
    );
    assert!(controller.active_configuration().is_some());
    assert!(controller.status_text().is_some());

    let outcome = results
        .recv_timeout(Duration::from_secs(5))
        .expect("result should be published");
    let result = outcome.expect("termination succeeds");
    assert_eq!(result.kind, ResultKind::Termination { count: 1, total: 1 });
    assert_eq!(result.message(), "Successfully terminated 1 apps!");
    assert_eq!(*h.processes.attempts.lock().unwrap(), vec![100]);
    assert!(controller.active_configuration().is_none());
    assert!(controller.status_text().is_none());
}

#[test]
fn test_out_of_range_countdown_never_arms() {
    let h = harness(&[], FakePower::default());
    let err = TimerConfiguration::new(
        &countdown(999, 1, 0),
        Action::Shutdown,
        Vec::new(),
        now(),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::DurationTooLarge { .. }));
    assert!(h.power.requests.lock().unwrap().is_empty());
}

#[test]
fn test_specific_time_resolves_against_now() {
    let h = harness(&[], FakePower::default());
    let controller = TimerController::new(h.executor.clone(), fast_options());

    let target = TimerTarget::SpecificTime(NaiveTime::from_hms_opt(22, 0, 3));
    let config = TimerConfiguration::new(&target, Action::Sleep, Vec::new(), now()).unwrap();

    assert_eq!(
        controller.arm(config).unwrap(),
        ArmOutcome::Started { total_seconds: 3 }
    );
    assert!(controller.cancel());
}

#[test]
fn test_immediate_executes_and_publishes() {
    let h = harness(&[], FakePower::default());
    let controller = TimerController::new(h.executor.clone(), fast_options());
    let results = result_channel(&controller);

    let config =
        TimerConfiguration::new(&TimerTarget::Immediate, Action::Restart, Vec::new(), now())
            .unwrap();
    let outcome = controller.arm(config).unwrap();

    assert_eq!(
        outcome,
        ArmOutcome::Executed(ActionResult::system(PowerAction::Restart, true))
    );
    assert!(results.try_recv().expect("published synchronously").is_ok());
    assert!(!controller.scheduler().is_running());
}

#[test]
fn test_second_arm_is_ignored_while_active() {
    let h = harness(&[], FakePower::default());
    let controller = TimerController::new(h.executor.clone(), fast_options());
    let long = || {
        TimerConfiguration::new(&countdown(1, 0, 0), Action::Lock, Vec::new(), now()).unwrap()
    };

    assert!(matches!(
        controller.arm(long()).unwrap(),
        ArmOutcome::Started { .. }
    ));
    assert_eq!(controller.arm(long()).unwrap(), ArmOutcome::AlreadyActive);

    assert!(controller.pause());
    assert_eq!(controller.toggle_pause(), Some(false));
    assert!(controller.cancel());
    assert!(controller.active_configuration().is_none());
}

#[test]
fn test_cancelled_countdown_never_executes() {
    let h = harness(&[100], FakePower::default());
    let controller = TimerController::new(h.executor.clone(), fast_options());
    let published = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&published);
    controller.add_result_listener(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let config = TimerConfiguration::new(
        &countdown(0, 0, 30),
        Action::TerminateProcess,
        groups(&h, &["editor"]),
        now(),
    )
    .unwrap();
    controller.arm(config).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    assert!(controller.cancel());
    std::thread::sleep(Duration::from_millis(100));

    assert_eq!(published.load(Ordering::SeqCst), 0);
    assert!(h.processes.attempts.lock().unwrap().is_empty());
}
