//! tts - timed termination and shutdown scheduler
//!
//! Counts down, then terminates the selected apps or shuts down, restarts,
//! locks or sleeps the machine.
//!
//! # Usage
//!
//! ```bash
//! # List running apps, grouped by name
//! tts list
//!
//! # Close every "firefox" process in 1h30m
//! tts start --hours 1 --minutes 30 --action terminate --target firefox
//!
//! # Shut down at 23:00 (tomorrow if 23:00 has passed)
//! tts start --at 23:00 --action shutdown
//!
//! # Show the effective settings
//! tts config
//! ```
//!
//! While a countdown runs, type `p` + Enter to pause or resume, `s` for the
//! status, `c` to cancel. Ctrl-C cancels as well.

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveTime};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tts_core::format::format_clock;
use tts_core::{
    Action, ActionOutcome, ActionResult, CountdownFields, FinishEstimate, Severity, Tick,
    TimerConfiguration, TimerTarget,
};
use tts_engine::{
    select_groups, ActionExecutor, ArmOutcome, DryRunPower, DryRunProcesses, IconCache,
    NotificationSink, PowerFacility, ProcessFacility, ProcessRegistry, Settings,
    SysinfoProcesses, SystemPower, TimerController,
};

/// Timed termination scheduler
#[derive(Parser, Debug)]
#[command(name = "tts", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Settings file (defaults to $TTS_CONFIG or <config dir>/tts/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log terminations and power requests instead of performing them
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List running apps grouped by name
    List {
        /// Include processes without an executable path
        #[arg(long)]
        all: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Arm a timer and wait for it
    Start(StartArgs),
    /// Print the effective settings
    Config,
}

#[derive(clap::Args, Debug)]
struct StartArgs {
    /// Countdown hours
    #[arg(long, default_value = "", conflicts_with_all = ["at", "now"])]
    hours: String,

    /// Countdown minutes
    #[arg(long, default_value = "", conflicts_with_all = ["at", "now"])]
    minutes: String,

    /// Countdown seconds
    #[arg(long, default_value = "", conflicts_with_all = ["at", "now"])]
    seconds: String,

    /// Run at a time of day, HH:MM or HH:MM:SS
    #[arg(long, conflicts_with = "now")]
    at: Option<String>,

    /// Run the action right away
    #[arg(long)]
    now: bool,

    /// terminate, shutdown, restart, lock or sleep
    #[arg(long, default_value = "terminate")]
    action: String,

    /// App name to terminate (repeatable)
    #[arg(long = "target", short = 't')]
    targets: Vec<String>,

    /// Match targets among processes without an executable path too
    #[arg(long)]
    all: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("tts=info".parse()?)
                .add_directive("tts_engine=info".parse()?)
                .add_directive("tts_core=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut settings = load_settings(args.config.as_ref())?;
    if args.dry_run {
        settings.dry_run = true;
    }

    match args.command {
        Command::List { all, json } => {
            list(&settings, all, json)?;
            Ok(())
        }
        Command::Start(start_args) => {
            let ok = start(settings, start_args).await?;
            if !ok {
                process::exit(1);
            }
            Ok(())
        }
        Command::Config => {
            let path = args.config.or_else(Settings::default_path);
            match path {
                Some(path) => println!("# {}", path.display()),
                None => println!("# no config directory"),
            }
            print!("{}", settings.to_toml());
            Ok(())
        }
    }
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings> {
    let settings = match path {
        Some(path) => Settings::load(path),
        None => Settings::load_default(),
    };
    settings.context("Failed to load settings")
}

fn build_registry(settings: &Settings) -> Arc<ProcessRegistry> {
    let facility: Arc<dyn ProcessFacility> = if settings.dry_run {
        Arc::new(DryRunProcesses::new(SysinfoProcesses::new()))
    } else {
        Arc::new(SysinfoProcesses::new())
    };
    Arc::new(ProcessRegistry::new(facility, Arc::new(IconCache::default())))
}

// ============================================================================
// list
// ============================================================================

fn list(settings: &Settings, all: bool, json: bool) -> Result<()> {
    let registry = build_registry(settings);
    let groups = registry.refresh(all || settings.include_system_processes);

    if json {
        let text = serde_json::to_string_pretty(&groups).context("Failed to encode groups")?;
        println!("{text}");
        return Ok(());
    }

    let mut out = std::io::stdout().lock();
    writeln!(out, "{:<32} {:>6}  EXECUTABLE", "NAME", "PIDS")?;
    for group in &groups {
        let exe = group
            .executable()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(out, "{:<32} {:>6}  {exe}", group.name, group.len())?;
    }
    Ok(())
}

// ============================================================================
// start
// ============================================================================

/// Prints tick and pause updates on stderr.
struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn on_tick(&self, tick: Tick) {
        if tick.remaining % 60 == 0 || tick.remaining <= 10 {
            eprintln!("{} left ({}%)", format_clock(tick.remaining), tick.percent());
        }
    }

    fn on_pause_changed(&self, paused: bool) {
        eprintln!("{}", if paused { "Paused" } else { "Resumed" });
    }

    fn on_cancel(&self, total: u64) {
        eprintln!("Cancelled {} timer", format_clock(total));
    }
}

fn target_from(args: &StartArgs) -> Result<TimerTarget> {
    if args.now {
        return Ok(TimerTarget::Immediate);
    }
    if let Some(at) = &args.at {
        let time = NaiveTime::parse_from_str(at, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(at, "%H:%M:%S"))
            .with_context(|| format!("Invalid time of day: {at}"))?;
        return Ok(TimerTarget::SpecificTime(Some(time)));
    }
    Ok(TimerTarget::Countdown(CountdownFields::new(
        args.hours.as_str(),
        args.minutes.as_str(),
        args.seconds.as_str(),
    )))
}

/// Arms the timer and waits for its outcome. Returns false when the action
/// failed outright.
async fn start(settings: Settings, args: StartArgs) -> Result<bool> {
    let action = Action::from_str(&args.action)?;
    let target = target_from(&args)?;

    let registry = build_registry(&settings);
    let selection = if action.needs_targets() {
        let groups = registry.refresh(args.all || settings.include_system_processes);
        select_groups(&groups, args.targets.as_slice())?
    } else {
        if !args.targets.is_empty() {
            warn!(%action, "Targets are ignored for system actions");
        }
        Vec::new()
    };

    let now = Local::now().naive_local();
    let config = TimerConfiguration::new(&target, action, selection, now)?;

    let power: Arc<dyn PowerFacility> = if settings.dry_run {
        Arc::new(DryRunPower)
    } else {
        Arc::new(SystemPower)
    };
    let executor = Arc::new(ActionExecutor::new(registry, power));
    let controller = Arc::new(TimerController::new(executor, settings.scheduler_options()));

    let (result_tx, mut result_rx) = mpsc::unbounded_channel::<ActionOutcome>();
    controller.add_result_listener(move |outcome| {
        let _ = result_tx.send(outcome.clone());
    });
    controller.scheduler().attach(Arc::new(ConsoleSink));

    let description = config.target_description();
    let total_seconds = match controller.arm(config)? {
        ArmOutcome::Executed(result) => return Ok(report(&result, args.json)),
        ArmOutcome::AlreadyActive => bail!("A timer is already active"),
        ArmOutcome::Started { total_seconds } => total_seconds,
    };

    let estimate = FinishEstimate::new(now, total_seconds);
    eprintln!(
        "{} ({description}) at {} {}, {}. Type p to pause, s for status, c to cancel.",
        action.label(),
        estimate.clock(),
        estimate.relative_day(),
        estimate.date_label(),
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Error waiting for Ctrl-C");
            return;
        }
        info!("Interrupt received");
        signal_token.cancel();
    });

    let mut lines = spawn_line_reader(BufReader::new(std::io::stdin()));
    let mut stdin_open = true;

    loop {
        tokio::select! {
            outcome = result_rx.recv() => {
                let result = match outcome {
                    Some(outcome) => outcome?,
                    None => bail!("Timer stopped without a result"),
                };
                return Ok(report(&result, args.json));
            }
            _ = shutdown.cancelled() => {
                cancel(&controller).await?;
                return Ok(true);
            }
            line = lines.recv(), if stdin_open => {
                match line {
                    Some(line) => match line.trim() {
                        "p" => {
                            controller.toggle_pause();
                        }
                        "s" => match controller.status_text() {
                            Some(status) => eprintln!("{status}"),
                            None => eprintln!("No active timer"),
                        },
                        "c" => {
                            cancel(&controller).await?;
                            return Ok(true);
                        }
                        "" => {}
                        other => eprintln!("Unknown command {other:?}: p, s or c"),
                    },
                    None => stdin_open = false,
                }
            }
        }
    }
}

/// Forwards lines from `reader` until EOF or a read error.
///
/// The reader thread is never joined, so a pending read cannot hold up
/// runtime shutdown once the timer is done.
fn spawn_line_reader<R>(reader: R) -> mpsc::UnboundedReceiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in reader.lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read stdin");
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "Failed to spawn stdin reader; commands disabled");
    }
    rx
}

/// Cancels off the runtime: the scheduler blocks until its worker exits.
async fn cancel(controller: &Arc<TimerController>) -> Result<()> {
    let controller = Arc::clone(controller);
    tokio::task::spawn_blocking(move || controller.cancel())
        .await
        .context("Cancel task failed")?;
    Ok(())
}

fn report(result: &ActionResult, json: bool) -> bool {
    if json {
        match serde_json::to_string(result) {
            Ok(text) => println!("{text}"),
            Err(e) => error!(error = %e, "Failed to encode result"),
        }
    } else {
        println!("{}", result.message());
    }
    result.severity() != Severity::Failure
}
