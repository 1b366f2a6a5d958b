//! OS power facility: shutdown, restart, lock and sleep requests.
//!
//! Requests are fire-and-forget. The command is spawned and not waited for,
//! since a successful shutdown may tear this process down mid-call.

use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::info;
use tts_core::PowerAction;

/// Errors issuing a power request.
#[derive(Debug, Error)]
pub enum PowerError {
    /// The platform has no known command for this request
    #[error("{0} is not supported on this platform")]
    Unsupported(PowerAction),

    /// The command could not be spawned
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Boundary to the operating system's power and session controls.
pub trait PowerFacility: Send + Sync {
    /// Hands the request to the OS without waiting for it to complete.
    fn request(&self, action: PowerAction) -> Result<(), PowerError>;
}

/// Issues requests with the platform's standard commands.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPower;

impl SystemPower {
    /// The program and arguments used for `action` on this platform.
    pub fn command_for(action: PowerAction) -> Option<(&'static str, &'static [&'static str])> {
        platform_command(action)
    }
}

#[cfg(target_os = "windows")]
fn platform_command(action: PowerAction) -> Option<(&'static str, &'static [&'static str])> {
    let command: (&'static str, &'static [&'static str]) = match action {
        PowerAction::Shutdown => ("shutdown", &["/s", "/t", "1"]),
        PowerAction::Restart => ("shutdown", &["/r", "/t", "1"]),
        PowerAction::Lock => ("rundll32.exe", &["user32.dll,LockWorkStation"]),
        PowerAction::Sleep => ("rundll32.exe", &["powrprof.dll,SetSuspendState", "0,1,0"]),
    };
    Some(command)
}

#[cfg(target_os = "macos")]
fn platform_command(action: PowerAction) -> Option<(&'static str, &'static [&'static str])> {
    let command: (&'static str, &'static [&'static str]) = match action {
        PowerAction::Shutdown => ("osascript", &["-e", "tell app \"System Events\" to shut down"]),
        PowerAction::Restart => ("osascript", &["-e", "tell app \"System Events\" to restart"]),
        PowerAction::Lock => ("pmset", &["displaysleepnow"]),
        PowerAction::Sleep => ("pmset", &["sleepnow"]),
    };
    Some(command)
}

#[cfg(all(unix, not(target_os = "macos")))]
fn platform_command(action: PowerAction) -> Option<(&'static str, &'static [&'static str])> {
    let command: (&'static str, &'static [&'static str]) = match action {
        PowerAction::Shutdown => ("systemctl", &["poweroff"]),
        PowerAction::Restart => ("systemctl", &["reboot"]),
        PowerAction::Lock => ("loginctl", &["lock-session"]),
        PowerAction::Sleep => ("systemctl", &["suspend"]),
    };
    Some(command)
}

#[cfg(not(any(unix, target_os = "windows")))]
fn platform_command(_action: PowerAction) -> Option<(&'static str, &'static [&'static str])> {
    None
}

impl PowerFacility for SystemPower {
    fn request(&self, action: PowerAction) -> Result<(), PowerError> {
        let (program, args) = platform_command(action).ok_or(PowerError::Unsupported(action))?;

        info!(%action, program, ?args, "Issuing power request");
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| PowerError::Spawn { program, source })?;
        Ok(())
    }
}

/// Logs requests instead of issuing them.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunPower;

impl PowerFacility for DryRunPower {
    fn request(&self, action: PowerAction) -> Result<(), PowerError> {
        info!(%action, "Dry run: would issue power request");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_accepts_everything() {
        for action in [
            PowerAction::Shutdown,
            PowerAction::Restart,
            PowerAction::Lock,
            PowerAction::Sleep,
        ] {
            assert!(DryRunPower.request(action).is_ok());
        }
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn test_linux_commands() {
        assert_eq!(
            SystemPower::command_for(PowerAction::Shutdown),
            Some(("systemctl", &["poweroff"][..]))
        );
        assert_eq!(
            SystemPower::command_for(PowerAction::Lock),
            Some(("loginctl", &["lock-session"][..]))
        );
    }

    #[test]
    fn test_error_messages() {
        let err = PowerError::Unsupported(PowerAction::Sleep);
        assert_eq!(err.to_string(), "sleep is not supported on this platform");
    }
}
