//! User settings loaded from a TOML file.
//!
//! The file lives at `$TTS_CONFIG` when set, otherwise at
//! `<config dir>/tts/config.toml`. A missing file yields the defaults; every
//! field is optional.
//!
//! ```toml
//! include_system_processes = false
//! dry_run = false
//! cancel_timeout_ms = 1000
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::scheduler::SchedulerOptions;

/// Environment variable overriding the settings file location.
pub const CONFIG_ENV: &str = "TTS_CONFIG";

const MIN_CANCEL_TIMEOUT_MS: u64 = 100;
const MAX_CANCEL_TIMEOUT_MS: u64 = 10_000;

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Show processes without an executable path in listings.
    pub include_system_processes: bool,
    /// Log terminations and power requests instead of performing them.
    pub dry_run: bool,
    /// Upper bound on how long a cancel waits for the countdown thread.
    pub cancel_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            include_system_processes: false,
            dry_run: false,
            cancel_timeout_ms: 1_000,
        }
    }
}

impl Settings {
    /// Default settings file location, `None` if no config dir is known.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("tts").join("config.toml"))
    }

    /// Parses and validates settings from TOML text.
    pub fn from_toml(path: &Path, content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let settings = Self::from_toml(path, &content)?;
        debug!(path = %path.display(), ?settings, "Settings loaded");
        Ok(settings)
    }

    /// Loads from the default location, or returns the defaults when there
    /// is none.
    pub fn load_default() -> Result<Self, SettingsError> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(MIN_CANCEL_TIMEOUT_MS..=MAX_CANCEL_TIMEOUT_MS).contains(&self.cancel_timeout_ms) {
            return Err(SettingsError::InvalidValue {
                field: "cancel_timeout_ms",
                reason: format!(
                    "{} is outside {MIN_CANCEL_TIMEOUT_MS}..={MAX_CANCEL_TIMEOUT_MS}",
                    self.cancel_timeout_ms
                ),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn cancel_timeout(&self) -> Duration {
        Duration::from_millis(self.cancel_timeout_ms)
    }

    #[must_use]
    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions::with_cancel_timeout(self.cancel_timeout())
    }

    /// Renders the settings as TOML.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}
