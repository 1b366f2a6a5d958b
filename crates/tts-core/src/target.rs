//! Target resolution: turns a countdown or a wall-clock time into seconds.
//!
//! Everything here is pure. The caller passes `now` explicitly so the same
//! input can be re-evaluated on every change and tested deterministically.

use std::borrow::Cow;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::config::TimerMode;
use crate::{ConfigError, ConfigResult};

/// Exclusive upper bound for a timer: 999 hours.
pub const MAX_DURATION_SECS: u64 = 999 * 3600;

const SECS_PER_HOUR: u64 = 3600;
const SECS_PER_MINUTE: u64 = 60;

// ============================================================================
// Countdown Fields
// ============================================================================

/// The three text fields of a countdown, as typed by the user.
///
/// An empty field counts as zero.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CountdownFields {
    pub hours: String,
    pub minutes: String,
    pub seconds: String,
}

impl CountdownFields {
    pub fn new(
        hours: impl Into<String>,
        minutes: impl Into<String>,
        seconds: impl Into<String>,
    ) -> Self {
        Self {
            hours: hours.into(),
            minutes: minutes.into(),
            seconds: seconds.into(),
        }
    }

    /// Builds fields from already-numeric parts.
    pub fn from_parts(hours: u64, minutes: u64, seconds: u64) -> Self {
        Self::new(hours.to_string(), minutes.to_string(), seconds.to_string())
    }

    /// Parses the fields and sums them to seconds.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidInput` if a field is not a non-negative integer
    /// - `ConfigError::NonPositiveDuration` if the sum is zero
    /// - `ConfigError::DurationTooLarge` if the sum overflows
    pub fn total_seconds(&self) -> ConfigResult<u64> {
        let hours = parse_field("hours", &self.hours)?;
        let minutes = parse_field("minutes", &self.minutes)?;
        let seconds = parse_field("seconds", &self.seconds)?;

        let total = hours
            .checked_mul(SECS_PER_HOUR)
            .and_then(|h| minutes.checked_mul(SECS_PER_MINUTE).and_then(|m| h.checked_add(m)))
            .and_then(|hm| hm.checked_add(seconds))
            .ok_or(ConfigError::DurationTooLarge { seconds: u64::MAX })?;

        if total == 0 {
            return Err(ConfigError::NonPositiveDuration);
        }
        Ok(total)
    }
}

fn parse_field(field: &'static str, value: &str) -> ConfigResult<u64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }

    // Digits only: rejects signs, which u64::from_str would accept as "+5".
    if !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::InvalidInput {
            field,
            value: value.to_string(),
        });
    }

    trimmed.parse().map_err(|_| ConfigError::InvalidInput {
        field,
        value: value.to_string(),
    })
}

// ============================================================================
// Timer Target
// ============================================================================

/// When the armed action should fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerTarget {
    /// After hours/minutes/seconds have elapsed.
    Countdown(CountdownFields),
    /// At the next occurrence of a time of day; `None` until one is picked.
    SpecificTime(Option<NaiveTime>),
    /// Right away, without starting a timer.
    Immediate,
}

impl TimerTarget {
    #[must_use]
    pub fn mode(&self) -> TimerMode {
        match self {
            Self::Countdown(_) => TimerMode::Countdown,
            Self::SpecificTime(_) => TimerMode::SpecificTime,
            Self::Immediate => TimerMode::Immediate,
        }
    }

    /// Resolves the target to the number of seconds to count down.
    ///
    /// Immediate targets resolve to zero and skip the duration bounds.
    ///
    /// # Errors
    ///
    /// Any countdown parse error, `ConfigError::NoTimeSelected`, and the
    /// bounds check of [`validate_duration`].
    pub fn resolve(&self, now: NaiveDateTime) -> ConfigResult<u64> {
        let seconds = match self {
            Self::Immediate => return Ok(0),
            Self::Countdown(fields) => fields.total_seconds()?,
            Self::SpecificTime(None) => return Err(ConfigError::NoTimeSelected),
            Self::SpecificTime(Some(time)) => resolve_specific_time(*time, now),
        };
        validate_duration(seconds)
    }
}

/// Seconds from `now` until the next occurrence of `time`.
///
/// A time at or before `now` today rolls over to tomorrow. Fractional
/// seconds are truncated.
#[must_use]
pub fn resolve_specific_time(time: NaiveTime, now: NaiveDateTime) -> u64 {
    let mut target = now.date().and_time(time);
    if target <= now {
        target += Duration::days(1);
        debug!(%target, "Target time already passed today, rolling to tomorrow");
    }

    let seconds = (target - now).num_seconds();
    u64::try_from(seconds).unwrap_or(0)
}

/// Checks `0 < seconds < MAX_DURATION_SECS`.
///
/// # Errors
///
/// - `ConfigError::NonPositiveDuration` for zero
/// - `ConfigError::DurationTooLarge` at or above 999 hours
pub fn validate_duration(seconds: u64) -> ConfigResult<u64> {
    if seconds == 0 {
        return Err(ConfigError::NonPositiveDuration);
    }
    if seconds >= MAX_DURATION_SECS {
        return Err(ConfigError::DurationTooLarge { seconds });
    }
    Ok(seconds)
}

// ============================================================================
// Finish Estimate
// ============================================================================

/// When a run of a given length started now will end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishEstimate {
    pub finish_at: NaiveDateTime,
    /// Calendar days between `now` and `finish_at`
    pub days_ahead: i64,
}

impl FinishEstimate {
    pub fn new(now: NaiveDateTime, total_seconds: u64) -> Self {
        let secs = i64::try_from(total_seconds).unwrap_or(i64::MAX);
        let finish_at = now
            .checked_add_signed(Duration::seconds(secs))
            .unwrap_or(now);
        let days_ahead = (finish_at.date() - now.date()).num_days();
        Self {
            finish_at,
            days_ahead,
        }
    }

    /// "Today", "Tomorrow" or "In N days".
    #[must_use]
    pub fn relative_day(&self) -> Cow<'static, str> {
        match self.days_ahead {
            0 => Cow::Borrowed("Today"),
            1 => Cow::Borrowed("Tomorrow"),
            n => Cow::Owned(format!("In {n} days")),
        }
    }

    /// Finish time of day, "HH:MM".
    #[must_use]
    pub fn clock(&self) -> String {
        self.finish_at.format("%H:%M").to_string()
    }

    /// Finish date, e.g. "Sunday, 18 October 2026".
    #[must_use]
    pub fn date_label(&self) -> String {
        self.finish_at.format("%A, %d %B %Y").to_string()
    }
}
