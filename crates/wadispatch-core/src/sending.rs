//! Sending-parameter validation

use serde::Serialize;
use thiserror::Error;
use wadispatch_common::Error;
use wadispatch_storage::models::SendingConfigurationForm;

/// Shortest pause the editor recommends, in seconds
pub const MIN_RECOMMENDED_PAUSE_SECONDS: u32 = 60;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SendingConfigError {
    #[error("minimum delay must be at least 1 second")]
    MinDelayTooLow,

    #[error("maximum delay ({max}s) must not be less than the minimum delay ({min}s)")]
    MaxBelowMin { min: u32, max: u32 },
}

impl From<SendingConfigError> for Error {
    fn from(err: SendingConfigError) -> Self {
        Error::Validation(err.to_string())
    }
}

/// Hard rules gating the pacing step; the first failing rule is reported
pub fn validate_sending_config(config: &SendingConfigurationForm) -> Result<(), SendingConfigError> {
    if config.min_delay_seconds < 1 {
        return Err(SendingConfigError::MinDelayTooLow);
    }
    if config.max_delay_seconds < config.min_delay_seconds {
        return Err(SendingConfigError::MaxBelowMin {
            min: config.min_delay_seconds,
            max: config.max_delay_seconds,
        });
    }
    Ok(())
}

/// Non-blocking warning about a pacing setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SendingAdvisory {
    NoPauses,
    ShortPause,
    HalfOpenWindow,
    EmptyWindow,
    ZeroDailyLimit,
}

impl std::fmt::Display for SendingAdvisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendingAdvisory::NoPauses => {
                write!(f, "pause_after_messages is 0, sending will never pause")
            }
            SendingAdvisory::ShortPause => write!(
                f,
                "pauses shorter than {} seconds are not recommended",
                MIN_RECOMMENDED_PAUSE_SECONDS
            ),
            SendingAdvisory::HalfOpenWindow => {
                write!(f, "allowed hours need both a start and an end")
            }
            SendingAdvisory::EmptyWindow => {
                write!(f, "allowed hours start must be before the end")
            }
            SendingAdvisory::ZeroDailyLimit => write!(f, "a daily limit of 0 allows no sends"),
        }
    }
}

/// Warnings that never block the wizard
pub fn advisories(config: &SendingConfigurationForm) -> Vec<SendingAdvisory> {
    let mut found = Vec::new();

    if config.pause_after_messages < 1 {
        found.push(SendingAdvisory::NoPauses);
    }
    if config.pause_duration_seconds < MIN_RECOMMENDED_PAUSE_SECONDS {
        found.push(SendingAdvisory::ShortPause);
    }
    match (config.allowed_hours_start, config.allowed_hours_end) {
        (Some(start), Some(end)) if start >= end => found.push(SendingAdvisory::EmptyWindow),
        (Some(_), None) | (None, Some(_)) => found.push(SendingAdvisory::HalfOpenWindow),
        _ => {}
    }
    if config.daily_limit == Some(0) {
        found.push(SendingAdvisory::ZeroDailyLimit);
    }

    found
}
