//! Core error types for studyplan-core.
//!
//! This module defines the error hierarchy using thiserror:
//! - [`SchedulingError`] is what every scheduling operation returns
//! - [`StoreError`] covers failures of the external task/preference/memory store
//! - [`ConfigError`] covers loading and editing the TOML configuration

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Error returned by allocation, completion handling and slot finding.
#[derive(Error, Debug)]
pub enum SchedulingError {
    /// Preferences are present but unusable (empty study days, unknown intensity, bad weekday)
    #[error("Invalid preferences: {reason}")]
    InvalidPreferences { reason: String },

    /// The allocator or slot finder was handed a preference set with no study days
    #[error("No study days configured")]
    NoStudyDaysConfigured,

    /// The day cursor ran past the search horizon without finding a free slot
    #[error("No free slot found within {searched_days} days of {start}")]
    CapacityExhaustedIndefinitely { start: NaiveDate, searched_days: u32 },

    /// Date arithmetic left chrono's representable range
    #[error("Date out of range: {from} + {days} days")]
    DateOutOfRange { from: NaiveDate, days: u64 },

    /// A call to the external store failed
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl SchedulingError {
    pub(crate) fn invalid_preferences(reason: impl Into<String>) -> Self {
        SchedulingError::InvalidPreferences {
            reason: reason.into(),
        }
    }
}

/// Store-specific errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A previous holder of the store handle panicked mid-write
    #[error("Store handle poisoned")]
    Poisoned,

    /// A stored value could not be decoded
    #[error("Corrupt stored value for '{field}': {value}")]
    Corrupt { field: &'static str, value: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Could not resolve or create the configuration directory
    #[error("Configuration directory unavailable: {0}")]
    NoConfigDir(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked
                    || err.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for SchedulingError {
    fn from(err: rusqlite::Error) -> Self {
        SchedulingError::StoreUnavailable(err.into())
    }
}

/// Result type alias for SchedulingError
pub type Result<T, E = SchedulingError> = std::result::Result<T, E>;
