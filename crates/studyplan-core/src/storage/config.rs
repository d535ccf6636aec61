//! TOML-based application configuration.
//!
//! Stores:
//! - Scheduler policies (allocation mode, review policy, shift mode)
//! - Search horizon for the day cursor
//! - Preferences applied to users who never set any
//! - Optional database location override
//!
//! Configuration is stored at `~/.config/studyplan/config.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::allocator::{AllocationMode, DEFAULT_MAX_SEARCH_DAYS};
use crate::error::{ConfigError, Result as SchedulingResult};
use crate::lifecycle::ReviewPolicy;
use crate::planner::PlannerConfig;
use crate::preferences::{Intensity, UserPreferences, DEFAULT_STUDY_DAYS};
use crate::slots::ShiftMode;

/// Allocator variant as written in the config file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AllocationModeName {
    #[default]
    LearnOnly,
    Staged,
}

/// Shift variant as written in the config file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShiftModeName {
    #[default]
    CapacityAware,
    StudyDayOnly,
    Off,
}

/// Scheduler-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSection {
    #[serde(default)]
    pub allocation_mode: AllocationModeName,
    /// Days the staged allocator advances after each placed task
    #[serde(default = "default_stage_spacing_days")]
    pub stage_spacing_days: u32,
    #[serde(default)]
    pub review_policy: ReviewPolicy,
    #[serde(default)]
    pub shift_mode: ShiftModeName,
    /// Upper bound on tasks moved per insertion in `study_day_only` mode
    #[serde(default = "default_shift_max_tasks")]
    pub shift_max_tasks: usize,
    #[serde(default = "default_max_search_days")]
    pub max_search_days: u32,
}

/// Preferences for users without a stored row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_study_days")]
    pub study_days: Vec<u8>,
    #[serde(default)]
    pub intensity: Intensity,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/studyplan/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// Database file; defaults to `studyplan.db` in the data directory.
    #[serde(default)]
    pub database_path: Option<String>,
}

// Default functions
fn default_stage_spacing_days() -> u32 {
    1
}
fn default_shift_max_tasks() -> usize {
    50
}
fn default_max_search_days() -> u32 {
    DEFAULT_MAX_SEARCH_DAYS
}
fn default_study_days() -> Vec<u8> {
    DEFAULT_STUDY_DAYS.to_vec()
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            allocation_mode: AllocationModeName::default(),
            stage_spacing_days: default_stage_spacing_days(),
            review_policy: ReviewPolicy::default(),
            shift_mode: ShiftModeName::default(),
            shift_max_tasks: default_shift_max_tasks(),
            max_search_days: default_max_search_days(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            study_days: default_study_days(),
            intensity: Intensity::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(invalid("config key is empty".into()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| invalid("unknown config key".into()))?;
                let existing = obj.get(part);

                let new_value = match existing {
                    Some(serde_json::Value::Bool(_)) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    Some(serde_json::Value::Number(_)) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    Some(serde_json::Value::Object(_)) | Some(serde_json::Value::Array(_)) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    // Strings, and optional fields currently null
                    Some(_) => serde_json::Value::String(value.into()),
                    None => return Err(invalid("unknown config key".into())),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| invalid("unknown config key".into()))?;
        }

        Err(invalid("unknown config key".into()))
    }

    /// Location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or create and persist the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml(&content).map_err(|e| ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|err| {
            tracing::warn!(%err, "falling back to default config");
            Self::default()
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field (including unknown enum variants).
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a config value by key and persist.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Database location, resolved against the data directory.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(data_dir()?.join("studyplan.db")),
        }
    }

    /// Validated fallback preferences.
    pub fn default_preferences(&self) -> SchedulingResult<UserPreferences> {
        UserPreferences::new(self.defaults.study_days.iter().copied(), self.defaults.intensity)
    }

    /// Scheduler settings for the planner.
    pub fn planner_config(&self) -> SchedulingResult<PlannerConfig> {
        let s = &self.scheduler;
        Ok(PlannerConfig {
            allocation_mode: match s.allocation_mode {
                AllocationModeName::LearnOnly => AllocationMode::LearnOnly,
                AllocationModeName::Staged => AllocationMode::Staged {
                    spacing_days: s.stage_spacing_days,
                },
            },
            review_policy: s.review_policy,
            shift_mode: match s.shift_mode {
                ShiftModeName::CapacityAware => ShiftMode::CapacityAware,
                ShiftModeName::StudyDayOnly => ShiftMode::StudyDayOnly {
                    max_tasks: s.shift_max_tasks,
                },
                ShiftModeName::Off => ShiftMode::Off,
            },
            max_search_days: s.max_search_days,
            default_preferences: self.default_preferences()?,
        })
    }
}
