//! User study preferences: which weekdays to study on and how hard.
//!
//! Weekday indices follow `chrono::Weekday::num_days_from_monday`
//! (0=Mon ... 6=Sun).

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulingError};
use crate::task::ESTIMATED_MINUTES;

/// Weekdays used when a user has no stored preferences.
pub const DEFAULT_STUDY_DAYS: [u8; 5] = [1, 2, 3, 4, 5];

/// Named daily time budget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Light,
    #[default]
    Medium,
    Hard,
}

impl Intensity {
    /// Daily study budget in minutes.
    pub fn daily_budget_minutes(self) -> u32 {
        match self {
            Intensity::Light => 10,
            Intensity::Medium => 45,
            Intensity::Hard => 90,
        }
    }

    /// Maximum number of tasks that fit in one day.
    pub fn tasks_per_day(self) -> usize {
        (self.daily_budget_minutes() / ESTIMATED_MINUTES) as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Intensity::Light => "light",
            Intensity::Medium => "medium",
            Intensity::Hard => "hard",
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intensity {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Intensity::Light),
            "medium" => Ok(Intensity::Medium),
            "hard" => Ok(Intensity::Hard),
            other => Err(SchedulingError::invalid_preferences(format!(
                "unknown intensity '{other}'"
            ))),
        }
    }
}

/// Set of weekdays, stored as a 7-bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct StudyDays(u8);

impl StudyDays {
    pub fn empty() -> Self {
        StudyDays(0)
    }

    /// Build from weekday indices, rejecting anything outside 0..=6.
    pub fn from_indices<I>(indices: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<i64>,
    {
        let mut mask = 0u8;
        for index in indices {
            let index = index.into();
            if !(0..=6).contains(&index) {
                return Err(SchedulingError::invalid_preferences(format!(
                    "weekday index {index} is outside 0..=6"
                )));
            }
            mask |= 1u8 << index;
        }
        Ok(StudyDays(mask))
    }

    pub fn contains(self, weekday: Weekday) -> bool {
        self.0 & (1u8 << weekday.num_days_from_monday()) != 0
    }

    pub fn contains_date(self, date: NaiveDate) -> bool {
        self.contains(date.weekday())
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Weekday indices in ascending order.
    pub fn indices(self) -> Vec<u8> {
        (0u8..7).filter(|i| self.0 & (1u8 << i) != 0).collect()
    }
}

impl TryFrom<Vec<u8>> for StudyDays {
    type Error = SchedulingError;

    fn try_from(value: Vec<u8>) -> Result<Self> {
        StudyDays::from_indices(value)
    }
}

impl From<StudyDays> for Vec<u8> {
    fn from(days: StudyDays) -> Self {
        days.indices()
    }
}

/// Preferences for one scheduling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub study_days: StudyDays,
    pub intensity: Intensity,
}

impl UserPreferences {
    /// Build validated preferences. An empty weekday set is rejected.
    pub fn new<I>(study_days: I, intensity: Intensity) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<i64>,
    {
        let prefs = Self {
            study_days: StudyDays::from_indices(study_days)?,
            intensity,
        };
        prefs.validate()?;
        Ok(prefs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.study_days.is_empty() {
            return Err(SchedulingError::invalid_preferences("study_days is empty"));
        }
        Ok(())
    }

    pub fn daily_budget_minutes(&self) -> u32 {
        self.intensity.daily_budget_minutes()
    }

    /// Whether a day already holding `existing` tasks can take one more.
    pub fn has_room_for_one_more(&self, existing: usize) -> bool {
        (existing as u64 + 1) * ESTIMATED_MINUTES as u64 <= self.daily_budget_minutes() as u64
    }

    /// Decode a stored record. Missing records are the caller's concern;
    /// a record that is present but malformed is an error.
    pub fn from_record(record: &PreferenceRecord) -> Result<Self> {
        let intensity = record.intensity.parse::<Intensity>()?;
        Self::new(record.study_days.iter().copied(), intensity)
    }

    pub fn to_record(&self) -> PreferenceRecord {
        PreferenceRecord {
            study_days: self.study_days.indices().into_iter().map(i64::from).collect(),
            intensity: self.intensity.as_str().to_string(),
        }
    }
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            study_days: StudyDays(
                DEFAULT_STUDY_DAYS
                    .iter()
                    .fold(0u8, |mask, day| mask | (1u8 << *day)),
            ),
            intensity: Intensity::Medium,
        }
    }
}

/// Preferences as the preference store holds them, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceRecord {
    pub study_days: Vec<i64>,
    pub intensity: String,
}
