pub mod agenda;
pub mod complete;
pub mod config;
pub mod plan;
pub mod prefs;
pub mod status;

use studyplan_core::{Config, Intensity, StudyDb, StudyPlanner, StudyStore, UserPreferences};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Planner over the configured database with the configured policies.
pub fn open_planner() -> Result<StudyPlanner<StudyDb>, Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let path = config.database_path()?;
    tracing::debug!(path = %path.display(), "opening database");
    let db = StudyDb::open_at(path)?;
    Ok(StudyPlanner::with_config(db, config.planner_config()?))
}

/// Overlay the given flags on `base`.
pub fn merge_preferences(
    base: UserPreferences,
    days: Option<Vec<u8>>,
    intensity: Option<&str>,
) -> Result<UserPreferences, Box<dyn std::error::Error>> {
    let intensity = match intensity {
        Some(name) => name.parse::<Intensity>()?,
        None => base.intensity,
    };
    let days = days.unwrap_or_else(|| base.study_days.indices());
    Ok(UserPreferences::new(days, intensity)?)
}

/// Preferences from the command-line flags, filling gaps from the user's
/// effective preferences. When both flags are given the stored row is never
/// read, so a row that no longer validates can still be replaced.
pub fn resolve_preferences<S: StudyStore>(
    planner: &StudyPlanner<S>,
    user: &str,
    days: Option<Vec<u8>>,
    intensity: Option<&str>,
) -> Result<UserPreferences, Box<dyn std::error::Error>> {
    match (days, intensity) {
        (Some(days), Some(name)) => Ok(UserPreferences::new(days, name.parse::<Intensity>()?)?),
        (days, intensity) => merge_preferences(planner.preferences(user)?, days, intensity),
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
