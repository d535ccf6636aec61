use clap::Subcommand;

use super::{open_planner, print_json, resolve_preferences, CliResult};

#[derive(Subcommand)]
pub enum PrefsAction {
    /// Show effective preferences (stored or defaults)
    Get {
        #[arg(long)]
        user: String,
    },
    /// Update stored preferences
    Set {
        #[arg(long)]
        user: String,
        /// Comma-separated study weekdays, 0 = Monday
        #[arg(long, value_delimiter = ',')]
        days: Option<Vec<u8>>,
        /// Intensity: light, medium or hard
        #[arg(long)]
        intensity: Option<String>,
    },
}

pub fn run(action: PrefsAction) -> CliResult {
    let planner = open_planner()?;
    match action {
        PrefsAction::Get { user } => print_json(&planner.preferences(&user)?),
        PrefsAction::Set {
            user,
            days,
            intensity,
        } => {
            let prefs = resolve_preferences(&planner, &user, days, intensity.as_deref())?;
            planner.set_preferences(&user, &prefs)?;
            print_json(&prefs)
        }
    }
}
