use chrono::NaiveDate;
use clap::Args;

use super::{open_planner, print_json, resolve_preferences, CliResult};

#[derive(Args)]
pub struct PlanArgs {
    /// User ID
    #[arg(long)]
    user: String,
    /// First day to consider (YYYY-MM-DD, default: today)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// Comma-separated study weekdays, 0 = Monday (e.g. "0,2,4")
    #[arg(long, value_delimiter = ',')]
    days: Option<Vec<u8>>,
    /// Intensity: light, medium or hard
    #[arg(long)]
    intensity: Option<String>,
    /// Chunk IDs, in study order
    #[arg(required = true)]
    chunks: Vec<String>,
}

pub fn run(args: PlanArgs) -> CliResult {
    let planner = open_planner()?;
    let prefs = if args.days.is_some() || args.intensity.is_some() {
        let prefs = resolve_preferences(&planner, &args.user, args.days, args.intensity.as_deref())?;
        planner.set_preferences(&args.user, &prefs)?;
        prefs
    } else {
        planner.preferences(&args.user)?
    };

    let schedule = planner.allocate_initial_schedule(&args.user, &args.chunks, &prefs, args.start)?;
    print_json(&schedule)
}
