use chrono::{Local, NaiveDate};
use clap::Args;

use super::{open_planner, print_json, CliResult};

#[derive(Args)]
pub struct AgendaArgs {
    /// User ID
    #[arg(long)]
    user: String,
    /// Day to list (YYYY-MM-DD, default: today)
    #[arg(long)]
    date: Option<NaiveDate>,
}

pub fn run(args: AgendaArgs) -> CliResult {
    let planner = open_planner()?;
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let tasks = planner.agenda(&args.user, date)?;
    print_json(&tasks)
}
