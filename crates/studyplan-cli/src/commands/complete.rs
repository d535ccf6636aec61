use chrono::NaiveDate;
use clap::{ArgGroup, Args};
use studyplan_core::TaskType;

use super::{open_planner, print_json, CliResult};

#[derive(Args)]
#[command(group(ArgGroup::new("outcome").required(true).args(["correct", "incorrect"])))]
pub struct CompleteArgs {
    /// User ID
    #[arg(long)]
    user: String,
    /// Chunk ID
    #[arg(long)]
    chunk: String,
    /// Completed task type: learn, quiz or review
    #[arg(long)]
    task_type: String,
    /// The answer was correct
    #[arg(long)]
    correct: bool,
    /// The answer was wrong
    #[arg(long)]
    incorrect: bool,
    /// Completion day (YYYY-MM-DD, default: today)
    #[arg(long)]
    today: Option<NaiveDate>,
}

pub fn run(args: CompleteArgs) -> CliResult {
    let task_type: TaskType = args.task_type.parse()?;
    let planner = open_planner()?;
    let next = match args.today {
        Some(today) => planner.handle_task_completion_on(
            &args.user,
            &args.chunk,
            task_type,
            args.correct,
            today,
        )?,
        None => planner.handle_task_completion(&args.user, &args.chunk, task_type, args.correct)?,
    };
    print_json(&serde_json::json!({ "scheduled": next }))
}
