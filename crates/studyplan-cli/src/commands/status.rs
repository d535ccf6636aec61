use clap::Args;
use studyplan_core::ChunkStage;

use super::{open_planner, print_json, CliResult};

#[derive(Args)]
pub struct StatusArgs {
    /// User ID
    #[arg(long)]
    user: String,
    /// Chunk ID
    #[arg(long)]
    chunk: String,
}

pub fn run(args: StatusArgs) -> CliResult {
    let planner = open_planner()?;
    let history = planner.chunk_history(&args.user, &args.chunk)?;
    let stage = ChunkStage::from_history(&history);
    print_json(&serde_json::json!({
        "chunk_id": args.chunk,
        "stage": stage,
        "awaiting": stage.awaiting(),
        "tasks": history,
    }))
}
