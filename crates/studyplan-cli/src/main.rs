use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "studyplan", version, about = "Study schedule planner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate an initial schedule for new chunks
    Plan(commands::plan::PlanArgs),
    /// Record a task completion and schedule its follow-up
    Complete(commands::complete::CompleteArgs),
    /// Tasks scheduled for one day
    Agenda(commands::agenda::AgendaArgs),
    /// Lifecycle stage of one chunk
    Status(commands::status::StatusArgs),
    /// Per-user study preferences
    Prefs {
        #[command(subcommand)]
        action: commands::prefs::PrefsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("STUDYPLAN_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Plan(args) => commands::plan::run(args),
        Commands::Complete(args) => commands::complete::run(args),
        Commands::Agenda(args) => commands::agenda::run(args),
        Commands::Status(args) => commands::status::run(args),
        Commands::Prefs { action } => commands::prefs::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
