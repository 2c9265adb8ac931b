//! duesync: mirror assignment deadlines into a task list.
//!
//! # Usage
//!
//! ```text
//! duesync init
//! duesync ingest <sheet> <file.json> --kind portal|classroom
//! duesync sync [<sheet>] [--dry-run]
//! duesync status [--json]
//! duesync tasklist [--name <title>]
//! duesync daemon start|stop|status|run|logs
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    daemon::DaemonCommand, ingest::IngestArgs, init::InitArgs, status::StatusArgs,
    sync::SyncArgs, tasklist::TasklistArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "duesync",
    version,
    about = "Reconcile assignment deadlines with a remote task list",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create settings and empty sheets under ~/.duesync.
    Init(InitArgs),

    /// Merge a scraped JSON batch into a sheet.
    Ingest(IngestArgs),

    /// Register, refresh and sweep records against the task list.
    Sync(SyncArgs),

    /// Show per-sheet record counts and last run.
    Status(StatusArgs),

    /// Resolve (or create) the task list and remember its id.
    Tasklist(TasklistArgs),

    /// Manage the background scheduler.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    if !matches!(cli.command, Commands::Daemon { .. }) {
        init_tracing();
    }
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Ingest(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Tasklist(args) => args.run(),
        Commands::Daemon { command } => commands::daemon::run(command),
    }
}

/// Library logs go to stderr so stdout stays parseable.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
