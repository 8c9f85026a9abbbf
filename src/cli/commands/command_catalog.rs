// Command line surface. Each feature gets its own handler file.

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::AppContext;
use crate::core::folders::DEFAULT_MERGE_THRESHOLD;

pub mod calls;
pub mod csv_sync;
pub mod folders;
pub mod snapshots;
pub mod triggers;

#[derive(Debug, Parser)]
#[command(name = "sales-ops")]
#[command(about = "Call summaries, customer folders and forecast snapshots for the sales team")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Summarize call transcripts added since the last run
    ProcessCalls,
    /// Forget the last processed timestamp so every call file is evaluated again
    ResetWatermark,
    /// Print the Jaro-Winkler similarity of two strings
    Similarity { a: String, b: String },
    /// List pairs of customer folders that look like duplicates
    SuggestMerges {
        /// Pairs scoring above this are reported
        #[arg(long, default_value_t = DEFAULT_MERGE_THRESHOLD)]
        threshold: f64,
    },
    /// Move every file from one customer folder into another and trash the source
    MergeFolders { source: String, destination: String },
    /// Copy reporting tabs into dated snapshot tabs
    Snapshot {
        #[arg(value_enum)]
        target: SnapshotTarget,
    },
    /// Refresh the configured sheets from their published CSV exports
    SyncCsv,
    /// Manage scheduled jobs
    Triggers {
        #[command(subcommand)]
        action: TriggerCommand,
    },
    /// Run scheduled jobs until interrupted
    RunScheduler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SnapshotTarget {
    Sales,
    Deals,
    Pbf,
    All,
}

#[derive(Debug, Subcommand)]
pub enum TriggerCommand {
    /// Register a recurring job
    Create {
        #[arg(value_enum)]
        schedule: TriggerSchedule,
    },
    /// Remove the triggers of one job
    Delete {
        #[arg(value_enum)]
        target: TriggerTarget,
    },
    /// Show registered triggers and when they fire next
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TriggerSchedule {
    /// Process call files every day at 01:00
    Calls,
    /// Snapshot the deals tab every Monday at 08:00
    DealsWeekly,
    /// Snapshot the sales forecast on the 1st of each month at 08:00
    SalesMonthly,
    /// Snapshot the PBF deals on the 1st of each month at 08:00
    PbfMonthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TriggerTarget {
    Calls,
    Deals,
    Sales,
    Pbf,
    AllSnapshots,
}

pub async fn run(command: Command, ctx: &AppContext) -> anyhow::Result<()> {
    match command {
        Command::ProcessCalls => calls::process_calls(ctx).await,
        Command::ResetWatermark => calls::reset_watermark(ctx).await,
        Command::Similarity { a, b } => {
            folders::similarity(&a, &b);
            Ok(())
        }
        Command::SuggestMerges { threshold } => folders::suggest_merges(ctx, threshold).await,
        Command::MergeFolders {
            source,
            destination,
        } => folders::merge_folders(ctx, &source, &destination).await,
        Command::Snapshot { target } => snapshots::snapshot(ctx, target).await,
        Command::SyncCsv => csv_sync::sync_csv(ctx).await,
        Command::Triggers { action } => match action {
            TriggerCommand::Create { schedule } => triggers::create(ctx, schedule).await,
            TriggerCommand::Delete { target } => triggers::delete(ctx, target).await,
            TriggerCommand::List => triggers::list(ctx).await,
        },
        Command::RunScheduler => triggers::run_scheduler(ctx).await,
    }
}
