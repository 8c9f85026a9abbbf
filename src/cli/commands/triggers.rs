use async_trait::async_trait;
use chrono::Utc;

use crate::cli::AppContext;
use crate::core::snapshots::SnapshotKind;
use crate::core::triggers::{next_fire, Job, JobRunner};

use super::{TriggerSchedule, TriggerTarget};

/// Runs scheduled jobs against the services configured for this process.
pub struct ScheduledJobs<'a> {
    ctx: &'a AppContext,
}

impl<'a> ScheduledJobs<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl<'a> JobRunner for ScheduledJobs<'a> {
    async fn run(&self, job: Job) -> anyhow::Result<()> {
        let kind = match job {
            Job::ProcessCallFiles => {
                let report = self.ctx.call_summaries().await?.process_new_call_files().await?;
                tracing::info!(
                    evaluated = report.evaluated,
                    created = report.created(),
                    failed = report.failed.len(),
                    "Scheduled call processing finished"
                );
                return Ok(());
            }
            Job::SnapshotSales => SnapshotKind::Sales,
            Job::SnapshotDeals => SnapshotKind::Deals,
            Job::SnapshotPbf => SnapshotKind::Pbf,
        };

        let name = self.ctx.snapshots().await?.snapshot(kind).await?;
        tracing::info!(%kind, sheet = %name, "Scheduled snapshot created");
        Ok(())
    }
}

pub async fn create(ctx: &AppContext, schedule: TriggerSchedule) -> anyhow::Result<()> {
    let triggers = ctx.triggers().await?;
    let trigger = match schedule {
        TriggerSchedule::Calls => triggers.create_daily_call_trigger().await?,
        TriggerSchedule::DealsWeekly => triggers.create_weekly_deals_trigger().await?,
        TriggerSchedule::SalesMonthly => triggers.create_monthly_sales_trigger().await?,
        TriggerSchedule::PbfMonthly => triggers.create_monthly_pbf_trigger().await?,
    };

    println!(
        "Trigger created successfully: {} runs {}.",
        trigger.job, trigger.recurrence
    );
    Ok(())
}

pub async fn delete(ctx: &AppContext, target: TriggerTarget) -> anyhow::Result<()> {
    let triggers = ctx.triggers().await?;
    let job = match target {
        TriggerTarget::Calls => Job::ProcessCallFiles,
        TriggerTarget::Deals => Job::SnapshotDeals,
        TriggerTarget::Sales => Job::SnapshotSales,
        TriggerTarget::Pbf => Job::SnapshotPbf,
        TriggerTarget::AllSnapshots => {
            let removed = triggers.delete_all_snapshot_triggers().await?;
            println!("Deleted {removed} snapshot trigger(s).");
            return Ok(());
        }
    };

    let removed = triggers.delete_triggers(job).await?;
    println!("Deleted {removed} trigger(s) for {job}.");
    Ok(())
}

pub async fn list(ctx: &AppContext) -> anyhow::Result<()> {
    let tz = ctx.config.time_zone;
    let registered = ctx.triggers().await?.list().await;

    if registered.is_empty() {
        println!("No triggers registered.");
        return Ok(());
    }

    let now = Utc::now();
    for trigger in &registered {
        let next = next_fire(&trigger.recurrence, now, tz)
            .map(|at| at.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{:<20} {:<32} next: {next}",
            trigger.job.name(),
            trigger.recurrence.to_string()
        );
    }
    Ok(())
}

pub async fn run_scheduler(ctx: &AppContext) -> anyhow::Result<()> {
    let triggers = ctx.triggers().await?;
    if triggers.list().await.is_empty() {
        println!("No triggers registered. Create one with `sales-ops triggers create`.");
        return Ok(());
    }

    let runner = ScheduledJobs::new(ctx);
    tokio::select! {
        _ = triggers.run_scheduler(&runner, ctx.config.time_zone) => {}
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Received Ctrl-C, stopping scheduler");
        }
    }
    Ok(())
}
