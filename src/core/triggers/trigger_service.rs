use async_trait::async_trait;
use chrono::{DateTime, Utc, Weekday};
use chrono_tz::Tz;
use thiserror::Error;
use tokio::sync::RwLock;

use super::trigger_models::{next_fire, Job, Recurrence, Trigger, TriggerConfig};

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("Failed to persist triggers: {0}")]
    Store(String),
    #[error("Invalid recurrence: {0}")]
    InvalidRecurrence(String),
}

/// Storage layer abstraction for the trigger registry.
#[async_trait]
pub trait TriggerStore: Send + Sync {
    async fn load(&self) -> Result<TriggerConfig, TriggerError>;
    async fn save(&self, config: &TriggerConfig) -> Result<(), TriggerError>;
}

/// Executes one scheduled job.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: Job) -> anyhow::Result<()>;
}

/// Registers time-based triggers and decides which ones are due.
pub struct TriggerService<S: TriggerStore> {
    store: S,
    config: RwLock<TriggerConfig>,
}

impl<S: TriggerStore> TriggerService<S> {
    /// Create a new service and eagerly load the persisted registry. A
    /// registry that cannot be read is an error, so it is never overwritten.
    pub async fn new(store: S) -> Result<Self, TriggerError> {
        let config = store.load().await?;

        Ok(Self {
            store,
            config: RwLock::new(config),
        })
    }

    pub async fn list(&self) -> Vec<Trigger> {
        self.config.read().await.triggers.clone()
    }

    /// Replace every trigger for `job` with a single new one.
    pub async fn create(&self, job: Job, recurrence: Recurrence) -> Result<Trigger, TriggerError> {
        recurrence
            .validate()
            .map_err(TriggerError::InvalidRecurrence)?;

        let trigger = Trigger {
            job,
            recurrence,
            created_at: Utc::now(),
        };

        let mut config = self.config.write().await;
        let mut updated = config.clone();
        updated.triggers.retain(|t| t.job != job);
        updated.triggers.push(trigger.clone());
        self.store.save(&updated).await?;
        *config = updated;

        tracing::info!(%job, %recurrence, "Trigger created");
        Ok(trigger)
    }

    /// Summarize new call files every night at 01:00.
    pub async fn create_daily_call_trigger(&self) -> Result<Trigger, TriggerError> {
        self.create(Job::ProcessCallFiles, Recurrence::Daily { hour: 1 })
            .await
    }

    pub async fn create_weekly_deals_trigger(&self) -> Result<Trigger, TriggerError> {
        self.create(
            Job::SnapshotDeals,
            Recurrence::Weekly {
                weekday: Weekday::Mon,
                hour: 8,
            },
        )
        .await
    }

    pub async fn create_monthly_sales_trigger(&self) -> Result<Trigger, TriggerError> {
        self.create(Job::SnapshotSales, Recurrence::Monthly { day: 1, hour: 8 })
            .await
    }

    pub async fn create_monthly_pbf_trigger(&self) -> Result<Trigger, TriggerError> {
        self.create(Job::SnapshotPbf, Recurrence::Monthly { day: 1, hour: 8 })
            .await
    }

    /// Remove every trigger for `job`. Returns how many were removed.
    pub async fn delete_triggers(&self, job: Job) -> Result<usize, TriggerError> {
        self.remove_where(|t| t.job == job).await
    }

    pub async fn delete_all_snapshot_triggers(&self) -> Result<usize, TriggerError> {
        self.remove_where(|t| t.job.is_snapshot()).await
    }

    async fn remove_where(&self, doomed: impl Fn(&Trigger) -> bool) -> Result<usize, TriggerError> {
        let mut config = self.config.write().await;
        let mut updated = config.clone();
        updated.triggers.retain(|t| !doomed(t));
        let removed = config.triggers.len() - updated.triggers.len();
        if removed > 0 {
            self.store.save(&updated).await?;
            *config = updated;
        }
        Ok(removed)
    }

    /// Earliest trigger firing strictly after `after`.
    pub async fn next_due(&self, after: DateTime<Utc>, tz: Tz) -> Option<(Job, DateTime<Utc>)> {
        self.config
            .read()
            .await
            .triggers
            .iter()
            .filter_map(|t| next_fire(&t.recurrence, after, tz).map(|at| (t.job, at)))
            .min_by_key(|(_, at)| *at)
    }

    /// Jobs with an occurrence in `(since, now]`, in firing order. A job is
    /// listed once even if several of its occurrences fell in the window.
    pub async fn due_between(&self, since: DateTime<Utc>, now: DateTime<Utc>, tz: Tz) -> Vec<Job> {
        let mut due: Vec<(DateTime<Utc>, Job)> = self
            .config
            .read()
            .await
            .triggers
            .iter()
            .filter_map(|t| next_fire(&t.recurrence, since, tz).map(|at| (at, t.job)))
            .filter(|(at, _)| *at <= now)
            .collect();
        due.sort_by_key(|(at, _)| *at);

        let mut jobs = Vec::with_capacity(due.len());
        for (_, job) in due {
            if !jobs.contains(&job) {
                jobs.push(job);
            }
        }
        jobs
    }

    /// Run every job due in `(since, now]` one after another. A failing job is
    /// logged and does not stop the others.
    pub async fn fire_due<R: JobRunner + ?Sized>(
        &self,
        runner: &R,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
        tz: Tz,
    ) -> Vec<Job> {
        let jobs = self.due_between(since, now, tz).await;
        for job in &jobs {
            tracing::info!(%job, "Running scheduled job");
            if let Err(e) = runner.run(*job).await {
                tracing::error!(%job, "Scheduled job failed: {e:#}");
            }
        }
        jobs
    }

    /// Sleep until the next trigger, run what is due, repeat. Returns when the
    /// registry is empty.
    pub async fn run_scheduler<R: JobRunner + ?Sized>(&self, runner: &R, tz: Tz) {
        let mut checked_at = Utc::now();
        loop {
            let Some((job, at)) = self.next_due(checked_at, tz).await else {
                tracing::info!("No triggers registered; scheduler stopping");
                return;
            };
            tracing::info!(%job, next_run = %at, "Waiting for next trigger");

            let wait = (at - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            let now = Utc::now().max(at);
            self.fire_due(runner, checked_at, now, tz).await;
            checked_at = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct MemoryStore {
        saved: Arc<Mutex<Option<TriggerConfig>>>,
        unreadable: bool,
        read_only: Arc<AtomicBool>,
    }

    #[async_trait]
    impl TriggerStore for MemoryStore {
        async fn load(&self) -> Result<TriggerConfig, TriggerError> {
            if self.unreadable {
                return Err(TriggerError::Store("trailing comma at line 12".into()));
            }
            Ok(self.saved.lock().unwrap().clone().unwrap_or_default())
        }

        async fn save(&self, config: &TriggerConfig) -> Result<(), TriggerError> {
            if self.read_only.load(Ordering::SeqCst) {
                return Err(TriggerError::Store("disk full".into()));
            }
            *self.saved.lock().unwrap() = Some(config.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingRunner {
        ran: Mutex<Vec<Job>>,
        fail: Option<Job>,
    }

    #[async_trait]
    impl JobRunner for RecordingRunner {
        async fn run(&self, job: Job) -> anyhow::Result<()> {
            self.ran.lock().unwrap().push(job);
            if self.fail == Some(job) {
                anyhow::bail!("boom");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn create_replaces_triggers_for_the_same_job() {
        let store = MemoryStore::default();
        let service = TriggerService::new(store.clone()).await.unwrap();

        service.create_daily_call_trigger().await.unwrap();
        service.create_daily_call_trigger().await.unwrap();
        service.create_weekly_deals_trigger().await.unwrap();

        let triggers = service.list().await;
        assert_eq!(triggers.len(), 2);
        assert_eq!(triggers[0].job, Job::ProcessCallFiles);
        assert_eq!(triggers[0].recurrence, Recurrence::Daily { hour: 1 });

        let persisted = store.saved.lock().unwrap().clone().unwrap();
        assert_eq!(persisted.triggers.len(), 2);
    }

    #[tokio::test]
    async fn registry_is_reloaded_from_store() {
        let store = MemoryStore::default();
        {
            let service = TriggerService::new(store.clone()).await.unwrap();
            service.create_monthly_sales_trigger().await.unwrap();
        }

        let reloaded = TriggerService::new(store).await.unwrap();
        assert_eq!(reloaded.list().await[0].job, Job::SnapshotSales);
    }

    #[tokio::test]
    async fn delete_counts_removed_triggers() {
        let service = TriggerService::new(MemoryStore::default()).await.unwrap();
        service.create_daily_call_trigger().await.unwrap();
        service.create_weekly_deals_trigger().await.unwrap();
        service.create_monthly_sales_trigger().await.unwrap();
        service.create_monthly_pbf_trigger().await.unwrap();

        assert_eq!(service.delete_triggers(Job::SnapshotDeals).await.unwrap(), 1);
        assert_eq!(service.delete_triggers(Job::SnapshotDeals).await.unwrap(), 0);
        assert_eq!(service.delete_all_snapshot_triggers().await.unwrap(), 2);

        let remaining = service.list().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].job, Job::ProcessCallFiles);
    }

    #[tokio::test]
    async fn invalid_recurrence_is_rejected() {
        let service = TriggerService::new(MemoryStore::default()).await.unwrap();

        let err = service
            .create(Job::SnapshotPbf, Recurrence::Monthly { day: 32, hour: 8 })
            .await
            .unwrap_err();

        assert!(matches!(err, TriggerError::InvalidRecurrence(_)));
        assert!(service.list().await.is_empty());
    }

    #[tokio::test]
    async fn next_due_picks_earliest_trigger() {
        let tz = chrono_tz::UTC;
        let service = TriggerService::new(MemoryStore::default()).await.unwrap();
        service.create_daily_call_trigger().await.unwrap();
        service.create_weekly_deals_trigger().await.unwrap();

        // Monday 2025-06-02 05:00: the call trigger already fired, deals is at 08:00.
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 5, 0, 0).unwrap();

        assert_eq!(
            service.next_due(now, tz).await,
            Some((
                Job::SnapshotDeals,
                Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap()
            ))
        );
    }

    #[tokio::test]
    async fn fire_due_runs_jobs_in_order_and_survives_failures() {
        let tz = chrono_tz::UTC;
        let service = TriggerService::new(MemoryStore::default()).await.unwrap();
        service.create_weekly_deals_trigger().await.unwrap();
        service.create_daily_call_trigger().await.unwrap();
        service.create_monthly_pbf_trigger().await.unwrap();

        let runner = RecordingRunner {
            fail: Some(Job::ProcessCallFiles),
            ..Default::default()
        };
        let since = Utc.with_ymd_and_hms(2025, 6, 1, 23, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();

        let fired = service.fire_due(&runner, since, now, tz).await;

        assert_eq!(fired, vec![Job::ProcessCallFiles, Job::SnapshotDeals]);
        assert_eq!(*runner.ran.lock().unwrap(), fired);
    }

    #[tokio::test]
    async fn unreadable_registry_is_an_error_and_left_alone() {
        let store = MemoryStore {
            unreadable: true,
            ..Default::default()
        };
        *store.saved.lock().unwrap() = Some(TriggerConfig {
            triggers: vec![Trigger {
                job: Job::SnapshotSales,
                recurrence: Recurrence::Monthly { day: 1, hour: 8 },
                created_at: Utc::now(),
            }],
        });

        let result = TriggerService::new(store.clone()).await;

        assert!(matches!(result, Err(TriggerError::Store(_))));
        let kept = store.saved.lock().unwrap().clone().unwrap();
        assert_eq!(kept.triggers[0].job, Job::SnapshotSales);
    }

    #[tokio::test]
    async fn failed_save_leaves_registry_unchanged() {
        let store = MemoryStore::default();
        let service = TriggerService::new(store.clone()).await.unwrap();
        service.create_weekly_deals_trigger().await.unwrap();

        store.read_only.store(true, Ordering::SeqCst);

        assert!(service.create_daily_call_trigger().await.is_err());
        assert!(service.delete_triggers(Job::SnapshotDeals).await.is_err());

        let triggers = service.list().await;
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].job, Job::SnapshotDeals);
    }
}
