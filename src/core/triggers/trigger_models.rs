use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Jobs the scheduler knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Job {
    ProcessCallFiles,
    SnapshotSales,
    SnapshotDeals,
    SnapshotPbf,
}

impl Job {
    pub fn is_snapshot(self) -> bool {
        !matches!(self, Job::ProcessCallFiles)
    }

    pub fn name(self) -> &'static str {
        match self {
            Job::ProcessCallFiles => "process_call_files",
            Job::SnapshotSales => "snapshot_sales",
            Job::SnapshotDeals => "snapshot_deals",
            Job::SnapshotPbf => "snapshot_pbf",
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wall-clock recurrence, evaluated in the scheduler's time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "every", rename_all = "snake_case")]
pub enum Recurrence {
    Daily { hour: u32 },
    Weekly { weekday: Weekday, hour: u32 },
    /// Months without `day` are skipped.
    Monthly { day: u32, hour: u32 },
}

impl Recurrence {
    pub fn hour(&self) -> u32 {
        match *self {
            Recurrence::Daily { hour }
            | Recurrence::Weekly { hour, .. }
            | Recurrence::Monthly { hour, .. } => hour,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.hour() > 23 {
            return Err(format!("hour {} is out of range 0-23", self.hour()));
        }
        if let Recurrence::Monthly { day, .. } = *self {
            if !(1..=31).contains(&day) {
                return Err(format!("day {day} is out of range 1-31"));
            }
        }
        Ok(())
    }

    fn matches(&self, date: chrono::NaiveDate) -> bool {
        match *self {
            Recurrence::Daily { .. } => true,
            Recurrence::Weekly { weekday, .. } => date.weekday() == weekday,
            Recurrence::Monthly { day, .. } => date.day() == day,
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recurrence::Daily { hour } => write!(f, "daily at {hour:02}:00"),
            Recurrence::Weekly { weekday, hour } => {
                write!(f, "every {weekday} at {hour:02}:00")
            }
            Recurrence::Monthly { day, hour } => {
                write!(f, "monthly on day {day} at {hour:02}:00")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub job: Job,
    pub recurrence: Recurrence,
    pub created_at: DateTime<Utc>,
}

/// Persisted trigger registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(default)]
    pub triggers: Vec<Trigger>,
}

/// Covers the longest gap a monthly `day = 31` recurrence can have.
const SEARCH_DAYS: i64 = 400;

/// Next occurrence of `recurrence` strictly after `after`, in wall-clock time
/// of `tz`. A local hour that does not exist on a DST change is skipped.
pub fn next_fire(recurrence: &Recurrence, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(recurrence.hour(), 0, 0)?;
    let start = after.with_timezone(&tz).date_naive();

    (0..=SEARCH_DAYS)
        .map(|offset| start + Duration::days(offset))
        .filter(|date| recurrence.matches(*date))
        .filter_map(|date| tz.from_local_datetime(&date.and_time(time)).earliest())
        .map(|local| local.with_timezone(&Utc))
        .find(|fire| *fire > after)
}
