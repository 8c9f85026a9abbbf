// Dated snapshot tabs: a copy of a live reporting tab with every formula
// replaced by its value, filters stripped, and a gray tab color so it reads as
// an archive.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::core::sheets::{find_sheet, SheetError, SheetInfo, TabColor, Workbook};

/// Used when neither the spreadsheet nor the configuration names a zone.
pub const DEFAULT_TIME_ZONE: Tz = chrono_tz::America::Vancouver;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Sheet \"{0}\" not found.")]
    MissingSheet(String),
    #[error(transparent)]
    Sheet(#[from] SheetError),
}

/// The reporting tabs that get snapshotted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKind {
    Sales,
    Deals,
    Pbf,
}

impl SnapshotKind {
    pub const ALL: [SnapshotKind; 3] = [SnapshotKind::Sales, SnapshotKind::Deals, SnapshotKind::Pbf];

    pub fn source_sheet(self) -> &'static str {
        match self {
            SnapshotKind::Sales => "Sales Forecast",
            SnapshotKind::Deals => "Forecast Deals",
            SnapshotKind::Pbf => "PBF Deals",
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            SnapshotKind::Sales => "Sales",
            SnapshotKind::Deals => "Deals",
            SnapshotKind::Pbf => "PBF",
        }
    }
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Names of the three tabs created by [`SnapshotService::snapshot_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotBundle {
    pub sales: String,
    pub deals: String,
    pub pbf: String,
}

/// `base`, then `base-2`, `base-3`, ... until the name is free.
pub fn unique_name(base: &str, existing: &HashSet<String>) -> String {
    if !existing.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|name| !existing.contains(name))
        .unwrap_or_else(|| base.to_string())
}

/// One suffix (`""`, `"-2"`, `"-3"`, ...) that frees every base name at once,
/// so bundled snapshots always share it.
pub fn shared_suffix(bases: &[String], existing: &HashSet<String>) -> String {
    if bases.iter().all(|b| !existing.contains(b)) {
        return String::new();
    }
    (2..)
        .map(|n| format!("-{n}"))
        .find(|suffix| {
            bases
                .iter()
                .all(|b| !existing.contains(&format!("{b}{suffix}")))
        })
        .unwrap_or_default()
}

pub struct SnapshotService<W: Workbook> {
    workbook: W,
    fallback_zone: Tz,
}

impl<W: Workbook> SnapshotService<W> {
    pub fn new(workbook: W, fallback_zone: Tz) -> Self {
        Self {
            workbook,
            fallback_zone,
        }
    }

    #[cfg(test)]
    pub fn workbook(&self) -> &W {
        &self.workbook
    }

    /// Snapshot one tab, placed right after its source. Returns the new name.
    pub async fn snapshot(&self, kind: SnapshotKind) -> Result<String, SnapshotError> {
        self.snapshot_at(kind, Utc::now()).await
    }

    pub async fn snapshot_at(
        &self,
        kind: SnapshotKind,
        now: DateTime<Utc>,
    ) -> Result<String, SnapshotError> {
        let date = self.date_string(now).await?;
        let sheets = self.workbook.list_sheets().await?;
        let source = require_sheet(&sheets, kind.source_sheet())?;

        let existing = titles(&sheets);
        let name = unique_name(&format!("{}-{}", kind.prefix(), date), &existing);

        self.copy_and_flatten(source, &name, source.index + 1).await?;
        tracing::info!(%kind, snapshot = %name, "Snapshot created");
        Ok(name)
    }

    /// Snapshot Sales, Deals and PBF together: same date, same suffix, placed
    /// contiguously after the right-most source tab.
    pub async fn snapshot_all(&self) -> Result<SnapshotBundle, SnapshotError> {
        self.snapshot_all_at(Utc::now()).await
    }

    pub async fn snapshot_all_at(&self, now: DateTime<Utc>) -> Result<SnapshotBundle, SnapshotError> {
        let date = self.date_string(now).await?;
        let sheets = self.workbook.list_sheets().await?;

        let sources = SnapshotKind::ALL
            .iter()
            .map(|kind| require_sheet(&sheets, kind.source_sheet()))
            .collect::<Result<Vec<_>, _>>()?;

        let bases: Vec<String> = SnapshotKind::ALL
            .iter()
            .map(|kind| format!("{}-{}", kind.prefix(), date))
            .collect();
        let suffix = shared_suffix(&bases, &titles(&sheets));
        let names: Vec<String> = bases.iter().map(|b| format!("{b}{suffix}")).collect();

        let anchor = sources.iter().map(|s| s.index).max().unwrap_or(0);
        for (offset, (source, name)) in sources.iter().zip(&names).enumerate() {
            self.copy_and_flatten(source, name, anchor + 1 + offset).await?;
        }

        tracing::info!(snapshots = ?names, "Snapshot bundle created");
        Ok(SnapshotBundle {
            sales: names[0].clone(),
            deals: names[1].clone(),
            pbf: names[2].clone(),
        })
    }

    async fn copy_and_flatten(
        &self,
        source: &SheetInfo,
        name: &str,
        index: usize,
    ) -> Result<SheetInfo, SnapshotError> {
        let copy = self
            .workbook
            .duplicate_sheet(source.sheet_id, name, index)
            .await?;
        self.workbook
            .set_tab_color(copy.sheet_id, TabColor::SNAPSHOT_GRAY)
            .await?;
        // Filters go first so hidden rows are flattened too.
        self.workbook.remove_basic_filter(copy.sheet_id).await?;
        self.workbook.delete_filter_views(copy.sheet_id).await?;
        self.workbook.flatten_values(copy.sheet_id).await?;
        Ok(copy)
    }

    /// Today as `yyyy-MM-dd` in the spreadsheet's zone.
    async fn date_string(&self, now: DateTime<Utc>) -> Result<String, SnapshotError> {
        let zone = self
            .workbook
            .time_zone()
            .await?
            .and_then(|name| match Tz::from_str(&name) {
                Ok(tz) => Some(tz),
                Err(e) => {
                    tracing::warn!(zone = %name, "Unknown spreadsheet time zone: {e}");
                    None
                }
            })
            .unwrap_or(self.fallback_zone);

        Ok(now.with_timezone(&zone).format("%Y-%m-%d").to_string())
    }
}

fn require_sheet<'a>(sheets: &'a [SheetInfo], title: &str) -> Result<&'a SheetInfo, SnapshotError> {
    find_sheet(sheets, title).ok_or_else(|| SnapshotError::MissingSheet(title.to_string()))
}

fn titles(sheets: &[SheetInfo]) -> HashSet<String> {
    sheets.iter().map(|s| s.title.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::sheets::InMemoryWorkbook;
    use chrono::TimeZone;

    fn names(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn workbook() -> InMemoryWorkbook {
        let book = InMemoryWorkbook::new(Some("America/Vancouver"));
        book.add_sheet_with_formulas("Summary");
        book.add_sheet_with_formulas("Sales Forecast");
        book.add_sheet_with_formulas("Forecast Deals");
        book.add_sheet_with_formulas("PBF Deals");
        book.add_sheet_with_formulas("Lookups");
        book
    }

    fn noon_utc() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()
    }

    #[test]
    fn unique_name_counts_from_two() {
        assert_eq!(unique_name("Sales-2025-06-02", &names(&[])), "Sales-2025-06-02");
        assert_eq!(
            unique_name(
                "Sales-2025-06-02",
                &names(&["Sales-2025-06-02", "Sales-2025-06-02-2"])
            ),
            "Sales-2025-06-02-3"
        );
    }

    #[test]
    fn shared_suffix_avoids_every_conflict() {
        let bases = vec!["Sales-d".to_string(), "Deals-d".to_string(), "PBF-d".to_string()];

        assert_eq!(shared_suffix(&bases, &names(&["Other"])), "");
        assert_eq!(shared_suffix(&bases, &names(&["Deals-d"])), "-2");
        assert_eq!(
            shared_suffix(&bases, &names(&["Deals-d", "PBF-d-2"])),
            "-3"
        );
    }

    #[tokio::test]
    async fn snapshot_is_placed_after_source_and_flattened() {
        let service = SnapshotService::new(workbook(), DEFAULT_TIME_ZONE);

        let name = service
            .snapshot_at(SnapshotKind::Deals, noon_utc())
            .await
            .unwrap();

        assert_eq!(name, "Deals-2025-06-02");
        let book = service.workbook();
        assert_eq!(
            book.titles(),
            vec![
                "Summary",
                "Sales Forecast",
                "Forecast Deals",
                "Deals-2025-06-02",
                "PBF Deals",
                "Lookups"
            ]
        );
        let snap = book.sheet("Deals-2025-06-02").unwrap();
        assert_eq!(snap.tab_color, Some(TabColor::SNAPSHOT_GRAY));
        assert!(!snap.has_basic_filter);
        assert_eq!(snap.filter_views, 0);
        assert!(!snap.has_formulas);

        let source = book.sheet("Forecast Deals").unwrap();
        assert!(source.has_formulas);
        assert!(source.has_basic_filter);
    }

    #[tokio::test]
    async fn repeated_snapshots_get_numbered() {
        let service = SnapshotService::new(workbook(), DEFAULT_TIME_ZONE);

        service.snapshot_at(SnapshotKind::Sales, noon_utc()).await.unwrap();
        let second = service.snapshot_at(SnapshotKind::Sales, noon_utc()).await.unwrap();

        assert_eq!(second, "Sales-2025-06-02-2");
    }

    #[tokio::test]
    async fn date_follows_spreadsheet_zone() {
        let service = SnapshotService::new(workbook(), chrono_tz::UTC);
        // 02:00 UTC on the 3rd is still the 2nd in Vancouver.
        let early = Utc.with_ymd_and_hms(2025, 6, 3, 2, 0, 0).unwrap();

        let name = service.snapshot_at(SnapshotKind::Pbf, early).await.unwrap();

        assert_eq!(name, "PBF-2025-06-02");
    }

    #[tokio::test]
    async fn bundle_shares_suffix_and_sits_after_rightmost_source() {
        let book = workbook();
        book.add_sheet_with_formulas("PBF-2025-06-02");
        let service = SnapshotService::new(book, DEFAULT_TIME_ZONE);

        let bundle = service.snapshot_all_at(noon_utc()).await.unwrap();

        assert_eq!(
            bundle,
            SnapshotBundle {
                sales: "Sales-2025-06-02-2".into(),
                deals: "Deals-2025-06-02-2".into(),
                pbf: "PBF-2025-06-02-2".into(),
            }
        );
        assert_eq!(
            service.workbook().titles(),
            vec![
                "Summary",
                "Sales Forecast",
                "Forecast Deals",
                "PBF Deals",
                "Sales-2025-06-02-2",
                "Deals-2025-06-02-2",
                "PBF-2025-06-02-2",
                "Lookups",
                "PBF-2025-06-02"
            ]
        );
    }

    #[tokio::test]
    async fn missing_source_is_reported_by_name() {
        let book = InMemoryWorkbook::new(None);
        book.add_sheet_with_formulas("Sales Forecast");
        let service = SnapshotService::new(book, DEFAULT_TIME_ZONE);

        let err = service.snapshot_all_at(noon_utc()).await.unwrap_err();

        assert_eq!(err.to_string(), "Sheet \"Forecast Deals\" not found.");
        assert_eq!(service.workbook().titles(), vec!["Sales Forecast"]);
    }
}
