// Spreadsheet port used by the snapshot and CSV sync automations. Indexes are
// 0-based tab positions; ids are the backend's stable sheet ids.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("Sheets API error: {0}")]
    Api(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Sheet id {0} not found")]
    UnknownSheet(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetInfo {
    pub sheet_id: i64,
    pub title: String,
    pub index: usize,
}

/// RGB tab color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl TabColor {
    /// Gray used to mark snapshot tabs (`#9e9e9e`).
    pub const SNAPSHOT_GRAY: TabColor = TabColor {
        red: 0x9e,
        green: 0x9e,
        blue: 0x9e,
    };
}

#[async_trait]
pub trait Workbook: Send + Sync {
    /// IANA time zone configured on the spreadsheet, if any.
    async fn time_zone(&self) -> Result<Option<String>, SheetError>;

    /// All tabs, ordered by index.
    async fn list_sheets(&self) -> Result<Vec<SheetInfo>, SheetError>;

    async fn add_sheet(&self, title: &str) -> Result<SheetInfo, SheetError>;

    /// Copy a tab (values, formulas and formatting) to `insert_index`.
    async fn duplicate_sheet(
        &self,
        sheet_id: i64,
        new_title: &str,
        insert_index: usize,
    ) -> Result<SheetInfo, SheetError>;

    async fn set_tab_color(&self, sheet_id: i64, color: TabColor) -> Result<(), SheetError>;

    async fn remove_basic_filter(&self, sheet_id: i64) -> Result<(), SheetError>;

    async fn delete_filter_views(&self, sheet_id: i64) -> Result<(), SheetError>;

    /// Replace every formula in the tab with its current value.
    async fn flatten_values(&self, sheet_id: i64) -> Result<(), SheetError>;

    /// Clear cell contents, keeping formatting.
    async fn clear_contents(&self, sheet_id: i64) -> Result<(), SheetError>;

    async fn clear_conditional_formats(&self, sheet_id: i64) -> Result<(), SheetError>;

    /// Set the grid to exactly `rows` x `cols`.
    async fn resize(&self, sheet_id: i64, rows: usize, cols: usize) -> Result<(), SheetError>;

    /// Write `values` starting at A1.
    async fn write_values(&self, sheet: &SheetInfo, values: &[Vec<String>])
        -> Result<(), SheetError>;
}

/// Find a tab by exact title.
pub fn find_sheet<'a>(sheets: &'a [SheetInfo], title: &str) -> Option<&'a SheetInfo> {
    sheets.iter().find(|s| s.title == title)
}
