// In-memory `Workbook` for the snapshot and CSV sync tests. Each tab keeps
// just enough state to observe what the services did to it.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::core::sheets::{SheetError, SheetInfo, TabColor, Workbook};

const DEFAULT_ROWS: usize = 1000;
const DEFAULT_COLS: usize = 26;

#[derive(Clone, Debug)]
pub struct InMemorySheet {
    pub info: SheetInfo,
    pub rows: usize,
    pub cols: usize,
    pub values: Vec<Vec<String>>,
    pub has_formulas: bool,
    pub has_basic_filter: bool,
    pub filter_views: usize,
    pub conditional_formats: usize,
    pub tab_color: Option<TabColor>,
}

impl InMemorySheet {
    fn blank(info: SheetInfo) -> Self {
        Self {
            info,
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            values: Vec::new(),
            has_formulas: false,
            has_basic_filter: false,
            filter_views: 0,
            conditional_formats: 0,
            tab_color: None,
        }
    }
}

pub struct InMemoryWorkbook {
    time_zone: Option<String>,
    sheets: DashMap<i64, InMemorySheet>,
    next_id: AtomicI64,
}

impl InMemoryWorkbook {
    pub fn new(time_zone: Option<&str>) -> Self {
        Self {
            time_zone: time_zone.map(str::to_string),
            sheets: DashMap::new(),
            next_id: AtomicI64::new(100),
        }
    }

    /// Append a live reporting tab: formulas, a basic filter, two filter views
    /// and a conditional format rule.
    pub fn add_sheet_with_formulas(&self, title: &str) -> SheetInfo {
        let info = self.append(title);
        if let Some(mut sheet) = self.sheets.get_mut(&info.sheet_id) {
            sheet.values = vec![vec!["Total".to_string(), "=SUM(B2:B)".to_string()]];
            sheet.has_formulas = true;
            sheet.has_basic_filter = true;
            sheet.filter_views = 2;
            sheet.conditional_formats = 1;
        }
        info
    }

    /// Tab titles in tab order.
    pub fn titles(&self) -> Vec<String> {
        self.ordered().into_iter().map(|s| s.info.title).collect()
    }

    pub fn sheet(&self, title: &str) -> Option<InMemorySheet> {
        self.sheets
            .iter()
            .find(|s| s.info.title == title)
            .map(|s| s.value().clone())
    }

    fn ordered(&self) -> Vec<InMemorySheet> {
        let mut sheets: Vec<InMemorySheet> = self.sheets.iter().map(|s| s.value().clone()).collect();
        sheets.sort_by_key(|s| s.info.index);
        sheets
    }

    fn append(&self, title: &str) -> SheetInfo {
        let info = SheetInfo {
            sheet_id: self.next_id.fetch_add(1, Ordering::SeqCst),
            title: title.to_string(),
            index: self.sheets.len(),
        };
        self.sheets
            .insert(info.sheet_id, InMemorySheet::blank(info.clone()));
        info
    }

    fn with_sheet<T>(
        &self,
        sheet_id: i64,
        f: impl FnOnce(&mut InMemorySheet) -> T,
    ) -> Result<T, SheetError> {
        let mut sheet = self
            .sheets
            .get_mut(&sheet_id)
            .ok_or(SheetError::UnknownSheet(sheet_id))?;
        Ok(f(&mut sheet))
    }

    fn title_taken(&self, title: &str) -> bool {
        self.sheets.iter().any(|s| s.info.title == title)
    }
}

#[async_trait]
impl Workbook for InMemoryWorkbook {
    async fn time_zone(&self) -> Result<Option<String>, SheetError> {
        Ok(self.time_zone.clone())
    }

    async fn list_sheets(&self) -> Result<Vec<SheetInfo>, SheetError> {
        Ok(self.ordered().into_iter().map(|s| s.info).collect())
    }

    async fn add_sheet(&self, title: &str) -> Result<SheetInfo, SheetError> {
        if self.title_taken(title) {
            return Err(SheetError::Api(format!("A sheet named '{title}' already exists")));
        }
        Ok(self.append(title))
    }

    async fn duplicate_sheet(
        &self,
        sheet_id: i64,
        new_title: &str,
        insert_index: usize,
    ) -> Result<SheetInfo, SheetError> {
        if self.title_taken(new_title) {
            return Err(SheetError::Api(format!(
                "A sheet named '{new_title}' already exists"
            )));
        }
        let source = self
            .sheets
            .get(&sheet_id)
            .map(|s| s.value().clone())
            .ok_or(SheetError::UnknownSheet(sheet_id))?;

        for mut sheet in self.sheets.iter_mut() {
            if sheet.info.index >= insert_index {
                sheet.info.index += 1;
            }
        }

        let info = SheetInfo {
            sheet_id: self.next_id.fetch_add(1, Ordering::SeqCst),
            title: new_title.to_string(),
            index: insert_index,
        };
        self.sheets.insert(
            info.sheet_id,
            InMemorySheet {
                info: info.clone(),
                ..source
            },
        );
        Ok(info)
    }

    async fn set_tab_color(&self, sheet_id: i64, color: TabColor) -> Result<(), SheetError> {
        self.with_sheet(sheet_id, |s| s.tab_color = Some(color))
    }

    async fn remove_basic_filter(&self, sheet_id: i64) -> Result<(), SheetError> {
        self.with_sheet(sheet_id, |s| s.has_basic_filter = false)
    }

    async fn delete_filter_views(&self, sheet_id: i64) -> Result<(), SheetError> {
        self.with_sheet(sheet_id, |s| s.filter_views = 0)
    }

    async fn flatten_values(&self, sheet_id: i64) -> Result<(), SheetError> {
        self.with_sheet(sheet_id, |s| s.has_formulas = false)
    }

    async fn clear_contents(&self, sheet_id: i64) -> Result<(), SheetError> {
        self.with_sheet(sheet_id, |s| {
            s.values.clear();
            s.has_formulas = false;
        })
    }

    async fn clear_conditional_formats(&self, sheet_id: i64) -> Result<(), SheetError> {
        self.with_sheet(sheet_id, |s| s.conditional_formats = 0)
    }

    async fn resize(&self, sheet_id: i64, rows: usize, cols: usize) -> Result<(), SheetError> {
        self.with_sheet(sheet_id, |s| {
            s.rows = rows;
            s.cols = cols;
            s.values.truncate(rows);
            for row in &mut s.values {
                row.truncate(cols);
            }
        })
    }

    async fn write_values(
        &self,
        sheet: &SheetInfo,
        values: &[Vec<String>],
    ) -> Result<(), SheetError> {
        self.with_sheet(sheet.sheet_id, |s| {
            let width = values.iter().map(Vec::len).max().unwrap_or(0);
            if values.len() > s.rows || width > s.cols {
                return Err(SheetError::Api(format!(
                    "{}x{} values do not fit a {}x{} grid",
                    values.len(),
                    width,
                    s.rows,
                    s.cols
                )));
            }
            s.values = values.to_vec();
            Ok(())
        })?
    }
}
