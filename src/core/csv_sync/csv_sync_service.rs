// Pull published CSV exports into named workbook tabs. Each source is
// independent: one failing URL never stops the others.

use async_trait::async_trait;
use thiserror::Error;

use crate::core::sheets::{find_sheet, SheetError, SheetInfo, Workbook};

#[derive(Debug, Error)]
pub enum CsvSyncError {
    #[error(
        "HTTP {status} fetching {url}.\n\
         • Open the link in an incognito window. If it fails, it isn't public.\n\
         • Either re-publish the tab OR replace with a Drive export link:\n  \
         https://docs.google.com/spreadsheets/d/{{FILE_ID}}/export?format=csv&gid={{GID}}\n  \
         (the service account needs at least Viewer access)."
    )]
    Http { status: u16, url: String },
    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },
    #[error("Invalid CSV: {0}")]
    Parse(#[from] csv::Error),
    #[error(transparent)]
    Sheet(#[from] SheetError),
}

/// A published CSV and the tab it lands in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvSource {
    pub sheet_name: String,
    pub url: String,
}

impl CsvSource {
    /// Parse `Sheet Name=https://...;Other=https://...`.
    pub fn parse_list(raw: &str) -> Result<Vec<CsvSource>, String> {
        raw.split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (name, url) = entry
                    .split_once('=')
                    .ok_or_else(|| format!("expected `Sheet Name=URL`, got `{entry}`"))?;
                let (name, url) = (name.trim(), url.trim());
                if name.is_empty() || url.is_empty() {
                    return Err(format!("expected `Sheet Name=URL`, got `{entry}`"));
                }
                Ok(CsvSource {
                    sheet_name: name.to_string(),
                    url: url.to_string(),
                })
            })
            .collect()
    }
}

/// Fetches CSV text over HTTP.
#[async_trait]
pub trait CsvFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, CsvSyncError>;
}

/// Outcome for one source.
#[derive(Debug)]
pub struct SyncResult {
    pub sheet_name: String,
    pub outcome: Result<(usize, usize), CsvSyncError>,
}

impl SyncResult {
    /// One line of the run summary.
    pub fn describe(&self) -> String {
        match &self.outcome {
            Ok((rows, cols)) => format!("✔ {} updated ({}×{})", self.sheet_name, rows, cols),
            Err(e) => format!("✖ {} failed:\n{}", self.sheet_name, e),
        }
    }
}

/// Parse CSV text into a rectangular grid. Short rows are padded with empty
/// cells up to the widest row.
pub fn parse_csv(text: &str) -> Result<Vec<Vec<String>>, CsvSyncError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut rows {
        row.resize(width, String::new());
    }
    Ok(rows)
}

pub struct CsvSyncService<F: CsvFetcher, W: Workbook> {
    fetcher: F,
    workbook: W,
    sources: Vec<CsvSource>,
}

impl<F: CsvFetcher, W: Workbook> CsvSyncService<F, W> {
    pub fn new(fetcher: F, workbook: W, sources: Vec<CsvSource>) -> Self {
        Self {
            fetcher,
            workbook,
            sources,
        }
    }

    #[cfg(test)]
    pub fn workbook(&self) -> &W {
        &self.workbook
    }

    /// Refresh every configured source and report each result.
    pub async fn refresh_all(&self) -> Vec<SyncResult> {
        let mut results = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let outcome = self.import(source).await;
            match &outcome {
                Ok((rows, cols)) => {
                    tracing::info!(sheet = %source.sheet_name, rows, cols, "CSV sync updated sheet")
                }
                Err(e) => tracing::warn!(sheet = %source.sheet_name, "CSV sync failed: {e}"),
            }
            results.push(SyncResult {
                sheet_name: source.sheet_name.clone(),
                outcome,
            });
        }
        results
    }

    /// Replace a tab's contents with one CSV. Returns `(rows, cols)` imported.
    pub async fn import(&self, source: &CsvSource) -> Result<(usize, usize), CsvSyncError> {
        let sheet = self.get_or_create_sheet(&source.sheet_name).await?;
        self.workbook.remove_basic_filter(sheet.sheet_id).await?;

        let text = self.fetcher.fetch(&source.url).await?;
        let data = parse_csv(&text)?;
        let rows = data.len();
        let cols = data.first().map(Vec::len).unwrap_or(0);

        self.workbook.clear_contents(sheet.sheet_id).await?;
        self.workbook.clear_conditional_formats(sheet.sheet_id).await?;
        self.workbook
            .resize(sheet.sheet_id, rows.max(1), cols.max(1))
            .await?;

        if rows > 0 && cols > 0 {
            self.workbook.write_values(&sheet, &data).await?;
        } else {
            self.workbook
                .write_values(&sheet, &[vec![String::new()]])
                .await?;
        }

        Ok((rows, cols))
    }

    async fn get_or_create_sheet(&self, name: &str) -> Result<SheetInfo, SheetError> {
        let sheets = self.workbook.list_sheets().await?;
        match find_sheet(&sheets, name) {
            Some(sheet) => Ok(sheet.clone()),
            None => self.workbook.add_sheet(name).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::sheets::InMemoryWorkbook;
    use std::collections::HashMap;

    struct StaticFetcher {
        responses: HashMap<String, Result<String, u16>>,
    }

    #[async_trait]
    impl CsvFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<String, CsvSyncError> {
            match self.responses.get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(status)) => Err(CsvSyncError::Http {
                    status: *status,
                    url: url.to_string(),
                }),
                None => Err(CsvSyncError::Network {
                    url: url.to_string(),
                    message: "unreachable".into(),
                }),
            }
        }
    }

    fn source(name: &str, url: &str) -> CsvSource {
        CsvSource {
            sheet_name: name.into(),
            url: url.into(),
        }
    }

    #[test]
    fn parses_source_list() {
        let sources = CsvSource::parse_list(
            "Deals=https://example.com/pub?gid=1&output=csv; Contract Data = https://example.com/pub?gid=2",
        )
        .unwrap();

        assert_eq!(
            sources,
            vec![
                source("Deals", "https://example.com/pub?gid=1&output=csv"),
                source("Contract Data", "https://example.com/pub?gid=2"),
            ]
        );
        assert!(CsvSource::parse_list("just-a-url").is_err());
        assert!(CsvSource::parse_list("").unwrap().is_empty());
    }

    #[test]
    fn ragged_rows_are_padded() {
        let grid = parse_csv("a,b,c\n1,\"two, quoted\"\n").unwrap();
        assert_eq!(
            grid,
            vec![
                vec!["a", "b", "c"],
                vec!["1", "two, quoted", ""],
            ]
        );
        assert!(parse_csv("").unwrap().is_empty());
    }

    #[tokio::test]
    async fn import_replaces_contents_and_sizes_grid_exactly() {
        let book = InMemoryWorkbook::new(None);
        let existing = book.add_sheet_with_formulas("Deals");
        let fetcher = StaticFetcher {
            responses: HashMap::from([(
                "https://example.com/deals".to_string(),
                Ok("Deal,Value\nAcme,100\nGlobex,250\n".to_string()),
            )]),
        };
        let service = CsvSyncService::new(
            fetcher,
            book,
            vec![source("Deals", "https://example.com/deals")],
        );

        let results = service.refresh_all().await;

        assert_eq!(results[0].describe(), "✔ Deals updated (3×2)");
        let sheet = service.workbook().sheet("Deals").unwrap();
        assert_eq!(sheet.info.sheet_id, existing.sheet_id);
        assert_eq!((sheet.rows, sheet.cols), (3, 2));
        assert_eq!(sheet.values[2], vec!["Globex", "250"]);
        assert!(!sheet.has_basic_filter);
        assert_eq!(sheet.conditional_formats, 0);
    }

    #[tokio::test]
    async fn missing_tab_is_created_and_empty_csv_leaves_one_cell() {
        let fetcher = StaticFetcher {
            responses: HashMap::from([("https://example.com/empty".to_string(), Ok(String::new()))]),
        };
        let service = CsvSyncService::new(
            fetcher,
            InMemoryWorkbook::new(None),
            vec![source("Contract Data", "https://example.com/empty")],
        );

        let results = service.refresh_all().await;

        assert_eq!(results[0].describe(), "✔ Contract Data updated (0×0)");
        let sheet = service.workbook().sheet("Contract Data").unwrap();
        assert_eq!((sheet.rows, sheet.cols), (1, 1));
        assert_eq!(sheet.values, vec![vec![String::new()]]);
    }

    #[tokio::test]
    async fn one_failing_source_does_not_stop_the_rest() {
        let fetcher = StaticFetcher {
            responses: HashMap::from([
                ("https://example.com/private".to_string(), Err(403)),
                ("https://example.com/ok".to_string(), Ok("x\n".to_string())),
            ]),
        };
        let service = CsvSyncService::new(
            fetcher,
            InMemoryWorkbook::new(None),
            vec![
                source("Deals", "https://example.com/private"),
                source("Contract Data", "https://example.com/ok"),
            ],
        );

        let results = service.refresh_all().await;

        let failure = results[0].describe();
        assert!(failure.starts_with("✖ Deals failed:\nHTTP 403 fetching https://example.com/private."));
        assert!(failure.contains("export?format=csv&gid={GID}"));
        assert_eq!(results[1].describe(), "✔ Contract Data updated (1×1)");
    }
}
