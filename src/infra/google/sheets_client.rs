// Sheets v4 implementation of the `Workbook` port for one spreadsheet.

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use super::google_api::{ApiFailure, GoogleApi};
use crate::core::sheets::{SheetError, SheetInfo, TabColor, Workbook};

const SHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spreadsheet {
    #[serde(default)]
    properties: SpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetProperties {
    time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sheet {
    properties: SheetProperties,
    #[serde(default)]
    filter_views: Vec<FilterView>,
    #[serde(default)]
    conditional_formats: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    index: usize,
}

impl From<&SheetProperties> for SheetInfo {
    fn from(props: &SheetProperties) -> Self {
        SheetInfo {
            sheet_id: props.sheet_id,
            title: props.title.clone(),
            index: props.index,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterView {
    filter_view_id: i64,
}

impl From<ApiFailure> for SheetError {
    fn from(failure: ApiFailure) -> Self {
        match failure {
            ApiFailure::Auth(message) => SheetError::Auth(message),
            other => SheetError::Api(other.to_string()),
        }
    }
}

/// `'Title'!A1`, with quotes in the title doubled.
fn a1_start(title: &str) -> String {
    format!("'{}'!A1", title.replace('\'', "''"))
}

/// Sheets API color channels are floats in `[0, 1]`.
fn color_json(color: TabColor) -> Value {
    json!({
        "red": f64::from(color.red) / 255.0,
        "green": f64::from(color.green) / 255.0,
        "blue": f64::from(color.blue) / 255.0,
    })
}

fn sheet_properties_reply(reply: &Value, kind: &str) -> Result<SheetInfo, SheetError> {
    let props = reply
        .get("replies")
        .and_then(|r| r.get(0))
        .and_then(|r| r.get(kind))
        .and_then(|r| r.get("properties"))
        .cloned()
        .ok_or_else(|| SheetError::Api(format!("{kind} reply missing sheet properties")))?;
    let props: SheetProperties =
        serde_json::from_value(props).map_err(|e| SheetError::Api(e.to_string()))?;
    Ok(SheetInfo::from(&props))
}

pub struct GoogleWorkbook {
    api: GoogleApi,
    spreadsheet_id: String,
}

impl GoogleWorkbook {
    pub fn new(api: GoogleApi, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            api,
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    async fn metadata(&self, fields: &str) -> Result<Spreadsheet, SheetError> {
        let url = format!("{SHEETS_URL}/{}", self.spreadsheet_id);
        Ok(self
            .api
            .json(Method::GET, &url, &[("fields", fields)], None)
            .await?)
    }

    async fn sheet(&self, sheet_id: i64) -> Result<Sheet, SheetError> {
        self.metadata("sheets(properties(sheetId,title,index),filterViews(filterViewId),conditionalFormats)")
            .await?
            .sheets
            .into_iter()
            .find(|s| s.properties.sheet_id == sheet_id)
            .ok_or(SheetError::UnknownSheet(sheet_id))
    }

    async fn batch_update(&self, requests: Vec<Value>) -> Result<Value, SheetError> {
        if requests.is_empty() {
            return Ok(json!({ "replies": [] }));
        }
        let url = format!("{SHEETS_URL}/{}:batchUpdate", self.spreadsheet_id);
        let body = json!({ "requests": requests });
        Ok(self.api.json(Method::POST, &url, &[], Some(&body)).await?)
    }
}

#[async_trait]
impl Workbook for GoogleWorkbook {
    async fn time_zone(&self) -> Result<Option<String>, SheetError> {
        Ok(self
            .metadata("properties.timeZone")
            .await?
            .properties
            .time_zone
            .filter(|tz| !tz.is_empty()))
    }

    async fn list_sheets(&self) -> Result<Vec<SheetInfo>, SheetError> {
        let mut sheets: Vec<SheetInfo> = self
            .metadata("sheets.properties(sheetId,title,index)")
            .await?
            .sheets
            .iter()
            .map(|s| SheetInfo::from(&s.properties))
            .collect();
        sheets.sort_by_key(|s| s.index);
        Ok(sheets)
    }

    async fn add_sheet(&self, title: &str) -> Result<SheetInfo, SheetError> {
        let reply = self
            .batch_update(vec![json!({ "addSheet": { "properties": { "title": title } } })])
            .await?;
        sheet_properties_reply(&reply, "addSheet")
    }

    async fn duplicate_sheet(
        &self,
        sheet_id: i64,
        new_title: &str,
        insert_index: usize,
    ) -> Result<SheetInfo, SheetError> {
        let reply = self
            .batch_update(vec![json!({
                "duplicateSheet": {
                    "sourceSheetId": sheet_id,
                    "insertSheetIndex": insert_index,
                    "newSheetName": new_title,
                }
            })])
            .await?;
        sheet_properties_reply(&reply, "duplicateSheet")
    }

    async fn set_tab_color(&self, sheet_id: i64, color: TabColor) -> Result<(), SheetError> {
        self.batch_update(vec![json!({
            "updateSheetProperties": {
                "properties": { "sheetId": sheet_id, "tabColor": color_json(color) },
                "fields": "tabColor",
            }
        })])
        .await?;
        Ok(())
    }

    async fn remove_basic_filter(&self, sheet_id: i64) -> Result<(), SheetError> {
        self.batch_update(vec![json!({ "clearBasicFilter": { "sheetId": sheet_id } })])
            .await?;
        Ok(())
    }

    async fn delete_filter_views(&self, sheet_id: i64) -> Result<(), SheetError> {
        let requests = self
            .sheet(sheet_id)
            .await?
            .filter_views
            .iter()
            .map(|view| json!({ "deleteFilterView": { "filterId": view.filter_view_id } }))
            .collect();
        self.batch_update(requests).await?;
        Ok(())
    }

    async fn flatten_values(&self, sheet_id: i64) -> Result<(), SheetError> {
        self.batch_update(vec![json!({
            "copyPaste": {
                "source": { "sheetId": sheet_id },
                "destination": { "sheetId": sheet_id },
                "pasteType": "PASTE_VALUES",
                "pasteOrientation": "NORMAL",
            }
        })])
        .await?;
        Ok(())
    }

    async fn clear_contents(&self, sheet_id: i64) -> Result<(), SheetError> {
        self.batch_update(vec![json!({
            "updateCells": {
                "range": { "sheetId": sheet_id },
                "fields": "userEnteredValue",
            }
        })])
        .await?;
        Ok(())
    }

    async fn clear_conditional_formats(&self, sheet_id: i64) -> Result<(), SheetError> {
        let count = self.sheet(sheet_id).await?.conditional_formats.len();
        // Highest index first so earlier indexes stay valid.
        let requests = (0..count)
            .rev()
            .map(|index| {
                json!({ "deleteConditionalFormatRule": { "sheetId": sheet_id, "index": index } })
            })
            .collect();
        self.batch_update(requests).await?;
        Ok(())
    }

    async fn resize(&self, sheet_id: i64, rows: usize, cols: usize) -> Result<(), SheetError> {
        self.batch_update(vec![json!({
            "updateSheetProperties": {
                "properties": {
                    "sheetId": sheet_id,
                    "gridProperties": { "rowCount": rows, "columnCount": cols },
                },
                "fields": "gridProperties.rowCount,gridProperties.columnCount",
            }
        })])
        .await?;
        Ok(())
    }

    async fn write_values(
        &self,
        sheet: &SheetInfo,
        values: &[Vec<String>],
    ) -> Result<(), SheetError> {
        let range = a1_start(&sheet.title);
        let mut url = Url::parse(&format!("{SHEETS_URL}/{}/values", self.spreadsheet_id))
            .map_err(|e| SheetError::Api(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SheetError::Api("spreadsheet URL cannot take a path".to_string()))?
            .push(&range);

        let body = json!({ "range": range, "majorDimension": "ROWS", "values": values });
        self.api
            .send(
                Method::PUT,
                url.as_str(),
                &[("valueInputOption", "USER_ENTERED")],
                Some(&body),
            )
            .await?;
        Ok(())
    }
}
