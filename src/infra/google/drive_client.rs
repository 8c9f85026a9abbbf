// Drive v3 + Docs v1 implementation of the `DriveStore` port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};

use super::docs_requests::document_requests;
use super::google_api::{ApiFailure, GoogleApi};
use crate::core::drive::{DriveError, DriveFile, DriveFolder, DriveStore};
use crate::core::summaries::SummaryDocument;

const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const DOCS_URL: &str = "https://docs.googleapis.com/v1/documents";

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const DOCUMENT_MIME: &str = "application/vnd.google-apps.document";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<FileResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    id: String,
    #[serde(default)]
    name: String,
    modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    parents: Vec<String>,
}

impl FileResource {
    fn into_file(self) -> DriveFile {
        DriveFile {
            id: self.id,
            name: self.name,
            modified_time: self.modified_time.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        }
    }

    fn into_folder(self) -> DriveFolder {
        DriveFolder {
            id: self.id,
            name: self.name,
        }
    }
}

/// Quote a value for a Drive search query.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn children_query(parent_id: &str, filter: &str) -> String {
    format!("{} in parents and trashed = false and {}", quote(parent_id), filter)
}

impl From<ApiFailure> for DriveError {
    fn from(failure: ApiFailure) -> Self {
        match failure {
            ApiFailure::Auth(message) => DriveError::Auth(message),
            failure if failure.is_not_found() => DriveError::NotFound(failure.to_string()),
            other => DriveError::Api(other.to_string()),
        }
    }
}

pub struct GoogleDriveStore {
    api: GoogleApi,
}

impl GoogleDriveStore {
    pub fn new(api: GoogleApi) -> Self {
        Self { api }
    }

    /// Every page of a `files.list` query, in listing order.
    async fn search(&self, query: &str) -> Result<Vec<FileResource>, DriveError> {
        let mut results = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query),
                ("fields", "nextPageToken,files(id,name,modifiedTime)"),
                ("pageSize", "1000"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let page: FileList = self.api.json(Method::GET, FILES_URL, &params, None).await?;
            results.extend(page.files);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(results)
    }

    async fn create_file(&self, metadata: &Value) -> Result<FileResource, DriveError> {
        Ok(self
            .api
            .json(
                Method::POST,
                FILES_URL,
                &[("fields", "id,name"), ("supportsAllDrives", "true")],
                Some(metadata),
            )
            .await?)
    }
}

#[async_trait]
impl DriveStore for GoogleDriveStore {
    async fn list_text_files(&self, folder_id: &str) -> Result<Vec<DriveFile>, DriveError> {
        let query = children_query(folder_id, "mimeType = 'text/plain'");
        Ok(self
            .search(&query)
            .await?
            .into_iter()
            .map(FileResource::into_file)
            .collect())
    }

    async fn list_files(&self, folder_id: &str) -> Result<Vec<DriveFile>, DriveError> {
        let query = children_query(folder_id, &format!("mimeType != {}", quote(FOLDER_MIME)));
        Ok(self
            .search(&query)
            .await?
            .into_iter()
            .map(FileResource::into_file)
            .collect())
    }

    async fn read_text(&self, file_id: &str) -> Result<String, DriveError> {
        let url = format!("{FILES_URL}/{file_id}");
        Ok(self
            .api
            .send(
                Method::GET,
                &url,
                &[("alt", "media"), ("supportsAllDrives", "true")],
                None,
            )
            .await?)
    }

    async fn list_folders(&self, parent_id: &str) -> Result<Vec<DriveFolder>, DriveError> {
        let query = children_query(parent_id, &format!("mimeType = {}", quote(FOLDER_MIME)));
        Ok(self
            .search(&query)
            .await?
            .into_iter()
            .map(FileResource::into_folder)
            .collect())
    }

    async fn find_folder(
        &self,
        parent_id: &str,
        name: &str,
    ) -> Result<Option<DriveFolder>, DriveError> {
        let query = children_query(
            parent_id,
            &format!("mimeType = {} and name = {}", quote(FOLDER_MIME), quote(name)),
        );
        Ok(self
            .search(&query)
            .await?
            .into_iter()
            .next()
            .map(FileResource::into_folder))
    }

    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<DriveFolder, DriveError> {
        let folder = self
            .create_file(&json!({
                "name": name,
                "mimeType": FOLDER_MIME,
                "parents": [parent_id],
            }))
            .await?;
        tracing::info!(folder = %name, id = %folder.id, "Created Drive folder");
        Ok(folder.into_folder())
    }

    async fn file_exists(&self, folder_id: &str, name: &str) -> Result<bool, DriveError> {
        let query = children_query(
            folder_id,
            &format!("mimeType != {} and name = {}", quote(FOLDER_MIME), quote(name)),
        );
        Ok(!self.search(&query).await?.is_empty())
    }

    async fn move_file(&self, file_id: &str, destination_id: &str) -> Result<(), DriveError> {
        let url = format!("{FILES_URL}/{file_id}");
        let current: FileResource = self
            .api
            .json(
                Method::GET,
                &url,
                &[("fields", "id,parents"), ("supportsAllDrives", "true")],
                None,
            )
            .await?;
        let previous = current.parents.join(",");

        self.api
            .send(
                Method::PATCH,
                &url,
                &[
                    ("addParents", destination_id),
                    ("removeParents", previous.as_str()),
                    ("supportsAllDrives", "true"),
                ],
                Some(&json!({})),
            )
            .await?;
        Ok(())
    }

    async fn trash_folder(&self, folder_id: &str) -> Result<(), DriveError> {
        let url = format!("{FILES_URL}/{folder_id}");
        self.api
            .send(
                Method::PATCH,
                &url,
                &[("supportsAllDrives", "true")],
                Some(&json!({ "trashed": true })),
            )
            .await?;
        Ok(())
    }

    async fn create_document(
        &self,
        folder_id: &str,
        document: &SummaryDocument,
    ) -> Result<String, DriveError> {
        let created = self
            .create_file(&json!({
                "name": document.title,
                "mimeType": DOCUMENT_MIME,
                "parents": [folder_id],
            }))
            .await?;

        let url = format!("{DOCS_URL}/{}:batchUpdate", created.id);
        let body = json!({ "requests": document_requests(document) });
        self.api.send(Method::POST, &url, &[], Some(&body)).await?;

        Ok(created.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries_escape_quotes_and_backslashes() {
        assert_eq!(quote("O'Brien \\ Co"), r"'O\'Brien \\ Co'");
        assert_eq!(
            children_query("abc", "mimeType = 'text/plain'"),
            "'abc' in parents and trashed = false and mimeType = 'text/plain'"
        );
    }

    #[test]
    fn file_list_parses_modified_time() {
        let page: FileList = serde_json::from_str(
            r#"{"files": [{"id": "1", "name": "call.json", "modifiedTime": "2025-06-02T17:04:05.123Z"}]}"#,
        )
        .unwrap();

        let file = page.files.into_iter().next().unwrap().into_file();
        assert_eq!(file.name, "call.json");
        assert_eq!(file.modified_time.to_rfc3339(), "2025-06-02T17:04:05.123+00:00");
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn not_found_maps_to_drive_not_found() {
        let err: DriveError = ApiFailure::Status {
            status: reqwest::StatusCode::NOT_FOUND,
            body: "File not found".into(),
        }
        .into();
        assert!(matches!(err, DriveError::NotFound(_)));

        let err: DriveError = ApiFailure::Auth("bad key".into()).into();
        assert!(matches!(err, DriveError::Auth(_)));
    }
}
