// Storage port for the hosted file store (folders, plain-text exports and
// generated documents). The summarizer and the folder tools only talk to this
// trait; `infra/google` provides the Drive/Docs implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::summaries::SummaryDocument;

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("Drive API error: {0}")]
    Api(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
}

/// A file as listed in a folder.
#[derive(Debug, Clone, PartialEq)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub modified_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveFolder {
    pub id: String,
    pub name: String,
}

#[async_trait]
pub trait DriveStore: Send + Sync {
    /// Plain-text files directly inside `folder_id`.
    async fn list_text_files(&self, folder_id: &str) -> Result<Vec<DriveFile>, DriveError>;

    /// Every non-trashed file directly inside `folder_id`.
    async fn list_files(&self, folder_id: &str) -> Result<Vec<DriveFile>, DriveError>;

    async fn read_text(&self, file_id: &str) -> Result<String, DriveError>;

    /// Subfolders of `parent_id`, in listing order.
    async fn list_folders(&self, parent_id: &str) -> Result<Vec<DriveFolder>, DriveError>;

    /// First subfolder of `parent_id` named exactly `name`.
    async fn find_folder(
        &self,
        parent_id: &str,
        name: &str,
    ) -> Result<Option<DriveFolder>, DriveError>;

    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<DriveFolder, DriveError>;

    async fn file_exists(&self, folder_id: &str, name: &str) -> Result<bool, DriveError>;

    async fn move_file(&self, file_id: &str, destination_id: &str) -> Result<(), DriveError>;

    async fn trash_folder(&self, folder_id: &str) -> Result<(), DriveError>;

    /// Create a document inside `folder_id` and return its id.
    async fn create_document(
        &self,
        folder_id: &str,
        document: &SummaryDocument,
    ) -> Result<String, DriveError>;
}
