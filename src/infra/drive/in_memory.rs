// In-memory `DriveStore` used by the core tests. Listing order is creation
// order, like a freshly populated Drive folder.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::core::drive::{DriveError, DriveFile, DriveFolder, DriveStore};
use crate::core::summaries::SummaryDocument;

#[derive(Clone, Debug)]
enum Content {
    Folder,
    Text(String),
    File,
    Document(SummaryDocument),
}

#[derive(Clone, Debug)]
struct Entry {
    seq: u64,
    name: String,
    parent: String,
    modified: DateTime<Utc>,
    trashed: bool,
    content: Content,
}

impl Entry {
    fn is_folder(&self) -> bool {
        matches!(self.content, Content::Folder)
    }
}

#[derive(Default)]
pub struct InMemoryDrive {
    entries: DashMap<String, Entry>,
    next_id: AtomicU64,
}

impl InMemoryDrive {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, parent: &str, name: &str, modified: DateTime<Utc>, content: Content) -> String {
        let seq = self.next_id.fetch_add(1, Ordering::SeqCst);
        let id = format!("id-{seq}");
        self.entries.insert(
            id.clone(),
            Entry {
                seq,
                name: name.to_string(),
                parent: parent.to_string(),
                modified,
                trashed: false,
                content,
            },
        );
        id
    }

    pub fn add_folder(&self, parent: &str, name: &str) -> String {
        self.insert(parent, name, Utc::now(), Content::Folder)
    }

    /// A non-text file (an existing document, say).
    pub fn add_file(&self, folder: &str, name: &str) -> String {
        self.insert(folder, name, Utc::now(), Content::File)
    }

    pub fn add_text_file(
        &self,
        folder: &str,
        name: &str,
        content: &str,
        modified: DateTime<Utc>,
    ) -> String {
        self.insert(folder, name, modified, Content::Text(content.to_string()))
    }

    pub fn is_trashed(&self, id: &str) -> bool {
        self.entries.get(id).is_some_and(|e| e.trashed)
    }

    /// Generated documents inside `folder`, in creation order.
    pub fn documents_in(&self, folder: &str) -> Vec<SummaryDocument> {
        self.children(folder, |e| matches!(e.content, Content::Document(_)))
            .into_iter()
            .filter_map(|(_, e)| match e.content {
                Content::Document(doc) => Some(doc),
                _ => None,
            })
            .collect()
    }

    fn children(&self, parent: &str, keep: impl Fn(&Entry) -> bool) -> Vec<(String, Entry)> {
        let mut found: Vec<(String, Entry)> = self
            .entries
            .iter()
            .filter(|e| e.parent == parent && !e.trashed && keep(e.value()))
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        found.sort_by_key(|(_, e)| e.seq);
        found
    }

    fn files(&self, parent: &str, keep: impl Fn(&Entry) -> bool) -> Vec<DriveFile> {
        self.children(parent, keep)
            .into_iter()
            .map(|(id, e)| DriveFile {
                id,
                name: e.name,
                modified_time: e.modified,
            })
            .collect()
    }

    fn folders(&self, parent: &str) -> Vec<DriveFolder> {
        self.children(parent, Entry::is_folder)
            .into_iter()
            .map(|(id, e)| DriveFolder { id, name: e.name })
            .collect()
    }
}

#[async_trait]
impl DriveStore for InMemoryDrive {
    async fn list_text_files(&self, folder_id: &str) -> Result<Vec<DriveFile>, DriveError> {
        Ok(self.files(folder_id, |e| matches!(e.content, Content::Text(_))))
    }

    async fn list_files(&self, folder_id: &str) -> Result<Vec<DriveFile>, DriveError> {
        Ok(self.files(folder_id, |e| !e.is_folder()))
    }

    async fn read_text(&self, file_id: &str) -> Result<String, DriveError> {
        match self.entries.get(file_id).map(|e| e.content.clone()) {
            Some(Content::Text(text)) => Ok(text),
            Some(_) => Err(DriveError::Api(format!("{file_id} is not a text file"))),
            None => Err(DriveError::NotFound(file_id.to_string())),
        }
    }

    async fn list_folders(&self, parent_id: &str) -> Result<Vec<DriveFolder>, DriveError> {
        Ok(self.folders(parent_id))
    }

    async fn find_folder(
        &self,
        parent_id: &str,
        name: &str,
    ) -> Result<Option<DriveFolder>, DriveError> {
        Ok(self.folders(parent_id).into_iter().find(|f| f.name == name))
    }

    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<DriveFolder, DriveError> {
        let id = self.add_folder(parent_id, name);
        Ok(DriveFolder {
            id,
            name: name.to_string(),
        })
    }

    async fn file_exists(&self, folder_id: &str, name: &str) -> Result<bool, DriveError> {
        Ok(!self
            .files(folder_id, |e| !e.is_folder() && e.name == name)
            .is_empty())
    }

    async fn move_file(&self, file_id: &str, destination_id: &str) -> Result<(), DriveError> {
        let mut entry = self
            .entries
            .get_mut(file_id)
            .ok_or_else(|| DriveError::NotFound(file_id.to_string()))?;
        entry.parent = destination_id.to_string();
        Ok(())
    }

    async fn trash_folder(&self, folder_id: &str) -> Result<(), DriveError> {
        let mut entry = self
            .entries
            .get_mut(folder_id)
            .ok_or_else(|| DriveError::NotFound(folder_id.to_string()))?;
        entry.trashed = true;
        Ok(())
    }

    async fn create_document(
        &self,
        folder_id: &str,
        document: &SummaryDocument,
    ) -> Result<String, DriveError> {
        Ok(self.insert(
            folder_id,
            &document.title,
            Utc::now(),
            Content::Document(document.clone()),
        ))
    }
}
