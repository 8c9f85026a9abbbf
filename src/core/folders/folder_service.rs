// Customer folder housekeeping: spotting near-duplicate customer folders and
// merging one into another on request. Nothing here merges automatically.

use thiserror::Error;

use crate::core::drive::{DriveError, DriveFolder, DriveStore};
use crate::core::similarity::jaro_winkler_similarity;

/// Pairs scoring strictly above this are reported as merge candidates.
pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.8;

#[derive(Debug, Error)]
pub enum FolderError {
    #[error("Could not find source folder \"{0}\"")]
    SourceNotFound(String),
    #[error("Could not find destination folder \"{0}\"")]
    DestinationNotFound(String),
    #[error("Source and destination are the same folder")]
    SameFolder,
    #[error(transparent)]
    Drive(#[from] DriveError),
}

/// Two folders that are probably the same customer.
#[derive(Debug, Clone)]
pub struct MergeSuggestion {
    /// The folder listed first; the suggested merge target.
    pub keep: DriveFolder,
    /// The folder to merge into `keep`.
    pub merge: DriveFolder,
    pub score: f64,
}

/// Result of a completed merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub files_moved: usize,
    pub source: String,
    pub destination: String,
}

/// Score every unordered pair of folder names (lowercased) and keep those above
/// `threshold`. Pairs come out in listing order: `(0,1), (0,2), ..., (1,2), ...`.
pub fn suggest_merges(folders: &[DriveFolder], threshold: f64) -> Vec<MergeSuggestion> {
    let lowered: Vec<String> = folders.iter().map(|f| f.name.to_lowercase()).collect();
    let mut suggestions = Vec::new();

    for i in 0..folders.len() {
        for j in (i + 1)..folders.len() {
            let score = jaro_winkler_similarity(&lowered[i], &lowered[j]);
            if score > threshold {
                suggestions.push(MergeSuggestion {
                    keep: folders[i].clone(),
                    merge: folders[j].clone(),
                    score,
                });
            }
        }
    }

    suggestions
}

pub struct FolderService<D: DriveStore> {
    drive: D,
    root_folder_id: String,
}

impl<D: DriveStore> FolderService<D> {
    pub fn new(drive: D, root_folder_id: impl Into<String>) -> Self {
        Self {
            drive,
            root_folder_id: root_folder_id.into(),
        }
    }

    pub fn drive(&self) -> &D {
        &self.drive
    }

    /// List the customer folders under the root and suggest likely duplicates.
    pub async fn find_merge_suggestions(
        &self,
        threshold: f64,
    ) -> Result<Vec<MergeSuggestion>, FolderError> {
        let folders = self.drive.list_folders(&self.root_folder_id).await?;
        tracing::info!(
            folders = folders.len(),
            threshold,
            "Checking for similar customer folders"
        );
        Ok(suggest_merges(&folders, threshold))
    }

    /// Move every file from `source_name` into `destination_name`, then trash
    /// the emptied source folder.
    pub async fn merge_folders(
        &self,
        source_name: &str,
        destination_name: &str,
    ) -> Result<MergeReport, FolderError> {
        let source = self
            .drive
            .find_folder(&self.root_folder_id, source_name)
            .await?
            .ok_or_else(|| FolderError::SourceNotFound(source_name.to_string()))?;
        let destination = self
            .drive
            .find_folder(&self.root_folder_id, destination_name)
            .await?
            .ok_or_else(|| FolderError::DestinationNotFound(destination_name.to_string()))?;

        if source.id == destination.id {
            return Err(FolderError::SameFolder);
        }

        let files = self.drive.list_files(&source.id).await?;
        for file in &files {
            self.drive.move_file(&file.id, &destination.id).await?;
        }
        self.drive.trash_folder(&source.id).await?;

        tracing::info!(
            moved = files.len(),
            source = %source.name,
            destination = %destination.name,
            "Merged customer folders"
        );

        Ok(MergeReport {
            files_moved: files.len(),
            source: source.name,
            destination: destination.name,
        })
    }

    /// The customer's folder under the root, created on first use.
    pub async fn get_or_create_folder(&self, name: &str) -> Result<DriveFolder, FolderError> {
        if let Some(folder) = self.drive.find_folder(&self.root_folder_id, name).await? {
            return Ok(folder);
        }
        tracing::info!(customer = %name, "Creating customer folder");
        Ok(self.drive.create_folder(&self.root_folder_id, name).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::drive::InMemoryDrive;

    fn folder(id: &str, name: &str) -> DriveFolder {
        DriveFolder {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn suggests_lowercased_near_duplicates_in_listing_order() {
        let folders = vec![
            folder("1", "Audette"),
            folder("2", "Northwind"),
            folder("3", "AUDET"),
        ];

        let suggestions = suggest_merges(&folders, DEFAULT_MERGE_THRESHOLD);

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].keep.name, "Audette");
        assert_eq!(suggestions[0].merge.name, "AUDET");
        assert!(suggestions[0].score > 0.9);
    }

    #[test]
    fn threshold_is_strict() {
        let folders = vec![folder("1", "martha"), folder("2", "marhta")];
        let score = jaro_winkler_similarity("martha", "marhta");

        assert!(suggest_merges(&folders, score).is_empty());
        assert_eq!(suggest_merges(&folders, score - 1e-9).len(), 1);
    }

    #[test]
    fn no_suggestions_for_distinct_names() {
        let folders = vec![folder("1", "Contoso"), folder("2", "Fabrikam")];
        assert!(suggest_merges(&folders, DEFAULT_MERGE_THRESHOLD).is_empty());
    }

    #[tokio::test]
    async fn merge_moves_files_and_trashes_source() {
        let drive = InMemoryDrive::new();
        let root = drive.add_folder("root", "Calls");
        let keep = drive.add_folder(&root, "Audette");
        let dupe = drive.add_folder(&root, "Audet");
        drive.add_file(&dupe, "Kickoff - 1/2/2025");
        drive.add_file(&dupe, "Review - 2/2/2025");

        let service = FolderService::new(drive, root.clone());
        let report = service.merge_folders("Audet", "Audette").await.unwrap();

        assert_eq!(report.files_moved, 2);
        let drive = service.drive();
        assert_eq!(drive.list_files(&keep).await.unwrap().len(), 2);
        assert!(drive.is_trashed(&dupe));
        let remaining = drive.list_folders(&root).await.unwrap();
        assert_eq!(remaining, vec![folder(&keep, "Audette")]);
    }

    #[tokio::test]
    async fn merge_reports_missing_and_identical_folders() {
        let drive = InMemoryDrive::new();
        let root = drive.add_folder("root", "Calls");
        drive.add_folder(&root, "Audette");

        let service = FolderService::new(drive, root);

        assert!(matches!(
            service.merge_folders("Nope", "Audette").await,
            Err(FolderError::SourceNotFound(name)) if name == "Nope"
        ));
        assert!(matches!(
            service.merge_folders("Audette", "Nope").await,
            Err(FolderError::DestinationNotFound(_))
        ));
        assert!(matches!(
            service.merge_folders("Audette", "Audette").await,
            Err(FolderError::SameFolder)
        ));
    }

    #[tokio::test]
    async fn get_or_create_reuses_existing_folder() {
        let drive = InMemoryDrive::new();
        let root = drive.add_folder("root", "Calls");
        let existing = drive.add_folder(&root, "Contoso");

        let service = FolderService::new(drive, root.clone());

        let found = service.get_or_create_folder("Contoso").await.unwrap();
        assert_eq!(found.id, existing);

        let created = service.get_or_create_folder("Fabrikam").await.unwrap();
        assert_ne!(created.id, existing);
        assert_eq!(service.drive().list_folders(&root).await.unwrap().len(), 2);
    }
}
