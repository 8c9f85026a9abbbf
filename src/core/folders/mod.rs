pub mod folder_service;

pub use folder_service::{FolderError, FolderService, DEFAULT_MERGE_THRESHOLD};
