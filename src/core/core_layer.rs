// The core module contains all business logic.
// Each automation gets its own submodule; external systems are reached only
// through the traits declared here.

#[path = "similarity/jaro_winkler.rs"]
pub mod similarity;

#[path = "transcripts/mod.rs"]
pub mod transcripts;

#[path = "drive/mod.rs"]
pub mod drive;

#[path = "folders/mod.rs"]
pub mod folders;

#[path = "properties/mod.rs"]
pub mod properties;

#[path = "summaries/mod.rs"]
pub mod summaries;

#[path = "sheets/mod.rs"]
pub mod sheets;

#[path = "snapshots/mod.rs"]
pub mod snapshots;

#[path = "csv_sync/mod.rs"]
pub mod csv_sync;

#[path = "triggers/mod.rs"]
pub mod triggers;
