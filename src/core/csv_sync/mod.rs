pub mod csv_sync_service;

pub use csv_sync_service::{CsvFetcher, CsvSource, CsvSyncError, CsvSyncService};
