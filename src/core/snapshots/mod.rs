pub mod snapshot_service;

pub use snapshot_service::{SnapshotKind, SnapshotService, DEFAULT_TIME_ZONE};
