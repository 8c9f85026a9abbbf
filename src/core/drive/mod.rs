pub mod drive_store;

pub use drive_store::{DriveError, DriveFile, DriveFolder, DriveStore};
