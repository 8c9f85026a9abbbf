// The infra module contains implementations of core traits.
// Each backend gets its own submodule.

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "google/mod.rs"]
pub mod google;

#[path = "csv_fetch/mod.rs"]
pub mod csv_fetch;

#[path = "properties/mod.rs"]
pub mod properties;

#[path = "triggers/mod.rs"]
pub mod triggers;

#[cfg(test)]
#[path = "drive/mod.rs"]
pub mod drive;

#[cfg(test)]
#[path = "sheets/mod.rs"]
pub mod sheets;
