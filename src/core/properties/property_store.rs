// Small persisted key/value settings shared across runs (watermarks and the
// like). Values are plain strings; callers own their encoding.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PropertyError {
    #[error("Property storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait PropertyStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, PropertyError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), PropertyError>;
    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool, PropertyError>;
}

/// Read an RFC 3339 timestamp property, defaulting to the Unix epoch when the
/// key is absent or unreadable.
pub async fn load_timestamp<P: PropertyStore + ?Sized>(
    store: &P,
    key: &str,
) -> Result<DateTime<Utc>, PropertyError> {
    let Some(raw) = store.get(key).await? else {
        return Ok(DateTime::<Utc>::UNIX_EPOCH);
    };

    match DateTime::parse_from_rfc3339(&raw) {
        Ok(ts) => Ok(ts.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(key, value = %raw, "Ignoring unreadable timestamp property: {e}");
            Ok(DateTime::<Utc>::UNIX_EPOCH)
        }
    }
}

pub async fn save_timestamp<P: PropertyStore + ?Sized>(
    store: &P,
    key: &str,
    value: DateTime<Utc>,
) -> Result<(), PropertyError> {
    store.set(key, &value.to_rfc3339()).await
}
