use crate::core::properties::{PropertyError, PropertyStore};
use async_trait::async_trait;
use dashmap::DashMap;

/// In-memory implementation of PropertyStore for tests.
#[derive(Default)]
pub struct InMemoryPropertyStore {
    values: DashMap<String, String>,
}

#[async_trait]
impl PropertyStore for InMemoryPropertyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PropertyError> {
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PropertyError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, PropertyError> {
        Ok(self.values.remove(key).is_some())
    }
}
