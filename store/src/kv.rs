use crate::error::StoreError;

/// Async trait for persisting string values under string keys.
///
/// This is the substrate both the row-store facade and the auth session sit
/// on: last write wins, reads return the last-written value, and a removed
/// key reads back as `None`. Implementations are expected to be cheap to
/// clone.
pub trait KvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
