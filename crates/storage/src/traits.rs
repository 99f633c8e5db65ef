use crate::error::StorageError;

/// String key-value storage scoped to one browsing session.
///
/// Implementations are shared behind `Arc` between the navigator and any
/// in-flight restoration, so every method takes `&self`.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}
