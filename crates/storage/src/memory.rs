use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::StorageError;
use crate::traits::KvStore;

/// Session-scoped store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .entries
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_scan_stops_at_boundary() -> Result<(), StorageError> {
        let store = MemoryStore::new();
        store.set("flowChain:a", "{}")?;
        store.set("flowChain:b", "{}")?;
        store.set("flowChainz", "{}")?;
        store.set("zzz", "{}")?;

        assert_eq!(store.keys_with_prefix("flowChain:")?.len(), 2);
        assert_eq!(store.len(), 4);
        Ok(())
    }
}
