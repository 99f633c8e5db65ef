use std::sync::Arc;

use storyflow_core::{ChainMap, NodeId};

use crate::config::StoreConfig;
use crate::error::StorageError;
use crate::traits::KvStore;

/// Typed view over a [`KvStore`]: one JSON chain per root plus the feed
/// anchor key.
pub struct ChainStore<S> {
    kv: Arc<S>,
    config: StoreConfig,
}

impl<S> Clone for ChainStore<S> {
    fn clone(&self) -> Self {
        Self {
            kv: Arc::clone(&self.kv),
            config: self.config.clone(),
        }
    }
}

impl<S: KvStore> ChainStore<S> {
    pub fn new(kv: Arc<S>) -> Self {
        Self::with_config(kv, StoreConfig::default())
    }

    pub fn with_config(kv: Arc<S>, config: StoreConfig) -> Self {
        Self { kv, config }
    }

    pub fn kv(&self) -> &Arc<S> {
        &self.kv
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn chain_key(&self, root: &NodeId) -> String {
        format!("{}{}", self.config.chain_key_prefix, root)
    }

    /// Read the chain for `root`. A missing or malformed entry reads as an
    /// empty chain; only the store itself failing is an error.
    pub fn read_chain(&self, root: &NodeId) -> Result<ChainMap, StorageError> {
        let key = self.chain_key(root);
        let Some(raw) = self.kv.get(&key)? else {
            return Ok(ChainMap::new());
        };
        match ChainMap::from_json(&raw) {
            Ok(chain) => Ok(chain),
            Err(e) => {
                tracing::warn!(%root, error = %e, "ignoring malformed persisted chain");
                Ok(ChainMap::new())
            }
        }
    }

    pub fn write_chain(&self, root: &NodeId, chain: &ChainMap) -> Result<(), StorageError> {
        let json = chain.to_json()?;
        self.kv.set(&self.chain_key(root), &json)
    }

    /// Roots that currently have a persisted chain entry.
    pub fn stored_roots(&self) -> Result<Vec<NodeId>, StorageError> {
        let prefix = &self.config.chain_key_prefix;
        Ok(self
            .kv
            .keys_with_prefix(prefix)?
            .into_iter()
            .filter_map(|k| k.strip_prefix(prefix.as_str()).map(NodeId::from))
            .collect())
    }

    pub fn set_feed_anchor(&self, node: &NodeId) -> Result<(), StorageError> {
        self.kv.set(&self.config.feed_anchor_key, node.as_str())
    }

    pub fn feed_anchor(&self) -> Result<Option<NodeId>, StorageError> {
        Ok(self.kv.get(&self.config.feed_anchor_key)?.map(NodeId::from))
    }

    pub fn clear_feed_anchor(&self) -> Result<(), StorageError> {
        self.kv.remove(&self.config.feed_anchor_key)
    }
}

impl<S> std::fmt::Debug for ChainStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
