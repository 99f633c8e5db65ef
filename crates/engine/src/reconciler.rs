use storyflow_core::{ChainMap, NodeId};
use storyflow_storage::{ChainStore, KvStore};

use crate::config::EngineConfig;

/// Whether a chain write reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persisted {
    Written,
    Unchanged,
    /// The store failed; the step lives only in memory for this session.
    Failed,
}

/// Sole writer of persisted chains. Storage failures stop here: they are
/// logged and reported as [`Persisted::Failed`], never returned as errors.
pub struct ChainReconciler<S> {
    store: ChainStore<S>,
    config: EngineConfig,
}

impl<S> Clone for ChainReconciler<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: KvStore> ChainReconciler<S> {
    pub fn new(store: ChainStore<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &ChainStore<S> {
        &self.store
    }

    /// Chain for `root`, or an empty one if the store cannot be read.
    pub fn load(&self, root: &NodeId) -> ChainMap {
        match self.store.read_chain(root) {
            Ok(chain) => chain,
            Err(e) => {
                tracing::warn!(%root, error = %e, "chain read failed; treating as empty");
                ChainMap::new()
            }
        }
    }

    pub fn recorded_child(&self, root: &NodeId, parent: &NodeId) -> Option<NodeId> {
        self.load(root).get(parent).cloned()
    }

    /// Record `parent -> child` for `root`, pruning the parent's old tail
    /// first when `prune_from_parent` is set.
    pub fn save_step(
        &self,
        root: &NodeId,
        parent: &NodeId,
        child: &NodeId,
        prune_from_parent: bool,
    ) -> Persisted {
        self.mutate(root, |chain| {
            chain.save_step(parent.clone(), child.clone(), prune_from_parent);
            true
        })
    }

    /// Record a step taken by continuing forward to the last node of `path`
    /// (root first). Steps the chain already holds are kept with their
    /// tails; a step that differs from the recorded one replaces it and
    /// prunes the old tail, so the chain follows the path actually taken.
    pub fn record_advance(&self, root: &NodeId, path: &[NodeId]) -> Persisted {
        self.mutate(root, |chain| follow_path(chain, path))
    }

    /// Record an explicit branch choice: the last step of `path`. Always
    /// prunes unless configured to skip choices that match the recorded
    /// child.
    pub fn record_choice(&self, root: &NodeId, path: &[NodeId]) -> Persisted {
        let Some((child, prefix)) = path.split_last() else {
            return Persisted::Unchanged;
        };
        let Some(parent) = prefix.last() else {
            return Persisted::Unchanged;
        };
        let skip_redundant = self.config.skip_redundant_prune;
        self.mutate(root, |chain| {
            let changed = follow_path(chain, prefix);
            if skip_redundant && chain.get(parent) == Some(child) {
                return changed;
            }
            chain.save_step(parent.clone(), child.clone(), true);
            true
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn mutate(&self, root: &NodeId, f: impl FnOnce(&mut ChainMap) -> bool) -> Persisted {
        let mut chain = match self.store.read_chain(root) {
            Ok(chain) => chain,
            Err(e) => {
                tracing::warn!(%root, error = %e, "chain read failed; step not persisted");
                return Persisted::Failed;
            }
        };
        if !f(&mut chain) {
            return Persisted::Unchanged;
        }
        // Keys off the root's path only come from a damaged entry.
        let dropped = chain.retain_reachable(root);
        if !dropped.is_empty() {
            tracing::warn!(%root, dropped = dropped.len(), "dropped unreachable chain steps");
        }
        match self.store.write_chain(root, &chain) {
            Ok(()) => {
                tracing::debug!(%root, steps = chain.len(), "chain persisted");
                Persisted::Written
            }
            Err(e) => {
                tracing::warn!(%root, error = %e, "chain write failed; step not persisted");
                Persisted::Failed
            }
        }
    }
}

/// Make `chain` follow `path` pair by pair. Returns whether anything changed.
fn follow_path(chain: &mut ChainMap, path: &[NodeId]) -> bool {
    let mut changed = false;
    for step in path.windows(2) {
        let (parent, child) = (&step[0], &step[1]);
        let prune = match chain.get(parent) {
            Some(existing) if existing == child => continue,
            Some(_) => true,
            None => false,
        };
        chain.save_step(parent.clone(), child.clone(), prune);
        changed = true;
    }
    changed
}
