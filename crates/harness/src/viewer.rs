use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use storyflow_core::{ChainMap, LikeState, NodeId};
use storyflow_engine::{ContentError, EngineConfig, Navigator, ReactionService};
use storyflow_storage::{ChainStore, KvStore, MemoryStore, StorageError};

use crate::tree::TestTree;

/// A navigator wired to a [`TestTree`] and a shared store, so several
/// viewers (or one viewer across "sessions") can see the same chains.
pub struct TestViewer<S = MemoryStore> {
    pub tree: Arc<TestTree>,
    pub kv: Arc<S>,
    pub config: EngineConfig,
    pub nav: Navigator<TestTree, S>,
}

impl TestViewer<MemoryStore> {
    pub fn new(tree: Arc<TestTree>) -> Self {
        Self::with_store(tree, Arc::new(MemoryStore::new()))
    }
}

impl<S: KvStore> TestViewer<S> {
    pub fn with_store(tree: Arc<TestTree>, kv: Arc<S>) -> Self {
        Self::with_config(tree, kv, EngineConfig::default())
    }

    pub fn with_config(tree: Arc<TestTree>, kv: Arc<S>, config: EngineConfig) -> Self {
        let store = ChainStore::new(Arc::clone(&kv));
        let nav = Navigator::with_config(Arc::clone(&tree), store, config.clone());
        Self {
            tree,
            kv,
            config,
            nav,
        }
    }

    /// A fresh navigator over the same tree and store, as after a reload.
    pub fn reopen(&self) -> Self {
        Self::with_config(
            Arc::clone(&self.tree),
            Arc::clone(&self.kv),
            self.config.clone(),
        )
    }

    pub fn chain(&self, root: &str) -> Result<ChainMap, StorageError> {
        self.nav.store().read_chain(&NodeId::from(root))
    }

    pub fn current_id(&self) -> Option<&str> {
        self.nav.current().map(|n| n.id.as_str())
    }
}

/// Reaction service keeping per-node like state, with a failure switch.
#[derive(Default)]
pub struct TestReactions {
    likes: Mutex<HashMap<NodeId, LikeState>>,
    failing: Mutex<bool>,
}

impl TestReactions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn state(&self, id: &str) -> Option<LikeState> {
        self.likes.lock().get(&NodeId::from(id)).copied()
    }
}

#[async_trait::async_trait]
impl ReactionService for TestReactions {
    async fn toggle_like(&self, node_id: &NodeId) -> Result<LikeState, ContentError> {
        if *self.failing.lock() {
            return Err(ContentError::Unavailable("reactions offline".into()));
        }
        let mut likes = self.likes.lock();
        let state = likes.entry(node_id.clone()).or_insert(LikeState {
            liked: false,
            count: 0,
        });
        state.liked = !state.liked;
        state.count = if state.liked {
            state.count + 1
        } else {
            state.count.saturating_sub(1)
        };
        Ok(*state)
    }
}
