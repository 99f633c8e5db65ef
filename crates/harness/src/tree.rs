use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use storyflow_core::{Continuations, Node, NodeId};
use storyflow_engine::{ContentError, ContentService};

#[derive(Default)]
struct Edges {
    default: Option<NodeId>,
    alternatives: Vec<NodeId>,
}

#[derive(Default)]
struct TreeState {
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<NodeId, Edges>,
    fail_next: usize,
    failing: HashSet<NodeId>,
    continuation_calls: usize,
}

/// In-memory content service over a mutable tree.
///
/// A node's `has_children` flag is derived from its edges at the time it is
/// served, so a tree can be grown or cut between navigation steps.
#[derive(Default)]
pub struct TestTree {
    state: Mutex<TreeState>,
}

impl TestTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id`, and every id it offers, as leaf nodes if missing, then set
    /// its continuations. `default` is served as-is even when absent from
    /// `alternatives`.
    pub fn offer(&self, id: &str, default: Option<&str>, alternatives: &[&str]) -> &Self {
        let mut state = self.state.lock();
        for name in std::iter::once(id).chain(default).chain(alternatives.iter().copied()) {
            let node_id = NodeId::from(name);
            state
                .nodes
                .entry(node_id.clone())
                .or_insert_with(|| Node::new(node_id, format!("/media/{name}.mp4"), false));
        }
        state.edges.insert(
            NodeId::from(id),
            Edges {
                default: default.map(NodeId::from),
                alternatives: alternatives.iter().map(|s| NodeId::from(*s)).collect(),
            },
        );
        self
    }

    pub fn add_leaf(&self, id: &str) -> &Self {
        let node_id = NodeId::from(id);
        self.state
            .lock()
            .nodes
            .entry(node_id.clone())
            .or_insert_with(|| Node::new(node_id, format!("/media/{id}.mp4"), false));
        self
    }

    /// Stop serving `child` from `parent`, as if it had been taken down.
    pub fn withdraw(&self, parent: &str, child: &str) {
        let mut state = self.state.lock();
        let child = NodeId::from(child);
        if let Some(edges) = state.edges.get_mut(&NodeId::from(parent)) {
            edges.alternatives.retain(|id| *id != child);
            if edges.default.as_ref() == Some(&child) {
                edges.default = None;
            }
        }
    }

    /// Fail the next `n` service calls with `Unavailable`.
    pub fn fail_next(&self, n: usize) {
        self.state.lock().fail_next = n;
    }

    /// Fail every call that asks about `id` until [`TestTree::heal`].
    pub fn fail_on(&self, id: &str) {
        self.state.lock().failing.insert(NodeId::from(id));
    }

    pub fn heal(&self) {
        let mut state = self.state.lock();
        state.fail_next = 0;
        state.failing.clear();
    }

    pub fn continuation_calls(&self) -> usize {
        self.state.lock().continuation_calls
    }
}

impl TreeState {
    fn check(&mut self, id: &NodeId) -> Result<(), ContentError> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(ContentError::Unavailable(format!("injected failure for {id}")));
        }
        if self.failing.contains(id) {
            return Err(ContentError::Server {
                status: 503,
                message: format!("{id} is failing"),
            });
        }
        Ok(())
    }

    fn serve(&self, id: &NodeId) -> Option<Node> {
        let mut node = self.nodes.get(id)?.clone();
        node.has_children = self
            .edges
            .get(id)
            .is_some_and(|e| e.default.is_some() || !e.alternatives.is_empty());
        Some(node)
    }
}

#[async_trait::async_trait]
impl ContentService for TestTree {
    async fn get_node(&self, node_id: &NodeId) -> Result<Option<Node>, ContentError> {
        let mut state = self.state.lock();
        state.check(node_id)?;
        Ok(state.serve(node_id))
    }

    async fn get_continuations(&self, node_id: &NodeId) -> Result<Continuations, ContentError> {
        let mut state = self.state.lock();
        state.continuation_calls += 1;
        state.check(node_id)?;
        let Some(edges) = state.edges.get(node_id) else {
            return Ok(Continuations::empty());
        };
        let default = edges.default.as_ref().and_then(|id| state.serve(id));
        let alternatives = edges
            .alternatives
            .iter()
            .filter_map(|id| state.serve(id))
            .collect();
        Ok(Continuations::new(default, alternatives))
    }
}
