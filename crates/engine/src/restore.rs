use std::collections::HashSet;
use std::sync::Arc;

use storyflow_core::{Node, NodeId};
use storyflow_storage::KvStore;

use crate::content::ContentService;
use crate::error::EngineError;
use crate::history::{Level, NavigationStack, Variants};
use crate::reconciler::ChainReconciler;

/// Identifies one `enter_root` request. A restoration is only applied if its
/// ticket is still the navigator's latest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreTicket {
    pub(crate) root: NodeId,
    pub(crate) epoch: u64,
}

impl RestoreTicket {
    pub fn root(&self) -> &NodeId {
        &self.root
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Navigation state rebuilt from a persisted chain, not yet applied.
#[derive(Debug, Clone)]
pub struct Restoration {
    pub ticket: RestoreTicket,
    pub current: Node,
    pub history: NavigationStack,
    pub variants: Variants,
    pub upcoming: Vec<Node>,
    /// Root-first ancestry of `current`, ending with it.
    pub path: Vec<NodeId>,
}

impl Restoration {
    /// True if at least one persisted step was replayed.
    pub fn resumed(&self) -> bool {
        !self.history.is_empty()
    }
}

/// Replays a root's persisted chain against the content service.
///
/// Holds its own handles so a restoration can run while the navigator is
/// free to accept a newer `enter_root`.
pub struct ChainRestorer<C, S> {
    content: Arc<C>,
    chains: ChainReconciler<S>,
}

impl<C, S> Clone for ChainRestorer<C, S> {
    fn clone(&self) -> Self {
        Self {
            content: Arc::clone(&self.content),
            chains: self.chains.clone(),
        }
    }
}

impl<C: ContentService, S: KvStore> ChainRestorer<C, S> {
    pub fn new(content: Arc<C>, chains: ChainReconciler<S>) -> Self {
        Self { content, chains }
    }

    pub async fn restore_full_chain(
        &self,
        ticket: &RestoreTicket,
    ) -> Result<Restoration, EngineError> {
        let root = &ticket.root;
        let root_node = self
            .content
            .get_node(root)
            .await?
            .ok_or_else(|| EngineError::RootNotFound(root.clone()))?;

        let chain = self.chains.load(root);
        let mut levels = Vec::new();
        let mut seen: HashSet<NodeId> = HashSet::from([root.clone()]);
        // Variants of the node being resolved; `None` while at the root,
        // which offers its own continuations.
        let mut variants: Option<Variants> = None;
        let mut upcoming: Option<Vec<Node>> = None;
        let mut parent = root_node;
        let mut path = vec![root.clone()];

        while let Some(chosen_id) = chain.get(&parent.id) {
            let offered = self.content.get_continuations(&parent.id).await?;
            let Some(next) = offered.find(chosen_id).cloned() else {
                tracing::debug!(%root, parent = %parent.id, missing = %chosen_id, "persisted step no longer served");
                upcoming = Some(offered.alternatives);
                break;
            };

            let parent_id = parent.id.clone();
            let level_variants = variants
                .take()
                .unwrap_or_else(|| Variants::from_parent(parent_id.clone(), offered.alternatives.clone()));
            levels.push(Level {
                videos: vec![parent],
                index: 0,
                variants: level_variants,
                upcoming: offered.alternatives.clone(),
                path: path.clone(),
            });
            variants = Some(Variants::from_parent(parent_id, offered.alternatives));

            parent = next;
            path.push(parent.id.clone());
            if !chain.contains(&parent.id) || !seen.insert(parent.id.clone()) {
                break;
            }
        }

        let current = parent;
        let upcoming = match upcoming {
            Some(upcoming) => upcoming,
            None if current.has_children => {
                self.content.get_continuations(&current.id).await?.alternatives
            }
            None => Vec::new(),
        };
        let variants = variants.unwrap_or_else(|| own_variants(&current, &upcoming));

        tracing::info!(
            %root,
            current = %current.id,
            depth = levels.len(),
            "restored navigation state"
        );

        Ok(Restoration {
            ticket: ticket.clone(),
            current,
            history: NavigationStack::from_levels(levels),
            variants,
            upcoming,
            path,
        })
    }
}

/// Variants for a position with no sibling set: the node's own children.
pub(crate) fn own_variants(node: &Node, upcoming: &[Node]) -> Variants {
    if upcoming.is_empty() {
        Variants::default()
    } else {
        Variants::from_parent(node.id.clone(), upcoming.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use storyflow_core::{ChainMap, Continuations};
    use storyflow_storage::{ChainStore, MemoryStore};

    use super::*;
    use crate::config::EngineConfig;
    use crate::content::ContentError;

    /// Fixed tree: `edges` maps a parent to (default, alternatives).
    struct FixedTree {
        edges: HashMap<&'static str, (Option<&'static str>, Vec<&'static str>)>,
    }

    impl FixedTree {
        fn node(&self, id: &str) -> Node {
            Node::new(id, format!("/v/{id}.mp4"), self.edges.contains_key(id))
        }
    }

    #[async_trait::async_trait]
    impl ContentService for FixedTree {
        async fn get_node(&self, node_id: &NodeId) -> Result<Option<Node>, ContentError> {
            Ok(Some(self.node(node_id.as_str())))
        }

        async fn get_continuations(&self, node_id: &NodeId) -> Result<Continuations, ContentError> {
            let Some((default, alternatives)) = self.edges.get(node_id.as_str()) else {
                return Ok(Continuations::empty());
            };
            Ok(Continuations::new(
                default.map(|d| self.node(d)),
                alternatives.iter().map(|a| self.node(a)).collect(),
            ))
        }
    }

    fn restorer(chain: &[(&str, &str)]) -> ChainRestorer<FixedTree, MemoryStore> {
        let tree = FixedTree {
            edges: HashMap::from([
                ("A", (Some("B"), vec!["B", "B2"])),
                ("B", (Some("C"), Vec::new())),
            ]),
        };
        let store = ChainStore::new(Arc::new(MemoryStore::new()));
        let map: ChainMap = chain
            .iter()
            .map(|(p, c)| (NodeId::from(*p), NodeId::from(*c)))
            .collect();
        store
            .write_chain(&NodeId::from("A"), &map)
            .expect("memory store write");
        ChainRestorer::new(Arc::new(tree), ChainReconciler::new(store, EngineConfig::default()))
    }

    fn ticket() -> RestoreTicket {
        RestoreTicket {
            root: NodeId::from("A"),
            epoch: 1,
        }
    }

    #[tokio::test]
    async fn empty_chain_restores_the_root_with_its_children() {
        let restoration = restorer(&[]).restore_full_chain(&ticket()).await.unwrap();

        assert!(!restoration.resumed());
        assert_eq!(restoration.current.id.as_str(), "A");
        assert_eq!(restoration.upcoming.len(), 2);
        assert_eq!(restoration.variants.parent, Some(NodeId::from("A")));
    }

    #[tokio::test]
    async fn default_is_an_eligible_target() {
        // B lists no alternatives; C is reachable only as its default.
        let restoration = restorer(&[("A", "B"), ("B", "C")])
            .restore_full_chain(&ticket())
            .await
            .unwrap();

        assert!(restoration.resumed());
        assert_eq!(restoration.current.id.as_str(), "C");
        assert_eq!(restoration.history.depth(), 2);
        assert!(restoration.upcoming.is_empty());
    }

    #[tokio::test]
    async fn levels_carry_their_ancestry() {
        let restoration = restorer(&[("A", "B"), ("B", "C")])
            .restore_full_chain(&ticket())
            .await
            .unwrap();

        let ids = |path: &[NodeId]| path.iter().map(NodeId::as_str).collect::<Vec<_>>().join(",");
        let levels = restoration.history.levels();
        assert_eq!(ids(&levels[0].path), "A");
        assert_eq!(ids(&levels[1].path), "A,B");
        assert_eq!(ids(&restoration.path), "A,B,C");
    }
}
