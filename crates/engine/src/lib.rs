pub mod config;
pub mod content;
pub mod error;
pub mod events;
pub mod feed;
pub mod history;
pub mod reconciler;
pub mod restore;

pub use config::EngineConfig;
pub use content::{ContentError, ContentService, ReactionService};
pub use error::EngineError;
pub use events::{Event, EventBus, SubscriptionId, Topic, UnreadCounter};
pub use history::{Level, NavigationStack, Variants};
pub use reconciler::{ChainReconciler, Persisted};
pub use restore::{ChainRestorer, Restoration, RestoreTicket};

use std::collections::HashMap;
use std::sync::Arc;

use storyflow_core::{LikeState, Node, NodeId};
use storyflow_storage::{ChainStore, KvStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Restoring,
    Viewing,
    ChoosingBranch,
}

/// Where `continue_forward` found the next video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceSource {
    SessionChoice,
    PersistedChain,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Moved { to: NodeId, source: AdvanceSource },
    /// Nothing to continue to automatically; the offered alternatives are
    /// loaded for the picker.
    AwaitingChoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    ClosedPicker,
    SteppedWithinLevel,
    Popped,
    /// History is empty: the presentation layer leaves the tree.
    ExitTree,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Applied { current: NodeId, depth: usize },
    /// A newer `enter_root` or `leave_root` superseded this restoration.
    Discarded,
}

/// Navigation state machine for one viewer.
///
/// Every navigation intent takes `&mut self`, so at most one is outstanding
/// at a time. A restoration can be split with [`Navigator::begin_enter_root`]
/// and [`Navigator::finish_enter_root`] when the caller needs to run it
/// elsewhere; the ticket epoch decides whether its result still applies.
pub struct Navigator<C, S> {
    content: Arc<C>,
    chains: ChainReconciler<S>,
    phase: Phase,
    root: Option<NodeId>,
    videos: Vec<Node>,
    index: usize,
    variants: Variants,
    upcoming: Vec<Node>,
    path: Vec<NodeId>,
    history: NavigationStack,
    chosen: HashMap<NodeId, Node>,
    epoch: u64,
}

impl<C: ContentService, S: KvStore> Navigator<C, S> {
    pub fn new(content: Arc<C>, store: ChainStore<S>) -> Self {
        Self::with_config(content, store, EngineConfig::default())
    }

    pub fn with_config(content: Arc<C>, store: ChainStore<S>, config: EngineConfig) -> Self {
        Self {
            content,
            chains: ChainReconciler::new(store, config),
            phase: Phase::Idle,
            root: None,
            videos: Vec::new(),
            index: 0,
            variants: Variants::default(),
            upcoming: Vec::new(),
            path: Vec::new(),
            history: NavigationStack::new(),
            chosen: HashMap::new(),
            epoch: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn root(&self) -> Option<&NodeId> {
        self.root.as_ref()
    }

    pub fn current(&self) -> Option<&Node> {
        self.videos.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn variants(&self) -> &Variants {
        &self.variants
    }

    /// The current video's own continuations.
    pub fn upcoming(&self) -> &[Node] {
        &self.upcoming
    }

    /// Root-first ancestry of the current video, ending with it.
    pub fn path(&self) -> &[NodeId] {
        &self.path
    }

    pub fn history(&self) -> &NavigationStack {
        &self.history
    }

    pub fn depth(&self) -> usize {
        self.history.depth()
    }

    pub fn chains(&self) -> &ChainReconciler<S> {
        &self.chains
    }

    pub fn store(&self) -> &ChainStore<S> {
        self.chains.store()
    }

    pub fn restorer(&self) -> ChainRestorer<C, S> {
        ChainRestorer::new(Arc::clone(&self.content), self.chains.clone())
    }

    // ========================================================================
    // Root entry and exit
    // ========================================================================

    /// Reset all per-root state and start restoring `root`. Any restoration
    /// still in flight for an earlier ticket will be discarded.
    pub fn begin_enter_root(&mut self, root: NodeId) -> RestoreTicket {
        self.epoch += 1;
        self.reset();
        tracing::info!(%root, epoch = self.epoch, "entering root");
        self.root = Some(root.clone());
        self.phase = Phase::Restoring;
        RestoreTicket {
            root,
            epoch: self.epoch,
        }
    }

    pub fn finish_enter_root(
        &mut self,
        ticket: &RestoreTicket,
        result: Result<Restoration, EngineError>,
    ) -> Result<RestoreOutcome, EngineError> {
        if ticket.epoch != self.epoch {
            tracing::debug!(
                root = %ticket.root,
                stale = ticket.epoch,
                latest = self.epoch,
                "discarding superseded restoration"
            );
            return Ok(RestoreOutcome::Discarded);
        }

        match result {
            Ok(restoration) => {
                let current = restoration.current.id.clone();
                self.videos = vec![restoration.current];
                self.index = 0;
                self.history = restoration.history;
                self.variants = restoration.variants;
                self.upcoming = restoration.upcoming;
                self.path = restoration.path;
                self.phase = Phase::Viewing;
                Ok(RestoreOutcome::Applied {
                    current,
                    depth: self.history.depth(),
                })
            }
            Err(e) => {
                tracing::warn!(root = %ticket.root, error = %e, "root entry failed");
                self.reset();
                self.root = None;
                self.phase = Phase::Idle;
                Err(e)
            }
        }
    }

    pub async fn enter_root(&mut self, root: NodeId) -> Result<RestoreOutcome, EngineError> {
        let ticket = self.begin_enter_root(root);
        let result = self.restorer().restore_full_chain(&ticket).await;
        self.finish_enter_root(&ticket, result)
    }

    /// Enter a tree from the linear feed, leaving an anchor so the feed can
    /// scroll back to `root` later.
    pub async fn enter_root_from_feed(
        &mut self,
        root: NodeId,
    ) -> Result<RestoreOutcome, EngineError> {
        if let Err(e) = self.chains.store().set_feed_anchor(&root) {
            tracing::warn!(%root, error = %e, "could not record feed anchor");
        }
        self.enter_root(root).await
    }

    pub fn leave_root(&mut self) {
        self.epoch += 1;
        if let Some(root) = self.root.take() {
            tracing::info!(%root, "leaving root");
        }
        self.reset();
        self.phase = Phase::Idle;
    }

    fn reset(&mut self) {
        self.videos.clear();
        self.index = 0;
        self.variants = Variants::default();
        self.upcoming.clear();
        self.path.clear();
        self.history.clear();
        self.chosen.clear();
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub async fn continue_forward(&mut self) -> Result<Advance, EngineError> {
        if self.phase != Phase::Viewing {
            return Err(EngineError::InvalidOperation("continue requires the viewing phase"));
        }
        let (root, current) = self.position()?;
        if !current.has_children {
            return Err(EngineError::InvalidOperation("current video has no continuations"));
        }

        if let Some(next) = self.chosen.get(&current.id).cloned() {
            let next_upcoming = self.load_upcoming(&next).await?;
            let next_path = self.extended_path(&next.id);
            self.chains.record_advance(&root, &next_path);
            let siblings = Variants::from_parent(current.id.clone(), self.upcoming.clone());
            return Ok(self.advance_to(next, siblings, next_upcoming, next_path, AdvanceSource::SessionChoice));
        }

        let offered = self.content.get_continuations(&current.id).await?;
        let recorded = self.chains.recorded_child(&root, &current.id);
        let persisted = recorded.as_ref().and_then(|id| offered.find(id));
        if let (Some(id), None) = (&recorded, persisted) {
            tracing::debug!(%root, parent = %current.id, missing = %id, "recorded child no longer served");
        }

        let resolved = match persisted {
            Some(node) => Some((node.clone(), AdvanceSource::PersistedChain)),
            None => offered
                .default_continuation
                .clone()
                .map(|node| (node, AdvanceSource::Default)),
        };

        let Some((next, source)) = resolved else {
            tracing::debug!(%root, parent = %current.id, offered = offered.alternatives.len(), "no continuation to follow");
            self.variants = Variants::from_parent(current.id.clone(), offered.alternatives.clone());
            self.upcoming = offered.alternatives;
            return Ok(Advance::AwaitingChoice);
        };

        let next_upcoming = self.load_upcoming(&next).await?;
        let next_path = self.extended_path(&next.id);
        // Also re-points the chain when this level was reached by backing
        // out of a different branch.
        self.chains.record_advance(&root, &next_path);
        let siblings = Variants::from_parent(current.id, offered.alternatives);
        Ok(self.advance_to(next, siblings, next_upcoming, next_path, source))
    }

    /// Show the branch picker over the current video.
    pub fn open_variants(&mut self) -> Result<&[Node], EngineError> {
        if self.phase != Phase::Viewing {
            return Err(EngineError::InvalidOperation("picker opens from the viewing phase"));
        }
        if self.variants.is_empty() {
            return Err(EngineError::InvalidOperation("no alternatives offered here"));
        }
        self.phase = Phase::ChoosingBranch;
        Ok(&self.variants.nodes)
    }

    pub async fn choose_branch(&mut self, index: usize) -> Result<NodeId, EngineError> {
        if self.phase != Phase::ChoosingBranch {
            return Err(EngineError::InvalidOperation("choose requires an open picker"));
        }
        let len = self.variants.nodes.len();
        let chosen = self
            .variants
            .nodes
            .get(index)
            .cloned()
            .ok_or(EngineError::IndexOutOfRange { index, len })?;
        let parent = self
            .variants
            .parent
            .clone()
            .ok_or(EngineError::InvalidOperation("alternatives have no parent"))?;
        let root = self
            .root
            .clone()
            .ok_or(EngineError::InvalidOperation("no root is being viewed"))?;

        let cut = self
            .path
            .iter()
            .rposition(|id| *id == parent)
            .ok_or(EngineError::InvalidOperation("picker parent is not on the current path"))?;
        let mut next_path = self.path[..=cut].to_vec();
        next_path.push(chosen.id.clone());

        let next_upcoming = self.load_upcoming(&chosen).await?;
        self.chains.record_choice(&root, &next_path);
        self.chosen.insert(parent, chosen.clone());

        let to = chosen.id.clone();
        let siblings = self.variants.clone();
        self.advance_to(chosen, siblings, next_upcoming, next_path, AdvanceSource::SessionChoice);
        Ok(to)
    }

    pub fn go_back(&mut self) -> BackOutcome {
        match self.phase {
            Phase::ChoosingBranch => {
                self.phase = Phase::Viewing;
                BackOutcome::ClosedPicker
            }
            Phase::Viewing if self.index > 0 => {
                self.index -= 1;
                BackOutcome::SteppedWithinLevel
            }
            Phase::Viewing => match self.history.pop() {
                Some(level) => {
                    tracing::debug!(depth = self.history.depth(), "back");
                    self.videos = level.videos;
                    self.index = level.index;
                    self.variants = level.variants;
                    self.upcoming = level.upcoming;
                    self.path = level.path;
                    BackOutcome::Popped
                }
                None => BackOutcome::ExitTree,
            },
            Phase::Idle | Phase::Restoring => BackOutcome::ExitTree,
        }
    }

    // ========================================================================
    // Reactions
    // ========================================================================

    /// Toggle the like on the current video, showing the result before the
    /// reaction service confirms it.
    pub async fn toggle_like<R: ReactionService>(
        &mut self,
        reactions: &R,
    ) -> Result<LikeState, EngineError> {
        let index = self.index;
        let node = self
            .videos
            .get_mut(index)
            .ok_or(EngineError::InvalidOperation("no video on screen"))?;
        let previous = node.toggle_like_optimistic();
        let id = node.id.clone();

        let result = reactions.toggle_like(&id).await;
        let Some(node) = self.videos.get_mut(index) else {
            return result.map_err(EngineError::Reaction);
        };
        match result {
            Ok(state) => {
                node.apply_like_state(state);
                Ok(state)
            }
            Err(e) => {
                tracing::debug!(node = %id, error = %e, "like reverted");
                node.apply_like_state(previous);
                Err(EngineError::Reaction(e))
            }
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn position(&self) -> Result<(NodeId, Node), EngineError> {
        let root = self
            .root
            .clone()
            .ok_or(EngineError::InvalidOperation("no root is being viewed"))?;
        let current = self
            .current()
            .cloned()
            .ok_or(EngineError::InvalidOperation("no video on screen"))?;
        Ok((root, current))
    }

    async fn load_upcoming(&self, node: &Node) -> Result<Vec<Node>, EngineError> {
        if !node.has_children {
            return Ok(Vec::new());
        }
        Ok(self.content.get_continuations(&node.id).await?.alternatives)
    }

    fn extended_path(&self, next: &NodeId) -> Vec<NodeId> {
        let mut path = self.path.clone();
        path.push(next.clone());
        path
    }

    fn advance_to(
        &mut self,
        next: Node,
        variants: Variants,
        upcoming: Vec<Node>,
        path: Vec<NodeId>,
        source: AdvanceSource,
    ) -> Advance {
        self.history.push(Level {
            videos: std::mem::take(&mut self.videos),
            index: self.index,
            variants: std::mem::replace(&mut self.variants, variants),
            upcoming: std::mem::replace(&mut self.upcoming, upcoming),
            path: std::mem::replace(&mut self.path, path),
        });
        let to = next.id.clone();
        tracing::debug!(to = %to, ?source, depth = self.history.depth(), "advanced");
        self.videos = vec![next];
        self.index = 0;
        self.phase = Phase::Viewing;
        Advance::Moved { to, source }
    }
}

impl<C, S> std::fmt::Debug for Navigator<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigator")
            .field("phase", &self.phase)
            .field("root", &self.root)
            .field("current", &self.videos.get(self.index).map(|n| &n.id))
            .field("depth", &self.history.depth())
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}
