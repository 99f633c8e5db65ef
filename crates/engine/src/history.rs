use storyflow_core::{Node, NodeId};

/// The branch set the picker offers, and the node it branches from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variants {
    pub parent: Option<NodeId>,
    pub nodes: Vec<Node>,
}

impl Variants {
    pub fn from_parent(parent: NodeId, nodes: Vec<Node>) -> Self {
        Self {
            parent: Some(parent),
            nodes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// One prior on-screen position, captured by value so back restores it
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub videos: Vec<Node>,
    pub index: usize,
    pub variants: Variants,
    /// The level video's own continuations, preloaded for the action bar.
    pub upcoming: Vec<Node>,
    /// Root-first ancestry of the level's video, ending with it.
    pub path: Vec<NodeId>,
}

impl Level {
    pub fn current(&self) -> Option<&Node> {
        self.videos.get(self.index)
    }
}

/// History of positions for the root being viewed. Back is a plain pop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationStack {
    levels: Vec<Level>,
}

impl NavigationStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_levels(levels: Vec<Level>) -> Self {
        Self { levels }
    }

    pub fn push(&mut self, level: Level) {
        self.levels.push(level);
    }

    pub fn pop(&mut self) -> Option<Level> {
        self.levels.pop()
    }

    pub fn peek(&self) -> Option<&Level> {
        self.levels.last()
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn clear(&mut self) {
        self.levels.clear();
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }
}
