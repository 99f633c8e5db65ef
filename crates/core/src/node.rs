use serde::{Deserialize, Serialize};

use crate::ids::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Authoritative like state returned by the reaction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub liked: bool,
    pub count: u64,
}

/// A single playable video in the branching tree.
///
/// Nodes are snapshots: the only fields ever changed locally are the
/// engagement counters, and only optimistically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub media_url: String,
    pub has_children: bool,
    #[serde(flatten)]
    pub author: Author,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub is_liked: bool,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, media_url: impl Into<String>, has_children: bool) -> Self {
        Self {
            id: id.into(),
            media_url: media_url.into(),
            has_children,
            author: Author {
                username: String::new(),
                avatar_url: None,
            },
            likes: 0,
            comments: 0,
            is_liked: false,
        }
    }

    pub fn with_author(mut self, username: impl Into<String>) -> Self {
        self.author.username = username.into();
        self
    }

    pub fn like_state(&self) -> LikeState {
        LikeState {
            liked: self.is_liked,
            count: self.likes,
        }
    }

    /// Flip the like locally before the reaction service confirms it.
    /// Returns the state to revert to if the service call fails.
    pub fn toggle_like_optimistic(&mut self) -> LikeState {
        let previous = self.like_state();
        if self.is_liked {
            self.likes = self.likes.saturating_sub(1);
        } else {
            self.likes += 1;
        }
        self.is_liked = !self.is_liked;
        previous
    }

    pub fn apply_like_state(&mut self, state: LikeState) {
        self.is_liked = state.liked;
        self.likes = state.count;
    }
}

/// What the content service offers from one node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Continuations {
    pub default_continuation: Option<Node>,
    #[serde(default)]
    pub alternatives: Vec<Node>,
}

impl Continuations {
    pub fn new(default_continuation: Option<Node>, alternatives: Vec<Node>) -> Self {
        Self {
            default_continuation,
            alternatives,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Locate a child by id. Alternatives are searched first; the default is
    /// an eligible target even when the service leaves it out of the list.
    pub fn find(&self, id: &NodeId) -> Option<&Node> {
        self.alternatives.iter().find(|n| n.id == *id).or_else(|| {
            self.default_continuation
                .as_ref()
                .filter(|n| n.id == *id)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.default_continuation.is_none() && self.alternatives.is_empty()
    }
}
