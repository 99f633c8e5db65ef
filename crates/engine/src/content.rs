use storyflow_core::{Continuations, LikeState, Node, NodeId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("unauthorized")]
    Unauthorized,
}

/// Read side of the branching tree. Edges are discovered one node at a time.
#[async_trait::async_trait]
pub trait ContentService: Send + Sync {
    /// Resolve a single node, `None` if the service does not serve it.
    async fn get_node(&self, node_id: &NodeId) -> Result<Option<Node>, ContentError>;

    /// Default continuation and ordered alternatives offered from `node_id`.
    async fn get_continuations(&self, node_id: &NodeId) -> Result<Continuations, ContentError>;
}

#[async_trait::async_trait]
pub trait ReactionService: Send + Sync {
    /// Toggle the viewer's like on `node_id`, returning the authoritative state.
    async fn toggle_like(&self, node_id: &NodeId) -> Result<LikeState, ContentError>;
}
