use storyflow_core::NodeId;
use thiserror::Error;

use crate::content::ContentError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("content service error: {0}")]
    Content(#[from] ContentError),

    #[error("root not found: {0}")]
    RootNotFound(NodeId),

    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    #[error("alternative index {index} out of range ({len} offered)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("reaction service error: {0}")]
    Reaction(ContentError),
}
