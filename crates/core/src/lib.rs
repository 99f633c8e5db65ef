pub mod chain;
pub mod error;
pub mod ids;
pub mod node;

pub use chain::ChainMap;
pub use error::CoreError;
pub use ids::*;
pub use node::{Author, Continuations, LikeState, Node};
