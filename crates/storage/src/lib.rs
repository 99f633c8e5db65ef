pub mod chain_store;
pub mod config;
pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use chain_store::ChainStore;
pub use config::StoreConfig;
pub use error::StorageError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::*;
