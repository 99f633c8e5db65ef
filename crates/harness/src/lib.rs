pub mod store;
pub mod tree;
pub mod viewer;

pub use store::FlakyStore;
pub use tree::TestTree;
pub use viewer::{TestReactions, TestViewer};

use tracing_subscriber::EnvFilter;

/// Install a test-friendly subscriber once per process. `RUST_LOG` selects
/// the level; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
