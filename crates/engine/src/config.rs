use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Skip the tail prune when an explicit choice equals the child already
    /// recorded for that parent. Off by default: explicit choices always prune.
    pub skip_redundant_prune: bool,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_skip_redundant_prune(mut self, skip: bool) -> Self {
        self.skip_redundant_prune = skip;
        self
    }
}
