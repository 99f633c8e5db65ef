use serde::{Deserialize, Serialize};

pub const DEFAULT_CHAIN_KEY_PREFIX: &str = "flowChain:";
pub const DEFAULT_FEED_ANCHOR_KEY: &str = "feedRestoreId";

/// Key layout of the persisted navigation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Prefix of the per-root chain keys; the root id is appended.
    pub chain_key_prefix: String,
    /// Ephemeral key holding the feed item to scroll back to.
    pub feed_anchor_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            chain_key_prefix: DEFAULT_CHAIN_KEY_PREFIX.to_string(),
            feed_anchor_key: DEFAULT_FEED_ANCHOR_KEY.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_chain_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.chain_key_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_feed_anchor_key(mut self, key: impl Into<String>) -> Self {
        self.feed_anchor_key = key.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let cfg: StoreConfig = serde_json::from_str(r#"{"chain_key_prefix": "tree/"}"#).unwrap();
        assert_eq!(cfg.chain_key_prefix, "tree/");
        assert_eq!(cfg.feed_anchor_key, DEFAULT_FEED_ANCHOR_KEY);
    }
}
