use storyflow_core::NodeId;
use storyflow_storage::{ChainStore, KvStore, StorageError};

/// Index in `items` of the feed entry the viewer left from, if the loaded
/// page contains it. The anchor is cleared only once it has been found, so a
/// page that does not contain it yet leaves it for the next one.
pub fn resume_position<S: KvStore>(
    store: &ChainStore<S>,
    items: &[NodeId],
) -> Result<Option<usize>, StorageError> {
    let Some(anchor) = store.feed_anchor()? else {
        return Ok(None);
    };
    let Some(index) = items.iter().position(|id| *id == anchor) else {
        tracing::debug!(%anchor, loaded = items.len(), "feed anchor not in loaded page");
        return Ok(None);
    };
    store.clear_feed_anchor()?;
    Ok(Some(index))
}
