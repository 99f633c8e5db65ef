use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::NodeId;

/// The viewer's recorded path through one root's tree: parent id to the
/// child id last chosen from it.
///
/// The map always describes a simple path. Every mutation that changes a
/// parent's child drops the old tail so no key is left unreachable from the
/// root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainMap {
    steps: BTreeMap<NodeId, NodeId>,
}

impl ChainMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, parent: &NodeId) -> Option<&NodeId> {
        self.steps.get(parent)
    }

    pub fn contains(&self, parent: &NodeId) -> bool {
        self.steps.contains_key(parent)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &NodeId)> {
        self.steps.iter()
    }

    /// Record `parent -> child`. With `prune_from_parent`, the parent's old
    /// child and everything reachable from it along the old chain is removed
    /// first.
    pub fn save_step(&mut self, parent: NodeId, child: NodeId, prune_from_parent: bool) {
        if prune_from_parent {
            self.prune_tail(&parent);
        }
        self.steps.insert(parent, child);
    }

    /// Remove `parent`'s mapping and walk the old chain from the removed
    /// child, deleting each subsequent mapping. Returns the removed keys in
    /// walk order.
    pub fn prune_tail(&mut self, parent: &NodeId) -> Vec<NodeId> {
        let mut removed = Vec::new();
        let Some(mut cur) = self.steps.remove(parent) else {
            return removed;
        };
        removed.push(parent.clone());

        // A malformed chain can loop back on itself; every removal shrinks
        // the map, so the walk ends once a key is missing.
        while let Some(next) = self.steps.remove(&cur) {
            removed.push(std::mem::replace(&mut cur, next));
        }
        removed
    }

    /// Node ids visited by following the chain from `root`, root first.
    /// Stops at the first node without a mapping or on a revisit.
    pub fn path_from(&self, root: &NodeId) -> Vec<NodeId> {
        let mut seen = BTreeSet::new();
        let mut path = vec![root.clone()];
        seen.insert(root.clone());

        let mut cur = root;
        while let Some(next) = self.steps.get(cur) {
            if !seen.insert(next.clone()) {
                break;
            }
            path.push(next.clone());
            cur = next;
        }
        path
    }

    /// Keys that cannot be reached from `root` by following the chain.
    pub fn orphaned_keys(&self, root: &NodeId) -> Vec<NodeId> {
        let reachable: BTreeSet<NodeId> = self.path_from(root).into_iter().collect();
        self.steps
            .keys()
            .filter(|k| !reachable.contains(*k))
            .cloned()
            .collect()
    }

    /// Drop every key unreachable from `root`, returning the dropped keys.
    pub fn retain_reachable(&mut self, root: &NodeId) -> Vec<NodeId> {
        let orphans = self.orphaned_keys(root);
        for key in &orphans {
            self.steps.remove(key);
        }
        orphans
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self, CoreError> {
        let value: serde_json::Value = serde_json::from_str(s)?;
        if !value.is_object() {
            return Err(CoreError::MalformedChain(format!(
                "expected object, found {}",
                json_kind(&value)
            )));
        }
        Ok(serde_json::from_value(value)?)
    }
}

impl FromIterator<(NodeId, NodeId)> for ChainMap {
    fn from_iter<I: IntoIterator<Item = (NodeId, NodeId)>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    fn chain(pairs: &[(&str, &str)]) -> ChainMap {
        pairs.iter().map(|(p, c)| (id(p), id(c))).collect()
    }

    #[test]
    fn prune_removes_whole_old_tail() {
        let mut c = chain(&[("A", "B"), ("B", "C"), ("C", "D")]);
        c.save_step(id("A"), id("E"), true);
        assert_eq!(c, chain(&[("A", "E")]));
    }

    #[test]
    fn save_without_prune_keeps_tail() {
        let mut c = chain(&[("A", "B"), ("B", "C")]);
        c.save_step(id("A"), id("B"), false);
        assert_eq!(c, chain(&[("A", "B"), ("B", "C")]));
    }

    #[test]
    fn prune_mid_chain_keeps_prefix() {
        let mut c = chain(&[("R", "A"), ("A", "B"), ("B", "C")]);
        let removed = c.prune_tail(&id("A"));
        assert_eq!(removed, vec![id("A"), id("B")]);
        assert_eq!(c, chain(&[("R", "A")]));
    }

    #[test]
    fn prune_of_unmapped_parent_is_noop() {
        let mut c = chain(&[("R", "A")]);
        assert!(c.prune_tail(&id("Q")).is_empty());
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn prune_terminates_on_cycle() {
        let mut c = chain(&[("A", "B"), ("B", "A")]);
        c.save_step(id("A"), id("C"), true);
        assert_eq!(c, chain(&[("A", "C")]));
    }

    #[test]
    fn repeated_pruning_never_orphans() {
        let root = id("R");
        let mut c = ChainMap::new();
        c.save_step(id("R"), id("A"), false);
        c.save_step(id("A"), id("B"), false);
        c.save_step(id("B"), id("C"), false);
        c.save_step(id("A"), id("X"), true);
        c.save_step(id("X"), id("Y"), false);
        c.save_step(id("R"), id("Z"), true);
        c.save_step(id("Z"), id("Q"), false);
        c.save_step(id("Z"), id("Q"), true);

        assert!(c.orphaned_keys(&root).is_empty());
        assert_eq!(c.path_from(&root), vec![id("R"), id("Z"), id("Q")]);
    }

    #[test]
    fn orphaned_keys_detected() {
        let c = chain(&[("R", "A"), ("Q", "W")]);
        assert_eq!(c.orphaned_keys(&id("R")), vec![id("Q")]);
    }

    #[test]
    fn retain_reachable_sweeps_orphans() {
        let mut c = chain(&[("R", "A"), ("Q", "W"), ("W", "E")]);
        let mut dropped = c.retain_reachable(&id("R"));
        dropped.sort();
        assert_eq!(dropped, vec![id("Q"), id("W")]);
        assert_eq!(c, chain(&[("R", "A")]));
    }

    #[test]
    fn path_stops_on_cycle() {
        let c = chain(&[("R", "A"), ("A", "R")]);
        assert_eq!(c.path_from(&id("R")), vec![id("R"), id("A")]);
    }

    #[test]
    fn json_layout_is_flat_object() {
        let c = chain(&[("A", "B")]);
        assert_eq!(c.to_json().unwrap(), r#"{"A":"B"}"#);
        assert_eq!(ChainMap::from_json(r#"{"A":"B"}"#).unwrap(), c);
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(matches!(
            ChainMap::from_json("[1,2]"),
            Err(CoreError::MalformedChain(_))
        ));
        assert!(ChainMap::from_json(r#"{"A": 5}"#).is_err());
        assert!(ChainMap::from_json("not json").is_err());
    }
}
