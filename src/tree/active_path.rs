//! Active-path finder
//!
//! The active path is the root-first chain ending at the deepest node that is
//! both flagged active and on the current branch. Ties on depth go to the most
//! recent timestamp, then to the last node in insertion order.

use std::collections::HashSet;

use super::hierarchy::{Hierarchy, NodeIdx};

/// Highlighted ancestry of the live conversation leaf
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivePath {
    /// Root-first arena indices
    nodes: Vec<NodeIdx>,
    ids: HashSet<String>,
}

impl ActivePath {
    /// Locate the active path for `current_branch_id`
    ///
    /// Returns an empty path when nothing matches; that only disables
    /// highlighting.
    pub fn find(hierarchy: &Hierarchy, current_branch_id: &str) -> Self {
        // max_by_key keeps the last maximum, and the arena is in pre-order
        let leaf = hierarchy
            .iter()
            .filter(|(_, n)| n.is_active && n.branch_id == current_branch_id)
            .max_by_key(|(_, n)| (n.depth, n.timestamp))
            .map(|(idx, _)| idx);

        let Some(leaf) = leaf else {
            tracing::debug!(branch = current_branch_id, "No active node on current branch");
            return Self::default();
        };

        let nodes = hierarchy.path_from_root(leaf);
        let ids = nodes
            .iter()
            .filter_map(|&idx| hierarchy.get(idx))
            .map(|n| n.id.clone())
            .collect();
        Self { nodes, ids }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn ids(&self) -> &HashSet<String> {
        &self.ids
    }

    /// Root-first arena indices
    pub fn nodes(&self) -> &[NodeIdx] {
        &self.nodes
    }

    /// Deepest node of the path
    pub fn leaf(&self) -> Option<NodeIdx> {
        self.nodes.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::hierarchy::PositionIndex;
    use crate::tree::types::RawNode;
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn ids_of(path: &ActivePath, hierarchy: &Hierarchy) -> Vec<String> {
        path.nodes()
            .iter()
            .map(|&idx| hierarchy.get(idx).unwrap().id.clone())
            .collect()
    }

    #[test]
    fn test_path_includes_unflagged_ancestors() {
        let raw = RawNode::new("R", "main", ts(0)).with_child(
            RawNode::new("A", "main", ts(1))
                .with_child(RawNode::new("B", "main", ts(2)).with_child(
                    RawNode::new("C", "main", ts(3)).active(),
                )),
        );
        let hierarchy = Hierarchy::build(&raw, &PositionIndex::new()).unwrap();

        let path = ActivePath::find(&hierarchy, "main");

        assert_eq!(ids_of(&path, &hierarchy), vec!["R", "A", "B", "C"]);
        assert!(path.contains("B"));
        assert_eq!(path.leaf(), hierarchy.index_of("C"));
    }

    #[test]
    fn test_deepest_match_wins() {
        let raw = RawNode::new("R", "main", ts(0))
            .active()
            .with_child(
                RawNode::new("a", "b1", ts(10))
                    .active()
                    .with_child(RawNode::new("a1", "b1", ts(5)).active()),
            )
            .with_child(RawNode::new("b", "b1", ts(20)).active());
        let hierarchy = Hierarchy::build(&raw, &PositionIndex::new()).unwrap();

        let path = ActivePath::find(&hierarchy, "b1");

        assert_eq!(ids_of(&path, &hierarchy), vec!["R", "a", "a1"]);
    }

    #[test]
    fn test_latest_timestamp_breaks_depth_tie() {
        let raw = RawNode::new("R", "main", ts(0))
            .with_child(RawNode::new("old", "b1", ts(10)).active())
            .with_child(RawNode::new("new", "b1", ts(20)).active())
            .with_child(RawNode::new("older", "b1", ts(5)).active());
        let hierarchy = Hierarchy::build(&raw, &PositionIndex::new()).unwrap();

        let path = ActivePath::find(&hierarchy, "b1");
        assert_eq!(ids_of(&path, &hierarchy), vec!["R", "new"]);
    }

    #[test]
    fn test_insertion_order_breaks_full_tie() {
        let raw = RawNode::new("R", "main", ts(0))
            .with_child(RawNode::new("first", "b1", ts(10)).active())
            .with_child(RawNode::new("second", "b1", ts(10)).active());
        let hierarchy = Hierarchy::build(&raw, &PositionIndex::new()).unwrap();

        let path = ActivePath::find(&hierarchy, "b1");
        assert_eq!(path.leaf(), hierarchy.index_of("second"));
    }

    #[test]
    fn test_no_match_is_empty() {
        let raw = RawNode::new("R", "main", ts(0))
            .with_child(RawNode::new("a", "main", ts(1)).active());
        let hierarchy = Hierarchy::build(&raw, &PositionIndex::new()).unwrap();

        let path = ActivePath::find(&hierarchy, "other-branch");
        assert!(path.is_empty());
        assert!(path.ids().is_empty());
        assert_eq!(path.leaf(), None);
    }
}
