//! Hierarchy builder - arena of layout-annotated nodes
//!
//! Converts a [`RawNode`] tree into a flat arena in pre-order (the root is
//! always index 0). Parents own an ordered list of child indices; ancestor
//! walks go through the `parent` index, so there are no back-references.
//!
//! Position continuity across frames goes through a [`PositionIndex`]: the
//! id-keyed positions of the last committed layout. A node found there starts
//! from its old position, a new node starts from its parent's start position.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use egui::Pos2;

use super::error::{TreeError, TreeResult};
use super::types::RawNode;

/// Index into the hierarchy arena
pub type NodeIdx = usize;

/// Laid-out positions from the previous frame, keyed by node id
pub type PositionIndex = HashMap<String, Pos2>;

// =============================================================================
// HIERARCHY NODE
// =============================================================================

/// A conversation node plus its layout state
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyNode {
    pub id: String,
    pub agent_name: String,
    pub message: String,
    pub branch_id: String,
    pub is_active: bool,
    pub timestamp: DateTime<Utc>,
    /// Parent arena index (None for the root)
    pub parent: Option<NodeIdx>,
    /// Root is depth 0
    pub depth: usize,
    /// Children taking part in layout
    pub children: Vec<NodeIdx>,
    /// Children withheld from layout while this node sits at the window edge
    pub collapsed_children: Option<Vec<NodeIdx>>,
    /// Inside the current visibility window
    pub visible: bool,
    /// Current layout position (x, y)
    pub position: Pos2,
    /// Position to animate from (x0, y0)
    pub previous: Pos2,
}

impl HierarchyNode {
    /// Whether descendants are cached rather than laid out
    pub fn is_collapsed(&self) -> bool {
        self.collapsed_children
            .as_ref()
            .is_some_and(|kids| !kids.is_empty())
    }

    /// Children regardless of collapse state
    pub fn structural_children(&self) -> &[NodeIdx] {
        match &self.collapsed_children {
            Some(kids) => kids,
            None => &self.children,
        }
    }
}

// =============================================================================
// HIERARCHY
// =============================================================================

/// Arena of [`HierarchyNode`]s with an id lookup table
#[derive(Debug, Clone)]
pub struct Hierarchy {
    nodes: Vec<HierarchyNode>,
    index: HashMap<String, NodeIdx>,
}

impl Hierarchy {
    /// Root is always the first arena slot
    pub const ROOT: NodeIdx = 0;

    /// Build from a raw tree, seeding start positions from `previous`
    ///
    /// Rejects duplicate ids and parent references that disagree with the
    /// nesting (a second root, a parent that does not exist, or a root that
    /// names one of its own descendants).
    pub fn build(raw: &RawNode, previous: &PositionIndex) -> TreeResult<Self> {
        let mut nodes: Vec<HierarchyNode> = Vec::new();
        let mut index: HashMap<String, NodeIdx> = HashMap::new();
        // (node id, declared parent, actual parent id)
        let mut mismatches: Vec<(String, Option<String>, String)> = Vec::new();

        let mut stack: Vec<(&RawNode, Option<NodeIdx>)> = vec![(raw, None)];
        while let Some((raw_node, parent)) = stack.pop() {
            let idx = nodes.len();
            if index.insert(raw_node.id.clone(), idx).is_some() {
                return Err(TreeError::DuplicateId(raw_node.id.clone()));
            }

            let (depth, parent_start) = match parent {
                Some(p) => (nodes[p].depth + 1, nodes[p].previous),
                None => (0, Pos2::ZERO),
            };
            if let Some(p) = parent {
                let actual = &nodes[p].id;
                if raw_node.parent.as_deref() != Some(actual.as_str()) {
                    mismatches.push((raw_node.id.clone(), raw_node.parent.clone(), actual.clone()));
                }
                nodes[p].children.push(idx);
            }

            let start = previous.get(&raw_node.id).copied().unwrap_or(parent_start);
            nodes.push(HierarchyNode {
                id: raw_node.id.clone(),
                agent_name: raw_node.agent_name.clone(),
                message: raw_node.message.clone(),
                branch_id: raw_node.branch_id.clone(),
                is_active: raw_node.is_active,
                timestamp: raw_node.timestamp,
                parent,
                depth,
                children: Vec::with_capacity(raw_node.children.len()),
                collapsed_children: None,
                visible: false,
                position: start,
                previous: start,
            });

            stack.extend(raw_node.children.iter().rev().map(|c| (c, Some(idx))));
        }

        if let Some(parent) = raw.parent.as_ref() {
            return Err(if index.contains_key(parent) {
                TreeError::Cycle(raw.id.clone())
            } else {
                TreeError::DanglingParent {
                    id: raw.id.clone(),
                    parent: parent.clone(),
                }
            });
        }

        if let Some((id, declared, actual)) = mismatches.into_iter().next() {
            return Err(match declared {
                None => TreeError::MultipleRoots {
                    first: raw.id.clone(),
                    second: id,
                },
                Some(declared) if index.contains_key(&declared) => TreeError::ParentMismatch {
                    id,
                    declared,
                    actual,
                },
                Some(declared) => TreeError::DanglingParent {
                    id,
                    parent: declared,
                },
            });
        }

        Ok(Self { nodes, index })
    }

    pub fn root(&self) -> &HierarchyNode {
        &self.nodes[Self::ROOT]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, idx: NodeIdx) -> Option<&HierarchyNode> {
        self.nodes.get(idx)
    }

    pub fn get_mut(&mut self, idx: NodeIdx) -> Option<&mut HierarchyNode> {
        self.nodes.get_mut(idx)
    }

    pub fn get_by_id(&self, id: &str) -> Option<&HierarchyNode> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIdx> {
        self.index.get(id).copied()
    }

    /// All nodes in pre-order
    pub fn iter(&self) -> impl Iterator<Item = (NodeIdx, &HierarchyNode)> {
        self.nodes.iter().enumerate()
    }

    /// Nodes inside the visibility window, in pre-order
    pub fn visible_nodes(&self) -> impl Iterator<Item = &HierarchyNode> {
        self.nodes.iter().filter(|n| n.visible)
    }

    /// Parent node of `idx`
    pub fn parent_of(&self, idx: NodeIdx) -> Option<&HierarchyNode> {
        self.nodes.get(idx)?.parent.map(|p| &self.nodes[p])
    }

    /// Walk from `idx` up to the root (inclusive on both ends)
    pub fn ancestors(&self, idx: NodeIdx) -> impl Iterator<Item = NodeIdx> + '_ {
        std::iter::successors(
            self.nodes.get(idx).map(|_| idx),
            move |&current| self.nodes[current].parent,
        )
    }

    /// Root-first path ending at `idx`
    pub fn path_from_root(&self, idx: NodeIdx) -> Vec<NodeIdx> {
        let mut path: Vec<NodeIdx> = self.ancestors(idx).collect();
        path.reverse();
        path
    }

    /// Every descendant id of `idx` in pre-order, including collapsed ones
    pub fn subtree_ids(&self, idx: NodeIdx) -> Vec<String> {
        let mut ids = Vec::new();
        let mut stack: Vec<NodeIdx> = match self.nodes.get(idx) {
            Some(node) => node.structural_children().iter().rev().copied().collect(),
            None => return ids,
        };
        while let Some(current) = stack.pop() {
            let node = &self.nodes[current];
            ids.push(node.id.clone());
            stack.extend(node.structural_children().iter().rev().copied());
        }
        ids
    }

    /// Number of descendants withheld below a collapsed node
    pub fn hidden_descendant_count(&self, idx: NodeIdx) -> usize {
        match self.nodes.get(idx) {
            Some(node) if node.is_collapsed() => self.subtree_ids(idx).len(),
            _ => 0,
        }
    }

    /// Ids of visible nodes
    pub fn visible_ids(&self) -> HashSet<String> {
        self.visible_nodes().map(|n| n.id.clone()).collect()
    }

    /// Laid-out positions of visible nodes, for seeding the next frame
    pub fn positions(&self) -> PositionIndex {
        self.visible_nodes()
            .map(|n| (n.id.clone(), n.position))
            .collect()
    }

    /// Move every collapsed cache back into `children` and clear visibility
    pub fn expand_all(&mut self) {
        for node in &mut self.nodes {
            if let Some(kids) = node.collapsed_children.take() {
                node.children = kids;
            }
            node.visible = false;
        }
    }

    /// Withhold the children of `idx` from layout
    pub(crate) fn collapse(&mut self, idx: NodeIdx) {
        let node = &mut self.nodes[idx];
        if !node.children.is_empty() {
            node.collapsed_children = Some(std::mem::take(&mut node.children));
        }
    }
}
