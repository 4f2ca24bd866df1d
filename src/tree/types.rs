//! Input types pushed by the conversation data source
//!
//! A snapshot arrives either as a nested tree (`root` with `children`) or as a
//! flat record list (`nodes` with parent ids). Both end up as a [`RawNode`]
//! tree; the flat form is assembled and validated here.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};

use super::error::{TreeError, TreeResult};

// =============================================================================
// RAW NODE
// =============================================================================

/// One message in the conversation tree, as delivered by the data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    /// Unique across the whole tree
    pub id: String,
    #[serde(default)]
    pub agent_name: String,
    #[serde(default)]
    pub message: String,
    /// Parent id (None only for the root)
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<RawNode>,
    #[serde(default)]
    pub is_active: bool,
    pub branch_id: String,
    pub timestamp: DateTime<Utc>,
}

impl RawNode {
    /// Create a childless node with no parent
    pub fn new(
        id: impl Into<String>,
        branch_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            agent_name: String::new(),
            message: String::new(),
            parent: None,
            children: Vec::new(),
            is_active: false,
            branch_id: branch_id.into(),
            timestamp,
        }
    }

    pub fn with_agent(mut self, agent_name: impl Into<String>) -> Self {
        self.agent_name = agent_name.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Mark as part of the live branch
    pub fn active(mut self) -> Self {
        self.is_active = true;
        self
    }

    /// Append a child, pointing its parent reference at this node
    pub fn with_child(mut self, mut child: RawNode) -> Self {
        child.parent = Some(self.id.clone());
        self.children.push(child);
        self
    }

    /// Total number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Build a nested tree from flat records
    ///
    /// Children keep the relative order of their records. Fails on duplicate
    /// ids, zero or several roots, parents that do not exist, and records that
    /// cannot be reached from the root (which only happens through a cycle).
    pub fn assemble(records: Vec<FlatNode>) -> TreeResult<RawNode> {
        if records.is_empty() {
            return Err(TreeError::Empty);
        }

        let mut seen: HashSet<&str> = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.id.as_str()) {
                return Err(TreeError::DuplicateId(record.id.clone()));
            }
        }

        let mut root: Option<usize> = None;
        let mut children_of: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            match record.parent.as_deref() {
                None => {
                    if let Some(first) = root {
                        return Err(TreeError::MultipleRoots {
                            first: records[first].id.clone(),
                            second: record.id.clone(),
                        });
                    }
                    root = Some(idx);
                }
                Some(parent) if !seen.contains(parent) => {
                    return Err(TreeError::DanglingParent {
                        id: record.id.clone(),
                        parent: parent.to_string(),
                    });
                }
                Some(parent) => children_of.entry(parent).or_default().push(idx),
            }
        }
        let root = root.ok_or(TreeError::NoRoot)?;

        // Pre-order walk from the root; anything left over sits on a cycle
        let mut order: Vec<usize> = Vec::with_capacity(records.len());
        let mut reached = vec![false; records.len()];
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            reached[idx] = true;
            order.push(idx);
            if let Some(kids) = children_of.get(records[idx].id.as_str()) {
                stack.extend(kids.iter().rev().copied());
            }
        }
        if let Some(unreached) = reached.iter().position(|r| !r) {
            return Err(TreeError::Cycle(records[unreached].id.clone()));
        }

        // Reverse pre-order visits every child before its parent
        let kid_lists: Vec<Vec<usize>> = records
            .iter()
            .map(|r| children_of.remove(r.id.as_str()).unwrap_or_default())
            .collect();
        let mut slots: Vec<Option<FlatNode>> = records.into_iter().map(Some).collect();
        let mut built: Vec<Option<RawNode>> = (0..slots.len()).map(|_| None).collect();

        for &idx in order.iter().rev() {
            let Some(record) = slots[idx].take() else {
                continue;
            };
            let children = kid_lists[idx]
                .iter()
                .filter_map(|&kid| built[kid].take())
                .collect();
            built[idx] = Some(record.into_raw(children));
        }

        built[root].take().ok_or(TreeError::NoRoot)
    }
}

// =============================================================================
// FLAT NODE
// =============================================================================

/// Flat message record referencing its parent by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatNode {
    pub id: String,
    #[serde(default)]
    pub agent_name: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    pub branch_id: String,
    pub timestamp: DateTime<Utc>,
}

impl FlatNode {
    fn into_raw(self, children: Vec<RawNode>) -> RawNode {
        RawNode {
            id: self.id,
            agent_name: self.agent_name,
            message: self.message,
            parent: self.parent,
            children,
            is_active: self.is_active,
            branch_id: self.branch_id,
            timestamp: self.timestamp,
        }
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Complete conversation state pushed on every change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub root: RawNode,
    pub current_branch_id: String,
}

/// Which of the two JSON shapes a document uses
#[derive(Deserialize)]
struct WireShape {
    #[serde(default)]
    root: Option<IgnoredAny>,
    #[serde(default)]
    nodes: Option<IgnoredAny>,
}

#[derive(Deserialize)]
struct FlatWire {
    nodes: Vec<FlatNode>,
    current_branch_id: String,
}

/// Parse without serde_json's nesting limit, growing the stack on demand
fn parse_unbounded<T: DeserializeOwned>(json: &str) -> serde_json::Result<T> {
    let mut de = serde_json::Deserializer::from_str(json);
    de.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}

fn invalid_json(e: serde_json::Error) -> TreeError {
    TreeError::InvalidJson(e.to_string())
}

impl TreeSnapshot {
    pub fn new(root: RawNode, current_branch_id: impl Into<String>) -> Self {
        Self {
            root,
            current_branch_id: current_branch_id.into(),
        }
    }

    /// Build a snapshot from flat records
    pub fn from_flat(
        nodes: Vec<FlatNode>,
        current_branch_id: impl Into<String>,
    ) -> TreeResult<Self> {
        Ok(Self::new(RawNode::assemble(nodes)?, current_branch_id))
    }

    /// Parse either the nested or the flat JSON form
    ///
    /// Nesting depth is unbounded. The shape is picked from the top-level
    /// `root` or `nodes` key so errors point at the offending field.
    pub fn from_json(json: &str) -> TreeResult<Self> {
        let shape: WireShape = parse_unbounded(json).map_err(invalid_json)?;
        match (shape.root, shape.nodes) {
            (Some(_), _) => parse_unbounded(json).map_err(invalid_json),
            (None, Some(_)) => {
                let wire: FlatWire = parse_unbounded(json).map_err(invalid_json)?;
                Self::from_flat(wire.nodes, wire.current_branch_id)
            }
            (None, None) => Err(TreeError::InvalidJson(
                "expected a `root` or `nodes` field".to_string(),
            )),
        }
    }
}

// =============================================================================
// VIEWPORT SIZE
// =============================================================================

/// Size of the hosting area in screen points
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewportSize {
    pub width: f32,
    pub height: f32,
}

impl ViewportSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Layout and rendering are skipped until both sides are positive
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn flat(id: &str, parent: Option<&str>) -> FlatNode {
        FlatNode {
            id: id.to_string(),
            agent_name: "agent".to_string(),
            message: String::new(),
            parent: parent.map(str::to_string),
            is_active: false,
            branch_id: "main".to_string(),
            timestamp: ts(0),
        }
    }

    fn child_ids(node: &RawNode) -> Vec<&str> {
        node.children.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_assemble_preserves_record_order() {
        let root = RawNode::assemble(vec![
            flat("b", Some("r")),
            flat("r", None),
            flat("a", Some("r")),
            flat("b1", Some("b")),
        ])
        .unwrap();

        assert_eq!(root.id, "r");
        assert_eq!(child_ids(&root), vec!["b", "a"]);
        assert_eq!(child_ids(&root.children[0]), vec!["b1"]);
        assert_eq!(root.node_count(), 4);
    }

    #[test]
    fn test_assemble_rejects_duplicate_ids() {
        let err = RawNode::assemble(vec![flat("r", None), flat("r", None)]).unwrap_err();
        assert_eq!(err, TreeError::DuplicateId("r".to_string()));
    }

    #[test]
    fn test_assemble_rejects_multiple_roots() {
        let err = RawNode::assemble(vec![flat("r", None), flat("s", None)]).unwrap_err();
        assert_eq!(
            err,
            TreeError::MultipleRoots {
                first: "r".to_string(),
                second: "s".to_string()
            }
        );
    }

    #[test]
    fn test_assemble_rejects_dangling_parent() {
        let err = RawNode::assemble(vec![flat("r", None), flat("a", Some("ghost"))]).unwrap_err();
        assert!(matches!(err, TreeError::DanglingParent { ref parent, .. } if parent == "ghost"));
    }

    #[test]
    fn test_assemble_detects_cycle() {
        let err = RawNode::assemble(vec![
            flat("r", None),
            flat("x", Some("y")),
            flat("y", Some("x")),
        ])
        .unwrap_err();
        assert_eq!(err, TreeError::Cycle("x".to_string()));
    }

    #[test]
    fn test_assemble_without_root() {
        let err = RawNode::assemble(vec![flat("x", Some("y")), flat("y", Some("x"))]).unwrap_err();
        assert_eq!(err, TreeError::NoRoot);
        assert_eq!(RawNode::assemble(Vec::new()).unwrap_err(), TreeError::Empty);
    }

    #[test]
    fn test_snapshot_from_nested_json() {
        let json = r#"{
            "current_branch_id": "main",
            "root": {
                "id": "r", "agent_name": "user", "branch_id": "main",
                "timestamp": "2024-05-01T10:00:00Z", "is_active": true,
                "children": [
                    {"id": "a", "parent": "r", "branch_id": "main",
                     "timestamp": "2024-05-01T10:00:05Z", "is_active": true}
                ]
            }
        }"#;

        let snapshot = TreeSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.current_branch_id, "main");
        assert_eq!(child_ids(&snapshot.root), vec!["a"]);
        assert!(snapshot.root.children[0].is_active);
    }

    #[test]
    fn test_snapshot_from_flat_json() {
        let json = r#"{
            "current_branch_id": "b2",
            "nodes": [
                {"id": "r", "branch_id": "main", "timestamp": "2024-05-01T10:00:00Z"},
                {"id": "a", "parent": "r", "branch_id": "b2", "timestamp": "2024-05-01T10:00:05Z"}
            ]
        }"#;

        let snapshot = TreeSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.root.node_count(), 2);
        assert_eq!(snapshot.root.children[0].parent.as_deref(), Some("r"));
    }

    #[test]
    fn test_snapshot_invalid_json() {
        assert!(matches!(
            TreeSnapshot::from_json("{\"nodes\": 3}"),
            Err(TreeError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_nested_error_names_the_field() {
        let json = r#"{
            "current_branch_id": "main",
            "root": {"id": "r", "branch_id": "main", "timestamp": "not a time"}
        }"#;

        let Err(TreeError::InvalidJson(msg)) = TreeSnapshot::from_json(json) else {
            panic!("expected a JSON error");
        };
        assert!(!msg.contains("did not match any variant"), "{msg}");
        assert!(msg.contains("line"), "{msg}");
    }

    #[test]
    fn test_snapshot_without_tree_rejected() {
        let Err(TreeError::InvalidJson(msg)) =
            TreeSnapshot::from_json(r#"{"current_branch_id": "main"}"#)
        else {
            panic!("expected a JSON error");
        };
        assert!(msg.contains("`root` or `nodes`"));
    }

    #[test]
    fn test_deep_nested_snapshot_round_trips() {
        let depth = 500;
        let mut node = RawNode::new(format!("n{}", depth - 1), "main", ts(depth as i64)).active();
        for i in (0..depth - 1).rev() {
            node = RawNode::new(format!("n{i}"), "main", ts(i as i64))
                .active()
                .with_child(node);
        }
        let snapshot = TreeSnapshot::new(node, "main");

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed = TreeSnapshot::from_json(&json).unwrap();

        assert_eq!(parsed.root.node_count(), depth);
        assert!(parsed == snapshot);
    }

    #[test]
    fn test_viewport_size_validity() {
        assert!(ViewportSize::new(800.0, 600.0).is_valid());
        assert!(!ViewportSize::new(0.0, 600.0).is_valid());
        assert!(!ViewportSize::new(800.0, -1.0).is_valid());
    }
}
