//! Visibility windower
//!
//! Bounds the laid-out subgraph to `max_visible_height` levels below the focus
//! node. The ancestor chain of the focus node is always visible. Everything
//! else is admitted breadth-first down to depth `depth(focus) + height`; a
//! visible node at that depth with children becomes a collapsed leaf whose
//! children are cached in `collapsed_children`.
//!
//! Applying the window first restores every cache, so the result depends only
//! on the tree, the focus node and the height.

use std::collections::VecDeque;

use super::active_path::ActivePath;
use super::hierarchy::{Hierarchy, NodeIdx};
use crate::config::WindowSettings;

/// Pick the node the window and the viewport revolve around
///
/// The deepest node of the active path, or the root when there is none.
pub fn select_focus(hierarchy: &Hierarchy, active_path: &ActivePath) -> NodeIdx {
    active_path
        .leaf()
        .filter(|&idx| hierarchy.get(idx).is_some())
        .unwrap_or(Hierarchy::ROOT)
}

/// Outcome of applying the window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowSummary {
    pub focus: NodeIdx,
    /// Visible nodes in breadth-first order
    pub visible: Vec<NodeIdx>,
    /// Visible nodes whose children were cached
    pub collapsed: Vec<NodeIdx>,
}

impl WindowSummary {
    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }
}

/// Depth-bounded window around a focus node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityWindow {
    max_visible_height: usize,
}

impl Default for VisibilityWindow {
    fn default() -> Self {
        Self::from_settings(&WindowSettings::default())
    }
}

impl VisibilityWindow {
    pub fn new(max_visible_height: usize) -> Self {
        Self { max_visible_height }
    }

    pub fn from_settings(settings: &WindowSettings) -> Self {
        Self::new(settings.max_visible_height)
    }

    pub fn max_visible_height(&self) -> usize {
        self.max_visible_height
    }

    /// Mark visibility and collapse the window edge
    pub fn apply(&self, hierarchy: &mut Hierarchy, focus: NodeIdx) -> WindowSummary {
        hierarchy.expand_all();

        let focus = if hierarchy.get(focus).is_some() {
            focus
        } else {
            tracing::warn!(focus, "Focus node missing from hierarchy, windowing from root");
            Hierarchy::ROOT
        };
        let focus_depth = hierarchy.get(focus).map_or(0, |n| n.depth);
        let depth_limit = focus_depth.saturating_add(self.max_visible_height);

        let ancestors: Vec<NodeIdx> = hierarchy.ancestors(focus).collect();
        for idx in ancestors {
            if let Some(node) = hierarchy.get_mut(idx) {
                node.visible = true;
            }
        }

        let mut summary = WindowSummary {
            focus,
            ..WindowSummary::default()
        };
        let mut queue: VecDeque<NodeIdx> = VecDeque::from([Hierarchy::ROOT]);
        while let Some(idx) = queue.pop_front() {
            let Some(node) = hierarchy.get_mut(idx) else {
                continue;
            };
            node.visible = true;
            summary.visible.push(idx);

            if node.children.is_empty() {
                continue;
            }
            if node.depth >= depth_limit {
                hierarchy.collapse(idx);
                summary.collapsed.push(idx);
            } else {
                queue.extend(node.children.iter().copied());
            }
        }

        tracing::debug!(
            focus = %hierarchy.get(focus).map_or("", |n| n.id.as_str()),
            visible = summary.visible.len(),
            collapsed = summary.collapsed.len(),
            total = hierarchy.len(),
            "Applied visibility window"
        );

        summary
    }
}
