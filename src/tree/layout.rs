//! Tidy tree layout
//!
//! Reingold–Tilford style placement over the visible part of the hierarchy.
//! Subtrees are packed left to right by comparing their contours (the
//! leftmost and rightmost x at every level). Two nodes sharing a parent are
//! kept `sibling_separation` apart, any other neighbours `cousin_separation`.
//! Each parent sits centred over its first and last child.
//!
//! The result is then fitted to the viewport width: the horizontal extent is
//! scaled into `[margin, width - margin]` with the extreme nodes inset by half
//! their separation. The vertical axis ignores the layout entirely and uses
//! `y = depth * vertical_spacing`.
//!
//! Everything is iterative, so arbitrarily deep windows are safe.

use egui::{Pos2, Rect};

use super::hierarchy::{Hierarchy, NodeIdx};
use super::types::ViewportSize;
use crate::config::LayoutSettings;

// =============================================================================
// CONTOUR
// =============================================================================

/// Per-level horizontal extent of a laid-out subtree
///
/// Levels are stored deepest first so the parent level can be pushed in O(1),
/// and `shift` moves the whole contour without touching every level.
#[derive(Debug, Clone)]
struct Contour {
    /// (leftmost, rightmost) before `shift`, deepest level first
    levels: Vec<(f32, f32)>,
    shift: f32,
}

impl Contour {
    fn leaf() -> Self {
        Self {
            levels: vec![(0.0, 0.0)],
            shift: 0.0,
        }
    }

    fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Extent `level` rows below the subtree root
    fn level(&self, level: usize) -> (f32, f32) {
        let (left, right) = self.levels[self.levels.len() - 1 - level];
        (left + self.shift, right + self.shift)
    }

    /// Smallest offset for `right` that clears this contour on every level
    fn required_offset(&self, right: &Contour, sibling: f32, cousin: f32) -> f32 {
        let shared = self.depth().min(right.depth());
        (0..shared)
            .map(|level| {
                let gap = if level == 0 { sibling } else { cousin };
                self.level(level).1 - right.level(level).0 + gap
            })
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Union with `right` placed at `offset`, reusing the deeper storage
    fn merge_right(self, mut right: Contour, offset: f32) -> Contour {
        right.shift += offset;
        let shared = self.depth().min(right.depth());

        if right.depth() > self.depth() {
            let len = right.levels.len();
            for level in 0..shared {
                right.levels[len - 1 - level].0 = self.level(level).0 - right.shift;
            }
            right
        } else {
            let mut left = self;
            let len = left.levels.len();
            for level in 0..shared {
                left.levels[len - 1 - level].1 = right.level(level).1 - left.shift;
            }
            left
        }
    }

    /// Add the subtree root above the current top level
    fn push_root(&mut self) {
        self.levels.push((-self.shift, -self.shift));
    }
}

// =============================================================================
// LAYOUT ENGINE
// =============================================================================

/// Extent of a completed layout in world coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutSummary {
    pub node_count: usize,
    pub max_depth: usize,
    pub bounds: Rect,
}

impl Default for LayoutSummary {
    fn default() -> Self {
        Self {
            node_count: 0,
            max_depth: 0,
            bounds: Rect::NOTHING,
        }
    }
}

/// Assigns `(x, y)` to every visible node
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutEngine {
    settings: LayoutSettings,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(LayoutSettings::default())
    }
}

impl LayoutEngine {
    pub fn new(settings: LayoutSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    /// Lay out the visible window and write `position` on each visible node
    pub fn layout(&self, hierarchy: &mut Hierarchy, size: ViewportSize) -> LayoutSummary {
        if hierarchy.is_empty() || !size.is_valid() {
            return LayoutSummary::default();
        }

        let order = layout_order(hierarchy);
        let relative = self.relative_offsets(hierarchy, &order);

        // Absolute layout units, parents before children
        let mut unit_x = vec![0.0_f32; hierarchy.len()];
        for &idx in &order {
            if let Some(parent) = hierarchy.get(idx).and_then(|n| n.parent) {
                unit_x[idx] = unit_x[parent] + relative[idx];
            }
        }

        let fit = self.fit_width(hierarchy, &order, &unit_x, size.width);

        let mut bounds = Rect::NOTHING;
        let mut max_depth = 0;
        for &idx in &order {
            let Some(node) = hierarchy.get_mut(idx) else {
                continue;
            };
            let pos = Pos2::new(
                fit.apply(unit_x[idx]),
                node.depth as f32 * self.settings.vertical_spacing,
            );
            node.position = pos;
            bounds.extend_with(pos);
            max_depth = max_depth.max(node.depth);
        }

        tracing::debug!(
            nodes = order.len(),
            max_depth,
            width = size.width,
            "Tree layout complete"
        );

        LayoutSummary {
            node_count: order.len(),
            max_depth,
            bounds,
        }
    }

    /// Each node's x relative to its parent, in layout units
    fn relative_offsets(&self, hierarchy: &Hierarchy, order: &[NodeIdx]) -> Vec<f32> {
        let sibling = self.settings.sibling_separation;
        let cousin = self.settings.cousin_separation;

        let mut relative = vec![0.0_f32; hierarchy.len()];
        let mut contours: Vec<Option<Contour>> = (0..hierarchy.len()).map(|_| None).collect();

        // Reverse pre-order: every child is finished before its parent
        for &idx in order.iter().rev() {
            let Some(node) = hierarchy.get(idx) else {
                continue;
            };
            let kids = &node.children;
            let Some((&first, rest)) = kids.split_first() else {
                contours[idx] = Some(Contour::leaf());
                continue;
            };

            let mut merged = contours[first].take().unwrap_or_else(Contour::leaf);
            let mut offsets = Vec::with_capacity(kids.len());
            offsets.push(0.0_f32);
            for &kid in rest {
                let next = contours[kid].take().unwrap_or_else(Contour::leaf);
                let offset = merged.required_offset(&next, sibling, cousin);
                offsets.push(offset);
                merged = merged.merge_right(next, offset);
            }

            let mid = (offsets[0] + offsets[offsets.len() - 1]) / 2.0;
            for (&kid, offset) in kids.iter().zip(&offsets) {
                relative[kid] = offset - mid;
            }
            merged.shift -= mid;
            merged.push_root();
            contours[idx] = Some(merged);
        }

        relative
    }

    /// Map layout units onto `[margin, width - margin]`
    fn fit_width(
        &self,
        hierarchy: &Hierarchy,
        order: &[NodeIdx],
        unit_x: &[f32],
        width: f32,
    ) -> WidthFit {
        let mut margin = self.settings.horizontal_margin.max(0.0);
        let mut available = width - 2.0 * margin;
        if available <= 0.0 {
            margin = 0.0;
            available = width;
        }

        let mut left = Hierarchy::ROOT;
        let mut right = Hierarchy::ROOT;
        for &idx in order {
            if unit_x[idx] < unit_x[left] {
                left = idx;
            }
            if unit_x[idx] > unit_x[right] {
                right = idx;
            }
        }

        let inset = if left == right {
            1.0
        } else {
            let share_parent = hierarchy.get(left).and_then(|n| n.parent)
                == hierarchy.get(right).and_then(|n| n.parent);
            let gap = if share_parent {
                self.settings.sibling_separation
            } else {
                self.settings.cousin_separation
            };
            gap / 2.0
        };

        let translate = inset - unit_x[left];
        let scale = available / (unit_x[right] + inset + translate);
        WidthFit {
            translate,
            scale,
            margin,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct WidthFit {
    translate: f32,
    scale: f32,
    margin: f32,
}

impl WidthFit {
    fn apply(&self, x: f32) -> f32 {
        (x + self.translate) * self.scale + self.margin
    }
}

/// Pre-order over the nodes reachable through layout children
fn layout_order(hierarchy: &Hierarchy) -> Vec<NodeIdx> {
    let mut order = Vec::new();
    let mut stack = vec![Hierarchy::ROOT];
    while let Some(idx) = stack.pop() {
        let Some(node) = hierarchy.get(idx) else {
            continue;
        };
        order.push(idx);
        stack.extend(node.children.iter().rev().copied());
    }
    order
}
