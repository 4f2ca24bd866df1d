//! Conversation tree engine
//!
//! Owns the whole pipeline and the state that survives between snapshots:
//!
//! ```text
//! TreeSnapshot ─► Hierarchy::build ─► ActivePath::find ─► VisibilityWindow::apply
//!              ─► LayoutEngine::layout ─► TreeRenderer::reconcile ─► ViewportController
//! ```
//!
//! A snapshot that fails to build leaves the previous frame untouched. Layout
//! waits for a valid viewport size. The viewport recenters by itself only
//! when the focus node changes identity, so a manual pan survives ordinary
//! data updates.
//!
//! The engine is a plain owned value driven from the UI thread: push
//! snapshots and sizes, call `tick(dt)` once per frame, then paint.

use std::collections::HashSet;

use egui::{Pos2, Rect};

use super::active_path::ActivePath;
use super::camera::ViewportController;
use super::error::TreeResult;
use super::hierarchy::{Hierarchy, HierarchyNode, NodeIdx, PositionIndex};
use super::layout::{LayoutEngine, LayoutSummary};
use super::render::{Presence, RenderOptions, TreeRenderer};
use super::spatial::{SpatialIndex, SpatialNode};
use super::types::{TreeSnapshot, ViewportSize};
use super::window::{select_focus, VisibilityWindow, WindowSummary};
use crate::config::{global_config, TreeSettings};

/// Extra pick radius around each node, in screen points
const HIT_SLOP: f32 = 4.0;

/// Read-only view for the hosting shell
#[derive(Debug, Clone, Copy)]
pub struct TreeState<'a> {
    pub root: Option<&'a HierarchyNode>,
    pub active_node_ids: &'a HashSet<String>,
    pub center_node_id: Option<&'a str>,
}

/// What one snapshot did to the engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSummary {
    pub node_count: usize,
    pub visible_count: usize,
    pub collapsed_count: usize,
    pub active_path_len: usize,
    pub focus_id: String,
    /// False while the viewport has no usable size
    pub laid_out: bool,
    /// The focus changed identity and the viewport started recentering
    pub recentered: bool,
}

#[derive(Debug)]
pub struct ConversationTreeEngine {
    settings: TreeSettings,
    window: VisibilityWindow,
    layout: LayoutEngine,
    renderer: TreeRenderer,
    viewport: ViewportController,
    spatial: SpatialIndex,

    hierarchy: Option<Hierarchy>,
    active_path: ActivePath,
    focus: NodeIdx,
    window_summary: WindowSummary,
    layout_summary: LayoutSummary,
    /// Positions of the last committed layout, seeds the next build
    positions: PositionIndex,
    /// Focus id the viewport was last recentered on
    recentered_on: Option<String>,

    size: ViewportSize,
    needs_layout: bool,
    warned_zero_size: bool,
}

impl Default for ConversationTreeEngine {
    fn default() -> Self {
        Self::new(TreeSettings::default())
    }
}

impl ConversationTreeEngine {
    pub fn new(settings: TreeSettings) -> Self {
        Self {
            window: VisibilityWindow::from_settings(&settings.window),
            layout: LayoutEngine::new(settings.layout.clone()),
            renderer: TreeRenderer::new(
                settings.animation.clone(),
                settings.style.clone(),
                settings.layout.node_radius,
            ),
            viewport: ViewportController::new(settings.viewport.clone(), &settings.animation),
            spatial: SpatialIndex::new(),
            hierarchy: None,
            active_path: ActivePath::default(),
            focus: Hierarchy::ROOT,
            window_summary: WindowSummary::default(),
            layout_summary: LayoutSummary::default(),
            positions: PositionIndex::new(),
            recentered_on: None,
            size: ViewportSize::default(),
            needs_layout: false,
            warned_zero_size: false,
            settings,
        }
    }

    /// Engine configured from `config/tree_settings.yaml`
    pub fn from_global_config() -> Self {
        Self::new(global_config().clone())
    }

    // =========================================================================
    // INPUTS
    // =========================================================================

    /// Commit a new conversation snapshot
    ///
    /// Malformed trees are reported and nothing is committed.
    pub fn set_snapshot(&mut self, snapshot: &TreeSnapshot) -> TreeResult<UpdateSummary> {
        let mut hierarchy = Hierarchy::build(&snapshot.root, &self.positions)?;

        let previous_focus = self.focus_id().map(str::to_owned);
        let active_path = ActivePath::find(&hierarchy, &snapshot.current_branch_id);
        let focus = select_focus(&hierarchy, &active_path);
        if let Some(previous) = previous_focus.as_deref() {
            if active_path.is_empty() && hierarchy.index_of(previous).is_none() {
                tracing::warn!(previous, "Focus node disappeared, falling back to root");
            }
        }
        let window_summary = self.window.apply(&mut hierarchy, focus);

        let mut summary = UpdateSummary {
            node_count: hierarchy.len(),
            visible_count: window_summary.visible.len(),
            collapsed_count: window_summary.collapsed.len(),
            active_path_len: active_path.len(),
            focus_id: hierarchy.get(focus).map(|n| n.id.clone()).unwrap_or_default(),
            ..UpdateSummary::default()
        };

        self.hierarchy = Some(hierarchy);
        self.active_path = active_path;
        self.focus = focus;
        self.window_summary = window_summary;
        self.needs_layout = true;

        if self.size.is_valid() {
            summary.recentered = self.relayout();
            summary.laid_out = true;
        } else {
            self.warn_zero_size();
        }

        tracing::debug!(
            nodes = summary.node_count,
            visible = summary.visible_count,
            collapsed = summary.collapsed_count,
            active_path = summary.active_path_len,
            focus = %summary.focus_id,
            laid_out = summary.laid_out,
            "Committed tree snapshot"
        );

        Ok(summary)
    }

    /// Parse a JSON snapshot (nested or flat) and commit it
    pub fn set_snapshot_json(&mut self, json: &str) -> TreeResult<UpdateSummary> {
        let snapshot = TreeSnapshot::from_json(json)?;
        self.set_snapshot(&snapshot)
    }

    /// Report the hosting area's size; relayouts when it changes
    pub fn set_viewport_size(&mut self, size: ViewportSize) {
        if size == self.size {
            return;
        }
        self.size = size;
        self.viewport.set_size(size);

        if !size.is_valid() {
            self.warn_zero_size();
            return;
        }
        self.warned_zero_size = false;
        if self.hierarchy.is_some() {
            self.relayout();
        }
    }

    fn warn_zero_size(&mut self) {
        if !self.warned_zero_size {
            tracing::warn!(
                width = self.size.width,
                height = self.size.height,
                "Viewport has no area, deferring layout"
            );
            self.warned_zero_size = true;
        }
    }

    /// Lay out, reconcile and maybe recenter. Returns true if it recentered.
    fn relayout(&mut self) -> bool {
        let Some(hierarchy) = self.hierarchy.as_mut() else {
            return false;
        };

        self.layout_summary = self.layout.layout(hierarchy, self.size);
        self.renderer.reconcile(hierarchy, &self.active_path);
        self.positions = hierarchy.positions();

        self.rebuild_spatial();
        self.needs_layout = false;

        self.recenter_if_focus_moved()
    }

    fn recenter_if_focus_moved(&mut self) -> bool {
        let Some(focus) = self.focus_node() else {
            return false;
        };
        if self.recentered_on.as_deref() == Some(focus.id.as_str()) {
            return false;
        }

        let (id, position) = (focus.id.clone(), focus.position);
        tracing::info!(focus = %id, "Focus node changed, recentering");
        self.viewport.recenter_on(position);
        self.recentered_on = Some(id);
        true
    }

    // =========================================================================
    // FRAME LOOP
    // =========================================================================

    /// Advance node, link and viewport transitions. Returns true while animating.
    pub fn tick(&mut self, dt: f32) -> bool {
        let was_moving = self.renderer.is_animating();
        let nodes = self.renderer.tick(dt);
        let viewport = self.viewport.tick(dt);
        if was_moving {
            self.rebuild_spatial();
        }
        nodes || viewport
    }

    /// Index nodes where they are drawn this frame, so hover follows transitions
    fn rebuild_spatial(&mut self) {
        let radius = self.settings.layout.node_radius;
        self.spatial.rebuild(
            self.renderer
                .nodes()
                .filter(|n| n.presence != Presence::Exiting)
                .map(|n| SpatialNode::new(n.id.clone(), n.position(), radius)),
        );
    }

    pub fn is_animating(&self) -> bool {
        self.renderer.is_animating() || self.viewport.is_animating()
    }

    /// Paint the current frame into `screen_rect`
    pub fn paint(&self, painter: &egui::Painter, screen_rect: Rect, hovered: Option<&str>) {
        if !self.size.is_valid() || self.needs_layout {
            return;
        }
        let opts = RenderOptions {
            hovered,
            focus: self.focus_id(),
        };
        self.renderer.paint(painter, &self.viewport, screen_rect, &opts);
    }

    // =========================================================================
    // VIEWPORT CONTROLS
    // =========================================================================

    /// Animate the focus node to the centre, a third from the top
    pub fn recenter(&mut self) {
        if self.needs_layout {
            return;
        }
        let Some((id, position)) = self.focus_node().map(|n| (n.id.clone(), n.position)) else {
            return;
        };
        self.viewport.recenter_on(position);
        self.recentered_on = Some(id);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    pub fn reset_zoom(&mut self) {
        self.viewport.reset_zoom();
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Derived state for the shell
    pub fn state(&self) -> TreeState<'_> {
        TreeState {
            root: self.hierarchy.as_ref().map(|h| h.root()),
            active_node_ids: self.active_path.ids(),
            center_node_id: self.focus_id(),
        }
    }

    pub fn focus_node(&self) -> Option<&HierarchyNode> {
        self.hierarchy.as_ref()?.get(self.focus)
    }

    pub fn focus_id(&self) -> Option<&str> {
        self.focus_node().map(|n| n.id.as_str())
    }

    /// Whether the focus node is currently on screen
    ///
    /// True when there is nothing to jump to.
    pub fn is_focus_in_view(&self) -> bool {
        if self.needs_layout || !self.size.is_valid() {
            return true;
        }
        self.focus_node()
            .map_or(true, |n| self.viewport.is_visible(n.position))
    }

    /// Visible node under a world-space point
    pub fn hit_test(&self, world: Pos2) -> Option<&HierarchyNode> {
        let slop = HIT_SLOP / self.viewport.scale().max(f32::EPSILON);
        let hit = self.spatial.hit_test(world, slop)?;
        self.hierarchy.as_ref()?.get_by_id(&hit.id)
    }

    pub fn hierarchy(&self) -> Option<&Hierarchy> {
        self.hierarchy.as_ref()
    }

    pub fn active_path(&self) -> &ActivePath {
        &self.active_path
    }

    pub fn window_summary(&self) -> &WindowSummary {
        &self.window_summary
    }

    pub fn layout_summary(&self) -> &LayoutSummary {
        &self.layout_summary
    }

    pub fn renderer(&self) -> &TreeRenderer {
        &self.renderer
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut ViewportController {
        &mut self.viewport
    }

    pub fn settings(&self) -> &TreeSettings {
        &self.settings
    }

    pub fn size(&self) -> ViewportSize {
        self.size
    }

    /// Layout is pending a valid viewport size
    pub fn needs_layout(&self) -> bool {
        self.needs_layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::error::TreeError;
    use crate::tree::types::RawNode;
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn snapshot(active_leaf: &str) -> TreeSnapshot {
        let node = |id: &str, t: i64| {
            let n = RawNode::new(id, "main", ts(t));
            if id == "R" || id == active_leaf || id == "A" {
                n.active()
            } else {
                n
            }
        };
        let root = node("R", 0)
            .with_child(node("A", 1).with_child(node("A1", 2)).with_child(node("A2", 3)))
            .with_child(node("B", 4));
        TreeSnapshot::new(root, "main")
    }

    fn sized_engine() -> ConversationTreeEngine {
        let mut engine = ConversationTreeEngine::default();
        engine.set_viewport_size(ViewportSize::new(800.0, 600.0));
        engine
    }

    #[test]
    fn test_state_exposes_focus_and_active_ids() {
        let mut engine = sized_engine();
        let summary = engine.set_snapshot(&snapshot("A2")).unwrap();

        assert_eq!(summary.focus_id, "A2");
        assert!(summary.laid_out);
        assert!(summary.recentered);
        let state = engine.state();
        assert_eq!(state.root.map(|r| r.id.as_str()), Some("R"));
        assert_eq!(state.center_node_id, Some("A2"));
        let mut ids: Vec<&str> = state.active_node_ids.iter().map(String::as_str).collect();
        ids.sort();
        assert_eq!(ids, vec!["A", "A2", "R"]);
    }

    #[test]
    fn test_recenters_only_on_focus_change() {
        let mut engine = sized_engine();
        engine.set_snapshot(&snapshot("A2")).unwrap();
        engine.tick(1.0);

        let again = engine.set_snapshot(&snapshot("A2")).unwrap();
        assert!(!again.recentered);

        let moved = engine.set_snapshot(&snapshot("A1")).unwrap();
        assert!(moved.recentered);
        assert_eq!(moved.focus_id, "A1");
    }

    #[test]
    fn test_malformed_snapshot_keeps_previous_state() {
        let mut engine = sized_engine();
        engine.set_snapshot(&snapshot("A2")).unwrap();

        let bad_root = RawNode::new("R", "main", ts(0))
            .with_child(RawNode::new("X", "main", ts(1)))
            .with_child(RawNode::new("X", "main", ts(2)));
        let err = engine.set_snapshot(&TreeSnapshot::new(bad_root, "main")).unwrap_err();

        assert_eq!(err, TreeError::DuplicateId("X".to_string()));
        assert_eq!(engine.state().center_node_id, Some("A2"));
        assert_eq!(engine.hierarchy().map(Hierarchy::len), Some(5));
    }

    #[test]
    fn test_zero_size_defers_layout() {
        let mut engine = ConversationTreeEngine::default();
        let summary = engine.set_snapshot(&snapshot("A2")).unwrap();

        assert!(!summary.laid_out);
        assert!(engine.needs_layout());
        assert!(engine.renderer().nodes().next().is_none());

        engine.set_viewport_size(ViewportSize::new(800.0, 600.0));
        assert!(!engine.needs_layout());
        assert_eq!(engine.renderer().nodes().count(), 5);
        assert!(engine.viewport().is_animating());
    }

    #[test]
    fn test_missing_active_leaf_falls_back_to_root() {
        let mut engine = sized_engine();
        engine.set_snapshot(&snapshot("A2")).unwrap();

        let root = RawNode::new("R", "main", ts(0)).with_child(RawNode::new("Z", "main", ts(9)));
        let summary = engine.set_snapshot(&TreeSnapshot::new(root, "other")).unwrap();

        assert_eq!(summary.focus_id, "R");
        assert!(engine.state().active_node_ids.is_empty());
    }

    #[test]
    fn test_hit_test_finds_laid_out_node() {
        let mut engine = sized_engine();
        engine.set_snapshot(&snapshot("A2")).unwrap();
        engine.tick(1.0);

        let b = engine.hierarchy().unwrap().get_by_id("B").unwrap().position;
        assert_eq!(engine.hit_test(b).map(|n| n.id.as_str()), Some("B"));
        assert!(engine.hit_test(Pos2::new(-500.0, -500.0)).is_none());
    }

    #[test]
    fn test_hit_test_tracks_drawn_position_mid_transition() {
        let mut engine = sized_engine();
        engine.set_snapshot(&snapshot("A2")).unwrap();
        let target = engine.hierarchy().unwrap().get_by_id("B").unwrap().position;

        engine.tick(0.15);
        let drawn = engine.renderer().node("B").unwrap().position();
        assert!((drawn - target).length() > 20.0);

        assert_eq!(engine.hit_test(drawn).map(|n| n.id.as_str()), Some("B"));
        assert!(engine.hit_test(target).map_or(true, |n| n.id != "B"));

        engine.tick(1.0);
        assert_eq!(engine.hit_test(target).map(|n| n.id.as_str()), Some("B"));
    }

    #[test]
    fn test_focus_in_view_after_recenter() {
        let mut engine = sized_engine();
        engine.set_snapshot(&snapshot("A2")).unwrap();
        engine.tick(1.0);
        assert!(engine.is_focus_in_view());

        engine.viewport_mut().pan(egui::Vec2::new(5000.0, 0.0));
        assert!(!engine.is_focus_in_view());

        engine.recenter();
        engine.tick(1.0);
        assert!(engine.is_focus_in_view());
    }
}
