//! Branching conversation tree visualization
//!
//! # Architecture
//!
//! ```text
//! TreeSnapshot (from the data source)
//!        │
//!        ▼
//! Hierarchy (arena, positions seeded from the last frame)
//!        │
//!        ├──► ActivePath (highlighted ancestry of the live leaf)
//!        │
//!        ▼
//! VisibilityWindow (bounded levels around the focus node)
//!        │
//!        ▼
//! LayoutEngine (tidy tree, y = depth * spacing)
//!        │
//!        ├──► TreeRenderer (diff, tweens, draws to egui::Painter)
//!        │         └──► Edges (cubic links)
//!        │
//!        └──► ViewportController (pan/zoom transform, recenter)
//!                    ▲
//!                    │
//!              InputHandler (drag, scroll, keys)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let mut tree = ConversationTreeWidget::new();
//! tree.set_snapshot(&snapshot)?;
//! tree.ui(ui);
//! ```

pub mod active_path;
pub mod animation;
pub mod camera;
pub mod colors;
pub mod edges;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod input;
pub mod layout;
pub mod render;
pub mod spatial;
pub mod types;
pub mod window;

pub use active_path::ActivePath;
pub use camera::{ViewportController, ViewportTransform};
pub use engine::{ConversationTreeEngine, TreeState, UpdateSummary};
pub use error::{TreeError, TreeResult};
pub use hierarchy::{Hierarchy, HierarchyNode, NodeIdx, PositionIndex};
pub use layout::{LayoutEngine, LayoutSummary};
pub use render::{Presence, TreeRenderer};
pub use types::{FlatNode, RawNode, TreeSnapshot, ViewportSize};
pub use window::{select_focus, VisibilityWindow, WindowSummary};

use egui::{Color32, Rect, Sense, Vec2};

use crate::config::TreeSettings;
use input::{InputHandler, InputState};

/// Characters of the message shown in the hover tooltip
const TOOLTIP_PREVIEW_CHARS: usize = 280;

// =============================================================================
// WIDGET
// =============================================================================

/// egui widget around [`ConversationTreeEngine`]
#[derive(Debug)]
pub struct ConversationTreeWidget {
    engine: ConversationTreeEngine,
    input_state: InputState,
    last_error: Option<TreeError>,
}

impl Default for ConversationTreeWidget {
    fn default() -> Self {
        Self::with_engine(ConversationTreeEngine::from_global_config())
    }
}

impl ConversationTreeWidget {
    /// Widget configured from `config/tree_settings.yaml`
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: TreeSettings) -> Self {
        Self::with_engine(ConversationTreeEngine::new(settings))
    }

    pub fn with_engine(engine: ConversationTreeEngine) -> Self {
        Self {
            engine,
            input_state: InputState::new(),
            last_error: None,
        }
    }

    /// Push a new snapshot; on error the previous tree stays on screen
    pub fn set_snapshot(&mut self, snapshot: &TreeSnapshot) -> TreeResult<UpdateSummary> {
        let result = self.engine.set_snapshot(snapshot);
        self.last_error = result.as_ref().err().cloned();
        result
    }

    pub fn engine(&self) -> &ConversationTreeEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ConversationTreeEngine {
        &mut self.engine
    }

    pub fn state(&self) -> TreeState<'_> {
        self.engine.state()
    }

    /// Error from the most recent rejected snapshot
    pub fn last_error(&self) -> Option<&TreeError> {
        self.last_error.as_ref()
    }

    pub fn recenter(&mut self) {
        self.engine.recenter();
    }

    pub fn zoom_in(&mut self) {
        self.engine.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.engine.zoom_out();
    }

    pub fn reset_zoom(&mut self) {
        self.engine.reset_zoom();
    }

    /// Render the widget
    pub fn ui(&mut self, ui: &mut egui::Ui) {
        if self.engine.hierarchy().is_none() {
            self.render_empty_state(ui);
            return;
        }

        // Allocate space and get painter
        let available = ui.available_size();
        let (response, painter) = ui.allocate_painter(available, Sense::click_and_drag());
        let screen_rect = response.rect;

        self.engine
            .set_viewport_size(ViewportSize::new(screen_rect.width(), screen_rect.height()));

        // Advance transitions
        let dt = ui.input(|i| i.stable_dt);
        let animating = self.engine.tick(dt);

        // Handle input
        let needs_repaint = InputHandler::handle_input(
            &response,
            &mut self.engine,
            &mut self.input_state,
            screen_rect,
        );
        if response.hovered() {
            ui.ctx()
                .set_cursor_icon(input::cursor_for_state(&self.input_state));
        }

        self.engine
            .paint(&painter, screen_rect, self.input_state.hovered_node.as_deref());
        self.render_chrome(&painter, screen_rect);

        if let Some(hovered) = self.input_state.hovered_node.clone() {
            self.render_tooltip(response, &hovered);
        }

        // Request repaint if animating or needs update
        if animating || needs_repaint || self.engine.is_animating() {
            ui.ctx().request_repaint();
        }
    }

    fn render_empty_state(&self, ui: &mut egui::Ui) {
        ui.centered_and_justified(|ui| match &self.last_error {
            Some(err) => ui.colored_label(Color32::from_rgb(239, 68, 68), err.to_string()),
            None => ui.label("Waiting for conversation data"),
        });
    }

    /// Render UI chrome (stats, keyboard hints)
    fn render_chrome(&self, painter: &egui::Painter, screen_rect: Rect) {
        let summary = self.engine.window_summary();
        let total = self.engine.hierarchy().map_or(0, Hierarchy::len);
        let stats_text = format!(
            "{} messages | {} shown | {} collapsed",
            total,
            summary.visible.len(),
            summary.collapsed.len()
        );
        painter.text(
            screen_rect.left_top() + Vec2::new(10.0, 10.0),
            egui::Align2::LEFT_TOP,
            stats_text,
            egui::FontId::proportional(12.0),
            Color32::from_rgb(150, 150, 150),
        );

        // Zoom level in bottom-left
        let zoom_text = format!("Zoom: {:.0}%", self.engine.viewport().scale() * 100.0);
        painter.text(
            screen_rect.left_bottom() + Vec2::new(10.0, -30.0),
            egui::Align2::LEFT_BOTTOM,
            zoom_text,
            egui::FontId::proportional(11.0),
            Color32::from_rgb(120, 120, 120),
        );

        let hints = "Drag: Pan | Scroll: Zoom | +/-: Zoom | 0: Reset | C: Recenter";
        painter.text(
            screen_rect.left_bottom() + Vec2::new(10.0, -10.0),
            egui::Align2::LEFT_BOTTOM,
            hints,
            egui::FontId::proportional(10.0),
            Color32::from_rgb(100, 100, 100),
        );

        if let Some(err) = &self.last_error {
            painter.text(
                screen_rect.right_top() + Vec2::new(-10.0, 10.0),
                egui::Align2::RIGHT_TOP,
                format!("Update rejected: {}", err),
                egui::FontId::proportional(11.0),
                Color32::from_rgb(239, 68, 68),
            );
        }
    }

    fn render_tooltip(&self, response: egui::Response, node_id: &str) {
        let Some(node) = self.engine.hierarchy().and_then(|h| h.get_by_id(node_id)) else {
            return;
        };
        let preview: String = node.message.chars().take(TOOLTIP_PREVIEW_CHARS).collect();
        let truncated = node.message.chars().count() > TOOLTIP_PREVIEW_CHARS;

        response.on_hover_ui_at_pointer(|ui| {
            ui.set_max_width(320.0);
            ui.strong(if node.agent_name.is_empty() {
                node.id.as_str()
            } else {
                node.agent_name.as_str()
            });
            ui.weak(node.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string());
            if !preview.is_empty() {
                ui.separator();
                ui.label(if truncated {
                    format!("{preview}…")
                } else {
                    preview.clone()
                });
            }
            if node.is_collapsed() {
                ui.weak("More messages below (collapsed)");
            }
        });
    }
}
