//! Input handling - pointer and keyboard interaction with the tree
//!
//! Drag pans, scroll zooms about the pointer, hovering a node selects it for
//! the tooltip. Keys: `+`/`=` zoom in, `-` zoom out, `0` reset zoom,
//! `C`/`Space` recenter on the focus node.

use egui::{Rect, Response};

use super::engine::ConversationTreeEngine;

// =============================================================================
// INPUT STATE
// =============================================================================

/// Tracks input state for the tree view
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Node under the pointer
    pub hovered_node: Option<String>,
    /// Is the user currently dragging to pan?
    pub is_panning: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Viewport command triggered by a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    ZoomIn,
    ZoomOut,
    ResetZoom,
    Recenter,
}

impl KeyCommand {
    pub fn apply(self, engine: &mut ConversationTreeEngine) {
        match self {
            KeyCommand::ZoomIn => engine.zoom_in(),
            KeyCommand::ZoomOut => engine.zoom_out(),
            KeyCommand::ResetZoom => engine.reset_zoom(),
            KeyCommand::Recenter => engine.recenter(),
        }
    }
}

// =============================================================================
// INPUT HANDLER
// =============================================================================

/// Handles all input for the tree view
pub struct InputHandler;

impl InputHandler {
    /// Process input and update the viewport/state
    /// Returns true if the tree needs to be repainted
    pub fn handle_input(
        response: &Response,
        engine: &mut ConversationTreeEngine,
        state: &mut InputState,
        screen_rect: Rect,
    ) -> bool {
        let mut needs_repaint = false;
        let pointer_pos = response.hover_pos();

        // Hover detection
        let hovered = pointer_pos.and_then(|pos| {
            let world = engine.viewport().screen_to_world(pos, screen_rect);
            engine.hit_test(world).map(|n| n.id.clone())
        });
        if hovered != state.hovered_node {
            state.hovered_node = hovered;
            needs_repaint = true;
        }

        // Drag for panning
        if response.dragged() {
            let delta = response.drag_delta();
            if delta.length() > 0.0 {
                engine.viewport_mut().pan(delta);
                state.is_panning = true;
                needs_repaint = true;
            }
        } else {
            state.is_panning = false;
        }

        // Scroll for zooming
        if let Some(pos) = pointer_pos {
            let scroll_delta = response.ctx.input(|i| i.raw_scroll_delta);
            if scroll_delta.y != 0.0 {
                let sensitivity = engine.viewport().settings().wheel_sensitivity;
                let zoom_factor = (1.0 + scroll_delta.y * sensitivity).max(0.01);
                engine
                    .viewport_mut()
                    .zoom_at(zoom_factor, pos - screen_rect.min.to_vec2());
                needs_repaint = true;
            }
        }

        if response.hovered() || response.has_focus() {
            for command in Self::key_commands(response) {
                command.apply(engine);
                needs_repaint = true;
            }
        }

        needs_repaint
    }

    /// Keyboard shortcuts pressed this frame
    fn key_commands(response: &Response) -> Vec<KeyCommand> {
        response.ctx.input(|i| {
            let mut commands = Vec::new();
            if i.key_pressed(egui::Key::Plus) || i.key_pressed(egui::Key::Equals) {
                commands.push(KeyCommand::ZoomIn);
            }
            if i.key_pressed(egui::Key::Minus) {
                commands.push(KeyCommand::ZoomOut);
            }
            if i.key_pressed(egui::Key::Num0) {
                commands.push(KeyCommand::ResetZoom);
            }
            if i.key_pressed(egui::Key::C) || i.key_pressed(egui::Key::Space) {
                commands.push(KeyCommand::Recenter);
            }
            commands
        })
    }
}

/// Cursor to show for the current input state
pub fn cursor_for_state(state: &InputState) -> egui::CursorIcon {
    if state.is_panning {
        egui::CursorIcon::Grabbing
    } else if state.hovered_node.is_some() {
        egui::CursorIcon::PointingHand
    } else {
        egui::CursorIcon::Grab
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TreeSettings;
    use crate::tree::types::ViewportSize;

    fn engine() -> ConversationTreeEngine {
        let mut engine = ConversationTreeEngine::new(TreeSettings::default());
        engine.set_viewport_size(ViewportSize::new(800.0, 600.0));
        engine
    }

    #[test]
    fn test_cursor_follows_state() {
        let mut state = InputState::new();
        assert_eq!(cursor_for_state(&state), egui::CursorIcon::Grab);

        state.hovered_node = Some("m1".to_string());
        assert_eq!(cursor_for_state(&state), egui::CursorIcon::PointingHand);

        state.is_panning = true;
        assert_eq!(cursor_for_state(&state), egui::CursorIcon::Grabbing);
    }

    #[test]
    fn test_zoom_keys_animate_scale() {
        let mut engine = engine();

        KeyCommand::ZoomIn.apply(&mut engine);
        assert!((engine.viewport().target().scale - 1.3).abs() < 1e-5);
        assert!(engine.viewport().is_animating());

        KeyCommand::ResetZoom.apply(&mut engine);
        assert_eq!(
            engine.viewport().target(),
            engine.viewport().default_transform()
        );
    }
}
