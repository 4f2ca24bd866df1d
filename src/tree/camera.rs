//! Viewport controller - pan/zoom transform with eased transitions
//!
//! The transform maps world coordinates (layout output) to points inside the
//! widget rect: `screen = rect.min + world * scale + translate`.
//!
//! Programmatic changes (`recenter_on`, `zoom_in`, `zoom_out`, `reset_zoom`)
//! animate over the shared transition duration. Gestures (`pan`, `zoom_at`)
//! apply immediately and cancel whatever transition was in flight, so the
//! user's hand always wins over the animation.
//!
//! # Usage
//! Call `tick(dt)` at the start of the frame, then use the transforms for
//! rendering.

use egui::{Pos2, Rect, Vec2};

use super::animation::{Lerp, Tween};
use super::types::ViewportSize;
use crate::config::{AnimationSettings, ViewportSettings};

// =============================================================================
// TRANSFORM
// =============================================================================

/// Translation and uniform scale applied to the whole tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTransform {
    pub translate_x: f32,
    pub translate_y: f32,
    pub scale: f32,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ViewportTransform {
    pub const IDENTITY: Self = Self {
        translate_x: 0.0,
        translate_y: 0.0,
        scale: 1.0,
    };

    pub fn new(translate_x: f32, translate_y: f32, scale: f32) -> Self {
        Self {
            translate_x,
            translate_y,
            scale,
        }
    }

    pub fn translate(&self) -> Vec2 {
        Vec2::new(self.translate_x, self.translate_y)
    }

    /// World point to a point relative to the viewport's top-left corner
    pub fn apply(&self, world: Pos2) -> Pos2 {
        Pos2::new(
            world.x * self.scale + self.translate_x,
            world.y * self.scale + self.translate_y,
        )
    }

    /// Inverse of [`apply`](Self::apply)
    pub fn invert(&self, local: Pos2) -> Pos2 {
        Pos2::new(
            (local.x - self.translate_x) / self.scale,
            (local.y - self.translate_y) / self.scale,
        )
    }
}

impl Lerp for ViewportTransform {
    fn lerp(self, to: Self, t: f32) -> Self {
        Self {
            translate_x: self.translate_x.lerp(to.translate_x, t),
            translate_y: self.translate_y.lerp(to.translate_y, t),
            scale: self.scale.lerp(to.scale, t),
        }
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Owns the viewport transform and its transitions
#[derive(Debug, Clone)]
pub struct ViewportController {
    transform: Tween<ViewportTransform>,
    settings: ViewportSettings,
    size: ViewportSize,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(ViewportSettings::default(), &AnimationSettings::default())
    }
}

impl ViewportController {
    /// Starts at the identity transform
    pub fn new(settings: ViewportSettings, animation: &AnimationSettings) -> Self {
        Self {
            transform: Tween::from_settings(ViewportTransform::IDENTITY, animation),
            settings,
            size: ViewportSize::default(),
        }
    }

    // =========================================================================
    // CURRENT VALUES
    // =========================================================================

    /// Transform to render this frame
    pub fn transform(&self) -> ViewportTransform {
        self.transform.value()
    }

    /// Where the current transition ends
    pub fn target(&self) -> ViewportTransform {
        self.transform.target()
    }

    pub fn scale(&self) -> f32 {
        self.transform.value().scale
    }

    pub fn size(&self) -> ViewportSize {
        self.size
    }

    pub fn set_size(&mut self, size: ViewportSize) {
        self.size = size;
    }

    pub fn settings(&self) -> &ViewportSettings {
        &self.settings
    }

    // =========================================================================
    // ANIMATION UPDATE
    // =========================================================================

    /// Advance the transition (call every frame). Returns true while animating.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.transform.tick(dt)
    }

    pub fn is_animating(&self) -> bool {
        self.transform.is_animating()
    }

    // =========================================================================
    // PROGRAMMATIC CONTROLS (animated)
    // =========================================================================

    /// Put `world` at the horizontal centre and a third of the way down
    ///
    /// Keeps the scale the viewport is heading for.
    pub fn recenter_on(&mut self, world: Pos2) {
        let scale = self.transform.target().scale;
        let target = ViewportTransform::new(
            self.size.width / 2.0 - world.x * scale,
            self.size.height * self.settings.focus_vertical_fraction - world.y * scale,
            scale,
        );
        self.transform.retarget(target);
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(self.settings.zoom_in_factor);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(self.settings.zoom_out_factor);
    }

    /// Multiply the scale by `factor` about the viewport centre (animated)
    pub fn zoom_by(&mut self, factor: f32) {
        let centre = Pos2::new(self.size.width / 2.0, self.size.height / 2.0);
        let target = self.zoomed_about(self.transform.target(), factor, centre);
        self.transform.retarget(target);
    }

    /// Fixed default: small left margin, vertically centred, scale 1
    pub fn reset_zoom(&mut self) {
        self.transform.retarget(self.default_transform());
    }

    pub fn default_transform(&self) -> ViewportTransform {
        ViewportTransform::new(self.settings.reset_left_margin, self.size.height / 2.0, 1.0)
    }

    // =========================================================================
    // GESTURES (immediate)
    // =========================================================================

    /// Move by a screen-space delta
    pub fn pan(&mut self, delta: Vec2) {
        let mut current = self.transform.value();
        current.translate_x += delta.x;
        current.translate_y += delta.y;
        self.transform.set_immediate(current);
    }

    /// Zoom by `factor` keeping the point under `local` fixed
    ///
    /// `local` is relative to the viewport's top-left corner.
    pub fn zoom_at(&mut self, factor: f32, local: Pos2) {
        let next = self.zoomed_about(self.transform.value(), factor, local);
        self.transform.set_immediate(next);
    }

    fn zoomed_about(
        &self,
        from: ViewportTransform,
        factor: f32,
        anchor: Pos2,
    ) -> ViewportTransform {
        let scale = self.clamp_scale(from.scale * factor);
        let world = from.invert(anchor);
        ViewportTransform::new(anchor.x - world.x * scale, anchor.y - world.y * scale, scale)
    }

    pub fn clamp_scale(&self, scale: f32) -> f32 {
        scale.clamp(self.settings.min_scale, self.settings.max_scale)
    }

    // =========================================================================
    // COORDINATE TRANSFORMS
    // =========================================================================

    /// Transform world position to screen position
    pub fn world_to_screen(&self, world: Pos2, screen_rect: Rect) -> Pos2 {
        screen_rect.min + self.transform.value().apply(world).to_vec2()
    }

    /// Transform screen position to world position
    pub fn screen_to_world(&self, screen: Pos2, screen_rect: Rect) -> Pos2 {
        self.transform.value().invert(screen - screen_rect.min.to_vec2())
    }

    /// Get the visible world bounds for the current screen rect
    pub fn visible_bounds(&self, screen_rect: Rect) -> Rect {
        Rect::from_two_pos(
            self.screen_to_world(screen_rect.min, screen_rect),
            self.screen_to_world(screen_rect.max, screen_rect),
        )
    }

    /// Whether `world` currently projects inside the viewport
    pub fn is_visible(&self, world: Pos2) -> bool {
        let local = self.transform.value().apply(world);
        local.x >= 0.0
            && local.y >= 0.0
            && local.x <= self.size.width
            && local.y <= self.size.height
    }
}
