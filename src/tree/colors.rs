//! Color palette for the conversation tree
//!
//! Emphasis is carried by two things only: the accent border on the active
//! path and the opacity tier applied to every node and link.

use egui::{Color32, Stroke};

use crate::config::StyleSettings;

/// Border of active-path nodes
pub const ACCENT: Color32 = Color32::from_rgb(33, 150, 243); // Blue
/// Border of every other node
pub const NEUTRAL: Color32 = Color32::from_rgb(158, 158, 158); // Gray

pub const ACTIVE_FILL: Color32 = Color32::from_rgb(227, 242, 253);
pub const FILL: Color32 = Color32::from_rgb(250, 250, 250);
/// Collapsed nodes hint at more content below
pub const COLLAPSED_FILL: Color32 = Color32::from_rgb(255, 236, 179); // Amber

pub const LINK: Color32 = Color32::from_rgb(120, 144, 156);
pub const ACTIVE_LINK: Color32 = Color32::from_rgb(30, 136, 229);

pub const LABEL: Color32 = Color32::from_rgb(66, 66, 66);
pub const MUTED_LABEL: Color32 = Color32::from_rgb(117, 117, 117);

pub const HOVER_RING: Color32 = Color32::from_rgb(255, 152, 0);

/// Scale a color's alpha by `opacity` (0.0 to 1.0)
pub fn apply_opacity(color: Color32, opacity: f32) -> Color32 {
    let [r, g, b, a] = color.to_array();
    Color32::from_rgba_unmultiplied(r, g, b, (a as f32 * opacity.clamp(0.0, 1.0)) as u8)
}

/// Border stroke for a node, before opacity
pub fn node_stroke(on_active_path: bool, style: &StyleSettings) -> Stroke {
    if on_active_path {
        Stroke::new(style.active_stroke_width, ACCENT)
    } else {
        Stroke::new(style.inactive_stroke_width, NEUTRAL)
    }
}

pub fn node_fill(on_active_path: bool, collapsed: bool) -> Color32 {
    match (on_active_path, collapsed) {
        (_, true) => COLLAPSED_FILL,
        (true, false) => ACTIVE_FILL,
        (false, false) => FILL,
    }
}

pub fn link_color(on_active_path: bool) -> Color32 {
    if on_active_path {
        ACTIVE_LINK
    } else {
        LINK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_apply_opacity_scales_alpha() {
        let faded = apply_opacity(ACCENT, 0.6);
        assert_eq!(faded.a(), 153);
        assert_eq!(apply_opacity(ACCENT, 1.0), ACCENT);
        assert_eq!(apply_opacity(ACCENT, 0.0).a(), 0);
    }

    #[test]
    fn test_active_path_stroke_is_accented() {
        let style = StyleSettings::default();
        let active = node_stroke(true, &style);
        let inactive = node_stroke(false, &style);

        assert_eq!(active.color, ACCENT);
        assert_eq!(inactive.color, NEUTRAL);
        assert!(active.width > inactive.width);
    }
}
