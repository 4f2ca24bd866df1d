//! Tree visualization settings
//!
//! Loaded from `config/tree_settings.yaml` (directory overridable with
//! `CONVO_TREE_CONFIG_DIR`) on first access to [`global_config()`].
//! Missing or invalid files fall back to defaults with a warning.
//!
//! Every engine component also takes settings explicitly, so tests never
//! depend on the global.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::tree::animation::EasingFn;

/// Global settings instance (lazy-loaded)
static SETTINGS: OnceLock<TreeSettings> = OnceLock::new();

/// Get the global tree settings (loads on first access)
pub fn global_config() -> &'static TreeSettings {
    SETTINGS.get_or_init(|| {
        load_settings_from_config().unwrap_or_else(|e| {
            tracing::warn!("Failed to load tree settings: {:#}, using defaults", e);
            TreeSettings::default()
        })
    })
}

fn load_settings_from_config() -> anyhow::Result<TreeSettings> {
    let config_dir =
        std::env::var("CONVO_TREE_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let settings_path = format!("{}/tree_settings.yaml", config_dir);
    let settings = TreeSettings::from_file(&settings_path)?;

    tracing::info!(
        path = %settings_path,
        max_visible_height = settings.window.max_visible_height,
        "Loaded tree settings"
    );

    Ok(settings)
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Root settings structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeSettings {
    pub window: WindowSettings,
    pub layout: LayoutSettings,
    pub animation: AnimationSettings,
    pub viewport: ViewportSettings,
    pub style: StyleSettings,
}

impl TreeSettings {
    /// Parse and validate settings from YAML text
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let settings: TreeSettings =
            serde_yaml::from_str(content).context("Failed to parse tree settings YAML")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate a settings file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> anyhow::Result<()> {
        let vp = &self.viewport;
        if vp.min_scale <= 0.0 || vp.min_scale > vp.max_scale {
            anyhow::bail!(
                "viewport scale range [{}, {}] is invalid",
                vp.min_scale,
                vp.max_scale
            );
        }
        if vp.zoom_in_factor <= 1.0 || vp.zoom_out_factor <= 0.0 || vp.zoom_out_factor >= 1.0 {
            anyhow::bail!(
                "zoom factors must satisfy in > 1 and 0 < out < 1 (got {} / {})",
                vp.zoom_in_factor,
                vp.zoom_out_factor
            );
        }
        let layout = &self.layout;
        if layout.sibling_separation <= 0.0 || layout.cousin_separation <= 0.0 {
            anyhow::bail!("layout separations must be positive");
        }
        if layout.vertical_spacing <= 0.0 {
            anyhow::bail!("layout.vertical_spacing must be positive");
        }
        Ok(())
    }
}

/// Visibility window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    /// Levels admitted below the focus node
    pub max_visible_height: usize,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            max_visible_height: 30,
        }
    }
}

/// Tidy tree layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Separation (in layout units) between nodes sharing a parent
    pub sibling_separation: f32,
    /// Separation between adjacent nodes with different parents
    pub cousin_separation: f32,
    /// Fixed distance between depth levels
    pub vertical_spacing: f32,
    /// Margin kept free on both sides of the primary axis
    pub horizontal_margin: f32,
    /// Node circle radius in world units
    pub node_radius: f32,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            sibling_separation: 1.0,
            cousin_separation: 2.0,
            vertical_spacing: 100.0,
            horizontal_margin: 100.0,
            node_radius: 10.0,
        }
    }
}

/// Transition timing shared by nodes, links and the viewport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    pub duration_ms: u64,
    pub easing: EasingFn,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            duration_ms: 300,
            easing: EasingFn::EaseInOutCubic,
        }
    }
}

impl AnimationSettings {
    /// Duration in seconds (animations are ticked with frame `dt` seconds)
    pub fn duration_secs(&self) -> f32 {
        self.duration_ms as f32 / 1000.0
    }
}

/// Pan/zoom viewport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    pub min_scale: f32,
    pub max_scale: f32,
    pub zoom_in_factor: f32,
    pub zoom_out_factor: f32,
    /// Vertical position of the focus node after recenter (fraction of height)
    pub focus_vertical_fraction: f32,
    /// Horizontal translate used by reset
    pub reset_left_margin: f32,
    /// Scale change per scroll pixel
    pub wheel_sensitivity: f32,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 3.0,
            zoom_in_factor: 1.3,
            zoom_out_factor: 0.7,
            focus_vertical_fraction: 1.0 / 3.0,
            reset_left_margin: 50.0,
            wheel_sensitivity: 0.001,
        }
    }
}

/// Opacity tiers and stroke emphasis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSettings {
    /// Nodes on the active path
    pub active_path_opacity: f32,
    /// Off-path nodes still flagged active
    pub live_opacity: f32,
    /// Off-path inactive nodes
    pub dormant_opacity: f32,
    pub active_stroke_width: f32,
    pub inactive_stroke_width: f32,
    pub link_width: f32,
    /// Labels are hidden below this zoom scale
    pub label_min_scale: f32,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            active_path_opacity: 1.0,
            live_opacity: 0.6,
            dormant_opacity: 0.3,
            active_stroke_width: 3.0,
            inactive_stroke_width: 1.5,
            link_width: 1.5,
            label_min_scale: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let settings = TreeSettings::from_yaml("window:\n  max_visible_height: 12\n").unwrap();

        assert_eq!(settings.window.max_visible_height, 12);
        assert_eq!(settings.layout, LayoutSettings::default());
        assert_eq!(settings.animation.duration_ms, 300);
    }

    #[test]
    fn test_bundled_settings_file_parses() {
        let content = include_str!("../config/tree_settings.yaml");
        let settings = TreeSettings::from_yaml(content).unwrap();

        assert_eq!(settings.window.max_visible_height, 30);
        assert_eq!(settings.animation.easing, EasingFn::EaseInOutCubic);
        assert!((settings.viewport.max_scale - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_scale_range_rejected() {
        let err = TreeSettings::from_yaml("viewport:\n  min_scale: 4.0\n  max_scale: 3.0\n")
            .unwrap_err();
        assert!(err.to_string().contains("scale range"));
    }

    #[test]
    fn test_invalid_zoom_factor_rejected() {
        assert!(TreeSettings::from_yaml("viewport:\n  zoom_out_factor: 1.5\n").is_err());
    }
}
