//! Diff/animation renderer
//!
//! Keeps the animated state of every node and link that is on screen, keyed
//! by node id (links by their target node id, since every node has exactly one
//! incoming link). Each committed layout is reconciled against that state:
//!
//! - entering entries start at the node's seeded position `(x0, y0)` with
//!   opacity 0
//! - updating entries are retargeted from wherever they currently are
//! - exiting entries fade to 0 while sliding toward the root, then are dropped
//!
//! Reconciling mid-transition retargets rather than queues, so the picture
//! never lags the latest layout.
//!
//! All rendering uses world coordinates transformed by the viewport.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use egui::{Align2, FontId, Pos2, Rect, Stroke, Vec2};

use super::active_path::ActivePath;
use super::animation::{Lerp, Tween};
use super::camera::ViewportController;
use super::colors::{self, apply_opacity};
use super::edges::{render_link, LinkCurve};
use super::hierarchy::Hierarchy;
use crate::config::{AnimationSettings, StyleSettings};

const LABEL_FONT_SIZE: f32 = 12.0;
const MARKER_FONT_SIZE: f32 = 10.0;

/// Lifecycle of a rendered element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Entering,
    Updating,
    Exiting,
}

/// Opacity for a node (and its incoming link)
///
/// Active path → full. Off the path, expanded nodes are reduced and nodes
/// sitting on the window edge with cached descendants are faint.
pub fn opacity_tier(on_active_path: bool, collapsed: bool, style: &StyleSettings) -> f32 {
    if on_active_path {
        style.active_path_opacity
    } else if collapsed {
        style.dormant_opacity
    } else {
        style.live_opacity
    }
}

// =============================================================================
// ANIMATED ELEMENTS
// =============================================================================

#[derive(Debug, Clone)]
pub struct AnimatedNode {
    pub id: String,
    pub agent_name: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub presence: Presence,
    pub on_active_path: bool,
    pub collapsed: bool,
    /// Descendants withheld below a collapsed node
    pub hidden_count: usize,
    position: Tween<Pos2>,
    opacity: Tween<f32>,
}

impl AnimatedNode {
    pub fn position(&self) -> Pos2 {
        self.position.value()
    }

    pub fn target_position(&self) -> Pos2 {
        self.position.target()
    }

    pub fn opacity(&self) -> f32 {
        self.opacity.value()
    }

    pub fn target_opacity(&self) -> f32 {
        self.opacity.target()
    }

    pub fn is_animating(&self) -> bool {
        self.position.is_animating() || self.opacity.is_animating()
    }

    /// Agent name, or the id when the message has no author
    pub fn label(&self) -> &str {
        if self.agent_name.is_empty() {
            &self.id
        } else {
            &self.agent_name
        }
    }
}

/// Incoming link of a node, keyed by the node's id
#[derive(Debug, Clone)]
pub struct AnimatedLink {
    pub target_id: String,
    pub presence: Presence,
    pub on_active_path: bool,
    source: Tween<Pos2>,
    target: Tween<Pos2>,
    opacity: Tween<f32>,
}

impl AnimatedLink {
    pub fn curve(&self) -> LinkCurve {
        LinkCurve::new(self.source.value(), self.target.value())
    }

    pub fn opacity(&self) -> f32 {
        self.opacity.value()
    }

    pub fn target_opacity(&self) -> f32 {
        self.opacity.target()
    }

    pub fn is_animating(&self) -> bool {
        self.source.is_animating() || self.target.is_animating() || self.opacity.is_animating()
    }
}

/// Counts from one reconcile pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub entering: usize,
    pub updating: usize,
    pub exiting: usize,
}

/// Per-frame painting inputs not owned by the renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions<'a> {
    /// Node under the pointer (gets a hover ring)
    pub hovered: Option<&'a str>,
    /// Node the viewport revolves around
    pub focus: Option<&'a str>,
}

// =============================================================================
// TREE RENDERER
// =============================================================================

#[derive(Debug, Clone)]
pub struct TreeRenderer {
    nodes: BTreeMap<String, AnimatedNode>,
    links: BTreeMap<String, AnimatedLink>,
    animation: AnimationSettings,
    style: StyleSettings,
    node_radius: f32,
}

impl Default for TreeRenderer {
    fn default() -> Self {
        Self::new(AnimationSettings::default(), StyleSettings::default(), 10.0)
    }
}

impl TreeRenderer {
    pub fn new(animation: AnimationSettings, style: StyleSettings, node_radius: f32) -> Self {
        Self {
            nodes: BTreeMap::new(),
            links: BTreeMap::new(),
            animation,
            style,
            node_radius,
        }
    }

    pub fn style(&self) -> &StyleSettings {
        &self.style
    }

    pub fn node_radius(&self) -> f32 {
        self.node_radius
    }

    pub fn node(&self, id: &str) -> Option<&AnimatedNode> {
        self.nodes.get(id)
    }

    pub fn link(&self, target_id: &str) -> Option<&AnimatedLink> {
        self.links.get(target_id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &AnimatedNode> {
        self.nodes.values()
    }

    pub fn links(&self) -> impl Iterator<Item = &AnimatedLink> {
        self.links.values()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
    }

    fn tween<T: Lerp>(&self, from: T, to: T) -> Tween<T> {
        Tween::new(
            from,
            to,
            self.animation.duration_secs(),
            self.animation.easing,
        )
    }

    /// Diff the visible part of `hierarchy` against what is on screen
    pub fn reconcile(&mut self, hierarchy: &Hierarchy, active_path: &ActivePath) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        let root_target = hierarchy.root().position;

        for node in hierarchy.visible_nodes() {
            let on_path = active_path.contains(&node.id);
            let collapsed = node.is_collapsed();
            let opacity = opacity_tier(on_path, collapsed, &self.style);
            let idx = hierarchy.index_of(&node.id);
            let hidden_count = idx.map_or(0, |i| hierarchy.hidden_descendant_count(i));

            match self.nodes.get_mut(&node.id) {
                Some(existing) => {
                    existing.position.retarget(node.position);
                    existing.opacity.retarget(opacity);
                    existing.presence = Presence::Updating;
                    existing.on_active_path = on_path;
                    existing.collapsed = collapsed;
                    existing.hidden_count = hidden_count;
                    existing.agent_name.clone_from(&node.agent_name);
                    existing.message.clone_from(&node.message);
                    existing.timestamp = node.timestamp;
                    summary.updating += 1;
                }
                None => {
                    let entering = AnimatedNode {
                        id: node.id.clone(),
                        agent_name: node.agent_name.clone(),
                        message: node.message.clone(),
                        timestamp: node.timestamp,
                        presence: Presence::Entering,
                        on_active_path: on_path,
                        collapsed,
                        hidden_count,
                        position: self.tween(node.previous, node.position),
                        opacity: self.tween(0.0, opacity),
                    };
                    self.nodes.insert(node.id.clone(), entering);
                    summary.entering += 1;
                }
            }

            let Some(parent) = node.parent.and_then(|p| hierarchy.get(p)) else {
                continue;
            };
            match self.links.get_mut(&node.id) {
                Some(existing) => {
                    existing.source.retarget(parent.position);
                    existing.target.retarget(node.position);
                    existing.opacity.retarget(opacity);
                    existing.presence = Presence::Updating;
                    existing.on_active_path = on_path;
                }
                None => {
                    let entering = AnimatedLink {
                        target_id: node.id.clone(),
                        presence: Presence::Entering,
                        on_active_path: on_path,
                        source: self.tween(node.previous, parent.position),
                        target: self.tween(node.previous, node.position),
                        opacity: self.tween(0.0, opacity),
                    };
                    self.links.insert(node.id.clone(), entering);
                }
            }
        }

        let is_visible = |id: &str| hierarchy.get_by_id(id).is_some_and(|n| n.visible);
        for node in self.nodes.values_mut().filter(|n| !is_visible(&n.id)) {
            if node.presence != Presence::Exiting {
                node.presence = Presence::Exiting;
                summary.exiting += 1;
            }
            node.position.retarget(root_target);
            node.opacity.retarget(0.0);
            node.on_active_path = false;
        }
        for link in self.links.values_mut().filter(|l| !is_visible(&l.target_id)) {
            link.presence = Presence::Exiting;
            link.source.retarget(root_target);
            link.target.retarget(root_target);
            link.opacity.retarget(0.0);
            link.on_active_path = false;
        }

        tracing::debug!(
            entering = summary.entering,
            updating = summary.updating,
            exiting = summary.exiting,
            "Reconciled tree frame"
        );

        summary
    }

    /// Advance every transition and drop finished exits
    ///
    /// Returns true while anything is still moving.
    pub fn tick(&mut self, dt: f32) -> bool {
        let mut animating = false;
        for node in self.nodes.values_mut() {
            animating |= node.position.tick(dt);
            animating |= node.opacity.tick(dt);
        }
        for link in self.links.values_mut() {
            animating |= link.source.tick(dt);
            animating |= link.target.tick(dt);
            animating |= link.opacity.tick(dt);
        }

        self.nodes
            .retain(|_, n| n.presence != Presence::Exiting || n.is_animating());
        self.links
            .retain(|_, l| l.presence != Presence::Exiting || l.is_animating());

        animating
    }

    pub fn is_animating(&self) -> bool {
        self.nodes.values().any(AnimatedNode::is_animating)
            || self.links.values().any(AnimatedLink::is_animating)
    }

    // =========================================================================
    // PAINTING
    // =========================================================================

    /// Paint links, then nodes, in screen space
    pub fn paint(
        &self,
        painter: &egui::Painter,
        viewport: &ViewportController,
        screen_rect: Rect,
        opts: &RenderOptions<'_>,
    ) {
        let scale = viewport.scale();
        let radius = self.node_radius * scale;
        let cull_rect = screen_rect.expand(radius + 2.0);

        for link in self.links.values() {
            let opacity = link.opacity();
            if opacity <= 0.0 {
                continue;
            }
            let world = link.curve();
            let curve = LinkCurve::new(
                viewport.world_to_screen(world.from, screen_rect),
                viewport.world_to_screen(world.to, screen_rect),
            );
            let color = apply_opacity(colors::link_color(link.on_active_path), opacity);
            let width = if link.on_active_path {
                self.style.link_width * 1.5
            } else {
                self.style.link_width
            };
            render_link(painter, &curve, Stroke::new(width, color));
        }

        let show_labels = scale >= self.style.label_min_scale;
        for node in self.nodes.values() {
            let opacity = node.opacity();
            let center = viewport.world_to_screen(node.position(), screen_rect);
            if opacity <= 0.0 || !cull_rect.contains(center) {
                continue;
            }
            self.paint_node(painter, node, center, radius, opacity, show_labels, opts);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn paint_node(
        &self,
        painter: &egui::Painter,
        node: &AnimatedNode,
        center: Pos2,
        radius: f32,
        opacity: f32,
        show_labels: bool,
        opts: &RenderOptions<'_>,
    ) {
        let fill = apply_opacity(colors::node_fill(node.on_active_path, node.collapsed), opacity);
        let mut stroke = colors::node_stroke(node.on_active_path, &self.style);
        stroke.color = apply_opacity(stroke.color, opacity);
        painter.circle(center, radius, fill, stroke);

        if opts.focus == Some(node.id.as_str()) {
            painter.circle_stroke(
                center,
                radius * 1.6,
                Stroke::new(1.0, apply_opacity(colors::ACCENT, opacity * 0.5)),
            );
        }
        if opts.hovered == Some(node.id.as_str()) {
            painter.circle_stroke(
                center,
                radius + 3.0,
                Stroke::new(2.0, apply_opacity(colors::HOVER_RING, opacity)),
            );
        }

        if node.collapsed {
            painter.text(
                center + Vec2::new(0.0, radius + 8.0),
                Align2::CENTER_TOP,
                format!("+{}", node.hidden_count),
                FontId::proportional(MARKER_FONT_SIZE),
                apply_opacity(colors::MUTED_LABEL, opacity),
            );
        }

        if show_labels {
            let color = if node.on_active_path {
                colors::LABEL
            } else {
                colors::MUTED_LABEL
            };
            painter.text(
                center + Vec2::new(radius + 6.0, 0.0),
                Align2::LEFT_CENTER,
                node.label(),
                FontId::proportional(LABEL_FONT_SIZE),
                apply_opacity(color, opacity),
            );
        }
    }
}
