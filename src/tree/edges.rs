//! Parent-to-child link curves
//!
//! Links are cubic beziers whose control points sit at the horizontal midpoint,
//! the first at the source's height and the second at the target's. With a
//! top-down tree this gives the familiar S-shaped branch.

use egui::{Pos2, Stroke};

/// Number of segments used when flattening a link for painting
const LINK_SEGMENTS: usize = 24;

/// Cubic bezier between a parent and a child
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkCurve {
    pub from: Pos2,
    pub to: Pos2,
    pub control_a: Pos2,
    pub control_b: Pos2,
}

impl LinkCurve {
    pub fn new(from: Pos2, to: Pos2) -> Self {
        let mid_x = (from.x + to.x) / 2.0;
        Self {
            from,
            to,
            control_a: Pos2::new(mid_x, from.y),
            control_b: Pos2::new(mid_x, to.y),
        }
    }

    /// Point on the curve at parameter t (0.0 to 1.0)
    pub fn point_at(&self, t: f32) -> Pos2 {
        let t = t.clamp(0.0, 1.0);
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;

        Pos2::new(
            self.from.x * a + self.control_a.x * b + self.control_b.x * c + self.to.x * d,
            self.from.y * a + self.control_a.y * b + self.control_b.y * c + self.to.y * d,
        )
    }

    /// Polyline approximation with `segments + 1` points
    pub fn sample(&self, segments: usize) -> Vec<Pos2> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.point_at(i as f32 / segments as f32))
            .collect()
    }

    pub fn midpoint(&self) -> Pos2 {
        self.point_at(0.5)
    }

    /// Both endpoints coincide (a link still growing out of its parent)
    pub fn is_degenerate(&self) -> bool {
        self.from.distance_sq(self.to) < f32::EPSILON
    }
}

/// Paint a link given endpoints already in screen space
pub fn render_link(painter: &egui::Painter, curve: &LinkCurve, stroke: Stroke) {
    if curve.is_degenerate() || stroke.color.a() == 0 {
        return;
    }
    painter.add(egui::Shape::line(curve.sample(LINK_SEGMENTS), stroke));
}
