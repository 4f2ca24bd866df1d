//! Spatial index for hover hit testing
//!
//! R-tree (via `rstar`) over the laid-out node circles in world coordinates.
//! Rebuilt after every layout; queried with the pointer position mapped back
//! through the viewport transform.

use egui::Pos2;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// Node circle stored in the index
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialNode {
    pub id: String,
    pub center: [f32; 2],
    pub radius: f32,
    bounds: AABB<[f32; 2]>,
}

impl SpatialNode {
    pub fn new(id: impl Into<String>, center: Pos2, radius: f32) -> Self {
        let bounds = AABB::from_corners(
            [center.x - radius, center.y - radius],
            [center.x + radius, center.y + radius],
        );
        Self {
            id: id.into(),
            center: [center.x, center.y],
            radius,
            bounds,
        }
    }

    fn centre_distance_2(&self, point: [f32; 2]) -> f32 {
        let dx = point[0] - self.center[0];
        let dy = point[1] - self.center[1];
        dx * dx + dy * dy
    }

    /// Distance from `point` to the circle's edge (0 inside)
    fn edge_distance(&self, point: [f32; 2]) -> f32 {
        let dx = point[0] - self.center[0];
        let dy = point[1] - self.center[1];
        ((dx * dx + dy * dy).sqrt() - self.radius).max(0.0)
    }
}

impl RTreeObject for SpatialNode {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.bounds
    }
}

impl PointDistance for SpatialNode {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let d = self.edge_distance(*point);
        d * d
    }

    fn contains_point(&self, point: &[f32; 2]) -> bool {
        self.edge_distance(*point) <= 0.0
    }
}

/// R-tree of node circles
#[derive(Clone, Default)]
pub struct SpatialIndex {
    tree: RTree<SpatialNode>,
    count: usize,
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("count", &self.count)
            .finish_non_exhaustive()
    }
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with `nodes`
    pub fn rebuild(&mut self, nodes: impl Iterator<Item = SpatialNode>) {
        let nodes: Vec<_> = nodes.collect();
        self.count = nodes.len();
        self.tree = RTree::bulk_load(nodes);
    }

    pub fn clear(&mut self) {
        self.tree = RTree::new();
        self.count = 0;
    }

    /// Closest node whose edge lies within `threshold` of `point`
    pub fn hit_test(&self, point: Pos2, threshold: f32) -> Option<&SpatialNode> {
        let point = [point.x, point.y];
        let search = AABB::from_corners(
            [point[0] - threshold, point[1] - threshold],
            [point[0] + threshold, point[1] + threshold],
        );

        self.tree
            .locate_in_envelope_intersecting(&search)
            // Overlapping circles resolve to the nearest centre
            .min_by(|a, b| a.centre_distance_2(point).total_cmp(&b.centre_distance_2(point)))
            .filter(|node| node.edge_distance(point) <= threshold)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&SpatialNode> {
        self.tree.iter().find(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn index_of(nodes: Vec<SpatialNode>) -> SpatialIndex {
        let mut index = SpatialIndex::new();
        index.rebuild(nodes.into_iter());
        index
    }

    #[test]
    fn test_empty_index() {
        let index = SpatialIndex::new();
        assert!(index.is_empty());
        assert!(index.hit_test(Pos2::ZERO, 10.0).is_none());
    }

    #[test]
    fn test_hit_inside_edge_and_miss() {
        let index = index_of(vec![SpatialNode::new("m1", Pos2::new(100.0, 100.0), 10.0)]);

        assert_eq!(index.hit_test(Pos2::new(100.0, 100.0), 0.0).map(|n| n.id.as_str()), Some("m1"));
        assert!(index.hit_test(Pos2::new(113.0, 100.0), 5.0).is_some());
        assert!(index.hit_test(Pos2::new(200.0, 200.0), 5.0).is_none());
    }

    #[test]
    fn test_closest_node_wins() {
        let index = index_of(vec![
            SpatialNode::new("a", Pos2::new(0.0, 0.0), 10.0),
            SpatialNode::new("b", Pos2::new(50.0, 0.0), 10.0),
            SpatialNode::new("c", Pos2::new(100.0, 0.0), 10.0),
        ]);

        assert_eq!(index.hit_test(Pos2::new(48.0, 0.0), 15.0).map(|n| n.id.as_str()), Some("b"));
        assert_eq!(index.len(), 3);
        assert!(index.find_by_id("c").is_some());
    }

    #[test]
    fn test_overlapping_circles_pick_nearest_centre() {
        let index = index_of(vec![
            SpatialNode::new("a", Pos2::new(0.0, 0.0), 10.0),
            SpatialNode::new("b", Pos2::new(6.0, 0.0), 10.0),
        ]);

        assert_eq!(index.hit_test(Pos2::new(5.0, 0.0), 0.0).map(|n| n.id.as_str()), Some("b"));
        assert_eq!(index.hit_test(Pos2::new(1.0, 0.0), 0.0).map(|n| n.id.as_str()), Some("a"));
    }

    #[test]
    fn test_rebuild_replaces_contents() {
        let mut index = index_of(vec![SpatialNode::new("old", Pos2::ZERO, 5.0)]);
        index.rebuild(std::iter::once(SpatialNode::new("new", Pos2::new(30.0, 0.0), 5.0)));

        assert_eq!(index.len(), 1);
        assert!(index.find_by_id("old").is_none());
        assert!(index.hit_test(Pos2::ZERO, 1.0).is_none());
    }
}
