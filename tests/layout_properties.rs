//! Tidy layout properties over generated trees

use chrono::DateTime;
use convo_tree::config::LayoutSettings;
use convo_tree::tree::hierarchy::{Hierarchy, PositionIndex};
use convo_tree::tree::types::{FlatNode, RawNode};
use convo_tree::tree::{LayoutEngine, ViewportSize, VisibilityWindow};
use proptest::prelude::*;
use proptest::sample::Index;

fn random_tree(parents: &[Index]) -> RawNode {
    let record = |id: usize, parent: Option<usize>| FlatNode {
        id: format!("n{id}"),
        agent_name: String::new(),
        message: String::new(),
        parent: parent.map(|p| format!("n{p}")),
        is_active: false,
        branch_id: "main".to_string(),
        timestamp: DateTime::from_timestamp(id as i64, 0).unwrap(),
    };
    let mut records = vec![record(0, None)];
    for (i, parent) in parents.iter().enumerate() {
        records.push(record(i + 1, Some(parent.index(i + 1))));
    }
    RawNode::assemble(records).unwrap()
}

fn laid_out(parents: &[Index], height: usize, width: f32) -> Hierarchy {
    let raw = random_tree(parents);
    let mut hierarchy = Hierarchy::build(&raw, &PositionIndex::new()).unwrap();
    VisibilityWindow::new(height).apply(&mut hierarchy, Hierarchy::ROOT);
    LayoutEngine::new(LayoutSettings::default())
        .layout(&mut hierarchy, ViewportSize::new(width, 600.0));
    hierarchy
}

proptest! {
    #[test]
    fn prop_nodes_stay_inside_margins(
        parents in proptest::collection::vec(any::<Index>(), 0..60),
        width in 400.0f32..2000.0,
    ) {
        let hierarchy = laid_out(&parents, 100, width);
        let margin = LayoutSettings::default().horizontal_margin;

        for node in hierarchy.visible_nodes() {
            prop_assert!(node.position.x >= margin - 1e-2, "{} at {}", node.id, node.position.x);
            prop_assert!(node.position.x <= width - margin + 1e-2, "{} at {}", node.id, node.position.x);
        }
    }

    #[test]
    fn prop_levels_follow_depth(
        parents in proptest::collection::vec(any::<Index>(), 0..60),
        height in 1usize..6,
    ) {
        let hierarchy = laid_out(&parents, height, 1200.0);
        let spacing = LayoutSettings::default().vertical_spacing;

        for node in hierarchy.visible_nodes() {
            prop_assert!((node.position.y - node.depth as f32 * spacing).abs() < 1e-3);
        }
    }

    #[test]
    fn prop_same_level_nodes_do_not_overlap(
        parents in proptest::collection::vec(any::<Index>(), 1..60),
    ) {
        let hierarchy = laid_out(&parents, 100, 1200.0);

        let mut by_depth: std::collections::BTreeMap<usize, Vec<f32>> = Default::default();
        for node in hierarchy.visible_nodes() {
            by_depth.entry(node.depth).or_default().push(node.position.x);
        }
        for xs in by_depth.values_mut() {
            xs.sort_by(f32::total_cmp);
            for pair in xs.windows(2) {
                prop_assert!(pair[1] - pair[0] > 1e-4, "overlap at {:?}", pair);
            }
        }
    }

    #[test]
    fn prop_relayout_is_stable(
        parents in proptest::collection::vec(any::<Index>(), 0..60),
    ) {
        let mut hierarchy = laid_out(&parents, 100, 900.0);
        let before: Vec<_> = hierarchy.iter().map(|(_, n)| n.position).collect();

        LayoutEngine::new(LayoutSettings::default())
            .layout(&mut hierarchy, ViewportSize::new(900.0, 600.0));

        let after: Vec<_> = hierarchy.iter().map(|(_, n)| n.position).collect();
        prop_assert_eq!(before, after);
    }
}
