//! Expansion-driven visibility filtering.
//!
//! Runs against the same hierarchy as the coordinate stages but never touches
//! positions, so hidden nodes keep valid coordinates for later reveal. The
//! root and its first ring are always shown; a deeper node shows only while
//! every ancestor between it and the first ring is expanded.

use std::collections::BTreeSet;

use crate::hierarchy::Hierarchy;
use crate::model::{ExpansionState, NodeKey};

/// Computes the set of visible keys under `expansion`.
///
/// Children of an unexpanded node are pruned wholesale, so a descendant key
/// left inside `expansion` has no effect while any of its ancestors is
/// collapsed.
pub fn filter_visible(hierarchy: &Hierarchy, expansion: &ExpansionState) -> BTreeSet<NodeKey> {
    let mut visible = BTreeSet::new();
    let mut stack = vec![0usize];
    while let Some(idx) = stack.pop() {
        let node = hierarchy.node_at(idx);
        visible.insert(node.key.clone());
        let expanded = expansion.contains(&node.key);
        for &child in &node.children {
            if hierarchy.node_at(child).level <= 1 || expanded {
                stack.push(child);
            }
        }
    }
    visible
}

/// Collapses `key`: removes it from the expansion set together with every
/// descendant's entry, so re-expanding later reveals a single ring again.
pub fn collapse(hierarchy: &Hierarchy, expansion: &mut ExpansionState, key: &NodeKey) {
    expansion.remove(key);
    let Some(idx) = hierarchy.index_of(key) else {
        return;
    };
    for descendant in hierarchy.descendant_indices(idx) {
        expansion.remove(&hierarchy.node_at(descendant).key);
    }
}
