//! Radial tree layout: deterministic polar coordinates from the hierarchy.
//!
//! Depth maps to a radius band, sibling order maps to angle via a leaf walk.
//! The same hierarchy and sibling order always produce the same angles; input
//! list order is never re-sorted, which keeps re-layouts stable across
//! expand/collapse.

use std::f64::consts::TAU;

use crate::footprint::footprint;
use crate::geom::{Point, point};
use crate::hierarchy::Hierarchy;
use crate::model::{LayoutResult, Placement};

const DEFAULT_BAND_GAP: f64 = 120.0;
const MIN_BAND_GAP: f64 = 40.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RadialConfig {
    pub center_x: f64,
    pub center_y: f64,
    /// Radius band per tree depth; index 0 is the root ring.
    pub level_radii: Vec<f64>,
    /// Extra angular clearance between adjacent footprints, in layout units.
    pub padding: f64,
}

impl Default for RadialConfig {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            level_radii: vec![0.0, 140.0, 260.0, 360.0, 440.0],
            padding: 12.0,
        }
    }
}

impl RadialConfig {
    pub fn center(&self) -> Point {
        point(self.center_x, self.center_y)
    }

    /// Monotonically increasing step function of depth. Depths beyond the
    /// configured table extend by the last band gap.
    pub fn radius_for(&self, depth: u32) -> f64 {
        let d = depth as usize;
        if let Some(&r) = self.level_radii.get(d) {
            return r;
        }
        let len = self.level_radii.len();
        if len == 0 {
            return depth as f64 * DEFAULT_BAND_GAP;
        }
        let last = self.level_radii[len - 1];
        let gap = if len >= 2 {
            (self.level_radii[len - 1] - self.level_radii[len - 2]).max(MIN_BAND_GAP)
        } else {
            DEFAULT_BAND_GAP
        };
        last + gap * ((d - len + 1) as f64)
    }
}

/// Assigns every hierarchy node a polar coordinate around the configured
/// center. The root sits exactly at the center.
pub fn compute_radial_layout(hierarchy: &Hierarchy, config: &RadialConfig) -> LayoutResult {
    let n = hierarchy.len();
    let mut result = LayoutResult::default();
    if n == 0 {
        return result;
    }
    if n == 1 {
        let root = hierarchy.root();
        result.positions.insert(
            root.key.clone(),
            Placement {
                x: config.center_x,
                y: config.center_y,
                angle: 0.0,
                radius: 0.0,
                depth: 0,
                pinned: false,
            },
        );
        return result;
    }

    let mut leaves = Vec::new();
    collect_leaves(hierarchy, 0, &mut leaves);

    // Adjacent leaves on the ring are separated by the larger of the
    // structural minimum (two units under a shared parent, one unit across
    // parents, normalized by depth) and the angular span their footprints
    // need at the tighter of the two radii. Separations accumulate and the
    // whole ring normalizes to a full turn.
    let mut angles = vec![0.0f64; n];
    let mut raw = vec![0.0f64; leaves.len()];
    for i in 1..leaves.len() {
        raw[i] = raw[i - 1] + separation(hierarchy, config, leaves[i - 1], leaves[i]);
    }
    let wrap = separation(hierarchy, config, leaves[leaves.len() - 1], leaves[0]);
    let total = raw[leaves.len() - 1] + wrap;
    for (i, &leaf) in leaves.iter().enumerate() {
        angles[leaf] = if total > 0.0 { TAU * raw[i] / total } else { 0.0 };
    }

    settle_internal_angles(hierarchy, 0, &mut angles);

    for (idx, node) in hierarchy.nodes().iter().enumerate() {
        let radius = if idx == 0 {
            0.0
        } else {
            config.radius_for(node.level)
        };
        let angle = angles[idx];
        result.positions.insert(
            node.key.clone(),
            Placement {
                x: config.center_x + radius * angle.cos(),
                y: config.center_y + radius * angle.sin(),
                angle,
                radius,
                depth: node.level,
                pinned: false,
            },
        );
    }
    result
}

fn collect_leaves(hierarchy: &Hierarchy, idx: usize, out: &mut Vec<usize>) {
    let node = hierarchy.node_at(idx);
    if node.children.is_empty() {
        out.push(idx);
        return;
    }
    for &child in &node.children {
        collect_leaves(hierarchy, child, out);
    }
}

fn separation(hierarchy: &Hierarchy, config: &RadialConfig, a: usize, b: usize) -> f64 {
    let na = hierarchy.node_at(a);
    let nb = hierarchy.node_at(b);
    let depth = na.level.max(nb.level).max(1) as f64;
    let structural = if na.parent == nb.parent { 2.0 } else { 1.0 } / depth;

    let wa = footprint(na.level, na.kind).width;
    let wb = footprint(nb.level, nb.kind).width;
    let ra = config.radius_for(na.level);
    let rb = config.radius_for(nb.level);
    let radius = ra.min(rb).max(1.0);
    let size_aware = ((wa + wb) / 2.0 + config.padding) / radius;

    structural.max(size_aware)
}

fn settle_internal_angles(hierarchy: &Hierarchy, idx: usize, angles: &mut [f64]) {
    let node = hierarchy.node_at(idx);
    if node.children.is_empty() {
        return;
    }
    for &child in &node.children {
        settle_internal_angles(hierarchy, child, angles);
    }
    let first = angles[node.children[0]];
    let last = angles[node.children[node.children.len() - 1]];
    angles[idx] = (first + last) / 2.0;
}
