//! Grid-by-level fallback layout.
//!
//! Used when hierarchy construction fails. Rows are ordered by level and
//! nodes by input position within a row, so a malformed dataset still gets
//! one finite, stable coordinate per rendered key.

use std::collections::BTreeMap;
use std::f64::consts::TAU;

use crate::footprint::footprint;
use crate::model::{GraphNode, LayoutResult, NodeKey, Placement, render_keys};
use crate::radial::RadialConfig;

/// Vertical space between grid rows.
const ROW_GAP: f64 = 48.0;

/// Lays every rendered key out on a level-keyed grid around the configured
/// center. Never fails and never consults parent links, which is what makes
/// it safe on cyclic input.
pub fn grid_fallback(nodes: &[GraphNode], config: &RadialConfig) -> LayoutResult {
    let mut rows: BTreeMap<u32, Vec<(usize, NodeKey)>> = BTreeMap::new();
    for (idx, key) in render_keys(nodes) {
        rows.entry(nodes[idx].level).or_default().push((idx, key));
    }

    let mut result = LayoutResult::default();
    let mut y = config.center_y;
    for (level, row) in rows {
        let mut row_height = 0.0f64;
        let mut total_width = 0.0;
        for (idx, _) in &row {
            let size = footprint(level, nodes[*idx].kind);
            row_height = row_height.max(size.height);
            total_width += size.width + config.padding;
        }
        total_width -= config.padding;

        let mut x = config.center_x - total_width / 2.0;
        for (idx, key) in row {
            let size = footprint(level, nodes[idx].kind);
            let px = x + size.width / 2.0;
            let dx = px - config.center_x;
            let dy = y - config.center_y;
            let mut angle = dy.atan2(dx);
            if angle < 0.0 {
                angle += TAU;
            }
            result.positions.insert(
                key,
                Placement {
                    x: px,
                    y,
                    angle,
                    radius: dx.hypot(dy),
                    depth: level,
                    pinned: false,
                },
            );
            x += size.width + config.padding;
        }
        y += row_height + ROW_GAP;
    }
    result
}
