//! Pinned-position reconciliation.
//!
//! The boundary between the layout engine and the interaction layer: whatever
//! the pass computed, a coordinate the user dragged into place wins.

use std::collections::BTreeMap;

use crate::geom::Point;
use crate::model::{LayoutResult, NodeKey, Placement};

/// Overwrites computed coordinates with user-pinned ones.
///
/// Pinned entries keep the pass's angle/radius/depth metadata so transition
/// animation stays continuous, but their `pinned` flag is set so the next
/// pass seeds them as fixed instead of sweeping them back into the auto
/// layout. A pin for a key the pass never produced is inserted with bare
/// coordinates.
pub fn reconcile_positions(
    mut layout: LayoutResult,
    pinned: &BTreeMap<NodeKey, Point>,
) -> LayoutResult {
    for (key, point) in pinned {
        match layout.positions.get_mut(key) {
            Some(placement) => {
                placement.x = point.x;
                placement.y = point.y;
                placement.pinned = true;
            }
            None => {
                layout.positions.insert(
                    key.clone(),
                    Placement {
                        x: point.x,
                        y: point.y,
                        pinned: true,
                        ..Placement::default()
                    },
                );
            }
        }
    }
    layout
}
