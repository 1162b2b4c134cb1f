//! On-screen footprint model.
//!
//! Both the radial separation pass and the collision force size nodes through
//! this one pure function, so the two stages always agree on spacing.

use crate::geom::{Size, size};
use crate::model::{EntityKind, GraphNode};

const SIZE_ROOT: f64 = 96.0;
const SIZE_LEVEL_1: f64 = 72.0;
const SIZE_LEVEL_2: f64 = 56.0;
const SIZE_DEEP: f64 = 48.0;
const SIZE_DEEP_DOCUMENT: f64 = 40.0;

/// Square footprint for a node at `level` of entity `kind`.
pub fn footprint(level: u32, kind: EntityKind) -> Size {
    let side = match (level, kind) {
        (_, EntityKind::Root) | (0, _) => SIZE_ROOT,
        (1, _) => SIZE_LEVEL_1,
        (2, _) => SIZE_LEVEL_2,
        (_, EntityKind::Document) => SIZE_DEEP_DOCUMENT,
        _ => SIZE_DEEP,
    };
    size(side, side)
}

pub fn footprint_for(node: &GraphNode) -> Size {
    footprint(node.level, node.kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footprint_shrinks_with_depth() {
        let root = footprint(0, EntityKind::Root);
        let person = footprint(1, EntityKind::Person);
        let folder = footprint(2, EntityKind::Folder);
        let doc = footprint(3, EntityKind::Document);
        assert!(root.width > person.width);
        assert!(person.width > folder.width);
        assert!(folder.width > doc.width);
    }

    #[test]
    fn footprint_is_square_and_stable() {
        for level in 0..6 {
            for kind in [
                EntityKind::Person,
                EntityKind::Pet,
                EntityKind::Asset,
                EntityKind::Document,
                EntityKind::Folder,
                EntityKind::Root,
            ] {
                let a = footprint(level, kind);
                let b = footprint(level, kind);
                assert_eq!(a, b);
                assert_eq!(a.width, a.height);
            }
        }
    }

    #[test]
    fn root_kind_keeps_root_size_at_any_level() {
        assert_eq!(footprint(3, EntityKind::Root).width, SIZE_ROOT);
    }
}
