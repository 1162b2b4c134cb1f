//! Hierarchy construction: flat node/edge lists in, single-rooted tree out.
//!
//! The radial layout requires exactly one root, so a dataset without a
//! designated root gets a synthetic one injected and every other node shifted
//! one level down. Shared (multi-parent) nodes materialize as one shadow copy
//! per parent so the result stays a strict tree.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::{EntityKind, GraphEdge, GraphNode, NodeKey, Pin, render_keys};

/// Id given to the injected root when the dataset has none. If the dataset
/// already uses this id, tildes are appended until the id is free.
pub const SYNTHETIC_ROOT_ID: &str = "virtual-root";

/// A dangling parent reference that was resolved by promoting the node to the
/// root level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    pub node: NodeKey,
    pub missing_parent: NodeKey,
}

#[derive(Debug, Clone)]
pub struct HierarchyNode {
    pub key: NodeKey,
    pub kind: EntityKind,
    /// Tree depth; 0 is the root. Equals the dataset's `level` field for
    /// consistent input (shifted by one when a synthetic root was injected).
    pub level: u32,
    pub pinned: Option<Pin>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Hierarchy {
    nodes: Vec<HierarchyNode>,
    index: FxHashMap<NodeKey, usize>,
    promotions: Vec<Promotion>,
    synthetic_root: bool,
}

impl Hierarchy {
    pub fn root(&self) -> &HierarchyNode {
        &self.nodes[0]
    }

    pub fn nodes(&self) -> &[HierarchyNode] {
        &self.nodes
    }

    pub fn node_at(&self, idx: usize) -> &HierarchyNode {
        &self.nodes[idx]
    }

    pub fn get(&self, key: &NodeKey) -> Option<&HierarchyNode> {
        self.index.get(key).map(|&idx| &self.nodes[idx])
    }

    pub fn index_of(&self, key: &NodeKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn has_synthetic_root(&self) -> bool {
        self.synthetic_root
    }

    /// Dangling-parent promotions recorded during the build, in input order.
    pub fn promotions(&self) -> &[Promotion] {
        &self.promotions
    }

    /// Indices of every node strictly below `idx`, depth-first.
    pub fn descendant_indices(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[idx].children.clone();
        while let Some(cur) = stack.pop() {
            out.push(cur);
            stack.extend_from_slice(&self.nodes[cur].children);
        }
        out
    }
}

/// Builds the single-rooted tree for one layout pass.
///
/// Fails with [`Error::EmptyGraph`] on an empty node list and
/// [`Error::CyclicHierarchy`] when a parent chain does not terminate within
/// `node_count` steps; dangling parent references are not errors and resolve
/// as promotion to the root level.
pub fn build_hierarchy(nodes: &[GraphNode], edges: &[GraphEdge]) -> Result<Hierarchy> {
    if nodes.is_empty() {
        return Err(Error::EmptyGraph);
    }

    let by_id: FxHashMap<&str, &GraphNode> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let designated_root = nodes.iter().position(|n| n.kind == EntityKind::Root);
    let synthetic = designated_root.is_none();

    let root_key = match designated_root {
        Some(idx) => NodeKey::node(nodes[idx].id.clone()),
        None => {
            let mut id = SYNTHETIC_ROOT_ID.to_string();
            while by_id.contains_key(id.as_str()) {
                id.push('~');
            }
            NodeKey::Node(id)
        }
    };

    // Slot 0 is the root; remaining rendered keys follow in input order.
    let mut slots: Vec<(NodeKey, Option<usize>)> = Vec::with_capacity(nodes.len() + 1);
    slots.push((root_key.clone(), designated_root));
    for (node_idx, key) in render_keys(nodes) {
        if key != root_key {
            slots.push((key, Some(node_idx)));
        }
    }

    let mut index: FxHashMap<NodeKey, usize> = FxHashMap::default();
    index.reserve(slots.len() * 2);
    for (slot, (key, _)) in slots.iter().enumerate() {
        index.insert(key.clone(), slot);
    }

    let mut parent_of: FxHashMap<&NodeKey, &NodeKey> = FxHashMap::default();
    parent_of.reserve(edges.len() * 2);
    for e in edges {
        parent_of.insert(&e.target, &e.source);
    }

    // A parent id that is itself shared resolves to its primary copy.
    let parent_key_for = |id: &str| -> NodeKey {
        match by_id.get(id) {
            Some(n) if n.parent_ids.len() > 1 => NodeKey::shadow(id, n.parent_ids[0].clone()),
            _ => NodeKey::node(id),
        }
    };

    let mut promotions: Vec<Promotion> = Vec::new();
    let mut parents: Vec<Option<usize>> = vec![None; slots.len()];
    for (slot, (key, _)) in slots.iter().enumerate().skip(1) {
        let mut promote = |wanted: NodeKey| {
            warn!(node = %key, missing = %wanted, "parent not found; promoting to root level");
            promotions.push(Promotion {
                node: key.clone(),
                missing_parent: wanted,
            });
        };
        let resolved = match parent_of.get(key) {
            Some(&src) => match index.get(src) {
                Some(&parent_slot) => Some(parent_slot),
                None => {
                    promote(src.clone());
                    None
                }
            },
            None => match key {
                // Shadow keys carry their parent even when the caller's edge
                // list omits the corresponding entry.
                NodeKey::Shadow { parent, .. } => {
                    let wanted = parent_key_for(parent);
                    match index.get(&wanted) {
                        Some(&parent_slot) => Some(parent_slot),
                        None => {
                            promote(wanted);
                            None
                        }
                    }
                }
                NodeKey::Node(_) => None,
            },
        };
        parents[slot] = Some(resolved.unwrap_or(0));
    }

    // Every parent chain must reach the root within `slot` count steps.
    for start in 1..slots.len() {
        let mut cur = start;
        let mut steps = 0usize;
        while let Some(parent_slot) = parents[cur] {
            steps += 1;
            if steps > slots.len() {
                return Err(Error::CyclicHierarchy {
                    node_id: slots[start].0.original_id().to_string(),
                });
            }
            cur = parent_slot;
        }
    }

    let mut arena: Vec<HierarchyNode> = slots
        .iter()
        .map(|(key, node_idx)| {
            let (kind, pinned) = match node_idx {
                Some(idx) => (nodes[*idx].kind, nodes[*idx].pinned),
                None => (EntityKind::Root, None),
            };
            HierarchyNode {
                key: key.clone(),
                kind,
                level: 0,
                pinned,
                parent: None,
                children: Vec::new(),
            }
        })
        .collect();
    for slot in 1..slots.len() {
        let parent_slot = parents[slot].unwrap_or(0);
        arena[slot].parent = Some(parent_slot);
        arena[parent_slot].children.push(slot);
    }

    let mut queue: VecDeque<usize> = VecDeque::new();
    queue.push_back(0);
    while let Some(cur) = queue.pop_front() {
        let level = arena[cur].level;
        let children = arena[cur].children.clone();
        for child in children {
            arena[child].level = level + 1;
            queue.push_back(child);
        }
    }

    Ok(Hierarchy {
        nodes: arena,
        index,
        promotions,
        synthetic_root: synthetic,
    })
}
