//! Node/edge dataset model shared by every layout stage.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::geom::{Point, point};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Person,
    Pet,
    Asset,
    #[default]
    Document,
    Folder,
    Root,
}

/// User-dragged fixed position, carried on the caller's dataset across passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub x: f64,
    pub y: f64,
}

impl Pin {
    pub fn to_point(self) -> Point {
        point(self.x, self.y)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub kind: EntityKind,
    /// Depth in the dataset's own numbering; top-level nodes sit at 0 until a
    /// synthetic root shifts everything down by one.
    pub level: u32,
    /// Ordered parent references. More than one entry marks a "shared" node,
    /// which materializes as one shadow copy per parent.
    pub parent_ids: Vec<String>,
    pub pinned: Option<Pin>,
}

/// Identity of a rendered node.
///
/// A node with a single parent renders once (`Node`); a node with N parents
/// renders N times, one `Shadow` per parent, so the hierarchy stays a strict
/// tree. The string encoding used at the JSON boundary is `"id"` for plain
/// nodes and `"id@parent"` for shadows; `@` is reserved for that encoding and
/// must not appear in dataset ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKey {
    Node(String),
    Shadow { original: String, parent: String },
}

impl NodeKey {
    pub fn node(id: impl Into<String>) -> Self {
        NodeKey::Node(id.into())
    }

    pub fn shadow(original: impl Into<String>, parent: impl Into<String>) -> Self {
        NodeKey::Shadow {
            original: original.into(),
            parent: parent.into(),
        }
    }

    /// The dataset id behind this key, ignoring which copy it is.
    pub fn original_id(&self) -> &str {
        match self {
            NodeKey::Node(id) => id,
            NodeKey::Shadow { original, .. } => original,
        }
    }

    pub fn is_shadow(&self) -> bool {
        matches!(self, NodeKey::Shadow { .. })
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Node(id) => write!(f, "{id}"),
            NodeKey::Shadow { original, parent } => write!(f, "{original}@{parent}"),
        }
    }
}

impl From<&str> for NodeKey {
    fn from(value: &str) -> Self {
        match value.split_once('@') {
            Some((original, parent)) => NodeKey::Shadow {
                original: original.to_string(),
                parent: parent.to_string(),
            },
            None => NodeKey::Node(value.to_string()),
        }
    }
}

impl Serialize for NodeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(NodeKey::from(s.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: NodeKey,
    pub target: NodeKey,
}

impl GraphEdge {
    pub fn new(source: NodeKey, target: NodeKey) -> Self {
        let id = format!("{source}->{target}");
        Self { id, source, target }
    }
}

/// One placed node: final cartesian position plus the polar metadata the
/// rendering layer uses for transition continuity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    pub radius: f64,
    pub depth: u32,
    pub pinned: bool,
}

impl Placement {
    pub fn point(&self) -> Point {
        point(self.x, self.y)
    }
}

/// Position map produced by one layout pass. Immutable once returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    pub positions: BTreeMap<NodeKey, Placement>,
}

impl LayoutResult {
    pub fn get(&self, key: &NodeKey) -> Option<&Placement> {
        self.positions.get(key)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Set of expanded node keys driving progressive disclosure.
///
/// The root and first-level nodes are visible no matter what this set holds;
/// deeper nodes require every ancestor below the root to be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpansionState {
    expanded: BTreeSet<NodeKey>,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expand(&mut self, key: NodeKey) {
        self.expanded.insert(key);
    }

    /// Convenience for the common non-shadow case.
    pub fn expand_id(&mut self, id: impl Into<String>) {
        self.expanded.insert(NodeKey::Node(id.into()));
    }

    pub fn remove(&mut self, key: &NodeKey) -> bool {
        self.expanded.remove(key)
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.expanded.contains(key)
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeKey> {
        self.expanded.iter()
    }
}

/// Derives the 1:1 parent edges of the dataset: one edge per `parent_ids`
/// entry, targeting the shadow copy when the child is shared. Edge sources
/// pointing at a shared parent resolve to that parent's primary copy so
/// endpoints always name materialized keys.
pub fn derive_edges(nodes: &[GraphNode]) -> Vec<GraphEdge> {
    let by_id: FxHashMap<&str, &GraphNode> =
        nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let resolve = |id: &str| -> NodeKey {
        match by_id.get(id) {
            Some(n) if n.parent_ids.len() > 1 => NodeKey::shadow(id, n.parent_ids[0].clone()),
            _ => NodeKey::node(id),
        }
    };

    let mut edges = Vec::new();
    for node in nodes {
        if node.parent_ids.len() > 1 {
            for parent in &node.parent_ids {
                edges.push(GraphEdge::new(
                    resolve(parent),
                    NodeKey::shadow(node.id.clone(), parent.clone()),
                ));
            }
        } else if let Some(parent) = node.parent_ids.first() {
            edges.push(GraphEdge::new(resolve(parent), NodeKey::node(node.id.clone())));
        }
    }
    edges
}

/// Expands the dataset into rendered keys, in input order: one `Node` key per
/// single-parent node, one `Shadow` key per parent of a shared node. Returns
/// `(dataset index, key)` pairs.
pub fn render_keys(nodes: &[GraphNode]) -> Vec<(usize, NodeKey)> {
    let mut keys = Vec::with_capacity(nodes.len());
    for (idx, node) in nodes.iter().enumerate() {
        if node.parent_ids.len() > 1 {
            for parent in &node.parent_ids {
                keys.push((idx, NodeKey::shadow(node.id.clone(), parent.clone())));
            }
        } else {
            keys.push((idx, NodeKey::node(node.id.clone())));
        }
    }
    keys
}

/// The key under which a node's single authoritative copy lives: the plain
/// key for ordinary nodes, the first-parent shadow for shared ones.
pub fn primary_key(node: &GraphNode) -> NodeKey {
    if node.parent_ids.len() > 1 {
        NodeKey::shadow(node.id.clone(), node.parent_ids[0].clone())
    } else {
        NodeKey::node(node.id.clone())
    }
}
