#![forbid(unsafe_code)]

//! Headless radial layout engine for family document/asset graphs.
//!
//! `heirloom-layout` turns a flat node/parent dataset into stable 2D
//! coordinates: hierarchy construction, radial coordinate assignment, force
//! refinement, expansion-driven visibility, pin reconciliation. It is
//! runtime-agnostic and knows nothing about rendering; callers feed it
//! [`GraphNode`]s and an [`ExpansionState`] and draw the returned
//! [`LayoutResult`] however they like.

pub mod engine;
pub mod error;
pub mod fallback;
pub mod footprint;
pub mod geom;
pub mod hierarchy;
pub mod model;
pub mod radial;
pub mod reconcile;
pub mod sim;
pub mod visibility;

pub use engine::{LayoutEngine, LayoutOptions};
pub use error::{Error, Result};
pub use fallback::grid_fallback;
pub use footprint::{footprint, footprint_for};
pub use geom::{Point, Rect, Size, Vector};
pub use hierarchy::{Hierarchy, HierarchyNode, Promotion, build_hierarchy};
pub use model::{
    EntityKind, ExpansionState, GraphEdge, GraphNode, LayoutResult, NodeKey, Pin, Placement,
    derive_edges, primary_key, render_keys,
};
pub use radial::{RadialConfig, compute_radial_layout};
pub use reconcile::reconcile_positions;
pub use sim::{Simulation, SimulationConfig, StepResult, run_force_simulation};
pub use visibility::{collapse, filter_visible};
