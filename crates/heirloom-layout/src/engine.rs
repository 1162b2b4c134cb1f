//! Layout engine orchestration.
//!
//! Composes the pipeline stages into one pass: derive edges, build the
//! hierarchy, seed with the radial layout, refine with the force simulation,
//! reconcile pins. The engine is a plain value; construct one per layout
//! surface and drop it when done. A pass either runs to completion inside
//! [`LayoutEngine::compute`] or is driven tick by tick through
//! [`LayoutEngine::begin_animated`] and [`LayoutEngine::step`].

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::fallback::grid_fallback;
use crate::geom::Point;
use crate::hierarchy::build_hierarchy;
use crate::model::{GraphNode, LayoutResult, NodeKey, derive_edges, primary_key};
use crate::radial::{RadialConfig, compute_radial_layout};
use crate::reconcile::reconcile_positions;
use crate::sim::{Simulation, SimulationConfig, StepResult};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutOptions {
    pub radial: RadialConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug)]
enum PassBody {
    Sim(Simulation),
    /// Fallback or empty-dataset pass; already final, settles on first tick.
    Static(LayoutResult),
}

#[derive(Debug)]
struct ActivePass {
    body: PassBody,
    pins: BTreeMap<NodeKey, Point>,
}

/// One layout surface. Holds no state between passes except its options and
/// the last pass's divergence diagnostics.
#[derive(Debug, Default)]
pub struct LayoutEngine {
    options: LayoutOptions,
    active: Option<ActivePass>,
    last_divergence_clamps: usize,
}

impl LayoutEngine {
    pub fn new(options: LayoutOptions) -> Self {
        Self {
            options,
            active: None,
            last_divergence_clamps: 0,
        }
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn is_pass_active(&self) -> bool {
        self.active.is_some()
    }

    /// Positions clamped back inside the sanity bound during the last
    /// completed pass.
    pub fn last_divergence_clamps(&self) -> usize {
        self.last_divergence_clamps
    }

    /// Runs one batch pass to completion.
    ///
    /// An empty dataset yields an empty result; a dataset whose hierarchy
    /// cannot be built falls back to the level grid. The only error is
    /// [`Error::PassInFlight`], raised while an animated pass is still
    /// active.
    pub fn compute(&mut self, nodes: &[GraphNode]) -> Result<LayoutResult> {
        if self.active.is_some() {
            return Err(Error::PassInFlight);
        }
        if nodes.is_empty() {
            self.last_divergence_clamps = 0;
            return Ok(LayoutResult::default());
        }
        debug!(nodes = nodes.len(), "batch layout pass");

        let pins = collect_pins(nodes);
        let edges = derive_edges(nodes);
        let refined = match build_hierarchy(nodes, &edges) {
            Ok(hierarchy) => {
                let seed = compute_radial_layout(&hierarchy, &self.options.radial);
                let mut sim = Simulation::new(
                    nodes,
                    &edges,
                    &seed,
                    &self.options.simulation,
                    &self.options.radial,
                );
                let result = sim.run();
                self.last_divergence_clamps = sim.divergence_clamps();
                result
            }
            Err(err) => {
                warn!(%err, "hierarchy construction failed; using grid fallback");
                self.last_divergence_clamps = 0;
                grid_fallback(nodes, &self.options.radial)
            }
        };
        Ok(reconcile_positions(refined, &pins))
    }

    /// Starts an animated pass; the caller's scheduler then drives
    /// [`LayoutEngine::step`] and reads frames via [`LayoutEngine::snapshot`].
    ///
    /// A dataset the primary pipeline cannot handle still starts a pass, with
    /// the fallback result as its single immediately-settled frame.
    pub fn begin_animated(&mut self, nodes: &[GraphNode]) -> Result<()> {
        if self.active.is_some() {
            return Err(Error::PassInFlight);
        }
        debug!(nodes = nodes.len(), "animated layout pass");

        let pins = collect_pins(nodes);
        let body = if nodes.is_empty() {
            PassBody::Static(LayoutResult::default())
        } else {
            let edges = derive_edges(nodes);
            match build_hierarchy(nodes, &edges) {
                Ok(hierarchy) => {
                    let seed = compute_radial_layout(&hierarchy, &self.options.radial);
                    PassBody::Sim(Simulation::new(
                        nodes,
                        &edges,
                        &seed,
                        &self.options.simulation,
                        &self.options.radial,
                    ))
                }
                Err(err) => {
                    warn!(%err, "hierarchy construction failed; using grid fallback");
                    PassBody::Static(grid_fallback(nodes, &self.options.radial))
                }
            }
        };
        self.active = Some(ActivePass { body, pins });
        Ok(())
    }

    /// Advances the active pass one tick, or returns `None` when no pass is
    /// active. A settled pass stays queryable until [`LayoutEngine::finish`]
    /// or [`LayoutEngine::cancel`].
    pub fn step(&mut self) -> Option<StepResult> {
        let pass = self.active.as_mut()?;
        Some(match &mut pass.body {
            PassBody::Sim(sim) => sim.step(),
            PassBody::Static(_) => StepResult::Settled { iterations: 0 },
        })
    }

    /// Current frame of the active pass, pins applied.
    pub fn snapshot(&self) -> Option<LayoutResult> {
        let pass = self.active.as_ref()?;
        let raw = match &pass.body {
            PassBody::Sim(sim) => sim.snapshot(),
            PassBody::Static(result) => result.clone(),
        };
        Some(reconcile_positions(raw, &pass.pins))
    }

    /// Ends the active pass and returns its reconciled result.
    pub fn finish(&mut self) -> Option<LayoutResult> {
        let pass = self.active.take()?;
        let raw = match pass.body {
            PassBody::Sim(sim) => {
                self.last_divergence_clamps = sim.divergence_clamps();
                sim.snapshot()
            }
            PassBody::Static(result) => {
                self.last_divergence_clamps = 0;
                result
            }
        };
        Some(reconcile_positions(raw, &pass.pins))
    }

    /// Stops an animated pass immediately and discards its simulation state.
    pub fn cancel(&mut self) {
        self.active = None;
    }
}

fn collect_pins(nodes: &[GraphNode]) -> BTreeMap<NodeKey, Point> {
    nodes
        .iter()
        .filter_map(|n| n.pinned.map(|pin| (primary_key(n), pin.to_point())))
        .collect()
}
