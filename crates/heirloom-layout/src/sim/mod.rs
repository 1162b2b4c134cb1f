//! Force refinement simulation.
//!
//! Takes the radial seed (or previous positions) and nudges nodes into a
//! balanced, overlap-free arrangement. One pass owns its `SimNode` state;
//! nothing here survives past the pass. Batch callers use [`Simulation::run`],
//! animation schedulers drive [`Simulation::step`] one tick at a time and read
//! positions back between ticks.

mod quadtree;

use std::f64::consts::TAU;

use rustc_hash::FxHashMap;
use tracing::warn;

use crate::footprint::footprint;
use crate::model::{EntityKind, GraphEdge, GraphNode, LayoutResult, NodeKey, Placement, render_keys};
use crate::radial::RadialConfig;

use quadtree::{Body, QuadTree, RepulsionParams};

const ALPHA_INITIAL: f64 = 1.0;
const THETA2: f64 = 0.81;
const MIN_REPULSION_DIST2: f64 = 1.0;
// Pull toward the level's radius band.
const RADIAL_STRENGTH: f64 = 0.12;
// Level-2 spring toward the parent-tracked point.
const RADIAL_TRACK_STRENGTH: f64 = 0.08;
// Deliberately weak so the radial and collision forces dominate.
const LINK_STRENGTH: f64 = 0.04;
const COLLISION_STRENGTH: f64 = 0.7;
const CHARGE_SCALE_ROOT: f64 = 0.3;
const CHARGE_SCALE_LEVEL_1: f64 = 0.6;
// Below this alpha the level-2 target angle freezes at its last value.
const ANGLE_TRACK_MIN_ALPHA: f64 = 0.25;
// Spiral placement for nodes missing from the seed map.
const PHYLLO_RADIUS: f64 = 24.0;
const GOLDEN_ANGLE: f64 = 2.399963229728653;
const CENTER_EPS: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub repulsion_strength: f64,
    pub link_distance: f64,
    /// Fraction of alpha lost per step.
    pub alpha_decay: f64,
    /// Fraction of velocity lost per step.
    pub velocity_decay: f64,
    pub max_iterations: usize,
    pub collision_padding: f64,
    /// Alpha below which the simulation settles.
    pub alpha_min: f64,
    pub random_seed: u64,
    /// Positions farther than this from the layout center are clamped and
    /// reported as divergence.
    pub divergence_bound: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            repulsion_strength: 320.0,
            link_distance: 90.0,
            alpha_decay: 0.0228,
            velocity_decay: 0.4,
            max_iterations: 300,
            collision_padding: 8.0,
            alpha_min: 0.001,
            random_seed: 1,
            divergence_bound: 5000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepResult {
    Running { alpha: f64 },
    Settled { iterations: usize },
}

/// Deterministic xorshift64* generator; only used to break exact ties, so
/// identical seeds give identical layouts.
#[derive(Debug, Clone)]
pub(crate) struct XorShift64Star {
    state: u64,
}

impl XorShift64Star {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    pub(crate) fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    pub(crate) fn next_f64_signed(&mut self) -> f64 {
        self.next_f64() * 2.0 - 1.0
    }
}

#[derive(Debug, Clone)]
struct SimNode {
    key: NodeKey,
    level: u32,
    half_w: f64,
    half_h: f64,
    charge: f64,
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    fixed: Option<(f64, f64)>,
    /// Parent sim index; only consulted for level-2 angle tracking.
    parent: Option<usize>,
    angle_offset: f64,
    target_angle: f64,
}

#[derive(Debug, Clone, Copy)]
struct SimEdge {
    a: usize,
    b: usize,
    /// Share of the spring displacement taken by endpoint `b`; the rest goes
    /// to `a`. Split by endpoint degree so hubs move less.
    bias: f64,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    nodes: Vec<SimNode>,
    edges: Vec<SimEdge>,
    /// Seed entries with no rendered node, passed through to the snapshot.
    carried: Vec<(NodeKey, Placement)>,
    config: SimulationConfig,
    radial: RadialConfig,
    alpha: f64,
    iterations: usize,
    settled: bool,
    clamps: usize,
    rng: XorShift64Star,
    deltas: Vec<(f64, f64)>,
    scratch: Vec<usize>,
    bodies: Vec<Body>,
}

impl Simulation {
    /// Seeds one pass. Nodes present in `seed` start from their seeded
    /// position and keep its depth; the rest land on a deterministic spiral
    /// around the center. A pin fixes the node's primary copy; root nodes are
    /// fixed at their seeded spot. Seed entries with no rendered node, the
    /// synthetic root in practice, carry through to the snapshot untouched.
    pub fn new(
        nodes: &[GraphNode],
        edges: &[GraphEdge],
        seed: &LayoutResult,
        config: &SimulationConfig,
        radial: &RadialConfig,
    ) -> Simulation {
        let by_id: FxHashMap<&str, &GraphNode> =
            nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        let keys = render_keys(nodes);

        let mut sim_nodes: Vec<SimNode> = Vec::with_capacity(keys.len());
        let mut index: FxHashMap<NodeKey, usize> = FxHashMap::default();
        index.reserve(keys.len() * 2);

        for (i, (node_idx, key)) in keys.iter().enumerate() {
            let node = &nodes[*node_idx];
            let seeded = seed.get(key);
            let level = seeded.map(|p| p.depth).unwrap_or(node.level);
            let (x, y, angle) = match seeded {
                Some(p) => (p.x, p.y, p.angle),
                None => {
                    let r = PHYLLO_RADIUS * (0.5 + i as f64).sqrt();
                    let a = i as f64 * GOLDEN_ANGLE;
                    (
                        radial.center_x + r * a.cos(),
                        radial.center_y + r * a.sin(),
                        a % TAU,
                    )
                }
            };
            let is_primary = match key {
                NodeKey::Node(_) => true,
                NodeKey::Shadow { parent, .. } => node.parent_ids.first() == Some(parent),
            };
            let fixed = match node.pinned {
                // A pin holds the primary copy only; shadow copies refine
                // freely around their own parent.
                Some(pin) if is_primary => Some((pin.x, pin.y)),
                _ if node.kind == EntityKind::Root => Some((x, y)),
                _ => None,
            };
            let half = footprint(level, node.kind);
            sim_nodes.push(SimNode {
                key: key.clone(),
                level,
                half_w: half.width / 2.0,
                half_h: half.height / 2.0,
                charge: config.repulsion_strength * charge_scale(level),
                x,
                y,
                vx: 0.0,
                vy: 0.0,
                fixed,
                parent: None,
                angle_offset: 0.0,
                target_angle: angle,
            });
            index.insert(key.clone(), i);
        }

        // Hierarchy slots with no rendered node, the synthetic root in
        // practice, are not simulated; their seed placements pass through.
        let carried: Vec<(NodeKey, Placement)> = seed
            .positions
            .iter()
            .filter(|(key, _)| !index.contains_key(*key))
            .map(|(key, p)| (key.clone(), *p))
            .collect();

        // Level-2 nodes remember their seeded angular offset from the parent
        // so they can follow it while the simulation is hot.
        for i in 0..sim_nodes.len() {
            if sim_nodes[i].level != 2 {
                continue;
            }
            let parent_id = match &sim_nodes[i].key {
                NodeKey::Shadow { parent, .. } => Some(parent.clone()),
                NodeKey::Node(id) => by_id
                    .get(id.as_str())
                    .and_then(|n| n.parent_ids.first().cloned()),
            };
            let Some(pid) = parent_id else {
                continue;
            };
            let parent_key = match by_id.get(pid.as_str()) {
                Some(p) if p.parent_ids.len() > 1 => {
                    NodeKey::shadow(pid.clone(), p.parent_ids[0].clone())
                }
                _ => NodeKey::node(pid),
            };
            let Some(&p) = index.get(&parent_key) else {
                continue;
            };
            sim_nodes[i].parent = Some(p);
            sim_nodes[i].angle_offset = sim_nodes[i].target_angle - sim_nodes[p].target_angle;
        }

        let mut sim_edges: Vec<(usize, usize)> = Vec::with_capacity(edges.len());
        let mut degree: Vec<f64> = vec![0.0; sim_nodes.len()];
        for e in edges {
            let Some(&a) = index.get(&e.source) else {
                continue;
            };
            let Some(&b) = index.get(&e.target) else {
                continue;
            };
            if a == b {
                continue;
            }
            degree[a] += 1.0;
            degree[b] += 1.0;
            sim_edges.push((a, b));
        }
        let sim_edges = sim_edges
            .into_iter()
            .map(|(a, b)| SimEdge {
                a,
                b,
                bias: degree[a] / (degree[a] + degree[b]),
            })
            .collect();

        Simulation {
            nodes: sim_nodes,
            edges: sim_edges,
            carried,
            config: config.clone(),
            radial: radial.clone(),
            alpha: ALPHA_INITIAL,
            iterations: 0,
            settled: false,
            clamps: 0,
            rng: XorShift64Star::new(config.random_seed),
            deltas: Vec::new(),
            scratch: Vec::new(),
            bodies: Vec::new(),
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// How many positions were clamped back inside the sanity bound so far.
    pub fn divergence_clamps(&self) -> usize {
        self.clamps
    }

    /// Advances one tick: decay alpha, apply forces, integrate. Returns
    /// `Settled` on the tick that crosses the alpha floor or iteration cap,
    /// and on every call after that.
    pub fn step(&mut self) -> StepResult {
        if self.settled {
            return StepResult::Settled {
                iterations: self.iterations,
            };
        }
        if self.nodes.is_empty() {
            self.settled = true;
            return StepResult::Settled { iterations: 0 };
        }

        self.alpha *= 1.0 - self.config.alpha_decay;
        self.apply_repulsion();
        self.apply_radial_targets();
        self.apply_collisions();
        self.apply_links();
        self.integrate();
        self.iterations += 1;

        if self.alpha < self.config.alpha_min || self.iterations >= self.config.max_iterations {
            self.settled = true;
            return StepResult::Settled {
                iterations: self.iterations,
            };
        }
        StepResult::Running { alpha: self.alpha }
    }

    /// Runs every remaining tick synchronously and returns the final map.
    pub fn run(&mut self) -> LayoutResult {
        while !self.settled {
            self.step();
        }
        self.snapshot()
    }

    /// Current positions with polar metadata relative to the layout center.
    /// Carried seed entries are included unchanged.
    pub fn snapshot(&self) -> LayoutResult {
        let cx = self.radial.center_x;
        let cy = self.radial.center_y;
        let mut result = LayoutResult::default();
        for (key, p) in &self.carried {
            result.positions.insert(key.clone(), *p);
        }
        for n in &self.nodes {
            let dx = n.x - cx;
            let dy = n.y - cy;
            let mut angle = dy.atan2(dx);
            if angle < 0.0 {
                angle += TAU;
            }
            result.positions.insert(
                n.key.clone(),
                Placement {
                    x: n.x,
                    y: n.y,
                    angle,
                    radius: dx.hypot(dy),
                    depth: n.level,
                    pinned: false,
                },
            );
        }
        result
    }

    fn apply_repulsion(&mut self) {
        self.bodies.clear();
        for n in &self.nodes {
            self.bodies.push(Body {
                x: n.x,
                y: n.y,
                strength: n.charge,
            });
        }
        let tree = QuadTree::build(&self.bodies);
        let params = RepulsionParams {
            theta2: THETA2,
            min_distance2: MIN_REPULSION_DIST2,
            alpha: self.alpha,
        };

        self.deltas.clear();
        self.deltas.resize(self.nodes.len(), (0.0, 0.0));
        for i in 0..self.nodes.len() {
            tree.accumulate_repulsion(
                &self.bodies,
                i,
                &params,
                &mut self.rng,
                &mut self.scratch,
                &mut self.deltas,
            );
        }
        for (n, (dx, dy)) in self.nodes.iter_mut().zip(&self.deltas) {
            n.vx += dx;
            n.vy += dy;
        }
    }

    fn apply_radial_targets(&mut self) {
        let cx = self.radial.center_x;
        let cy = self.radial.center_y;
        let track = self.alpha > ANGLE_TRACK_MIN_ALPHA;
        let angles: Vec<f64> = self
            .nodes
            .iter()
            .map(|n| (n.y - cy).atan2(n.x - cx))
            .collect();

        for i in 0..self.nodes.len() {
            let band = self.radial.radius_for(self.nodes[i].level);
            let parent = self.nodes[i].parent;
            if self.nodes[i].level == 2 && parent.is_some() {
                if track {
                    if let Some(p) = parent {
                        self.nodes[i].target_angle = angles[p] + self.nodes[i].angle_offset;
                    }
                }
                let ta = self.nodes[i].target_angle;
                let tx = cx + band * ta.cos();
                let ty = cy + band * ta.sin();
                let n = &mut self.nodes[i];
                n.vx += (tx - n.x) * RADIAL_TRACK_STRENGTH * self.alpha;
                n.vy += (ty - n.y) * RADIAL_TRACK_STRENGTH * self.alpha;
            } else {
                let n = &mut self.nodes[i];
                let mut dx = n.x - cx;
                let mut dy = n.y - cy;
                let mut r = dx.hypot(dy);
                if r < CENTER_EPS {
                    dx = CENTER_EPS;
                    dy = 0.0;
                    r = CENTER_EPS;
                }
                let k = (band - r) * RADIAL_STRENGTH * self.alpha / r;
                n.vx += dx * k;
                n.vy += dy * k;
            }
        }
    }

    fn apply_collisions(&mut self) {
        let pad = self.config.collision_padding;
        let alpha = self.alpha;
        self.deltas.clear();
        self.deltas.resize(self.nodes.len(), (0.0, 0.0));

        for i in 0..self.nodes.len() {
            for j in (i + 1)..self.nodes.len() {
                let a = &self.nodes[i];
                let b = &self.nodes[j];
                let need_x = a.half_w + b.half_w + pad;
                let need_y = a.half_h + b.half_h + pad;
                let dx = b.x - a.x;
                let dy = b.y - a.y;
                let overlap_x = need_x - dx.abs();
                if overlap_x <= 0.0 {
                    continue;
                }
                let overlap_y = need_y - dy.abs();
                if overlap_y <= 0.0 {
                    continue;
                }

                let a_fixed = a.fixed.is_some();
                let b_fixed = b.fixed.is_some();
                // Separate along the axis with the smaller overlap.
                if overlap_x <= overlap_y {
                    let dir = direction(dx, &mut self.rng);
                    let push = overlap_x * COLLISION_STRENGTH * alpha;
                    split_push(&mut self.deltas, i, j, a_fixed, b_fixed, dir * push, 0.0);
                } else {
                    let dir = direction(dy, &mut self.rng);
                    let push = overlap_y * COLLISION_STRENGTH * alpha;
                    split_push(&mut self.deltas, i, j, a_fixed, b_fixed, 0.0, dir * push);
                }
            }
        }

        for (n, (dx, dy)) in self.nodes.iter_mut().zip(&self.deltas) {
            n.vx += dx;
            n.vy += dy;
        }
    }

    fn apply_links(&mut self) {
        for idx in 0..self.edges.len() {
            let SimEdge { a, b, bias } = self.edges[idx];
            let (ax, ay, avx, avy) = {
                let n = &self.nodes[a];
                (n.x, n.y, n.vx, n.vy)
            };
            let (bx, by, bvx, bvy) = {
                let n = &self.nodes[b];
                (n.x, n.y, n.vx, n.vy)
            };
            let mut dx = (bx + bvx) - (ax + avx);
            let mut dy = (by + bvy) - (ay + avy);
            let mut d = dx.hypot(dy);
            if d < CENTER_EPS {
                dx = self.rng.next_f64_signed() * CENTER_EPS;
                dy = self.rng.next_f64_signed() * CENTER_EPS;
                d = dx.hypot(dy).max(CENTER_EPS);
            }
            let l = (d - self.config.link_distance) / d * self.alpha * LINK_STRENGTH;
            let fx = dx * l;
            let fy = dy * l;
            {
                let n = &mut self.nodes[b];
                n.vx -= fx * bias;
                n.vy -= fy * bias;
            }
            {
                let n = &mut self.nodes[a];
                n.vx += fx * (1.0 - bias);
                n.vy += fy * (1.0 - bias);
            }
        }
    }

    fn integrate(&mut self) {
        let retain = 1.0 - self.config.velocity_decay;
        let cx = self.radial.center_x;
        let cy = self.radial.center_y;
        let bound = self.config.divergence_bound;

        for n in &mut self.nodes {
            if let Some((fx, fy)) = n.fixed {
                n.x = fx;
                n.y = fy;
                n.vx = 0.0;
                n.vy = 0.0;
                continue;
            }
            n.vx *= retain;
            n.vy *= retain;
            n.x += n.vx;
            n.y += n.vy;

            let finite = n.x.is_finite() && n.y.is_finite();
            let dx = n.x - cx;
            let dy = n.y - cy;
            let r = dx.hypot(dy);
            if !finite || r > bound {
                if self.clamps == 0 {
                    warn!(node = %n.key, "position diverged beyond sanity bound; clamping");
                }
                self.clamps += 1;
                if finite && r > 0.0 {
                    let scale = bound / r;
                    n.x = cx + dx * scale;
                    n.y = cy + dy * scale;
                } else {
                    n.x = cx;
                    n.y = cy;
                }
                n.vx = 0.0;
                n.vy = 0.0;
            }
        }
    }
}

fn charge_scale(level: u32) -> f64 {
    match level {
        0 => CHARGE_SCALE_ROOT,
        1 => CHARGE_SCALE_LEVEL_1,
        _ => 1.0,
    }
}

fn direction(delta: f64, rng: &mut XorShift64Star) -> f64 {
    if delta > 0.0 {
        1.0
    } else if delta < 0.0 {
        -1.0
    } else if rng.next_f64() < 0.5 {
        1.0
    } else {
        -1.0
    }
}

/// Writes one separating push into the delta slots, giving the whole of it to
/// the free endpoint when the other is fixed.
fn split_push(
    deltas: &mut [(f64, f64)],
    i: usize,
    j: usize,
    a_fixed: bool,
    b_fixed: bool,
    px: f64,
    py: f64,
) {
    match (a_fixed, b_fixed) {
        (false, false) => {
            deltas[i].0 -= px / 2.0;
            deltas[i].1 -= py / 2.0;
            deltas[j].0 += px / 2.0;
            deltas[j].1 += py / 2.0;
        }
        (true, false) => {
            deltas[j].0 += px;
            deltas[j].1 += py;
        }
        (false, true) => {
            deltas[i].0 -= px;
            deltas[i].1 -= py;
        }
        (true, true) => {}
    }
}

/// Batch entry point: seeds a simulation and runs it to completion.
pub fn run_force_simulation(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    seed: &LayoutResult,
    config: &SimulationConfig,
    radial: &RadialConfig,
) -> LayoutResult {
    let mut sim = Simulation::new(nodes, edges, seed, config, radial);
    sim.run()
}
