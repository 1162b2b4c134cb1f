//! Barnes–Hut quadtree for the repulsion force.
//!
//! Bulk-built per step from the current body positions. Cells store a
//! strength-weighted center so far groups collapse into one interaction; the
//! traversal is an explicit stack walk that only writes into the caller's
//! force-delta slots, never into body state.

use super::XorShift64Star;

const MIN_HALF: f64 = 1e-6;
const COINCIDENT_DIST2: f64 = 1e-12;
const JIGGLE_SCALE: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Body {
    pub x: f64,
    pub y: f64,
    pub strength: f64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RepulsionParams {
    /// Squared accuracy criterion; a cell of width `w` at distance `d` is
    /// treated as one body when `w^2 < theta2 * d^2`.
    pub theta2: f64,
    /// Squared distance floor, limiting the force between near-coincident
    /// bodies.
    pub min_distance2: f64,
    pub alpha: f64,
}

#[derive(Debug, Clone)]
struct Cell {
    half: f64,
    strength: f64,
    com_x: f64,
    com_y: f64,
    children: [Option<usize>; 4],
    /// Body indices, populated on leaves only.
    bodies: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct QuadTree {
    cells: Vec<Cell>,
    root: Option<usize>,
}

impl QuadTree {
    pub(crate) fn build(bodies: &[Body]) -> QuadTree {
        if bodies.is_empty() {
            return QuadTree::default();
        }
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for b in bodies {
            min_x = min_x.min(b.x);
            min_y = min_y.min(b.y);
            max_x = max_x.max(b.x);
            max_y = max_y.max(b.y);
        }
        let cx = (min_x + max_x) / 2.0;
        let cy = (min_y + max_y) / 2.0;
        let half = ((max_x - min_x).max(max_y - min_y) / 2.0).max(1.0);

        let mut cells = Vec::with_capacity(bodies.len() * 2);
        let idxs: Vec<usize> = (0..bodies.len()).collect();
        let root = build_cell(bodies, idxs, cx, cy, half, &mut cells);
        QuadTree { cells, root }
    }

    /// Adds the repulsion acting on `target` into `out[target]`. `scratch` is
    /// the traversal stack, cleared here and reused across calls.
    pub(crate) fn accumulate_repulsion(
        &self,
        bodies: &[Body],
        target: usize,
        params: &RepulsionParams,
        rng: &mut XorShift64Star,
        scratch: &mut Vec<usize>,
        out: &mut [(f64, f64)],
    ) {
        let Some(root) = self.root else {
            return;
        };
        let bx = bodies[target].x;
        let by = bodies[target].y;
        let mut fx = 0.0f64;
        let mut fy = 0.0f64;

        scratch.clear();
        scratch.push(root);
        while let Some(cell_idx) = scratch.pop() {
            let cell = &self.cells[cell_idx];
            if cell.strength <= 0.0 {
                continue;
            }
            let dx = bx - cell.com_x;
            let dy = by - cell.com_y;
            let dist2 = dx * dx + dy * dy;
            let width = cell.half * 2.0;

            if width * width < params.theta2 * dist2 {
                let (px, py) = push_away(dx, dy, cell.strength, params, rng);
                fx += px;
                fy += py;
                continue;
            }

            if cell.bodies.is_empty() {
                for child in cell.children.iter().flatten() {
                    scratch.push(*child);
                }
            } else {
                for &j in &cell.bodies {
                    if j == target {
                        continue;
                    }
                    let (px, py) = push_away(
                        bx - bodies[j].x,
                        by - bodies[j].y,
                        bodies[j].strength,
                        params,
                        rng,
                    );
                    fx += px;
                    fy += py;
                }
            }
        }

        out[target].0 += fx;
        out[target].1 += fy;
    }
}

/// Inverse-square push along `(dx, dy)` away from a source of the given
/// strength. Exactly coincident positions are jiggled so the direction is
/// defined.
fn push_away(
    dx: f64,
    dy: f64,
    strength: f64,
    params: &RepulsionParams,
    rng: &mut XorShift64Star,
) -> (f64, f64) {
    let (mut dx, mut dy) = (dx, dy);
    let mut dist2 = dx * dx + dy * dy;
    if dist2 < COINCIDENT_DIST2 {
        dx = rng.next_f64_signed() * JIGGLE_SCALE;
        dy = rng.next_f64_signed() * JIGGLE_SCALE;
        dist2 = dx * dx + dy * dy;
        if dist2 <= 0.0 {
            return (0.0, 0.0);
        }
    }
    let clamped = dist2.max(params.min_distance2);
    let scale = strength * params.alpha / (clamped * clamped.sqrt());
    (dx * scale, dy * scale)
}

fn build_cell(
    bodies: &[Body],
    idxs: Vec<usize>,
    cx: f64,
    cy: f64,
    half: f64,
    cells: &mut Vec<Cell>,
) -> Option<usize> {
    if idxs.is_empty() {
        return None;
    }
    let slot = cells.len();
    cells.push(Cell {
        half,
        strength: 0.0,
        com_x: cx,
        com_y: cy,
        children: [None; 4],
        bodies: Vec::new(),
    });

    if idxs.len() == 1 || half <= MIN_HALF {
        let mut s = 0.0;
        let mut sx = 0.0;
        let mut sy = 0.0;
        for &i in &idxs {
            s += bodies[i].strength;
            sx += bodies[i].x * bodies[i].strength;
            sy += bodies[i].y * bodies[i].strength;
        }
        if s > 0.0 {
            cells[slot].com_x = sx / s;
            cells[slot].com_y = sy / s;
        }
        cells[slot].strength = s;
        cells[slot].bodies = idxs;
        return Some(slot);
    }

    let mut quads: [Vec<usize>; 4] = [Vec::new(), Vec::new(), Vec::new(), Vec::new()];
    for &i in &idxs {
        let right = bodies[i].x >= cx;
        let bottom = bodies[i].y >= cy;
        quads[(bottom as usize) * 2 + (right as usize)].push(i);
    }

    let h2 = half / 2.0;
    let offsets = [(-h2, -h2), (h2, -h2), (-h2, h2), (h2, h2)];
    for (q, (ox, oy)) in offsets.iter().enumerate() {
        let child_idxs = std::mem::take(&mut quads[q]);
        let child = build_cell(bodies, child_idxs, cx + ox, cy + oy, h2, cells);
        cells[slot].children[q] = child;
    }

    let mut s = 0.0;
    let mut sx = 0.0;
    let mut sy = 0.0;
    for q in 0..4 {
        if let Some(child) = cells[slot].children[q] {
            let cs = cells[child].strength;
            s += cs;
            sx += cells[child].com_x * cs;
            sy += cells[child].com_y * cs;
        }
    }
    if s > 0.0 {
        cells[slot].com_x = sx / s;
        cells[slot].com_y = sy / s;
    }
    cells[slot].strength = s;
    Some(slot)
}
