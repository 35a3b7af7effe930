//! Uniform grid over the bounding box of a point set.
//!
//! Space is cut into axis-aligned cells of side slightly above `eps`, so any
//! two points within `eps` of each other sit in the same cell or in cells whose
//! integer coordinates differ by at most one along every axis. A query scans
//! the point's own cell plus those adjacent cells and filters candidates by
//! exact distance.
//!
//! Only non-empty cells are materialized. Points are stored grouped by cell in
//! CSR form (`cell_offsets` / `point_ids`), and every cell carries a
//! precomputed list of adjacent non-empty cells. Adjacency is found either by
//! probing all `3^dim` neighbor keys in a hash map or by scanning every
//! non-empty cell, whichever touches fewer cells; the second keeps high
//! dimensions from exploding.
//!
//! Build is `O(n log n)` for the sort and otherwise linear, with every stage
//! running on the rayon pool. Query cost is proportional to the number of
//! points in adjacent cells, not to `n`.

use std::collections::HashMap;
use std::ops::ControlFlow;

use rayon::prelude::*;
use tracing::{debug, enabled, Level};

use super::index::NeighborIndex;
use super::points::Points;
use super::util::squared_euclidean;
use crate::error::{Error, Result};

/// Relative slack added to the cell side so rounding in the cell-coordinate
/// division can never separate two points that are within `eps`.
const CELL_SLACK: f64 = 1e-6;

/// Largest span, in cells, along any axis.
///
/// The subtraction and division that produce a key each round by up to
/// `span_cells * 2^-53` cells, so two keys can drift apart by about
/// `4 * span_cells * 2^-53`. Below `2^30` cells that stays under `2^-21`,
/// inside `CELL_SLACK`, and points within `eps` never land two cells apart.
const MAX_SPAN_CELLS: f64 = (1u64 << 30) as f64;

/// How adjacent cells were discovered during build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdjacencyStrategy {
    /// Probe all `3^dim` neighbor keys.
    Probe,
    /// Compare against every non-empty cell.
    Scan,
}

/// Grid index for fixed-radius neighbor queries.
#[derive(Debug, Clone)]
pub struct Grid<'a> {
    points: Points<'a>,
    eps: f64,
    eps_sq: f64,
    /// Cell index of each point.
    point_cell: Vec<usize>,
    /// Start of each cell's run in `point_ids`, plus a final end marker.
    cell_offsets: Vec<usize>,
    /// Point ids grouped by cell, ascending within a cell.
    point_ids: Vec<usize>,
    /// CSR offsets into `adjacent`.
    adjacent_offsets: Vec<usize>,
    /// Adjacent non-empty cells of each cell, itself included.
    adjacent: Vec<usize>,
}

impl<'a> Grid<'a> {
    /// Build a grid over `points` for queries at radius `eps`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] if `eps` is not a positive finite number, or
    /// if the bounding box spans too many cells to address.
    pub fn build(points: Points<'a>, eps: f64) -> Result<Self> {
        if !(eps > 0.0 && eps.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "eps",
                message: "must be positive and finite",
            });
        }

        let n = points.len();
        let dim = points.dim();
        let side = eps * (1.0 + CELL_SLACK);

        if n == 0 {
            return Ok(Self {
                points,
                eps,
                eps_sq: eps * eps,
                point_cell: Vec::new(),
                cell_offsets: vec![0],
                point_ids: Vec::new(),
                adjacent_offsets: vec![0],
                adjacent: Vec::new(),
            });
        }

        let (lo, hi) = bounding_box(points);
        if !span_fits(&lo, &hi, side) {
            return Err(Error::InvalidParameter {
                name: "eps",
                message: "too small for the coordinate span of the input",
            });
        }

        // Integer cell coordinates, row-major like the input.
        let mut keys = vec![0i64; n * dim];
        keys.par_chunks_mut(dim).enumerate().for_each(|(i, key)| {
            let p = points.point(i);
            for d in 0..dim {
                key[d] = ((p[d] - lo[d]) / side).floor() as i64;
            }
        });
        let key_of = |i: usize| &keys[i * dim..(i + 1) * dim];

        let mut order: Vec<usize> = (0..n).collect();
        order.par_sort_unstable_by(|&a, &b| key_of(a).cmp(key_of(b)).then(a.cmp(&b)));

        // Group equal keys into cells.
        let mut point_cell = vec![0usize; n];
        let mut cell_offsets = Vec::new();
        let mut cell_keys: Vec<i64> = Vec::new();
        for (pos, &i) in order.iter().enumerate() {
            if pos == 0 || key_of(order[pos - 1]) != key_of(i) {
                cell_offsets.push(pos);
                cell_keys.extend_from_slice(key_of(i));
            }
            point_cell[i] = cell_offsets.len() - 1;
        }
        cell_offsets.push(n);
        let n_cells = cell_offsets.len() - 1;

        let (adjacency, strategy) = cell_adjacency(&cell_keys, dim, n_cells);
        let mut adjacent_offsets = Vec::with_capacity(n_cells + 1);
        adjacent_offsets.push(0);
        let mut adjacent = Vec::with_capacity(adjacency.iter().map(Vec::len).sum());
        for cells in adjacency {
            adjacent.extend(cells);
            adjacent_offsets.push(adjacent.len());
        }

        if enabled!(Level::DEBUG) {
            let max_occupancy = cell_offsets
                .windows(2)
                .map(|w| w[1] - w[0])
                .max()
                .unwrap_or(0);
            debug!(
                n_points = n,
                dim,
                n_cells,
                max_occupancy,
                adjacency_entries = adjacent.len(),
                ?strategy,
                "grid built"
            );
        }

        Ok(Self {
            points,
            eps,
            eps_sq: eps * eps,
            point_cell,
            cell_offsets,
            point_ids: order,
            adjacent_offsets,
            adjacent,
        })
    }

    /// True if a grid over `points` at radius `eps` can be built without the
    /// bounding box spanning too many cells for exact cell keys.
    pub fn can_index(points: Points<'_>, eps: f64) -> bool {
        if !(eps > 0.0 && eps.is_finite()) {
            return false;
        }
        if points.is_empty() {
            return true;
        }
        let (lo, hi) = bounding_box(points);
        span_fits(&lo, &hi, eps * (1.0 + CELL_SLACK))
    }

    /// Number of non-empty cells.
    pub fn n_cells(&self) -> usize {
        self.cell_offsets.len() - 1
    }

    /// Point ids stored in cell `c`.
    pub fn cell_points(&self, c: usize) -> &[usize] {
        &self.point_ids[self.cell_offsets[c]..self.cell_offsets[c + 1]]
    }

    /// Cell holding point `i`.
    pub fn cell_of(&self, i: usize) -> usize {
        self.point_cell[i]
    }

    /// Non-empty cells adjacent to cell `c`, `c` included.
    pub fn adjacent_cells(&self, c: usize) -> &[usize] {
        &self.adjacent[self.adjacent_offsets[c]..self.adjacent_offsets[c + 1]]
    }
}

impl NeighborIndex for Grid<'_> {
    fn points(&self) -> Points<'_> {
        self.points
    }

    fn eps(&self) -> f64 {
        self.eps
    }

    fn try_for_each_neighbor<F>(&self, i: usize, mut f: F) -> ControlFlow<()>
    where
        F: FnMut(usize) -> ControlFlow<()>,
    {
        let p = self.points.point(i);
        for &c in self.adjacent_cells(self.point_cell[i]) {
            for &j in self.cell_points(c) {
                if squared_euclidean(p, self.points.point(j)) <= self.eps_sq {
                    f(j)?;
                }
            }
        }
        ControlFlow::Continue(())
    }
}

fn span_fits(lo: &[f64], hi: &[f64], side: f64) -> bool {
    lo.iter()
        .zip(hi)
        .all(|(l, h)| (h - l) / side < MAX_SPAN_CELLS)
}

fn bounding_box(points: Points<'_>) -> (Vec<f64>, Vec<f64>) {
    let dim = points.dim();
    points
        .as_flat()
        .par_chunks(dim)
        .fold(
            || (vec![f64::INFINITY; dim], vec![f64::NEG_INFINITY; dim]),
            |(mut lo, mut hi), p| {
                for d in 0..dim {
                    lo[d] = lo[d].min(p[d]);
                    hi[d] = hi[d].max(p[d]);
                }
                (lo, hi)
            },
        )
        .reduce(
            || (vec![f64::INFINITY; dim], vec![f64::NEG_INFINITY; dim]),
            |(mut lo, mut hi), (lo2, hi2)| {
                for d in 0..dim {
                    lo[d] = lo[d].min(lo2[d]);
                    hi[d] = hi[d].max(hi2[d]);
                }
                (lo, hi)
            },
        )
}

/// For every cell, the sorted list of non-empty cells within Chebyshev
/// distance one (itself included).
fn cell_adjacency(
    cell_keys: &[i64],
    dim: usize,
    n_cells: usize,
) -> (Vec<Vec<usize>>, AdjacencyStrategy) {
    let key_of = |c: usize| &cell_keys[c * dim..(c + 1) * dim];

    // 3^dim, saturating well past any realistic cell count.
    let probes = (0..dim).try_fold(1usize, |acc, _| acc.checked_mul(3));
    let strategy = match probes {
        Some(p) if p <= n_cells => AdjacencyStrategy::Probe,
        _ => AdjacencyStrategy::Scan,
    };

    let adjacency: Vec<Vec<usize>> = match strategy {
        AdjacencyStrategy::Probe => {
            let lookup: HashMap<&[i64], usize> = (0..n_cells).map(|c| (key_of(c), c)).collect();
            (0..n_cells)
                .into_par_iter()
                .map(|c| {
                    let base = key_of(c);
                    let mut probe = base.to_vec();
                    let mut offset = vec![-1i64; dim];
                    let mut found = Vec::new();
                    loop {
                        for d in 0..dim {
                            probe[d] = base[d] + offset[d];
                        }
                        if let Some(&other) = lookup.get(probe.as_slice()) {
                            found.push(other);
                        }
                        if !next_offset(&mut offset) {
                            break;
                        }
                    }
                    found.sort_unstable();
                    found
                })
                .collect()
        }
        AdjacencyStrategy::Scan => (0..n_cells)
            .into_par_iter()
            .map(|c| {
                let base = key_of(c);
                (0..n_cells)
                    .filter(|&other| {
                        key_of(other)
                            .iter()
                            .zip(base)
                            .all(|(a, b)| (a - b).abs() <= 1)
                    })
                    .collect::<Vec<usize>>()
            })
            .collect(),
    };

    (adjacency, strategy)
}

/// Advance an odometer over `{-1, 0, 1}^dim`. Returns `false` after the last offset.
fn next_offset(offset: &mut [i64]) -> bool {
    for o in offset.iter_mut() {
        if *o < 1 {
            *o += 1;
            return true;
        }
        *o = -1;
    }
    false
}
