//! Exact eps-neighborhood queries.
//!
//! Every index answers the same question: which points lie within `eps` of
//! point `i` (inclusive, `i` itself included)? Implementations may
//! over-approximate internally but must filter by exact distance, so callers
//! never see false positives or false negatives.

use std::ops::ControlFlow;

use super::points::Points;
use super::util::squared_euclidean;

/// Which spatial index backs the neighbor queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexKind {
    /// Uniform grid with cell side `eps`. Linear build, density-bound queries.
    #[default]
    Grid,
    /// Brute-force scan over all points. Quadratic, no build cost.
    Linear,
}

/// Fixed-radius neighbor search over the points an index was built from.
///
/// Indexes are immutable once built and are shared by reference across
/// worker threads.
pub trait NeighborIndex: Sync {
    /// The points this index covers.
    fn points(&self) -> Points<'_>;

    /// The query radius fixed at build time.
    fn eps(&self) -> f64;

    /// Visit every point within `eps` of point `i` (including `i`), stopping
    /// early if `f` breaks.
    fn try_for_each_neighbor<F>(&self, i: usize, f: F) -> ControlFlow<()>
    where
        F: FnMut(usize) -> ControlFlow<()>;

    /// Visit every point within `eps` of point `i`, including `i`.
    fn for_each_neighbor<F>(&self, i: usize, mut f: F)
    where
        F: FnMut(usize),
    {
        let _ = self.try_for_each_neighbor(i, |j| {
            f(j);
            ControlFlow::Continue(())
        });
    }

    /// Ids of all points within `eps` of point `i`, including `i`, in ascending order.
    fn range_query(&self, i: usize) -> Vec<usize> {
        let mut out = Vec::new();
        self.for_each_neighbor(i, |j| out.push(j));
        out.sort_unstable();
        out
    }

    /// Neighborhood size of `i` (self included), saturating at `limit`.
    fn count_neighbors_up_to(&self, i: usize, limit: usize) -> usize {
        let mut count = 0usize;
        let _ = self.try_for_each_neighbor(i, |_| {
            count += 1;
            if count >= limit {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        count
    }
}

/// Brute-force index: every query scans the whole point set.
#[derive(Debug, Clone)]
pub struct LinearScan<'a> {
    points: Points<'a>,
    eps: f64,
    eps_sq: f64,
}

impl<'a> LinearScan<'a> {
    /// Wrap `points` for queries at radius `eps`.
    pub fn new(points: Points<'a>, eps: f64) -> Self {
        Self {
            points,
            eps,
            eps_sq: eps * eps,
        }
    }
}

impl NeighborIndex for LinearScan<'_> {
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
        for j in 0..self.points.len() {
            if squared_euclidean(p, self.points.point(j)) <= self.eps_sq {
                f(j)?;
            }
        }
        ControlFlow::Continue(())
    }
}
