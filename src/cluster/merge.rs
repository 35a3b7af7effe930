//! Cluster formation from core flags.
//!
//! 1. **Core-to-core union.** Every core point is unioned with each core point
//!    in its eps-neighborhood. Unions commute, so the resulting partition
//!    depends only on which pairs are adjacent, never on thread scheduling.
//! 2. **Border attachment.** Once all unions have joined, every non-core point
//!    adopts the class of its smallest-id core neighbor. Points without any
//!    core neighbor are noise.
//! 3. **Compaction.** Classes are numbered `0..k` in ascending order of their
//!    smallest member id, which is also their union-find representative.

use rayon::prelude::*;
use tracing::{debug, enabled, Level};

use super::index::NeighborIndex;
use super::util::AtomicUnionFind;
use crate::error::{try_filled, Error, Result};

/// Label assigned to noise points.
pub const NOISE_ID: i64 = -1;

/// Marker for "no core neighbor".
const NO_ANCHOR: usize = usize::MAX;

/// The result of one clustering call.
///
/// Both vectors have one entry per input point, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labeling {
    /// `true` for core points.
    pub core: Vec<bool>,
    /// Cluster id in `0..n_clusters`, or [`NOISE_ID`].
    pub labels: Vec<i64>,
    /// Number of clusters found.
    pub n_clusters: usize,
}

impl Labeling {
    pub(crate) fn empty() -> Self {
        Self {
            core: Vec::new(),
            labels: Vec::new(),
            n_clusters: 0,
        }
    }

    /// Number of labeled points.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True if no points were clustered.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Cluster of point `i`, or `None` for noise.
    ///
    /// # Panics
    ///
    /// If `i >= self.len()`.
    pub fn cluster_of(&self, i: usize) -> Option<usize> {
        usize::try_from(self.labels[i]).ok()
    }

    /// True if point `i` is noise.
    ///
    /// # Panics
    ///
    /// If `i >= self.len()`.
    pub fn is_noise(&self, i: usize) -> bool {
        self.labels[i] == NOISE_ID
    }

    /// True if point `i` is a border point: clustered but not core.
    ///
    /// # Panics
    ///
    /// If `i >= self.len()`.
    pub fn is_border(&self, i: usize) -> bool {
        !self.core[i] && !self.is_noise(i)
    }

    /// Split into `(core flags, labels)`.
    pub fn into_parts(self) -> (Vec<bool>, Vec<i64>) {
        (self.core, self.labels)
    }
}

/// Turn core flags into final cluster labels.
///
/// `core` must come from [`classify_core`](super::classify_core) on the same
/// index; it is moved into the returned [`Labeling`].
pub fn merge_clusters<I: NeighborIndex>(index: &I, core: Vec<bool>) -> Result<Labeling> {
    let n = core.len();
    if n != index.points().len() {
        return Err(Error::InvalidParameter {
            name: "core",
            message: "one flag per indexed point is required",
        });
    }

    let uf = AtomicUnionFind::new(n)?;
    debug_assert_eq!(uf.len(), n);

    // Each adjacent core pair is seen from both ends; only the larger id unions.
    let merges: usize = (0..n)
        .into_par_iter()
        .filter(|&p| core[p])
        .map(|p| {
            let mut merges = 0usize;
            index.for_each_neighbor(p, |q| {
                if q < p && core[q] && uf.union(p, q) {
                    merges += 1;
                }
            });
            merges
        })
        .sum();

    // All unions have joined here; the forest is read-only from now on.
    let mut anchor = try_filled("border anchors", n, NO_ANCHOR)?;
    anchor.par_iter_mut().enumerate().for_each(|(i, a)| {
        *a = if core[i] {
            uf.find(i)
        } else {
            let mut best = NO_ANCHOR;
            index.for_each_neighbor(i, |q| {
                if core[q] && q < best {
                    best = q;
                }
            });
            if best == NO_ANCHOR {
                NO_ANCHOR
            } else {
                uf.find(best)
            }
        };
    });

    // Representatives are the smallest member of each class, so ascending id
    // order yields the canonical numbering.
    let mut compact = try_filled("cluster ids", n, NOISE_ID)?;
    let mut n_clusters = 0usize;
    for i in 0..n {
        if core[i] && anchor[i] == i {
            compact[i] = n_clusters as i64;
            n_clusters += 1;
        }
    }

    let mut labels = try_filled("cluster labels", n, NOISE_ID)?;
    labels
        .par_iter_mut()
        .zip(anchor.par_iter())
        .for_each(|(label, &a)| {
            if a != NO_ANCHOR {
                *label = compact[a];
            }
        });

    if enabled!(Level::DEBUG) {
        let n_core = core.iter().filter(|&&c| c).count();
        let n_noise = labels.iter().filter(|&&l| l == NOISE_ID).count();
        debug!(
            n_core,
            n_border = n - n_core - n_noise,
            n_noise,
            merges,
            n_clusters,
            "clusters merged"
        );
    }

    Ok(Labeling {
        core,
        labels,
        n_clusters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::classify::classify_core;
    use crate::cluster::index::LinearScan;
    use crate::cluster::points::Points;

    fn run(data: &[f64], eps: f64, min_pts: usize) -> Labeling {
        let pts = Points::new(data, 1, data.len()).unwrap();
        let idx = LinearScan::new(pts, eps);
        let core = classify_core(&idx, min_pts).unwrap();
        merge_clusters(&idx, core).unwrap()
    }

    #[test]
    fn test_border_joins_smallest_core_neighbor() {
        // Two dense runs bridged by a single non-core point at 2.25.
        let a = [0.0, 0.25, 0.5, 1.0, 2.25, 3.5, 4.0, 4.25, 4.5];
        let out = run(&a, 1.25, 4);
        assert!(out.is_border(4));
        assert_eq!(out.labels[4], out.labels[3]);
        assert_eq!(out.labels, vec![0, 0, 0, 0, 0, 1, 1, 1, 1]);

        // Same geometry with the right run first: the bridge follows it instead.
        let b = [3.5, 4.0, 4.25, 4.5, 2.25, 0.0, 0.25, 0.5, 1.0];
        let out = run(&b, 1.25, 4);
        assert!(out.is_border(4));
        assert_eq!(out.labels, vec![0, 0, 0, 0, 0, 1, 1, 1, 1]);
        assert_eq!(out.n_clusters, 2);
    }

    #[test]
    fn test_numbering_follows_smallest_member() {
        // Cluster containing point 0 is 0 even though its other members come last.
        let data = [0.0, 10.0, 10.5, 0.5];
        let out = run(&data, 1.0, 2);
        assert_eq!(out.labels, vec![0, 1, 1, 0]);
        assert_eq!(out.cluster_of(2), Some(1));
    }

    #[test]
    fn test_noise_has_no_core_neighbor() {
        let data = [0.0, 0.5, 1.0, 5.0];
        let out = run(&data, 0.6, 3);
        assert_eq!(out.core, vec![false, true, false, false]);
        assert_eq!(out.labels, vec![0, 0, 0, NOISE_ID]);
        assert!(out.is_noise(3));
        assert_eq!(out.cluster_of(3), None);
    }

    #[test]
    #[should_panic]
    fn test_accessors_panic_out_of_range() {
        let out = run(&[0.0, 0.5], 1.0, 2);
        assert_eq!(out.len(), 2);
        let _ = out.cluster_of(2);
    }

    #[test]
    fn test_rejects_mismatched_flags() {
        let data = [0.0, 1.0];
        let pts = Points::new(&data, 1, 2).unwrap();
        let idx = LinearScan::new(pts, 1.0);
        assert!(merge_clusters(&idx, vec![true]).is_err());
    }
}
