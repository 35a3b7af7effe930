//! DBSCAN: Density-Based Spatial Clustering of Applications with Noise.
//!
//! # The Algorithm (Ester et al., 1996)
//!
//! DBSCAN groups points by neighborhood density. Unlike k-means, it:
//!
//! - Discovers clusters of arbitrary shape
//! - Determines the number of clusters itself
//! - Identifies noise points (outliers)
//!
//! ## Core Concepts
//!
//! - **Epsilon (ε)**: Maximum distance between two points to be neighbors.
//! - **MinPts**: Minimum neighborhood size, the point itself included, for a
//!   point to be "core".
//! - **Core point**: Has at least MinPts points within ε.
//! - **Border point**: Within ε of a core point but not core itself.
//! - **Noise point**: Neither core nor border.
//!
//! ## Parallel formulation
//!
//! The classic formulation expands clusters one seed at a time, which is
//! inherently sequential. Here the same result is computed in stages that each
//! run across the whole rayon pool (Wang, Gu, Shun 2020):
//!
//! 1. Build a grid with cell side ε ([`Grid`]).
//! 2. Count every point's ε-neighborhood and flag core points
//!    ([`classify_core`]).
//! 3. Union adjacent core points in a lock-free union-find, attach border
//!    points to their smallest-id core neighbor, and number the clusters
//!    canonically ([`merge_clusters`]).
//!
//! The output does not depend on the number of threads or on scheduling:
//! clusters are numbered by their smallest core member, and border ties are
//! broken by the smallest core neighbor id.
//!
//! ## Complexity
//!
//! - **Time**: `O(n log n)` grid build plus work proportional to the total
//!   number of candidate pairs in adjacent cells. Degrades towards `O(n²)` when
//!   everything falls into a handful of cells.
//! - **Space**: `O(n)` beyond the input.
//!
//! ## References
//!
//! Ester et al. (1996). "A Density-Based Algorithm for Discovering Clusters
//! in Large Spatial Databases with Noise." KDD-96.
//!
//! Wang, Gu, Shun (2020). "Theoretically-Efficient and Practical Parallel
//! DBSCAN." SIGMOD 2020.

use tracing::{debug, debug_span};

use super::classify::classify_core;
use super::grid::Grid;
use super::index::{IndexKind, LinearScan, NeighborIndex};
use super::merge::{merge_clusters, Labeling, NOISE_ID};
use super::points::Points;
use super::traits::Clustering;
use crate::error::{Error, Result};

/// DBSCAN clustering algorithm.
#[derive(Debug, Clone)]
pub struct Dbscan {
    /// Epsilon: maximum distance for neighborhood.
    epsilon: f64,
    /// Minimum points for core point classification.
    min_pts: usize,
    /// Density ratio. Reserved; accepted but unused.
    rho: Option<f64>,
    /// Worker count for a dedicated pool; `None` runs on the global rayon pool.
    threads: Option<usize>,
    index: IndexKind,
}

/// Label returned by [`Clustering::fit_predict`] for noise points.
pub const NOISE: usize = usize::MAX;

impl Dbscan {
    /// Create a new DBSCAN clusterer.
    ///
    /// # Arguments
    ///
    /// * `epsilon` - Maximum distance between two points to be neighbors.
    /// * `min_pts` - Minimum number of points, the point itself included, to form a dense region.
    ///
    /// # Typical Values
    ///
    /// - `epsilon`: Often determined by k-distance plot (k = min_pts - 1).
    /// - `min_pts`: 2 * dimension is a common heuristic.
    pub fn new(epsilon: f64, min_pts: usize) -> Self {
        Self {
            epsilon,
            min_pts,
            rho: None,
            threads: None,
            index: IndexKind::default(),
        }
    }

    /// Set epsilon (neighborhood radius).
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set minimum points for core classification.
    pub fn with_min_pts(mut self, min_pts: usize) -> Self {
        self.min_pts = min_pts;
        self
    }

    /// Set the density ratio.
    ///
    /// Reserved for an approximate variant; the value is accepted and ignored.
    pub fn with_rho(mut self, rho: f64) -> Self {
        self.rho = Some(rho);
        self
    }

    /// Run on a dedicated pool of `threads` workers instead of the global pool.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Choose the spatial index used for neighbor queries.
    pub fn with_index(mut self, index: IndexKind) -> Self {
        self.index = index;
        self
    }

    /// Neighborhood radius.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Minimum neighborhood size for a core point.
    pub fn min_pts(&self) -> usize {
        self.min_pts
    }

    /// The reserved density ratio, if set.
    pub fn rho(&self) -> Option<f64> {
        self.rho
    }

    fn validate(&self) -> Result<()> {
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "epsilon",
                message: "must be positive and finite",
            });
        }

        if self.min_pts == 0 {
            return Err(Error::InvalidParameter {
                name: "min_pts",
                message: "must be at least 1",
            });
        }

        if self.threads == Some(0) {
            return Err(Error::InvalidParameter {
                name: "threads",
                message: "must be at least 1",
            });
        }

        Ok(())
    }

    /// Cluster `n` points of dimension `dim` stored row-major in `coords`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidParameter`] for a non-positive epsilon, `min_pts == 0`,
    ///   `dim == 0`, `coords.len() != n * dim` or non-finite coordinates.
    /// - [`Error::AllocationFailure`] if output buffers cannot be allocated.
    ///
    /// `n == 0` is not an error and yields an empty [`Labeling`].
    pub fn fit(&self, coords: &[f64], dim: usize, n: usize) -> Result<Labeling> {
        self.validate()?;
        let points = Points::new(coords, dim, n)?;
        self.fit_validated(points)
    }

    /// Cluster an already validated point view.
    pub fn fit_points(&self, points: Points<'_>) -> Result<Labeling> {
        self.validate()?;
        self.fit_validated(points)
    }

    fn fit_validated(&self, points: Points<'_>) -> Result<Labeling> {
        if points.is_empty() {
            return Ok(Labeling::empty());
        }

        if let Some(rho) = self.rho {
            debug!(rho, "rho is reserved and has no effect");
        }

        match self.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()?;
                pool.install(|| self.run(points))
            }
            None => self.run(points),
        }
    }

    fn run(&self, points: Points<'_>) -> Result<Labeling> {
        let _span = debug_span!(
            "dbscan",
            n = points.len(),
            dim = points.dim(),
            eps = self.epsilon,
            min_pts = self.min_pts,
            threads = rayon::current_num_threads(),
        )
        .entered();

        match self.index {
            IndexKind::Grid if Grid::can_index(points, self.epsilon) => {
                let grid = Grid::build(points, self.epsilon)?;
                dbscan_with_index(&grid, self.min_pts)
            }
            IndexKind::Grid => {
                debug!("coordinate span too wide for exact grid keys; scanning linearly");
                let scan = LinearScan::new(points, self.epsilon);
                dbscan_with_index(&scan, self.min_pts)
            }
            IndexKind::Linear => {
                let scan = LinearScan::new(points, self.epsilon);
                dbscan_with_index(&scan, self.min_pts)
            }
        }
    }
}

impl Default for Dbscan {
    fn default() -> Self {
        Self::new(0.5, 5)
    }
}

/// Run classification and merging over a prebuilt index.
///
/// Runs on whichever rayon pool is current.
pub fn dbscan_with_index<I: NeighborIndex>(index: &I, min_pts: usize) -> Result<Labeling> {
    if min_pts == 0 {
        return Err(Error::InvalidParameter {
            name: "min_pts",
            message: "must be at least 1",
        });
    }
    let core = classify_core(index, min_pts)?;
    merge_clusters(index, core)
}

/// Flatten ragged `f32` rows into one row-major `f64` buffer, checking that all rows agree.
fn flatten_rows(data: &[Vec<f32>]) -> Result<(Vec<f64>, usize)> {
    let d = data.first().map_or(0, Vec::len);
    let mut flat = Vec::new();
    flat.try_reserve_exact(data.len() * d)
        .map_err(|_| Error::AllocationFailure {
            what: "flattened points",
            len: data.len() * d,
        })?;
    for row in data {
        if row.len() != d {
            return Err(Error::DimensionMismatch {
                expected: d,
                found: row.len(),
            });
        }
        flat.extend(row.iter().map(|&x| f64::from(x)));
    }
    Ok((flat, d))
}

impl Clustering for Dbscan {
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<usize>> {
        Ok(self
            .fit_predict_with_noise(data)?
            .into_iter()
            .map(|l| l.unwrap_or(NOISE))
            .collect())
    }

    /// DBSCAN discovers clusters dynamically, so this returns 0.
    ///
    /// The actual count is [`Labeling::n_clusters`].
    fn n_clusters(&self) -> usize {
        0
    }
}

/// Extended DBSCAN interface with noise detection.
pub trait DbscanExt {
    /// Fit and predict, returning labels where noise is marked as `None`.
    fn fit_predict_with_noise(&self, data: &[Vec<f32>]) -> Result<Vec<Option<usize>>>;

    /// Check if a label represents noise.
    fn is_noise(label: usize) -> bool {
        label == NOISE
    }
}

impl DbscanExt for Dbscan {
    fn fit_predict_with_noise(&self, data: &[Vec<f32>]) -> Result<Vec<Option<usize>>> {
        self.validate()?;
        if data.is_empty() {
            return Ok(Vec::new());
        }

        let (flat, d) = flatten_rows(data)?;
        let labeling = self.fit(&flat, d, data.len())?;
        Ok(labeling
            .labels
            .into_iter()
            .map(|l| if l == NOISE_ID { None } else { Some(l as usize) })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::needless_range_loop)]
mod tests {
    use super::*;
    use rand::prelude::*;

    #[test]
    fn test_dbscan_two_clusters() {
        // Two well-separated clusters
        let data = vec![
            // Cluster 1: around (0, 0)
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![0.1, 0.1],
            vec![0.05, 0.05],
            // Cluster 2: around (5, 5)
            vec![5.0, 5.0],
            vec![5.1, 5.0],
            vec![5.0, 5.1],
            vec![5.1, 5.1],
            vec![5.05, 5.05],
        ];

        let dbscan = Dbscan::new(0.3, 3);
        let labels = dbscan.fit_predict(&data).unwrap();

        assert_eq!(labels, vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1]);
    }

    #[test]
    fn test_dbscan_with_noise() {
        // Two clusters plus an outlier
        let data = vec![
            // Cluster 1
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![0.1, 0.1],
            // Outlier
            vec![100.0, 100.0],
            // Cluster 2
            vec![5.0, 5.0],
            vec![5.1, 5.0],
            vec![5.0, 5.1],
            vec![5.1, 5.1],
        ];

        let dbscan = Dbscan::new(0.3, 3);
        let labels = dbscan.fit_predict_with_noise(&data).unwrap();

        assert_eq!(labels.len(), 9);
        assert!(labels[4].is_none());
        for (i, label) in labels.iter().enumerate() {
            if i != 4 {
                assert!(label.is_some());
            }
        }

        let hard = dbscan.fit_predict(&data).unwrap();
        assert!(<Dbscan as DbscanExt>::is_noise(hard[4]));
    }

    #[test]
    fn test_dbscan_all_noise() {
        // Points too far apart
        let data = vec![
            vec![0.0, 0.0],
            vec![10.0, 0.0],
            vec![0.0, 10.0],
            vec![10.0, 10.0],
        ];

        let dbscan = Dbscan::new(0.5, 3);
        let labels = dbscan.fit_predict_with_noise(&data).unwrap();

        for label in labels {
            assert!(label.is_none());
        }
    }

    #[test]
    fn test_dbscan_empty() {
        let dbscan = Dbscan::new(0.5, 3);
        let out = dbscan.fit(&[], 2, 0).unwrap();
        assert!(out.is_empty());
        assert!(out.core.is_empty());
        assert_eq!(out.n_clusters, 0);

        let data: Vec<Vec<f32>> = vec![];
        assert!(dbscan.fit_predict(&data).unwrap().is_empty());
    }

    #[test]
    fn test_dbscan_invalid_params() {
        let data = [0.0, 0.0];

        // Invalid epsilon
        assert!(Dbscan::new(0.0, 3).fit(&data, 2, 1).is_err());
        assert!(Dbscan::new(-1.0, 3).fit(&data, 2, 1).is_err());
        assert!(Dbscan::new(f64::NAN, 3).fit(&data, 2, 1).is_err());

        // Invalid min_pts
        assert!(Dbscan::new(0.5, 0).fit(&data, 2, 1).is_err());

        // Invalid shape
        assert!(Dbscan::new(0.5, 1).fit(&data, 0, 1).is_err());
        assert!(Dbscan::new(0.5, 1).fit(&data, 2, 2).is_err());

        // Invalid thread count
        assert!(Dbscan::new(0.5, 1).with_threads(0).fit(&data, 2, 1).is_err());
    }

    #[test]
    fn test_zero_eps_rejected_even_when_empty() {
        let err = Dbscan::new(0.0, 1).fit(&[], 3, 0).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidParameter {
                name: "epsilon",
                ..
            }
        ));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let data = vec![vec![0.0, 0.0], vec![1.0]];
        let err = Dbscan::new(0.5, 1).fit_predict(&data).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_dbscan_chain() {
        // Chain of points - DBSCAN should connect them
        let data: Vec<Vec<f32>> = (0..10).map(|i| vec![i as f32 * 0.3, 0.0]).collect();

        let dbscan = Dbscan::new(0.5, 2);
        let labels = dbscan.fit_predict(&data).unwrap();

        assert!(labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn test_one_dimensional_two_runs() {
        let data = [0.0, 1.0, 2.0, 10.0, 11.0, 12.0];
        let out = Dbscan::new(1.5, 2).fit(&data, 1, 6).unwrap();

        assert_eq!(out.core, vec![true; 6]);
        assert_eq!(out.labels, vec![0, 0, 0, 1, 1, 1]);
        assert_eq!(out.n_clusters, 2);
    }

    #[test]
    fn test_single_point_singleton_cluster() {
        let out = Dbscan::new(0.1, 1).fit(&[3.0, -4.0], 2, 1).unwrap();
        assert_eq!(out.core, vec![true]);
        assert_eq!(out.labels, vec![0]);
    }

    #[test]
    fn test_wide_span_falls_back_to_exact_scan() {
        let data = [-2418637664093307.5, 3477711727937535.0, 3477711727937537.5];
        let out = Dbscan::new(2.5, 2).fit(&data, 1, 3).unwrap();
        assert_eq!(out.core, vec![false, true, true]);
        assert_eq!(out.labels, vec![NOISE_ID, 0, 0]);
    }

    #[test]
    fn test_validated_points_entry() {
        let data = [0.0, 1.0, 2.0, 10.0];
        let points = Points::new(&data, 1, 4).unwrap();
        let out = Dbscan::new(1.5, 2).fit_points(points).unwrap();
        assert_eq!(out.labels, vec![0, 0, 0, NOISE_ID]);
        assert!(Dbscan::new(0.0, 2).fit_points(points).is_err());
    }

    #[test]
    fn test_rho_is_ignored() {
        let data = [0.0, 1.0, 2.0, 10.0, 11.0, 12.0];
        let plain = Dbscan::new(1.5, 2).fit(&data, 1, 6).unwrap();
        let with_rho = Dbscan::new(1.5, 2).with_rho(0.01).fit(&data, 1, 6).unwrap();
        assert_eq!(plain, with_rho);
    }

    fn blobs(seed: u64, n_per: usize, centers: &[[f64; 3]], spread: f64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut out = Vec::new();
        for c in centers {
            for _ in 0..n_per {
                for d in 0..3 {
                    out.push(c[d] + rng.random_range(-spread..spread));
                }
            }
        }
        // Sprinkle uniform noise on top.
        for _ in 0..n_per {
            for _ in 0..3 {
                out.push(rng.random_range(-20.0..20.0));
            }
        }
        out
    }

    #[test]
    fn test_thread_count_does_not_change_output() {
        let data = blobs(42, 400, &[[0.0, 0.0, 0.0], [5.0, 5.0, 0.0], [-6.0, 2.0, 3.0]], 1.5);
        let n = data.len() / 3;

        let single = Dbscan::new(0.6, 6).with_threads(1).fit(&data, 3, n).unwrap();
        for threads in [2, 3, 8] {
            let multi = Dbscan::new(0.6, 6)
                .with_threads(threads)
                .fit(&data, 3, n)
                .unwrap();
            assert_eq!(single, multi, "threads = {threads}");
        }
        assert!(single.n_clusters >= 3);
    }

    #[test]
    fn test_grid_and_linear_agree() {
        let data = blobs(7, 150, &[[0.0, 0.0, 0.0], [3.0, 0.0, 0.0]], 1.0);
        let n = data.len() / 3;

        let grid = Dbscan::new(0.5, 4).fit(&data, 3, n).unwrap();
        let linear = Dbscan::new(0.5, 4)
            .with_index(IndexKind::Linear)
            .fit(&data, 3, n)
            .unwrap();
        assert_eq!(grid, linear);
    }

    #[test]
    fn test_labels_are_compact() {
        let data = blobs(3, 100, &[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [0.0, 10.0, 0.0]], 0.8);
        let n = data.len() / 3;
        let out = Dbscan::new(0.7, 5).fit(&data, 3, n).unwrap();

        let mut seen = vec![false; out.n_clusters];
        for &l in &out.labels {
            if l != NOISE_ID {
                seen[l as usize] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));

        // First appearance of each id is in ascending order.
        let mut next = 0i64;
        for i in 0..n {
            if out.core[i] && out.labels[i] >= next {
                assert_eq!(out.labels[i], next);
                next += 1;
            }
        }
    }
}
