//! Density-based clustering over points in Euclidean space.
//!
//! ## DBSCAN
//!
//! Density-based clustering that discovers non-convex clusters and identifies
//! outliers (noise points) without being told how many clusters to expect.
//! A point is **core** when at least `min_pts` points (itself included) lie
//! within `eps` of it. Core points within `eps` of each other share a cluster;
//! non-core points join the cluster of a nearby core point or become noise.
//!
//! The engine is split into stages that can also be driven one at a time:
//!
//! | Stage | Entry point | Parallelism |
//! |-------|-------------|-------------|
//! | Spatial index | [`Grid::build`], [`LinearScan::new`] | per point, per cell |
//! | Core flags | [`classify_core`] | per point |
//! | Union, border attachment, numbering | [`merge_clusters`] | per core point, per point |
//!
//! All stages run on the current rayon pool. [`Dbscan::with_threads`] installs a
//! dedicated pool for one call. Output is identical for every thread count.
//!
//! ## Usage
//!
//! ```rust
//! use dbgrid::cluster::{Dbscan, NOISE_ID};
//!
//! // Six points on a line, row-major with dim = 1.
//! let coords = [0.0, 1.0, 2.0, 10.0, 11.0, 12.0, 40.0];
//! let out = Dbscan::new(1.5, 2).fit(&coords, 1, coords.len()).unwrap();
//!
//! assert_eq!(out.labels, vec![0, 0, 0, 1, 1, 1, NOISE_ID]);
//! assert_eq!(out.core, vec![true, true, true, true, true, true, false]);
//! assert_eq!(out.n_clusters, 2);
//! ```
//!
//! Row-oriented `f32` data goes through the [`Clustering`] trait:
//!
//! ```rust
//! use dbgrid::cluster::{Clustering, Dbscan};
//!
//! let data = vec![
//!     vec![0.0, 0.0],
//!     vec![0.1, 0.1],
//!     vec![10.0, 10.0],
//!     vec![10.1, 10.1],
//! ];
//!
//! let labels = Dbscan::new(0.5, 2).fit_predict(&data).unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//! ```

mod classify;
mod dbscan;
mod grid;
mod index;
mod merge;
mod points;
mod traits;
mod util;

pub use classify::classify_core;
pub use dbscan::{dbscan_with_index, Dbscan, DbscanExt, NOISE};
pub use grid::Grid;
pub use index::{IndexKind, LinearScan, NeighborIndex};
pub use merge::{merge_clusters, Labeling, NOISE_ID};
pub use points::Points;
pub use traits::Clustering;
