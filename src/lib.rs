//! Parallel density-based clustering.
//!
//! `dbgrid` computes DBSCAN over an in-memory set of points in d-dimensional
//! Euclidean space. Input is a flat row-major `f64` buffer; output is one core
//! flag and one cluster label per point, with `-1` for noise.
//!
//! The primary public API is under [`cluster`]:
//! - [`Dbscan`]: builder and one-shot entry point
//! - [`Grid`]: uniform grid index for exact fixed-radius neighbor queries
//! - [`classify_core`] / [`merge_clusters`]: the individual pipeline stages
//!
//! Work is spread over a rayon pool; results do not depend on the thread count.

#![forbid(unsafe_code)]

pub mod cluster;
pub mod error;

pub use cluster::{
    classify_core, dbscan_with_index, merge_clusters, Clustering, Dbscan, DbscanExt, Grid,
    IndexKind, Labeling, LinearScan, NeighborIndex, Points, NOISE, NOISE_ID,
};
pub use error::{Error, Result};
