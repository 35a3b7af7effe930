//! Core-point classification.

use rayon::prelude::*;
use tracing::{debug, enabled, Level};

use super::index::NeighborIndex;
use crate::error::{try_filled, Result};

/// Flag every point whose eps-neighborhood (itself included) holds at least
/// `min_pts` points.
///
/// Each point is counted independently and writes only its own flag. Counting
/// stops as soon as `min_pts` neighbors have been seen.
pub fn classify_core<I: NeighborIndex>(index: &I, min_pts: usize) -> Result<Vec<bool>> {
    let n = index.points().len();
    let mut core = try_filled("core flags", n, false)?;

    core.par_iter_mut().enumerate().for_each(|(i, flag)| {
        *flag = index.count_neighbors_up_to(i, min_pts) >= min_pts;
    });

    if enabled!(Level::DEBUG) {
        debug!(
            n_points = n,
            n_core = core.iter().filter(|&&c| c).count(),
            min_pts,
            "core points classified"
        );
    }
    Ok(core)
}
