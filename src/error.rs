use thiserror::Error;

/// Errors returned by the clustering engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// Points in a dataset have inconsistent dimensionality.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Found dimensionality.
        found: usize,
    },

    /// An output or working buffer could not be allocated.
    #[error("failed to allocate {what} ({len} elements)")]
    AllocationFailure {
        /// Which buffer.
        what: &'static str,
        /// Requested length.
        len: usize,
    },

    /// A dedicated worker pool could not be started.
    #[error("thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Allocate a vector of `len` copies of `value`, reporting allocation failure instead of aborting.
pub(crate) fn try_filled<T: Clone>(what: &'static str, len: usize, value: T) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| Error::AllocationFailure { what, len })?;
    v.resize(len, value);
    Ok(v)
}
