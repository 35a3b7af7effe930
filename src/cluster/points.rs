//! Borrowed, validated view over a flat row-major coordinate buffer.

use crate::error::{Error, Result};

/// A read-only set of `n` points in `dim` dimensions.
///
/// Point `i` occupies `coords[i * dim..(i + 1) * dim]`. The view never copies
/// the buffer and cannot outlive it.
#[derive(Debug, Clone, Copy)]
pub struct Points<'a> {
    coords: &'a [f64],
    dim: usize,
    n: usize,
}

impl<'a> Points<'a> {
    /// Wrap `coords` as `n` points of dimension `dim`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] if `dim` is zero, if `coords.len() != n * dim`,
    /// or if any coordinate is NaN or infinite.
    pub fn new(coords: &'a [f64], dim: usize, n: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidParameter {
                name: "dim",
                message: "must be at least 1",
            });
        }

        let expected = n.checked_mul(dim).ok_or(Error::InvalidParameter {
            name: "n",
            message: "n * dim overflows",
        })?;
        if coords.len() != expected {
            return Err(Error::InvalidParameter {
                name: "coords",
                message: "buffer length must equal n * dim",
            });
        }

        if coords.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "coords",
                message: "coordinates must be finite",
            });
        }

        Ok(Self { coords, dim, n })
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    /// True if the set holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Dimensionality of every point.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Coordinates of point `i`.
    #[inline]
    pub fn point(&self, i: usize) -> &'a [f64] {
        &self.coords[i * self.dim..(i + 1) * self.dim]
    }

    /// The underlying flat buffer.
    #[inline]
    pub fn as_flat(&self) -> &'a [f64] {
        self.coords
    }
}
