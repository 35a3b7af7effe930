use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};

/// Lock-free disjoint-set forest over `0..n`, safe to share across worker threads.
///
/// Roots are always linked underneath the smaller root id, so parent ids only
/// ever decrease along a path. That keeps the forest acyclic under any
/// interleaving and makes each class's representative its smallest member.
#[derive(Debug)]
pub(crate) struct AtomicUnionFind {
    parent: Vec<AtomicUsize>,
}

impl AtomicUnionFind {
    pub(crate) fn new(n: usize) -> Result<Self> {
        let mut parent = Vec::new();
        parent
            .try_reserve_exact(n)
            .map_err(|_| Error::AllocationFailure {
                what: "union-find parents",
                len: n,
            })?;
        parent.extend((0..n).map(AtomicUsize::new));
        Ok(Self { parent })
    }

    pub(crate) fn len(&self) -> usize {
        self.parent.len()
    }

    /// Representative of `x`, halving the path as it goes.
    pub(crate) fn find(&self, x: usize) -> usize {
        let mut x = x;
        loop {
            let p = self.parent[x].load(Ordering::Acquire);
            if p == x {
                return x;
            }
            let gp = self.parent[p].load(Ordering::Acquire);
            if gp != p {
                // Losing this race is harmless: someone else shortened the path.
                let _ = self.parent[x].compare_exchange_weak(
                    p,
                    gp,
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                );
            }
            x = gp;
        }
    }

    /// Merge the classes of `a` and `b`. Returns `true` if this call joined two
    /// previously distinct classes.
    pub(crate) fn union(&self, a: usize, b: usize) -> bool {
        let mut ra = self.find(a);
        let mut rb = self.find(b);

        loop {
            if ra == rb {
                return false;
            }
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };

            match self.parent[hi].compare_exchange(hi, lo, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return true,
                Err(_) => {
                    // `hi` was linked elsewhere meanwhile; re-resolve both sides.
                    ra = self.find(lo);
                    rb = self.find(hi);
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn same(&self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }
}

#[inline]
pub(crate) fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
