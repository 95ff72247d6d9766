//! Rank-based work distribution.
//!
//! The combination set is split into contiguous, balanced partitions, one per
//! rank. Each rank solves its partition sequentially on its own model copy.
//! The only cross-rank communication is the final gather on the root rank.

use std::ops::Range;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Rank that performs the gather, file writes and timing report
pub const ROOT_RANK: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelManager {
    num_workers: usize,
}

impl ParallelManager {
    /// Create a manager with `num_workers` ranks (at least one)
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers: num_workers.max(1),
        }
    }

    /// Single-rank manager
    pub fn serial() -> Self {
        Self::new(1)
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn is_root_process(&self, rank: usize) -> bool {
        rank == ROOT_RANK
    }

    /// Contiguous slice of `0..total` owned by `rank`.
    ///
    /// The first `total % num_workers` ranks take one extra item.
    pub fn rank_range(&self, total: usize, rank: usize) -> Range<usize> {
        if rank >= self.num_workers {
            return total..total;
        }
        let base = total / self.num_workers;
        let extra = total % self.num_workers;
        let start = rank * base + rank.min(extra);
        let len = base + usize::from(rank < extra);
        start..start + len
    }

    /// Run `work` once per rank with that rank's partition. Results come back in rank order.
    pub fn run<T, F>(&self, total: usize, work: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize, Range<usize>) -> T + Sync,
    {
        let ranks = 0..self.num_workers;

        #[cfg(feature = "parallel")]
        let results = ranks
            .into_par_iter()
            .map(|rank| work(rank, self.rank_range(total, rank)))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let results = ranks
            .map(|rank| work(rank, self.rank_range(total, rank)))
            .collect();

        results
    }
}

impl Default for ParallelManager {
    fn default() -> Self {
        Self::serial()
    }
}
