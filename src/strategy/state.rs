//! Per-compiled-sender mutable state: round-robin cursors and weighted
//! random sampling. Lives entirely behind `Cell`/`RefCell` — the
//! single-threaded dispatch discipline this crate is built on means none
//! of this needs a lock.

use std::cell::Cell;

use rand::Rng;

/// A strictly rotating cursor over `n` children.
///
/// Cursor wrap is an implementation detail; the contract is strict
/// rotation with no skipping while all selected children remain
/// available. Modular arithmetic on a `usize` wraps long before it could
/// realistically overflow, so no explicit reset logic is needed.
pub(crate) struct RoundRobinCursor {
    next: Cell<usize>,
    len: usize,
}

impl RoundRobinCursor {
    pub fn new(len: usize) -> Self {
        RoundRobinCursor {
            next: Cell::new(0),
            len,
        }
    }

    /// Returns the index to dispatch this request to, then advances.
    pub fn advance(&self) -> usize {
        let i = self.next.get() % self.len;
        self.next.set(i.wrapping_add(1));
        i
    }
}

/// Chooses an index among `weights` with probability proportional to
/// weight, via cumulative-weight lookup.
pub(crate) struct WeightedSampler {
    cumulative: Vec<u64>,
    total: u64,
}

impl WeightedSampler {
    pub fn new(weights: &[u32]) -> Self {
        let mut cumulative = Vec::with_capacity(weights.len());
        let mut total = 0u64;
        for &w in weights {
            total += w as u64;
            cumulative.push(total);
        }
        WeightedSampler { cumulative, total }
    }

    /// Draws a weighted-random index using the given RNG. Panics if
    /// constructed with zero total weight (callers must filter those out
    /// before compiling, mirroring how `sharding`/`roundRobin` refuse to
    /// compile with zero children).
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        debug_assert!(self.total > 0);
        let target = rng.gen_range(0..self.total);
        match self.cumulative.binary_search(&(target + 1)) {
            Ok(i) | Err(i) => i,
        }
    }
}
