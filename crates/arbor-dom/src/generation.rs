//! Domain generation counters
//!
//! Every committed mutation bumps the generation of each domain it locked.
//! Text rendered from a domain stays valid until the domain's counter moves
//! past the generation stamped on the rendering.

use std::sync::atomic::{AtomicU64, Ordering};

/// Mutation count of one domain at some point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Generation(u64);

impl Generation {
    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Per-domain counter, bumped under the domain's write lock
#[derive(Debug, Default)]
pub struct AtomicGeneration(AtomicU64);

impl AtomicGeneration {
    pub const fn new() -> Self {
        AtomicGeneration(AtomicU64::new(0))
    }

    #[inline]
    pub fn get(&self) -> Generation {
        Generation(self.0.load(Ordering::Acquire))
    }

    /// Record one committed mutation
    #[inline]
    pub fn bump(&self) -> Generation {
        Generation(self.0.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Whether a mutation committed after `seen` was read
    #[inline]
    pub fn is_changed_since(&self, seen: Generation) -> bool {
        self.get() > seen
    }
}
