//! Generation clock: per-field, per-space modification counters.
//!
//! Each field carries one monotonic generation per memory space. An explicit
//! "modified on S" declaration advances S; a "synced to S" declaration
//! raises S up to the source space's generation. Generations never
//! decrease, so at most one space can be strictly ahead at any time in a
//! correctly declared program; the debug layer exists to catch the cases
//! where the declarations and the actual data movement disagree.
//!
//! # Determinism / concurrency
//! Declarations follow the surrounding mesh-modification protocol: a single
//! host writer, serialized by the caller. Counters are atomics only so that
//! device-side passes may *read* them concurrently; relaxed ordering is
//! sufficient under that single-writer contract.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::sync::MemorySpace;

/// Host/device generation pair for one field.
#[derive(Debug, Default)]
pub struct GenerationClock {
    host: AtomicU64,
    device: AtomicU64,
}

impl GenerationClock {
    #[inline]
    fn cell(&self, space: MemorySpace) -> &AtomicU64 {
        match space {
            MemorySpace::Host => &self.host,
            MemorySpace::Device => &self.device,
        }
    }

    /// Current generation of `space`.
    #[inline]
    pub fn generation(&self, space: MemorySpace) -> u64 {
        self.cell(space).load(Ordering::Relaxed)
    }

    /// Declare `space` modified: advance its generation by one.
    #[inline]
    pub fn declare_modified(&self, space: MemorySpace) -> u64 {
        self.cell(space).fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Declare `to` synced from `from`: raise the destination up to the
    /// source's generation. Never lowers, so calling with an already
    /// caught-up (or ahead) destination is a no-op.
    #[inline]
    pub fn declare_synced(&self, from: MemorySpace, to: MemorySpace) {
        let source = self.generation(from);
        self.cell(to).fetch_max(source, Ordering::Relaxed);
    }

    /// True iff `space` is strictly behind the opposite space.
    #[inline]
    pub fn lags(&self, space: MemorySpace) -> bool {
        self.generation(space) < self.generation(space.opposite())
    }
}
