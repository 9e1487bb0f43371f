//! Mesh-modification epoch tracking.
//!
//! The mesh owns a single monotonic counter that advances exactly once per
//! structural modification batch (entity creation, destruction, or
//! part-membership change). Device-side field handles capture the counter's
//! value when they are acquired; a captured stamp older than the live
//! counter means the handle predates a repartitioning of the underlying
//! buckets and must be re-acquired, never repaired in place.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared, monotonic structural-modification counter.
///
/// Cloning shares the underlying counter, so detached views (device field
/// handles) can compare their captured stamp against the live value without
/// borrowing the mesh.
#[derive(Debug, Clone, Default)]
pub struct EpochCounter(Arc<AtomicU64>);

impl EpochCounter {
    /// Current epoch.
    #[inline]
    pub fn current(&self) -> EpochStamp {
        EpochStamp(self.0.load(Ordering::Acquire))
    }

    /// Advance the epoch by one; called once per modification batch.
    #[inline]
    pub fn bump(&self) -> EpochStamp {
        EpochStamp(self.0.fetch_add(1, Ordering::AcqRel) + 1)
    }
}

/// The epoch captured by a device handle at acquisition time.
///
/// A stamp is either current or stale relative to its counter; a stale
/// stamp never becomes current again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EpochStamp(u64);

impl EpochStamp {
    /// True iff the counter has advanced past this stamp.
    #[inline]
    pub fn is_stale(self, counter: &EpochCounter) -> bool {
        self < counter.current()
    }
}
