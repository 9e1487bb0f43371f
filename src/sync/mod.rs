//! Coherency tracking: clocks, value records, interception, reporting.
//!
//! The modules here form the debug-mode tracker proper. They never move
//! field data; they only observe declarations and accesses and report when
//! the two disagree.

pub mod clock;
pub mod handle;
pub mod intercept;
pub mod report;
pub mod tracker;

pub use clock::GenerationClock;
pub use handle::{DeviceField, DeviceIndex, DevicePass};
pub use intercept::{Hazard, SyncDebugger};
pub use report::{CaptureSink, DiagnosticReporter, DiagnosticSink, LogSink, StderrSink};
pub use tracker::{AccessRecord, ValueTracker};

use std::fmt;

/// Tag for one of the two mirrored memory spaces. Pure value; exactly two
/// exist.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum MemorySpace {
    /// CPU-resident storage.
    Host,
    /// Accelerator-resident storage.
    Device,
}

impl MemorySpace {
    /// The other space.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            MemorySpace::Host => MemorySpace::Device,
            MemorySpace::Device => MemorySpace::Host,
        }
    }
}

impl fmt::Display for MemorySpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MemorySpace::Host => "Host",
            MemorySpace::Device => "Device",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_impl_all;

    assert_impl_all!(MemorySpace: Copy, Send, Sync);

    #[test]
    fn opposite_is_an_involution() {
        assert_eq!(MemorySpace::Host.opposite(), MemorySpace::Device);
        assert_eq!(MemorySpace::Device.opposite(), MemorySpace::Host);
        assert_eq!(MemorySpace::Host.opposite().opposite(), MemorySpace::Host);
    }

    #[test]
    fn display_matches_diagnostic_templates() {
        assert_eq!(MemorySpace::Host.to_string(), "Host");
        assert_eq!(MemorySpace::Device.to_string(), "Device");
    }

    #[test]
    fn serde_roundtrip() {
        let s = serde_json::to_string(&MemorySpace::Device).unwrap();
        let back: MemorySpace = serde_json::from_str(&s).unwrap();
        assert_eq!(back, MemorySpace::Device);
    }
}
