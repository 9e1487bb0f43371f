//! `EntityId`: a strong, zero-cost handle for mesh entities.
//!
//! Every entity in the bucket container is identified by a unique, opaque
//! id. `EntityId` wraps a nonzero `u64` to enforce at compile- and runtime
//! that 0 is reserved as an invalid or sentinel value.
//!
//! # Memory layout
//! The type is `repr(transparent)`: same ABI and alignment as its single
//! `NonZeroU64` field, so it can cross FFI boundaries exactly like a `u64`.

use std::{fmt, num::NonZeroU64};

use crate::mirror_error::MeshMirrorError;

/// Opaque, non-zero entity handle.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct EntityId(NonZeroU64);

impl EntityId {
    /// Creates a new `EntityId` from a raw `u64` value.
    ///
    /// # Errors
    /// Returns `Err(InvalidEntityId)` if `raw == 0`.
    ///
    /// # Example
    /// ```rust
    /// # fn try_main() -> Result<(), mesh_mirror::mirror_error::MeshMirrorError> {
    /// use mesh_mirror::topology::entity::EntityId;
    /// let e = EntityId::new(1)?;
    /// assert_eq!(e.get(), 1);
    /// # Ok(())
    /// # }
    /// ```
    #[inline]
    pub fn new(raw: u64) -> Result<Self, MeshMirrorError> {
        NonZeroU64::new(raw)
            .map(EntityId)
            .ok_or(MeshMirrorError::InvalidEntityId)
    }

    /// Returns the inner `u64` value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityId").field(&self.get()).finish()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Attachment granularity for fields and buckets.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Debug,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum EntityRank {
    /// Mesh vertices.
    Node,
    /// Mesh edges.
    Edge,
    /// Mesh faces.
    Face,
    /// Highest-dimension cells.
    Element,
}

impl fmt::Display for EntityRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityRank::Node => "Node",
            EntityRank::Edge => "Edge",
            EntityRank::Face => "Face",
            EntityRank::Element => "Element",
        };
        f.write_str(s)
    }
}
