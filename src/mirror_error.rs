//! MeshMirrorError: unified error type for mesh-mirror public APIs.
//!
//! Every fallible operation in the crate returns this error so callers can
//! match on a single enum instead of juggling per-module error types.

use thiserror::Error;

use crate::topology::entity::EntityId;

/// Unified error type for mesh-mirror operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshMirrorError {
    /// Attempted to construct an EntityId with a zero value (invalid).
    #[error("EntityId must be non-zero (0 is reserved as invalid/sentinel)")]
    InvalidEntityId,
    /// Entity created twice in the same mesh.
    #[error("entity `{0}` already exists in the mesh")]
    DuplicateEntity(EntityId),
    /// Entity referenced by a modification but not present in the mesh.
    #[error("entity `{0}` not found in the mesh")]
    MissingEntity(EntityId),
    /// Entity has no storage slot in the field's layout.
    #[error("entity `{0}` has no storage slot for this field")]
    MissingFieldSlot(EntityId),
    /// Part name was never declared on the mesh.
    #[error("unknown part `{0}`")]
    UnknownPart(String),
    /// Field id does not resolve to a declared field.
    #[error("unknown field `{0}`")]
    UnknownField(String),
    /// Field declared twice under the same name.
    #[error("field `{0}` already declared")]
    DuplicateField(String),
    /// Field looked up with a scalar type other than the declared one.
    #[error("field `{0}` is not of the requested scalar type")]
    FieldTypeMismatch(String),
    /// Fields must carry at least one scalar component per entity.
    #[error("field `{0}` must have at least one scalar component per entity")]
    ZeroComponentField(String),
    /// Fields must carry at least one state.
    #[error("field `{0}` must have at least one state")]
    ZeroStateField(String),
    /// Component index outside the field's per-entity component count.
    #[error("component {component} out of range for field `{name}` ({components} components)")]
    ComponentOutOfRange {
        /// Field name.
        name: String,
        /// Offending zero-based component index.
        component: usize,
        /// Declared components per entity.
        components: usize,
    },
    /// Bucket ordinal outside the field layout.
    #[error("bucket ordinal {0} out of range for this field layout")]
    MissingBucket(usize),
    /// A storage slice access fell outside the buffer.
    #[error("storage slice out of bounds: offset {offset}, len {len}")]
    SliceOutOfBounds {
        /// Starting element offset of the rejected access.
        offset: usize,
        /// Length in elements of the rejected access.
        len: usize,
    },
    /// Buffer handed to a bucket-granularity write has the wrong length.
    #[error("bucket write length mismatch: expected {expected}, found {found}")]
    BucketLengthMismatch {
        /// Slot count the bucket span requires.
        expected: usize,
        /// Slot count actually supplied.
        found: usize,
    },
    /// State rotation attempted while the device copy has unreconciled
    /// modifications; rotating would re-purpose storage whose logical
    /// content the device never observed.
    #[error("cannot rotate states for field `{0}`: Device copy has unreconciled modifications")]
    StateRotationUnreconciled(String),
    /// Internal layout invariant violated (see `DebugInvariants`).
    #[error("field layout invariant violated: {0}")]
    LayoutInvariant(&'static str),
    /// Internal mesh invariant violated (see `DebugInvariants`).
    #[error("mesh invariant violated: {0}")]
    MeshInvariant(&'static str),
}
