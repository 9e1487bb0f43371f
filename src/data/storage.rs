//! Pluggable flat storage for field buffers.
//!
//! The host side is a plain `Vec`; the device side is a separate,
//! zero-initialized allocation standing in for accelerator memory. The
//! crate never moves data between the two on its own — copies happen only
//! inside the field's explicit sync operations — so keeping both
//! host-resident is sufficient for the tracker and lets diagnostics read
//! back "what the device would see" without a real device round trip.

use core::fmt::{self, Debug};

use bytemuck::Zeroable;

use crate::data::FieldScalar;
use crate::mirror_error::MeshMirrorError;

/// Contiguous, indexable storage for `V` with checked slice access.
pub trait Storage<V: FieldScalar>: Debug + Send + Sync {
    /// Construct a zero-initialized buffer of `len` elements.
    fn with_len(len: usize) -> Self
    where
        Self: Sized;

    /// Current length in elements.
    fn len(&self) -> usize;

    /// True iff the buffer holds no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entire read-only buffer.
    fn as_slice(&self) -> &[V];

    /// Entire mutable buffer.
    fn as_mut_slice(&mut self) -> &mut [V];

    /// Element at `offset`, if in bounds.
    #[inline]
    fn get(&self, offset: usize) -> Option<V> {
        self.as_slice().get(offset).copied()
    }

    /// Copy `src` into the range `[offset .. offset + src.len())`.
    fn write_at(&mut self, offset: usize, src: &[V]) -> Result<(), MeshMirrorError> {
        let end = offset
            .checked_add(src.len())
            .ok_or(MeshMirrorError::SliceOutOfBounds {
                offset,
                len: src.len(),
            })?;
        let dst = self
            .as_mut_slice()
            .get_mut(offset..end)
            .ok_or(MeshMirrorError::SliceOutOfBounds {
                offset,
                len: src.len(),
            })?;
        dst.copy_from_slice(src);
        Ok(())
    }

    /// Read the range `[offset .. offset + len)` into a fresh vector.
    fn read_range(&self, offset: usize, len: usize) -> Result<Vec<V>, MeshMirrorError> {
        let end = offset
            .checked_add(len)
            .ok_or(MeshMirrorError::SliceOutOfBounds { offset, len })?;
        let src = self
            .as_slice()
            .get(offset..end)
            .ok_or(MeshMirrorError::SliceOutOfBounds { offset, len })?;
        Ok(src.to_vec())
    }

    /// Overwrite every element with `value`.
    fn fill(&mut self, value: V) {
        for slot in self.as_mut_slice() {
            *slot = value;
        }
    }
}

/// `Vec`-backed host storage.
#[derive(Clone)]
pub struct VecStorage<V>(Vec<V>);

impl<V> Debug for VecStorage<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VecStorage")
            .field("len", &self.0.len())
            .finish()
    }
}

impl<V: FieldScalar> Storage<V> for VecStorage<V> {
    fn with_len(len: usize) -> Self {
        Self(vec![V::zeroed(); len])
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn as_slice(&self) -> &[V] {
        &self.0
    }

    fn as_mut_slice(&mut self) -> &mut [V] {
        &mut self.0
    }
}

/// Simulated device allocation.
///
/// Structurally identical to `VecStorage` but kept as a distinct type: a
/// device allocation is never resized in place — mesh modification installs
/// a fresh one and retained handles keep the old allocation alive, the same
/// way a stale GPU view keeps pointing at its original buffer.
pub struct DeviceStorage<V> {
    data: Vec<V>,
}

impl<V> Debug for DeviceStorage<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceStorage")
            .field("len", &self.data.len())
            .finish()
    }
}

impl<V: FieldScalar> Storage<V> for DeviceStorage<V> {
    fn with_len(len: usize) -> Self {
        Self {
            data: vec![V::zeroed(); len],
        }
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn as_slice(&self) -> &[V] {
        &self.data
    }

    fn as_mut_slice(&mut self) -> &mut [V] {
        &mut self.data
    }
}
