//! FieldLayout: mapping entities to contiguous slices of a flat buffer.
//!
//! A layout packs one slice of `components` scalars per entity into a
//! single flat buffer, bucket-major in bucket order, entity order within
//! each bucket. Layouts are immutable: every mesh modification builds a new
//! one (with a bumped version) rather than patching offsets in place, so a
//! device handle can snapshot a layout and keep indexing its captured
//! allocation consistently no matter what the mesh does afterwards.
//!
//! # Invariants
//!
//! - Each entity appears exactly once in `order`, and `map` contains
//!   precisely the keys listed in `order`.
//! - Every span has `len == components > 0` and offsets are contiguous in
//!   order; `total_len` equals the sum of all span lengths.
//! - Bucket spans tile `[0, total_len)` without gaps.
//!
//! Checked after construction in debug builds and under the
//! `check-invariants` feature; also available via
//! [`validate_invariants`](crate::debug_invariants::DebugInvariants::validate_invariants).

use hashbrown::HashMap;

use crate::debug_invariants::DebugInvariants;
use crate::mirror_error::MeshMirrorError;
use crate::topology::bucket::Bucket;
use crate::topology::entity::{EntityId, EntityRank};

/// One bucket's run of slots in the flat buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketSpan {
    /// Starting slot offset.
    pub offset: usize,
    /// Number of entities in the bucket.
    pub entities: usize,
}

/// Immutable entity-to-slice mapping for one field.
#[derive(Debug, Clone, Default)]
pub struct FieldLayout {
    map: HashMap<EntityId, (usize, usize)>,
    order: Vec<EntityId>,
    bucket_spans: Vec<BucketSpan>,
    components: usize,
    total_len: usize,
    version: u64,
}

impl FieldLayout {
    /// Build a layout over the buckets of `rank`, `components` scalars per
    /// entity.
    pub fn build(
        buckets: &[Bucket],
        rank: EntityRank,
        components: usize,
        version: u64,
    ) -> Self {
        let mut map = HashMap::new();
        let mut order = Vec::new();
        let mut bucket_spans = Vec::new();
        let mut offset = 0usize;
        for bucket in buckets.iter().filter(|b| b.rank() == rank) {
            bucket_spans.push(BucketSpan {
                offset,
                entities: bucket.len(),
            });
            for entity in bucket.entities() {
                map.insert(entity, (offset, components));
                order.push(entity);
                offset += components;
            }
        }
        let layout = Self {
            map,
            order,
            bucket_spans,
            components,
            total_len: offset,
            version,
        };
        layout.debug_assert_invariants();
        layout
    }

    /// Slice descriptor `(offset, len)` for an entity.
    #[inline]
    pub fn span(&self, entity: EntityId) -> Option<(usize, usize)> {
        self.map.get(&entity).copied()
    }

    /// True iff the entity has a slot in this layout.
    #[inline]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.map.contains_key(&entity)
    }

    /// Number of entities covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True iff no entities are covered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Scalars per entity.
    #[inline]
    pub fn components(&self) -> usize {
        self.components
    }

    /// Total slot count; the size of the flat buffer.
    #[inline]
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    /// Version stamped at construction; bumped on every rebuild.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Entities in layout (bucket-major) order.
    #[inline]
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.order.iter().copied()
    }

    /// Per-bucket spans in bucket order.
    #[inline]
    pub fn bucket_spans(&self) -> &[BucketSpan] {
        &self.bucket_spans
    }

    /// Span for one bucket ordinal.
    #[inline]
    pub fn bucket_span(&self, ordinal: usize) -> Option<BucketSpan> {
        self.bucket_spans.get(ordinal).copied()
    }

    /// Number of buckets covered.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.bucket_spans.len()
    }
}

impl DebugInvariants for FieldLayout {
    fn debug_assert_invariants(&self) {
        crate::debug_assert_ok!(self.validate_invariants(), "FieldLayout invalid");
    }

    fn validate_invariants(&self) -> Result<(), MeshMirrorError> {
        use std::collections::HashSet;

        if self.components == 0 && !self.order.is_empty() {
            return Err(MeshMirrorError::LayoutInvariant("zero-width spans"));
        }

        // order is unique and matches map in both directions
        let set: HashSet<_> = self.order.iter().copied().collect();
        if set.len() != self.order.len() {
            return Err(MeshMirrorError::LayoutInvariant("duplicate entity in order"));
        }
        if self.order.iter().any(|e| !self.map.contains_key(e)) {
            return Err(MeshMirrorError::LayoutInvariant("order entity missing from map"));
        }
        if self.map.keys().any(|e| !set.contains(e)) {
            return Err(MeshMirrorError::LayoutInvariant("map entity missing from order"));
        }

        // contiguity and total_len
        let mut expected = 0usize;
        for entity in &self.order {
            let (offset, len) = self.map[entity];
            if len != self.components {
                return Err(MeshMirrorError::LayoutInvariant("span width mismatch"));
            }
            if offset != expected {
                return Err(MeshMirrorError::LayoutInvariant("non-contiguous offsets"));
            }
            expected = offset + len;
        }
        if expected != self.total_len {
            return Err(MeshMirrorError::LayoutInvariant("total_len mismatch"));
        }

        // bucket spans tile the buffer
        let mut cursor = 0usize;
        let mut covered = 0usize;
        for span in &self.bucket_spans {
            if span.offset != cursor {
                return Err(MeshMirrorError::LayoutInvariant("bucket spans do not tile"));
            }
            cursor += span.entities * self.components;
            covered += span.entities;
        }
        if cursor != self.total_len || covered != self.order.len() {
            return Err(MeshMirrorError::LayoutInvariant("bucket spans do not cover"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eid(raw: u64) -> EntityId {
        EntityId::new(raw).unwrap()
    }

    fn buckets() -> Vec<Bucket> {
        vec![
            Bucket::new(EntityRank::Element, "block_a".into(), vec![eid(1), eid(2)]),
            Bucket::new(EntityRank::Element, "block_b".into(), vec![eid(3)]),
            Bucket::new(EntityRank::Node, "block_a".into(), vec![eid(9)]),
        ]
    }

    #[test]
    fn bucket_major_spans() {
        let layout = FieldLayout::build(&buckets(), EntityRank::Element, 3, 1);
        assert_eq!(layout.len(), 3);
        assert_eq!(layout.total_len(), 9);
        assert_eq!(layout.span(eid(1)), Some((0, 3)));
        assert_eq!(layout.span(eid(2)), Some((3, 3)));
        assert_eq!(layout.span(eid(3)), Some((6, 3)));
        // Node bucket is filtered out by rank.
        assert_eq!(layout.span(eid(9)), None);
        assert_eq!(
            layout.entities().collect::<Vec<_>>(),
            vec![eid(1), eid(2), eid(3)]
        );
    }

    #[test]
    fn bucket_spans_tile_the_buffer() {
        let layout = FieldLayout::build(&buckets(), EntityRank::Element, 2, 1);
        assert_eq!(layout.bucket_count(), 2);
        assert_eq!(
            layout.bucket_span(0),
            Some(BucketSpan {
                offset: 0,
                entities: 2
            })
        );
        assert_eq!(
            layout.bucket_span(1),
            Some(BucketSpan {
                offset: 4,
                entities: 1
            })
        );
        assert_eq!(layout.bucket_span(2), None);
    }

    #[test]
    fn empty_rank_yields_empty_layout() {
        let layout = FieldLayout::build(&buckets(), EntityRank::Face, 3, 1);
        assert!(layout.is_empty());
        assert_eq!(layout.total_len(), 0);
        assert_eq!(layout.bucket_count(), 0);
        assert!(layout.validate_invariants().is_ok());
    }

    #[test]
    fn validate_detects_corruption() {
        let mut layout = FieldLayout::build(&buckets(), EntityRank::Element, 1, 1);
        layout.map.insert(eid(2), (7, 1));
        assert!(layout.validate_invariants().is_err());
    }

    #[test]
    fn version_is_stamped() {
        let layout = FieldLayout::build(&buckets(), EntityRank::Element, 1, 42);
        assert_eq!(layout.version(), 42);
    }
}
