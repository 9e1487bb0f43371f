//! Buckets: contiguous partitions of mesh entities.
//!
//! A bucket holds entities of one rank that share one part. Buckets are
//! rebuilt wholesale after every modification batch, in a deterministic
//! order (part declaration order, then ascending entity id), and split at
//! the mesh's bucket capacity. Field storage is laid out bucket-major, so
//! any change to bucket membership invalidates device-side views of that
//! storage; the epoch counter exists to detect exactly that.

use crate::topology::entity::{EntityId, EntityRank};

/// One contiguous run of same-rank, same-part entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    rank: EntityRank,
    part: String,
    entities: Vec<EntityId>,
}

impl Bucket {
    pub(crate) fn new(rank: EntityRank, part: String, entities: Vec<EntityId>) -> Self {
        debug_assert!(!entities.is_empty());
        Self {
            rank,
            part,
            entities,
        }
    }

    /// Rank of every entity in this bucket.
    #[inline]
    pub fn rank(&self) -> EntityRank {
        self.rank
    }

    /// Part whose membership defines this bucket.
    #[inline]
    pub fn part(&self) -> &str {
        &self.part
    }

    /// Number of entities in the bucket.
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Buckets are never empty; kept for the conventional pairing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in bucket order.
    #[inline]
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter().copied()
    }

    /// Entity at an in-bucket ordinal.
    #[inline]
    pub fn entity(&self, ordinal: usize) -> Option<EntityId> {
        self.entities.get(ordinal).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eid(raw: u64) -> EntityId {
        EntityId::new(raw).unwrap()
    }

    #[test]
    fn accessors() {
        let b = Bucket::new(EntityRank::Element, "block_a".into(), vec![eid(1), eid(2)]);
        assert_eq!(b.rank(), EntityRank::Element);
        assert_eq!(b.part(), "block_a");
        assert_eq!(b.len(), 2);
        assert!(!b.is_empty());
        assert_eq!(b.entities().collect::<Vec<_>>(), vec![eid(1), eid(2)]);
        assert_eq!(b.entity(1), Some(eid(2)));
        assert_eq!(b.entity(2), None);
    }
}
