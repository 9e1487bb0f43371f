//! Topology module: entities, buckets, epochs, and the mesh container.

pub mod bucket;
pub mod entity;
pub mod epoch;
pub mod mesh;

pub use bucket::Bucket;
pub use entity::{EntityId, EntityRank};
pub use epoch::{EpochCounter, EpochStamp};
pub use mesh::{DEFAULT_BUCKET_CAPACITY, Mesh, MeshBuilder, MeshModification};
