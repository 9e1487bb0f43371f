//! # mesh-mirror
//!
//! mesh-mirror is a debug-mode host/device coherency tracker for field data
//! that is mirrored between a host memory space and an accelerator (device)
//! memory space, attached to a partitioned, mutable mesh-entity container.
//! It detects, at the moment of access, whether the copy being read is
//! stale relative to the copy that was last written, and whether a
//! structural change to the entity partitioning has invalidated a
//! previously obtained device-side view.
//!
//! The tracker moves no data on its own behalf: users write field data,
//! declare "modified on host/device" and "synced to host/device", and the
//! interceptor checks every read against that declared history. Violations
//! are reported on a pluggable diagnostic sink; the one disallowed
//! operation — rotating multi-state buffers over an unreconciled device
//! copy — fails hard with an error instead.
//!
//! ## Features
//! - `sync-debug` (default): compile the tracker. Without it, every
//!   instrumented call site is a no-op; production builds should disable
//!   default features.
//! - `check-invariants`: validate internal structure invariants after
//!   mutations, as in debug builds.
//! - `rayon`: data-parallel device-side helpers.
//!
//! ## Determinism
//! Buckets are rebuilt in part-declaration order, then ascending entity id,
//! so layouts, slot offsets, and the first-violating-slot choice in
//! diagnostics are reproducible run to run.
//!
//! ## Usage
//! ```rust
//! use mesh_mirror::prelude::*;
//!
//! fn main() -> Result<(), MeshMirrorError> {
//!     let sink = CaptureSink::default();
//!     let mut mesh = Mesh::builder().with_diagnostic_sink(sink.clone()).build();
//!     mesh.declare_part("block_a");
//!     let id = mesh.declare_field::<f64>("pressure", EntityRank::Element, 1, 1)?;
//!     mesh.modify(|m| {
//!         m.create_entity(EntityId::new(1).unwrap(), EntityRank::Element, "block_a");
//!         m.create_entity(EntityId::new(2).unwrap(), EntityRank::Element, "block_a");
//!     })?;
//!
//!     let pressure = mesh.field::<f64>(id)?;
//!     for entity in pressure.entities() {
//!         pressure.write_host(entity, 0, 3.14)?;
//!     }
//!     pressure.modify_on_host();
//!     pressure.sync_to_device();
//!
//!     let view = pressure.device();
//!     let pass = view.read_pass();
//!     for index in view.indices() {
//!         let _ = pass.get(index, 0);
//!     }
//!     assert!(sink.is_empty()); // properly declared: no diagnostics
//!
//!     // A write with no declarations leaves the device copy stale:
//!     pressure.write_host(EntityId::new(1).unwrap(), 0, 2.18)?;
//!     let pass = view.read_pass();
//!     for index in view.indices() {
//!         let _ = pass.get(index, 0);
//!     }
//!     let lines = sink.take();
//!     assert_eq!(lines.len(), 1);
//!     assert!(lines[0].contains("stale data on Device for Field pressure[0]=3.140000"));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod data;
pub mod debug_invariants;
pub mod mirror_error;
pub mod sync;
pub mod topology;

pub use debug_invariants::DebugInvariants;
pub use mirror_error::MeshMirrorError;

/// A convenient prelude importing the most-used traits and types.
pub mod prelude {
    pub use crate::config::DebugConfig;
    pub use crate::data::field::{Field, FieldMeta, HostReadPass};
    pub use crate::data::registry::FieldId;
    pub use crate::data::{FieldScalar, Storage};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::mirror_error::MeshMirrorError;
    pub use crate::sync::handle::{DeviceField, DeviceIndex, DevicePass};
    pub use crate::sync::report::{CaptureSink, DiagnosticSink, LogSink, StderrSink};
    pub use crate::sync::MemorySpace;
    pub use crate::topology::bucket::Bucket;
    pub use crate::topology::entity::{EntityId, EntityRank};
    pub use crate::topology::mesh::{Mesh, MeshBuilder, MeshModification};
}
