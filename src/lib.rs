#![cfg_attr(docsrs, feature(doc_cfg))]
//! # soa-mesh
//!
//! soa-mesh is the data layer of an unstructured-mesh simulation code. Mesh
//! entities (points, edges, faces, zones, sides, corners) are stored as
//! struct-of-arrays: every per-element quantity is one contiguous,
//! individually resizable column, so element-wise kernels can sweep a field
//! over flat memory.
//!
//! ## Features
//! - [`Datastore`](data::Datastore): named, typed columns with atomic resize
//!   and exact little-endian serialization
//! - The [`Entity`](entity::Entity) contract and its six implementations,
//!   each carrying a local/ghost split for distributed decompositions
//! - [`Mesh`](mesh::Mesh): the aggregate, with checkpoint/restart I/O,
//!   bit-exact equality, statistics and derived side geometry
//! - [`Vector3`](geometry::Vector3): a small 3-vector value type
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! soa-mesh = "0.1"
//! # Optional features:
//! # features = ["rayon", "check-invariants"]
//! ```
//!
//! ```
//! use soa_mesh::prelude::*;
//!
//! let mut mesh = Mesh::new()?;
//! mesh.zones.resize(8, 10, 2)?;
//! let mut buf = Vec::new();
//! mesh.write(&mut buf)?;
//! let mut restored = Mesh::new()?;
//! restored.read(&mut buf.as_slice())?;
//! assert_eq!(mesh, restored);
//! # Ok::<(), MeshError>(())
//! ```
//!
//! ## Invariant checking
//! Structural invariants are verified after every resize and read in debug
//! builds. Enable `check-invariants` (or `strict-invariants`) to keep the
//! checks in release builds.

pub mod data;
pub mod debug_invariants;
pub mod entity;
pub mod geometry;
pub mod io;
pub mod mesh;
pub mod mesh_error;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::data::{Datastore, DsHandle, FieldElement, FieldType, Idx, IdxLists};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::entity::{
        CommType, Corners, Edges, Entity, EntityKind, Faces, Partition, Points, Sides, Zones,
    };
    pub use crate::geometry::{GeometryType, Vec3, Vector3, crossprod, dotprod, normalize};
    pub use crate::mesh::{Mesh, MeshConfig, MeshStats};
    pub use crate::mesh_error::MeshError;
}
