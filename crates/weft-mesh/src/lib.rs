//! # weft-mesh
//!
//! Triangle and rod geometry with Structure-of-Arrays (SoA) layout.
//!
//! ## Key Types
//!
//! - [`TriangleMesh`]: Vertex positions, triangle indices and rod segments
//!   in contiguous SoA buffers.
//! - [`Topology`]: Deterministic edge numbering and adjacency queries
//!   (vertex-to-triangle, edge-to-triangle, interior edge wings).
//! - Procedural generators for tests (quad grids, rods, single triangles).

pub mod generators;
pub mod mesh;
pub mod topology;

pub use mesh::TriangleMesh;
pub use topology::{InteriorEdge, Topology};
