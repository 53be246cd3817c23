//! # weft-contact
//!
//! Collision detection and response for deforming triangle surfaces and rods.
//!
//! The collision core is split into phases:
//! 1. **Broad phase**: element boxes in a hash grid or BVH
//! 2. **Narrow phase**: continuous-time (coplanarity cubic) and proximity tests
//! 3. **Response**: inelastic impulses along the collision normal
//!
//! [`safety`] answers whether a remeshing edit would create an
//! intersection, and [`pipeline`] runs whole passes with telemetry.
//! Geometry is consumed through [`GeometryQuery`] and [`MeshQuery`] and is
//! never owned by the core.

pub mod broad;
pub mod bvh;
pub mod collision;
pub mod config;
pub mod geometry;
pub mod grid;
pub mod narrow;
pub mod pipeline;
pub mod response;
pub mod safety;

pub use broad::{BroadPhase, ElementClass};
pub use bvh::BvhBroadPhase;
pub use collision::{
    Collision, CollisionKind, ContinuousCollision, Coordinates, Impact, PenaltyContact,
    PrimitivePair, ProximityCollision,
};
pub use config::{BroadPhaseKind, CollisionConfig, NarrowPhaseParams};
pub use geometry::{GeometryQuery, GeometryStore, MeshQuery, VelocityChange};
pub use grid::GridBroadPhase;
pub use narrow::{analyse, analyse_with, penalty_contact, proximity, try_analyse};
pub use pipeline::{CollisionPipeline, ContinuousPass, ProximityPass};
pub use response::{compute_impulse, velocity_changes};
pub use safety::{would_edit_collide, EditCheckParams, MeshEdit, VertexMove};
