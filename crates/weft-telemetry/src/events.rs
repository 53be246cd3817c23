//! Collision event types.
//!
//! Structured events emitted by the collision pass. Events are lightweight
//! value types that carry just enough data to be useful for monitoring and
//! debugging.

use serde::{Deserialize, Serialize};

/// A collision event.
///
/// Events are tagged with the index of the pass that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    /// Pass number (0-indexed, counted by the emitting pipeline).
    pub pass: u64,
    /// Event payload.
    pub kind: EventKind,
}

/// Which positions a broad-phase rebuild registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RebuildMode {
    /// Current positions padded by a proximity radius.
    Static,
    /// Current ∪ predicted positions.
    Continuous,
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// The broad-phase index was cleared and repopulated.
    BroadPhaseRebuilt {
        /// Backend name (`"grid"`, `"bvh"`).
        backend: String,
        /// Kind of boxes registered.
        mode: RebuildMode,
        /// Registered points.
        points: u32,
        /// Registered edges.
        edges: u32,
        /// Registered triangles.
        triangles: u32,
    },

    /// Candidate pairs survived broad-phase and footprint filtering.
    CandidatesGathered {
        /// Vertex/triangle candidates.
        vertex_face: u32,
        /// Edge/edge candidates.
        edge_edge: u32,
    },

    /// Continuous-time analysis completed.
    ContinuousCollisions {
        /// Confirmed collisions.
        confirmed: u32,
        /// Earliest collision time in `[0, 1]`, if any.
        earliest_time: Option<f64>,
    },

    /// Proximity tests completed.
    ProximityContacts {
        /// Pairs closer than their radius sum.
        contacts: u32,
        /// Largest penetration depth.
        max_penetration: f64,
    },

    /// Pairs skipped because no collision normal could be formed.
    DegenerateSkipped {
        /// Number of skipped pairs.
        count: u32,
    },

    /// A mesh edit was rejected by the safety check.
    EditRejected {
        /// Vertices the edit would have moved.
        moving_vertices: u32,
    },
}

impl CollisionEvent {
    /// Creates a new event for the given pass.
    pub fn new(pass: u64, kind: EventKind) -> Self {
        Self { pass, kind }
    }
}
