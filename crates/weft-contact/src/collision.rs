//! Collision records.
//!
//! A record names the primitives involved ([`PrimitivePair`]) and, once the
//! narrow phase has characterized it, where and how they meet. Two modes
//! exist: continuous-time records ([`ContinuousCollision`]) produced by
//! sweeping primitives over a step, and proximity records
//! ([`ProximityCollision`]) produced from current positions and radii.
//! [`PenaltyContact`] keeps a vertex off a face with a spring instead of an
//! impulse.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use weft_math::Vec3;
use weft_types::{VertexId, WeftError, WeftResult};

use crate::geometry::GeometryQuery;

/// Kind of primitive pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollisionKind {
    /// A point against a triangle.
    VertexFace,
    /// A segment against a segment.
    EdgeEdge,
}

/// The primitives taking part in a collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitivePair {
    /// A vertex against a triangle's three corners.
    VertexFace {
        /// The free point.
        vertex: VertexId,
        /// Triangle corners.
        face: [VertexId; 3],
    },
    /// Two edges, A and B.
    EdgeEdge {
        /// Endpoints of edge A.
        edge_a: [VertexId; 2],
        /// Endpoints of edge B.
        edge_b: [VertexId; 2],
    },
}

impl PrimitivePair {
    /// Vertex/triangle pair.
    pub fn vertex_face(vertex: VertexId, face: [VertexId; 3]) -> Self {
        Self::VertexFace { vertex, face }
    }

    /// Edge/edge pair.
    pub fn edge_edge(edge_a: [VertexId; 2], edge_b: [VertexId; 2]) -> Self {
        Self::EdgeEdge { edge_a, edge_b }
    }

    /// Kind tag.
    pub fn kind(&self) -> CollisionKind {
        match self {
            Self::VertexFace { .. } => CollisionKind::VertexFace,
            Self::EdgeEdge { .. } => CollisionKind::EdgeEdge,
        }
    }

    /// The four participating points.
    ///
    /// Vertex-face: `[p, f0, f1, f2]`. Edge-edge: `[a0, a1, b0, b1]`.
    pub fn vertices(&self) -> [VertexId; 4] {
        match *self {
            Self::VertexFace { vertex, face: [f0, f1, f2] } => [vertex, f0, f1, f2],
            Self::EdgeEdge { edge_a: [a0, a1], edge_b: [b0, b1] } => [a0, a1, b0, b1],
        }
    }

    /// Whether the two sides share a vertex id, which makes the pair trivially adjacent.
    pub fn shares_vertex(&self) -> bool {
        match self {
            Self::VertexFace { vertex, face } => face.contains(vertex),
            Self::EdgeEdge { edge_a, edge_b } => {
                edge_a.iter().any(|v| edge_b.contains(v))
                    || edge_a[0] == edge_a[1]
                    || edge_b[0] == edge_b[1]
            }
        }
    }

    /// Whether every participating point is immovable.
    pub fn is_fixed<G: GeometryQuery + ?Sized>(&self, geometry: &G) -> bool {
        self.vertices().iter().all(|&v| geometry.is_fixed(v))
    }

    /// Whether any participating point is collision-immune.
    pub fn has_immune<G: GeometryQuery + ?Sized>(&self, geometry: &G) -> bool {
        self.vertices()
            .iter()
            .any(|&v| geometry.is_collision_immune(v))
    }
}

/// Location of the contact on each side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Coordinates {
    /// Barycentric weights of the contact point on the triangle; `u + v + w = 1`.
    Face {
        /// Weight of `f0`.
        u: f64,
        /// Weight of `f1`.
        v: f64,
        /// Weight of `f2`.
        w: f64,
    },
    /// Parameters along edge A (`s`) and edge B (`t`).
    Edges {
        /// Parameter along edge A.
        s: f64,
        /// Parameter along edge B.
        t: f64,
    },
}

impl Coordinates {
    /// Signed weights `c_i` such that the relative velocity of the contact
    /// points is `Σ c_i v_i`, ordered as [`PrimitivePair::vertices`].
    ///
    /// The vertex / edge B side carries positive weights.
    pub fn coefficients(&self) -> [f64; 4] {
        match *self {
            Self::Face { u, v, w } => [1.0, -u, -v, -w],
            Self::Edges { s, t } => [-(1.0 - s), -s, 1.0 - t, t],
        }
    }

    /// Weights as a flat list (`[u, v, w]` or `[s, t]`).
    pub fn weights(&self) -> Vec<f64> {
        match *self {
            Self::Face { u, v, w } => vec![u, v, w],
            Self::Edges { s, t } => vec![s, t],
        }
    }
}

/// The characterization of a continuous-time collision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Impact {
    /// Fraction of the step at which the primitives touch, in `[0, 1]`.
    pub time: f64,
    /// Unit normal, oriented so that `relative_velocity ≤ 0`.
    pub normal: Vec3,
    /// Normal component of the relative velocity; negative means approaching.
    pub relative_velocity: f64,
    /// Contact coordinates.
    pub coords: Coordinates,
}

/// A continuous-time collision record.
///
/// Created from primitive ids and populated exactly once by the narrow phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousCollision {
    /// Participating primitives.
    pub pair: PrimitivePair,
    impact: Option<Impact>,
}

impl ContinuousCollision {
    /// An unanalysed record.
    pub fn new(pair: PrimitivePair) -> Self {
        Self { pair, impact: None }
    }

    /// Whether the narrow phase has populated this record.
    #[inline]
    pub fn is_analysed(&self) -> bool {
        self.impact.is_some()
    }

    /// The impact, if analysed.
    #[inline]
    pub fn impact(&self) -> Option<&Impact> {
        self.impact.as_ref()
    }

    /// Populates the record. Fails if it already holds an impact.
    pub fn set_impact(&mut self, impact: Impact) -> WeftResult<()> {
        if self.impact.is_some() {
            return Err(WeftError::AlreadyAnalysed);
        }
        self.impact = Some(impact);
        Ok(())
    }

    fn analysed(&self) -> &Impact {
        match &self.impact {
            Some(impact) => impact,
            None => panic!("collision record read before analysis: {:?}", self.pair),
        }
    }

    /// Collision time. Panics if not analysed.
    pub fn time(&self) -> f64 {
        self.analysed().time
    }

    /// Collision normal. Panics if not analysed.
    pub fn normal(&self) -> Vec3 {
        self.analysed().normal
    }

    /// Normal relative velocity. Panics if not analysed.
    pub fn relative_velocity(&self) -> f64 {
        self.analysed().relative_velocity
    }

    /// Contact coordinates. Panics if not analysed.
    pub fn coordinates(&self) -> Coordinates {
        self.analysed().coords
    }
}

/// A proximity (discrete) collision record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityCollision {
    /// Participating primitives.
    pub pair: PrimitivePair,
    /// Radius sum minus current distance; positive.
    pub penetration: f64,
    /// Current distance between the closest points.
    pub distance: f64,
    /// Unit normal from the face toward the vertex, or from edge A toward edge B.
    pub normal: Vec3,
    /// Effective radii `[vertex or edge A, face or edge B]` at the closest points.
    pub radii: [f64; 2],
    /// Closest-point coordinates.
    pub coords: Coordinates,
}

/// A vertex held off a triangle by a penalty spring.
///
/// The spring acts along the face's outward normal and engages once the
/// vertex comes within `radii[0] + radii[1] + thickness` of the plane through
/// `contact_point`. The contact point stays fixed for the lifetime of the
/// record, so the force can be re-evaluated at trial positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyContact {
    /// Always a vertex-face pair.
    pub pair: PrimitivePair,
    /// Effective radii `[vertex, face]`.
    pub radii: [f64; 2],
    /// Extra shell thickness on top of the radius sum.
    pub thickness: f64,
    /// Spring stiffness.
    pub stiffness: f64,
    /// Unit normal given by the face winding, `(f1 - f0) × (f2 - f0)`.
    pub normal: Vec3,
    /// Point of the face closest to the vertex.
    pub contact_point: Vec3,
    /// Barycentric weights of `contact_point`.
    pub coords: Coordinates,
}

impl PenaltyContact {
    /// Distance the spring engages at.
    pub fn reach(&self) -> f64 {
        self.radii[0] + self.radii[1] + self.thickness
    }

    /// How far a vertex at `position` sits inside the shell; negative when clear.
    pub fn depth(&self, position: Vec3) -> f64 {
        self.reach() - (position - self.contact_point).dot(self.normal)
    }

    /// Force on a vertex at `position`: `k · depth · n` inside the shell, zero outside.
    pub fn force(&self, position: Vec3) -> Vec3 {
        let depth = self.depth(position);
        if depth > 0.0 {
            self.normal * (self.stiffness * depth)
        } else {
            Vec3::ZERO
        }
    }

    /// The vertex force and its reaction spread over the face corners by
    /// barycentric weight, ordered as [`PrimitivePair::vertices`].
    pub fn forces(&self, position: Vec3) -> [(VertexId, Vec3); 4] {
        let f = self.force(position);
        let c = self.coords.coefficients();
        let ids = self.pair.vertices();
        std::array::from_fn(|i| (ids[i], f * c[i]))
    }
}

/// Either mode of collision record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Collision {
    /// Swept over a step.
    Continuous(ContinuousCollision),
    /// From current positions.
    Proximity(ProximityCollision),
}

impl Collision {
    /// Participating primitives.
    pub fn pair(&self) -> &PrimitivePair {
        match self {
            Self::Continuous(c) => &c.pair,
            Self::Proximity(p) => &p.pair,
        }
    }

    /// Kind tag.
    pub fn kind(&self) -> CollisionKind {
        self.pair().kind()
    }
}

impl From<ContinuousCollision> for Collision {
    fn from(c: ContinuousCollision) -> Self {
        Self::Continuous(c)
    }
}

impl From<ProximityCollision> for Collision {
    fn from(p: ProximityCollision) -> Self {
        Self::Proximity(p)
    }
}

/// Sorts records by collision time, earliest first. Unanalysed records go last.
pub fn sort_by_time(collisions: &mut [ContinuousCollision]) {
    collisions.sort_by(|a, b| match (a.impact(), b.impact()) {
        (Some(x), Some(y)) => x.time.total_cmp(&y.time),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
