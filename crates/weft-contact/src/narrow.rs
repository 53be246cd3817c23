//! Narrow phase collision detection.
//!
//! Decides, for one candidate pair, whether a genuine collision occurs.
//!
//! - **Continuous-time**: points move linearly over the step. The pair can
//!   only touch when its four points are coplanar, so the coplanarity times
//!   are found first and an exact closest-point test runs at each one, earliest
//!   first. Pairs that share a plane for the whole step are instead tested
//!   whenever a point crosses the line of an edge of the other primitive.
//! - **Proximity**: current positions only. The pair collides when the
//!   closest-point distance is below the sum of the effective radii.
//!   [`penalty_contact`] widens that test by a shell thickness and returns
//!   a spring record instead.
//!
//! The position-level kernels ([`vertex_face_ccd`], [`edge_edge_ccd`]) take
//! raw start/end positions so that callers can sweep pseudo-motions that
//! are not the geometry's actual velocities.

use weft_math::closest::{barycentric, closest_point_triangle, closest_points_segments};
use weft_math::roots::contact_times;
use weft_math::Vec3;
use weft_types::constants::DEGENERATE_NORMAL_THRESHOLD;
use weft_types::{WeftError, WeftResult};

use crate::collision::{
    ContinuousCollision, Coordinates, Impact, PenaltyContact, PrimitivePair, ProximityCollision,
};
use crate::config::NarrowPhaseParams;
use crate::geometry::GeometryQuery;

/// Point/line triples `[a, b, q]` tracked when a vertex-face sweep stays in
/// one plane: the vertex against each triangle edge.
const VERTEX_FACE_LINES: [[usize; 3]; 3] = [[1, 2, 0], [2, 3, 0], [3, 1, 0]];

/// The edge-edge counterpart: each endpoint against the other edge.
const EDGE_EDGE_LINES: [[usize; 3]; 4] = [[2, 3, 0], [2, 3, 1], [0, 1, 2], [0, 1, 3]];

/// A touching instant found by a continuous-time kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CcdHit {
    /// Fraction of the sweep, in `[0, 1]`.
    pub time: f64,
    /// Contact coordinates at `time`.
    pub coords: Coordinates,
    /// Squared closest-point distance at `time`.
    pub distance_sq: f64,
    /// Bracket width of the coplanarity root.
    pub root_error: f64,
}

/// Positions at fraction `t` of the sweep.
#[inline]
pub fn interpolate(start: &[Vec3; 4], end: &[Vec3; 4], t: f64) -> [Vec3; 4] {
    std::array::from_fn(|i| start[i].lerp(end[i], t))
}

#[inline]
fn within_unit(weights: &[f64], tolerance: f64) -> bool {
    weights
        .iter()
        .all(|&w| w >= -tolerance && w <= 1.0 + tolerance)
}

/// Earliest time a point sweeping `start[0] → end[0]` touches the triangle
/// sweeping `start[1..4] → end[1..4]`.
pub fn vertex_face_ccd(
    start: &[Vec3; 4],
    end: &[Vec3; 4],
    params: &NarrowPhaseParams,
) -> Option<CcdHit> {
    if start == end {
        return None;
    }

    for root in contact_times(start, end, params.coefficient_threshold, &VERTEX_FACE_LINES) {
        let [p, a, b, c] = interpolate(start, end, root.time);
        let closest = closest_point_triangle(p, a, b, c);
        let distance_sq = (p - closest.point).length_squared();
        if distance_sq >= params.touch_distance_sq {
            continue;
        }

        let [u, v, w] = barycentric(a, b, c, p).unwrap_or(closest.barycentric);
        if !within_unit(&[u, v, w], params.barycentric_tolerance) {
            continue;
        }
        return Some(CcdHit {
            time: root.time,
            coords: Coordinates::Face { u, v, w },
            distance_sq,
            root_error: root.error,
        });
    }
    None
}

/// Earliest time edge `start[0..2] → end[0..2]` touches edge
/// `start[2..4] → end[2..4]`.
pub fn edge_edge_ccd(
    start: &[Vec3; 4],
    end: &[Vec3; 4],
    params: &NarrowPhaseParams,
) -> Option<CcdHit> {
    if start == end {
        return None;
    }

    for root in contact_times(start, end, params.coefficient_threshold, &EDGE_EDGE_LINES) {
        let [a0, a1, b0, b1] = interpolate(start, end, root.time);
        let closest = closest_points_segments(a0, a1, b0, b1);
        if closest.distance_sq >= params.touch_distance_sq {
            continue;
        }
        if !within_unit(&[closest.s, closest.t], params.barycentric_tolerance) {
            continue;
        }
        return Some(CcdHit {
            time: root.time,
            coords: Coordinates::Edges {
                s: closest.s,
                t: closest.t,
            },
            distance_sq: closest.distance_sq,
            root_error: root.error,
        });
    }
    None
}

/// Whether segment `pq` passes through the static triangle `tri`.
///
/// Sweeps a point from `p` to `q` against the triangle.
pub fn segment_hits_triangle(p: Vec3, q: Vec3, tri: [Vec3; 3], params: &NarrowPhaseParams) -> bool {
    let [a, b, c] = tri;
    vertex_face_ccd(&[p, a, b, c], &[q, a, b, c], params).is_some()
}

/// Unit `a × b`, or `None` when the vectors are (nearly) parallel or zero.
fn unit_cross(a: Vec3, b: Vec3) -> Option<Vec3> {
    let scale = a.length() * b.length();
    let cross = a.cross(b);
    let len = cross.length();
    if scale > 0.0 && len > DEGENERATE_NORMAL_THRESHOLD * scale && len.is_finite() {
        Some(cross / len)
    } else {
        None
    }
}

/// Normal of the triangle `x[1..4]`.
fn face_normal(x: &[Vec3; 4]) -> Option<Vec3> {
    unit_cross(x[2] - x[1], x[3] - x[1])
}

/// Normal of the plane spanned by edges `x[0..2]` and `x[2..4]`.
fn edge_cross_normal(x: &[Vec3; 4]) -> Option<Vec3> {
    unit_cross(x[1] - x[0], x[3] - x[2])
}

/// Direction from edge A's closest point to edge B's.
fn edge_separation_normal(x: &[Vec3; 4]) -> Option<Vec3> {
    let closest = closest_points_segments(x[0], x[1], x[2], x[3]);
    (closest.on_second - closest.on_first).try_normalize()
}

/// Analyses a continuous-time record with default tolerances.
///
/// Returns `true` and populates the record if the primitives touch during
/// the step. Degenerate configurations are logged and reported as `false`.
pub fn analyse<G: GeometryQuery + ?Sized>(
    record: &mut ContinuousCollision,
    geometry: &G,
    dt: f64,
) -> bool {
    analyse_with(record, geometry, dt, &NarrowPhaseParams::default())
}

/// [`analyse`] with explicit tolerances.
pub fn analyse_with<G: GeometryQuery + ?Sized>(
    record: &mut ContinuousCollision,
    geometry: &G,
    dt: f64,
    params: &NarrowPhaseParams,
) -> bool {
    match try_analyse(record, geometry, dt, params) {
        Ok(confirmed) => confirmed,
        Err(err) => {
            tracing::warn!(pair = ?record.pair, %err, "collision analysis failed, skipping pair");
            false
        }
    }
}

/// Analyses a continuous-time record, reporting failures as typed errors.
///
/// - `Ok(false)`: no collision (trivially adjacent, motionless or a miss).
/// - `Ok(true)`: collision; the record now holds its [`Impact`].
/// - `Err(AlreadyAnalysed)`: the record was populated before.
/// - `Err(DegenerateGeometry)`: the primitives touch but no normal could be
///   formed; the record stays unpopulated.
pub fn try_analyse<G: GeometryQuery + ?Sized>(
    record: &mut ContinuousCollision,
    geometry: &G,
    dt: f64,
    params: &NarrowPhaseParams,
) -> WeftResult<bool> {
    if record.is_analysed() {
        return Err(WeftError::AlreadyAnalysed);
    }
    let pair = record.pair;
    if pair.shares_vertex() {
        return Ok(false);
    }

    let ids = pair.vertices();
    let velocities = ids.map(|v| geometry.velocity(v));
    if velocities.iter().all(|v| *v == Vec3::ZERO) {
        return Ok(false);
    }
    let start = ids.map(|v| geometry.position(v));
    let end: [Vec3; 4] = std::array::from_fn(|i| start[i] + velocities[i] * dt);

    let (hit, normal) = match pair {
        PrimitivePair::VertexFace { .. } => {
            let Some(hit) = vertex_face_ccd(&start, &end, params) else {
                return Ok(false);
            };
            let at = interpolate(&start, &end, hit.time);
            let normal = face_normal(&at)
                .or_else(|| face_normal(&start))
                .or_else(|| face_normal(&end))
                .ok_or_else(|| {
                    WeftError::DegenerateGeometry(format!(
                        "triangle of {pair:?} has no normal at contact, start or end"
                    ))
                })?;
            (hit, normal)
        }
        PrimitivePair::EdgeEdge { .. } => {
            if start[0] == start[1] || start[2] == start[3] {
                return Ok(false);
            }
            let Some(hit) = edge_edge_ccd(&start, &end, params) else {
                return Ok(false);
            };
            let at = interpolate(&start, &end, hit.time);
            let normal = edge_cross_normal(&at)
                .or_else(|| edge_cross_normal(&start))
                .or_else(|| edge_separation_normal(&start))
                .ok_or_else(|| {
                    WeftError::DegenerateGeometry(format!(
                        "edges of {pair:?} are parallel and touching at the start"
                    ))
                })?;
            (hit, normal)
        }
    };

    let coefficients = hit.coords.coefficients();
    let mut relative_velocity: f64 = coefficients
        .iter()
        .zip(velocities.iter())
        .map(|(c, v)| c * v.dot(normal))
        .sum();
    let mut normal = normal;
    if relative_velocity > 0.0 {
        normal = -normal;
        relative_velocity = -relative_velocity;
    }

    record.set_impact(Impact {
        time: hit.time,
        normal,
        relative_velocity,
        coords: hit.coords,
    })?;
    Ok(true)
}

/// Proximity test on current positions and radii.
///
/// Returns `Ok(None)` when the pair is adjacent or farther apart than its
/// radius sum. The effective radius of a face or edge is interpolated from
/// its vertex radii at the closest point.
pub fn proximity<G: GeometryQuery + ?Sized>(
    pair: &PrimitivePair,
    geometry: &G,
) -> WeftResult<Option<ProximityCollision>> {
    if pair.shares_vertex() {
        return Ok(None);
    }

    match *pair {
        PrimitivePair::VertexFace { vertex, face } => {
            let p = geometry.position(vertex);
            let [a, b, c] = face.map(|v| geometry.position(v));
            let closest = closest_point_triangle(p, a, b, c);
            let offset = p - closest.point;
            let distance = offset.length();

            let [u, v, w] = closest.barycentric;
            let r_vertex = geometry.radius(vertex);
            let r_face = u * geometry.radius(face[0])
                + v * geometry.radius(face[1])
                + w * geometry.radius(face[2]);
            let penetration = r_vertex + r_face - distance;
            if !(penetration > 0.0) {
                return Ok(None);
            }

            let normal = if distance > 0.0 {
                offset / distance
            } else {
                unit_cross(b - a, c - a).ok_or_else(|| {
                    WeftError::DegenerateGeometry(format!(
                        "vertex lies on a zero-area triangle in {pair:?}"
                    ))
                })?
            };
            Ok(Some(ProximityCollision {
                pair: *pair,
                penetration,
                distance,
                normal,
                radii: [r_vertex, r_face],
                coords: Coordinates::Face { u, v, w },
            }))
        }
        PrimitivePair::EdgeEdge { edge_a, edge_b } => {
            let [a0, a1] = edge_a.map(|v| geometry.position(v));
            let [b0, b1] = edge_b.map(|v| geometry.position(v));
            let closest = closest_points_segments(a0, a1, b0, b1);
            let distance = closest.distance_sq.sqrt();

            let (s, t) = (closest.s, closest.t);
            let r_a = (1.0 - s) * geometry.radius(edge_a[0]) + s * geometry.radius(edge_a[1]);
            let r_b = (1.0 - t) * geometry.radius(edge_b[0]) + t * geometry.radius(edge_b[1]);
            let penetration = r_a + r_b - distance;
            if !(penetration > 0.0) {
                return Ok(None);
            }

            let normal = if distance > 0.0 {
                (closest.on_second - closest.on_first) / distance
            } else {
                unit_cross(a1 - a0, b1 - b0).ok_or_else(|| {
                    WeftError::DegenerateGeometry(format!(
                        "edges of {pair:?} overlap along a common line"
                    ))
                })?
            };
            Ok(Some(ProximityCollision {
                pair: *pair,
                penetration,
                distance,
                normal,
                radii: [r_a, r_b],
                coords: Coordinates::Edges { s, t },
            }))
        }
    }
}

/// Penalty spring between a vertex and a face on current positions.
///
/// Returns `Ok(None)` when the pair is adjacent or the vertex is at least
/// `r_vertex + r_face + thickness` from the face. Only vertex-face pairs
/// are accepted.
pub fn penalty_contact<G: GeometryQuery + ?Sized>(
    pair: &PrimitivePair,
    geometry: &G,
    thickness: f64,
    stiffness: f64,
) -> WeftResult<Option<PenaltyContact>> {
    if !(thickness >= 0.0 && thickness.is_finite()) {
        return Err(WeftError::InvalidArgument(format!(
            "penalty thickness must be finite and non-negative, got {thickness}"
        )));
    }
    if !(stiffness > 0.0 && stiffness.is_finite()) {
        return Err(WeftError::InvalidArgument(format!(
            "penalty stiffness must be finite and positive, got {stiffness}"
        )));
    }
    let PrimitivePair::VertexFace { vertex, face } = *pair else {
        return Err(WeftError::InvalidArgument(format!(
            "penalty contacts need a vertex-face pair, got {pair:?}"
        )));
    };
    if pair.shares_vertex() {
        return Ok(None);
    }

    let p = geometry.position(vertex);
    let [a, b, c] = face.map(|v| geometry.position(v));
    let closest = closest_point_triangle(p, a, b, c);
    let [u, v, w] = closest.barycentric;
    let r_vertex = geometry.radius(vertex);
    let r_face =
        u * geometry.radius(face[0]) + v * geometry.radius(face[1]) + w * geometry.radius(face[2]);
    if (p - closest.point).length() >= r_vertex + r_face + thickness {
        return Ok(None);
    }

    let normal = unit_cross(b - a, c - a).ok_or_else(|| {
        WeftError::DegenerateGeometry(format!("penalty face of {pair:?} has no normal"))
    })?;
    Ok(Some(PenaltyContact {
        pair: *pair,
        radii: [r_vertex, r_face],
        thickness,
        stiffness,
        normal,
        contact_point: closest.point,
        coords: Coordinates::Face { u, v, w },
    }))
}
