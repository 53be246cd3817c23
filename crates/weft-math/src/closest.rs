//! Closest-point queries between points, segments and triangles.
//!
//! Follows the Voronoi-region formulations from Ericson,
//! *Real-Time Collision Detection* (§5.1.2, §5.1.5, §5.1.9), with explicit
//! handling of degenerate (zero-length / zero-area) inputs.

use crate::Vec3;

/// Squared length under which a segment is treated as a point.
const SEGMENT_EPSILON: f64 = 1.0e-30;

/// Closest point on a triangle together with its barycentric weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrianglePoint {
    /// The closest point on the (closed) triangle.
    pub point: Vec3,
    /// Weights `[u, v, w]` of the triangle vertices; they sum to 1.
    pub barycentric: [f64; 3],
}

/// Closest points between two segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentPair {
    /// Parameter along the first segment, in `[0, 1]`.
    pub s: f64,
    /// Parameter along the second segment, in `[0, 1]`.
    pub t: f64,
    /// Closest point on the first segment.
    pub on_first: Vec3,
    /// Closest point on the second segment.
    pub on_second: Vec3,
    /// Squared distance between the two closest points.
    pub distance_sq: f64,
}

/// Closest point to `p` on segment `ab`, returned as `(parameter, point)`.
pub fn closest_point_segment(p: Vec3, a: Vec3, b: Vec3) -> (f64, Vec3) {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= SEGMENT_EPSILON {
        return (0.0, a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (t, a + ab * t)
}

/// Closest point to `p` on triangle `abc`.
pub fn closest_point_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> TrianglePoint {
    let ab = b - a;
    let ac = c - a;

    // Vertex region A
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return TrianglePoint { point: a, barycentric: [1.0, 0.0, 0.0] };
    }

    // Vertex region B
    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return TrianglePoint { point: b, barycentric: [0.0, 1.0, 0.0] };
    }

    // Edge region AB
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return TrianglePoint { point: a + ab * v, barycentric: [1.0 - v, v, 0.0] };
    }

    // Vertex region C
    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return TrianglePoint { point: c, barycentric: [0.0, 0.0, 1.0] };
    }

    // Edge region AC
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return TrianglePoint { point: a + ac * w, barycentric: [1.0 - w, 0.0, w] };
    }

    // Edge region BC
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return TrianglePoint {
            point: b + (c - b) * w,
            barycentric: [0.0, 1.0 - w, w],
        };
    }

    // Face region
    let sum = va + vb + vc;
    if sum.abs() <= f64::MIN_POSITIVE || !sum.is_finite() {
        return closest_point_degenerate_triangle(p, a, b, c);
    }
    let denom = 1.0 / sum;
    let v = vb * denom;
    let w = vc * denom;
    TrianglePoint {
        point: a + ab * v + ac * w,
        barycentric: [1.0 - v - w, v, w],
    }
}

/// A zero-area triangle is the union of its edges.
fn closest_point_degenerate_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> TrianglePoint {
    let (t_ab, on_ab) = closest_point_segment(p, a, b);
    let (t_bc, on_bc) = closest_point_segment(p, b, c);
    let (t_ca, on_ca) = closest_point_segment(p, c, a);

    let candidates = [
        (on_ab, [1.0 - t_ab, t_ab, 0.0]),
        (on_bc, [0.0, 1.0 - t_bc, t_bc]),
        (on_ca, [t_ca, 0.0, 1.0 - t_ca]),
    ];
    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        if (candidate.0 - p).length_squared() < (best.0 - p).length_squared() {
            best = *candidate;
        }
    }
    TrianglePoint { point: best.0, barycentric: best.1 }
}

/// Barycentric coordinates `[u, v, w]` of `p` projected onto the plane of `abc`.
///
/// The weights are not clamped, so a point outside the triangle yields
/// negative entries. Returns `None` for a zero-area triangle.
pub fn barycentric(a: Vec3, b: Vec3, c: Vec3, p: Vec3) -> Option<[f64; 3]> {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);

    let denom = d00 * d11 - d01 * d01;
    if denom.abs() <= f64::EPSILON * d00 * d11 {
        return None;
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    Some([1.0 - v - w, v, w])
}

/// Closest points between segments `p1q1` and `p2q2`.
pub fn closest_points_segments(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> SegmentPair {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.dot(d1);
    let e = d2.dot(d2);
    let f = d2.dot(r);

    let (s, t) = if a <= SEGMENT_EPSILON && e <= SEGMENT_EPSILON {
        // Both segments degenerate into points
        (0.0, 0.0)
    } else if a <= SEGMENT_EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e <= SEGMENT_EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            // Parallel segments: pick s = 0 and let t follow.
            let mut s = if denom > 0.0 {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    let on_first = p1 + d1 * s;
    let on_second = p2 + d2 * t;
    SegmentPair {
        s,
        t,
        on_first,
        on_second,
        distance_sq: (on_first - on_second).length_squared(),
    }
}
