//! Coplanarity times of four linearly moving points.
//!
//! Four points moving linearly over a timestep are coplanar exactly when
//! the signed volume of their tetrahedron vanishes. That volume is a cubic
//! in the normalized time `t ∈ [0, 1]`:
//!
//! ```text
//! V(t) = (a1 + t b1) · ((a2 + t b2) × (a3 + t b3))
//! ```
//!
//! where `a_i = x_i − x_0` are start offsets and `b_i` the corresponding
//! relative displacements. Roots are isolated by splitting `[0, 1]` at the
//! critical points (where the cubic is monotone in between) and bisecting
//! every bracket with a sign change.
//!
//! When the four points share a plane for the whole step the cubic vanishes
//! identically and carries no timing information. Contact inside that plane
//! can only begin when a point crosses the line of an edge, so
//! [`contact_times`] adds the collinearity instants of caller-chosen
//! point/line triples.

use crate::Vec3;

/// Bisection iterations per bracket. Enough to exhaust `f64` resolution on `[0, 1]`.
const MAX_BISECTION_ITERATIONS: u32 = 64;

/// Residual (on the normalized cubic) under which a sample counts as a root.
const ROOT_VALUE_TOLERANCE: f64 = 1.0e-14;

/// Roots closer than this are merged.
const ROOT_MERGE_DISTANCE: f64 = 1.0e-12;

/// Volume scale (relative to `L³`) under which the cubic counts as identically zero.
const IDENTICALLY_ZERO_SCALE: f64 = 1.0e-14;

/// A time in `[0, 1]` at which four moving points are coplanar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoplanarityRoot {
    /// Normalized time within the step.
    pub time: f64,
    /// Width of the bracket the root was isolated to.
    pub error: f64,
}

/// Cubic `c0 + c1 t + c2 t² + c3 t³`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cubic {
    /// Coefficients, lowest order first.
    pub coeffs: [f64; 4],
}

impl Cubic {
    /// Evaluates the polynomial with Horner's scheme.
    #[inline]
    pub fn eval(&self, t: f64) -> f64 {
        let [c0, c1, c2, c3] = self.coeffs;
        ((c3 * t + c2) * t + c1) * t + c0
    }

    /// Largest coefficient magnitude.
    pub fn scale(&self) -> f64 {
        self.coeffs.iter().fold(0.0_f64, |m, c| m.max(c.abs()))
    }
}

/// Builds the signed-volume cubic for points moving from `start` to `end`.
pub fn coplanarity_cubic(start: &[Vec3; 4], end: &[Vec3; 4]) -> Cubic {
    let d0 = end[0] - start[0];
    let a1 = start[1] - start[0];
    let a2 = start[2] - start[0];
    let a3 = start[3] - start[0];
    let b1 = (end[1] - start[1]) - d0;
    let b2 = (end[2] - start[2]) - d0;
    let b3 = (end[3] - start[3]) - d0;

    let a2xa3 = a2.cross(a3);
    let b2xb3 = b2.cross(b3);
    let a2xb3 = a2.cross(b3);
    let b2xa3 = b2.cross(a3);

    Cubic {
        coeffs: [
            a1.dot(a2xa3),
            b1.dot(a2xa3) + a1.dot(a2xb3 + b2xa3),
            a1.dot(b2xb3) + b1.dot(a2xb3 + b2xa3),
            b1.dot(b2xb3),
        ],
    }
}

/// Times in `[0, 1]` at which the four points are coplanar, ascending.
///
/// `threshold` is the relative magnitude below which a coefficient is
/// treated as zero, so the cubic degrades to a quadratic or a line.
/// When the points stay coplanar for the whole step the result is the
/// two candidate instants `{0, 1}`.
pub fn coplanarity_times(
    start: &[Vec3; 4],
    end: &[Vec3; 4],
    threshold: f64,
) -> Vec<CoplanarityRoot> {
    let cubic = coplanarity_cubic(start, end);
    let scale = cubic.scale();
    if !scale.is_finite() {
        return Vec::new();
    }
    if is_identically_zero(&cubic, start, end) {
        return step_endpoints();
    }
    roots_in_unit_interval(&cubic, threshold)
}

/// Whether the four points stay coplanar for the whole step.
pub fn coplanar_throughout(start: &[Vec3; 4], end: &[Vec3; 4]) -> bool {
    is_identically_zero(&coplanarity_cubic(start, end), start, end)
}

/// Candidate contact times in `[0, 1]` for four linearly moving points, ascending.
///
/// Normally these are the coplanarity roots. When the points are coplanar
/// for the whole step the candidates are `{0, 1}` plus every instant at
/// which a triple `[a, b, q]` of `lines` is collinear, i.e. point `q` lies on
/// the line through `a` and `b`.
pub fn contact_times(
    start: &[Vec3; 4],
    end: &[Vec3; 4],
    threshold: f64,
    lines: &[[usize; 3]],
) -> Vec<CoplanarityRoot> {
    let cubic = coplanarity_cubic(start, end);
    if !cubic.scale().is_finite() {
        return Vec::new();
    }
    if !is_identically_zero(&cubic, start, end) {
        return roots_in_unit_interval(&cubic, threshold);
    }

    let mut roots = step_endpoints();
    for &[a, b, q] in lines {
        let times = collinearity_times(
            [start[a], start[b], start[q]],
            [end[a], end[b], end[q]],
            threshold,
        );
        roots.extend(times.into_iter().map(|time| CoplanarityRoot { time, error: 0.0 }));
    }
    merge_roots(&mut roots);
    roots
}

/// Times in `[0, 1]` at which point `x[2]` lies on the line through `x[0]`
/// and `x[1]`, all three moving linearly from `start` to `end`. Ascending,
/// possibly with repeats.
///
/// Collinearity makes every component of `(x1 − x0) × (x2 − x0)` vanish.
/// That cross product is quadratic in `t`, so the roots of each component
/// that is not identically zero are collected. Triples collinear for the
/// whole step yield nothing.
pub fn collinearity_times(start: [Vec3; 3], end: [Vec3; 3], threshold: f64) -> Vec<f64> {
    let u0 = start[1] - start[0];
    let w0 = start[2] - start[0];
    let du = (end[1] - start[1]) - (end[0] - start[0]);
    let dw = (end[2] - start[2]) - (end[0] - start[0]);

    let c0 = u0.cross(w0);
    let c1 = u0.cross(dw) + du.cross(w0);
    let c2 = du.cross(dw);

    let scale = [c0, c1, c2]
        .iter()
        .fold(0.0_f64, |m, c| m.max(c.abs().max_element()));
    if scale == 0.0 || !scale.is_finite() {
        return Vec::new();
    }
    let cutoff = threshold * scale;
    let clean = |c: f64| if c.abs() < cutoff { 0.0 } else { c / scale };

    let mut times = Vec::new();
    for axis in 0..3 {
        let (a, b, c) = (clean(c2[axis]), clean(c1[axis]), clean(c0[axis]));
        if a == 0.0 && b == 0.0 {
            continue;
        }
        let (roots, count) = solve_quadratic(a, b, c);
        times.extend(
            roots[..count]
                .iter()
                .copied()
                .filter(|t| (-ROOT_MERGE_DISTANCE..=1.0 + ROOT_MERGE_DISTANCE).contains(t))
                .map(|t| t.clamp(0.0, 1.0)),
        );
    }
    times.sort_by(f64::total_cmp);
    times
}

fn is_identically_zero(cubic: &Cubic, start: &[Vec3; 4], end: &[Vec3; 4]) -> bool {
    let mut length = 0.0_f64;
    for i in 1..4 {
        length = length.max((start[i] - start[0]).length());
        length = length.max(((end[i] - start[i]) - (end[0] - start[0])).length());
    }
    cubic.scale() <= IDENTICALLY_ZERO_SCALE * length * length * length
}

fn step_endpoints() -> Vec<CoplanarityRoot> {
    vec![
        CoplanarityRoot { time: 0.0, error: 0.0 },
        CoplanarityRoot { time: 1.0, error: 0.0 },
    ]
}

/// Sorts ascending and merges roots closer than [`ROOT_MERGE_DISTANCE`].
fn merge_roots(roots: &mut Vec<CoplanarityRoot>) {
    roots.sort_by(|a, b| a.time.total_cmp(&b.time));
    roots.dedup_by(|later, earlier| {
        if later.time - earlier.time <= ROOT_MERGE_DISTANCE {
            earlier.error = earlier.error.max(later.error);
            true
        } else {
            false
        }
    });
}

/// Real roots of `cubic` inside `[0, 1]`, ascending.
pub fn roots_in_unit_interval(cubic: &Cubic, threshold: f64) -> Vec<CoplanarityRoot> {
    let scale = cubic.scale();
    if scale == 0.0 || !scale.is_finite() {
        return Vec::new();
    }

    let cutoff = threshold * scale;
    let normalized = Cubic {
        coeffs: cubic
            .coeffs
            .map(|c| if c.abs() < cutoff { 0.0 } else { c / scale }),
    };
    if normalized.coeffs[1..].iter().all(|&c| c == 0.0) {
        return Vec::new();
    }

    let mut breaks = vec![0.0];
    breaks.extend(critical_points(&normalized));
    breaks.push(1.0);

    let mut roots = Vec::with_capacity(3);
    for window in breaks.windows(2) {
        let (lo, hi) = (window[0], window[1]);
        let f_lo = normalized.eval(lo);
        let f_hi = normalized.eval(hi);
        let lo_is_root = f_lo.abs() <= ROOT_VALUE_TOLERANCE;
        let hi_is_root = f_hi.abs() <= ROOT_VALUE_TOLERANCE;

        if lo_is_root {
            roots.push(CoplanarityRoot { time: lo, error: 0.0 });
        }
        if hi_is_root {
            roots.push(CoplanarityRoot { time: hi, error: 0.0 });
        }
        if !lo_is_root && !hi_is_root && (f_lo < 0.0) != (f_hi < 0.0) {
            roots.push(bisect(&normalized, lo, hi, f_lo));
        }
    }

    merge_roots(&mut roots);
    roots
}

/// Isolates the single root of a monotone bracket.
fn bisect(cubic: &Cubic, mut lo: f64, mut hi: f64, mut f_lo: f64) -> CoplanarityRoot {
    for _ in 0..MAX_BISECTION_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            break;
        }
        let f_mid = cubic.eval(mid);
        if f_mid == 0.0 {
            return CoplanarityRoot { time: mid, error: 0.0 };
        }
        if (f_mid < 0.0) == (f_lo < 0.0) {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    CoplanarityRoot {
        time: (0.5 * (lo + hi)).clamp(0.0, 1.0),
        error: hi - lo,
    }
}

/// Zeros of the derivative strictly inside `(0, 1)`, ascending.
fn critical_points(cubic: &Cubic) -> Vec<f64> {
    let [_, c1, c2, c3] = cubic.coeffs;
    let (roots, count) = solve_quadratic(3.0 * c3, 2.0 * c2, c1);
    let mut inner: Vec<f64> = roots[..count]
        .iter()
        .copied()
        .filter(|&t| t > 0.0 && t < 1.0)
        .collect();
    inner.sort_by(f64::total_cmp);
    inner
}

/// Real roots of `a t² + b t + c`, degrading to the linear case when `a == 0`.
///
/// Returns the roots and how many of them are valid.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> ([f64; 2], usize) {
    if a == 0.0 {
        if b == 0.0 {
            return ([0.0; 2], 0);
        }
        return ([-c / b, 0.0], 1);
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return ([0.0; 2], 0);
    }
    if disc == 0.0 {
        return ([-b / (2.0 * a), 0.0], 1);
    }

    // Numerically stable form: avoid cancellation between -b and sqrt(disc).
    let sqrt_disc = disc.sqrt();
    let q = if b >= 0.0 {
        -0.5 * (b + sqrt_disc)
    } else {
        -0.5 * (b - sqrt_disc)
    };
    let r0 = q / a;
    let r1 = if q != 0.0 { c / q } else { -r0 };
    ([r0.min(r1), r0.max(r1)], 2)
}
