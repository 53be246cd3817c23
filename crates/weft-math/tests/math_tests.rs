//! Integration tests for weft-math.

use weft_math::closest::{
    barycentric, closest_point_segment, closest_point_triangle, closest_points_segments,
};
use weft_math::roots::{
    collinearity_times, contact_times, coplanar_throughout, coplanarity_cubic, coplanarity_times,
    roots_in_unit_interval, solve_quadratic, Cubic,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use weft_math::{Aabb, Vec3};

const THRESHOLD: f64 = 1e-12;

fn random_point(rng: &mut StdRng) -> Vec3 {
    Vec3::new(
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
    )
}

// ─── Aabb Tests ───────────────────────────────────────────────

#[test]
fn aabb_overlap_is_inclusive_on_faces() {
    let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
    let b = Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
    let c = Aabb::new(Vec3::new(1.0 + 1e-9, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
    assert!(a.overlaps(&b));
    assert!(b.overlaps(&a));
    assert!(!a.overlaps(&c));
}

#[test]
fn aabb_from_points_and_union() {
    let pts = [
        Vec3::new(1.0, -2.0, 0.5),
        Vec3::new(-1.0, 3.0, 0.0),
        Vec3::new(0.0, 0.0, 4.0),
    ];
    let bounds = Aabb::from_points(&pts).unwrap();
    assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, 0.0));
    assert_eq!(bounds.max, Vec3::new(1.0, 3.0, 4.0));
    assert!(Aabb::from_points(&[]).is_none());

    let other = Aabb::from_point(Vec3::new(5.0, 0.0, 0.0));
    let u = bounds.union(&other);
    assert!(u.contains(&bounds));
    assert!(u.contains(&other));
    assert_eq!(u.longest_axis(), 0);
}

#[test]
fn aabb_padding_grows_every_side() {
    let b = Aabb::from_point(Vec3::ZERO).padded(0.5);
    assert_eq!(b.min, Vec3::splat(-0.5));
    assert_eq!(b.max, Vec3::splat(0.5));
    assert_eq!(b.center(), Vec3::ZERO);
    assert_eq!(b.extent(), Vec3::ONE);
}

// ─── Root Finding Tests ──────────────────────────────────────

#[test]
fn quadratic_stable_roots() {
    let (roots, n) = solve_quadratic(1.0, -3.0, 2.0);
    assert_eq!(n, 2);
    assert!((roots[0] - 1.0).abs() < 1e-15);
    assert!((roots[1] - 2.0).abs() < 1e-15);

    let (_, n) = solve_quadratic(1.0, 0.0, 1.0);
    assert_eq!(n, 0);

    let (roots, n) = solve_quadratic(0.0, 2.0, -1.0);
    assert_eq!(n, 1);
    assert!((roots[0] - 0.5).abs() < 1e-15);
}

#[test]
fn cubic_with_three_roots_in_unit_interval() {
    // (t - 0.2)(t - 0.5)(t - 0.9)
    let cubic = Cubic {
        coeffs: [-0.09, 0.73, -1.6, 1.0],
    };
    let roots = roots_in_unit_interval(&cubic, THRESHOLD);
    assert_eq!(roots.len(), 3);
    for (root, expected) in roots.iter().zip([0.2, 0.5, 0.9]) {
        assert!((root.time - expected).abs() < 1e-12, "{root:?}");
        assert!(root.error < 1e-12);
    }
}

#[test]
fn cubic_roots_outside_interval_are_ignored() {
    // (t + 1)(t - 2)(t - 3)
    let cubic = Cubic {
        coeffs: [6.0, 1.0, -4.0, 1.0],
    };
    assert!(roots_in_unit_interval(&cubic, THRESHOLD).is_empty());
}

#[test]
fn negligible_leading_coefficient_degrades_to_linear() {
    // 1e-20 t³ + t - 0.25: the cubic term is numerical noise.
    let cubic = Cubic {
        coeffs: [-0.25, 1.0, 0.0, 1e-20],
    };
    let roots = roots_in_unit_interval(&cubic, THRESHOLD);
    assert_eq!(roots.len(), 1);
    assert!((roots[0].time - 0.25).abs() < 1e-14);
}

#[test]
fn double_root_at_critical_point_is_found() {
    // (t - 0.5)²
    let cubic = Cubic {
        coeffs: [0.25, -1.0, 1.0, 0.0],
    };
    let roots = roots_in_unit_interval(&cubic, THRESHOLD);
    assert_eq!(roots.len(), 1);
    assert!((roots[0].time - 0.5).abs() < 1e-12);
}

#[test]
fn point_crossing_static_triangle_is_coplanar_halfway() {
    let start = [
        Vec3::new(0.25, 0.25, 1.0),
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    ];
    let mut end = start;
    end[0].z = -1.0;

    let cubic = coplanarity_cubic(&start, &end);
    assert_eq!(cubic.coeffs[2], 0.0);
    assert_eq!(cubic.coeffs[3], 0.0);

    let times = coplanarity_times(&start, &end, THRESHOLD);
    assert_eq!(times.len(), 1);
    assert!((times[0].time - 0.5).abs() < 1e-14);
}

#[test]
fn coplanar_throughout_reports_step_endpoints() {
    let start = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
    ];
    let mut end = start;
    end[0] = Vec3::new(0.5, 0.5, 0.0);

    let times = coplanarity_times(&start, &end, THRESHOLD);
    let t: Vec<f64> = times.iter().map(|r| r.time).collect();
    assert_eq!(t, vec![0.0, 1.0]);
}

#[test]
fn falling_parallel_rod_crosses_the_line_halfway() {
    // Edge A rests on the x axis, edge B falls onto it from z = 0.5
    let start = [
        Vec3::ZERO,
        Vec3::X,
        Vec3::new(0.0, 0.0, 0.5),
        Vec3::new(1.0, 0.0, 0.5),
    ];
    let mut end = start;
    end[2].z = -0.5;
    end[3].z = -0.5;
    assert!(coplanar_throughout(&start, &end));

    let lines = [[2, 3, 0], [2, 3, 1], [0, 1, 2], [0, 1, 3]];
    let t: Vec<f64> = contact_times(&start, &end, THRESHOLD, &lines)
        .iter()
        .map(|r| r.time)
        .collect();
    assert_eq!(t.len(), 3);
    assert_eq!(t[0], 0.0);
    assert!((t[1] - 0.5).abs() < 1e-12);
    assert_eq!(t[2], 1.0);
}

#[test]
fn point_sliding_in_plane_crosses_each_edge_line() {
    let start = [
        Vec3::new(-1.0, 0.25, 0.0),
        Vec3::ZERO,
        Vec3::X,
        Vec3::Y,
    ];
    let mut end = start;
    end[0] = Vec3::new(1.0, 0.25, 0.0);

    let lines = [[1, 2, 0], [2, 3, 0], [3, 1, 0]];
    let t: Vec<f64> = contact_times(&start, &end, THRESHOLD, &lines)
        .iter()
        .map(|r| r.time)
        .collect();
    // x = 0 at t = 0.5, the hypotenuse at t = 0.875; the x axis is never crossed
    assert_eq!(t.len(), 4);
    assert!((t[1] - 0.5).abs() < 1e-12);
    assert!((t[2] - 0.875).abs() < 1e-12);
}

#[test]
fn contact_times_match_coplanarity_roots_off_plane() {
    let start = [
        Vec3::new(0.25, 0.25, 1.0),
        Vec3::ZERO,
        Vec3::X,
        Vec3::Y,
    ];
    let mut end = start;
    end[0].z = -1.0;
    assert!(!coplanar_throughout(&start, &end));
    assert_eq!(
        contact_times(&start, &end, THRESHOLD, &[[1, 2, 0]]),
        coplanarity_times(&start, &end, THRESHOLD)
    );
}

#[test]
fn collinearity_of_moving_triples() {
    // Point rising through the x axis at t = 0.25
    let times = collinearity_times(
        [Vec3::ZERO, Vec3::X, Vec3::new(0.5, -0.25, 0.0)],
        [Vec3::ZERO, Vec3::X, Vec3::new(0.5, 0.75, 0.0)],
        THRESHOLD,
    );
    assert!(!times.is_empty());
    assert!(times.iter().all(|t| (t - 0.25).abs() < 1e-12));

    // Never collinear
    let parallel = collinearity_times(
        [Vec3::ZERO, Vec3::X, Vec3::Y],
        [Vec3::Z, Vec3::X + Vec3::Z, Vec3::Y + Vec3::Z],
        THRESHOLD,
    );
    assert!(parallel.is_empty());

    // Collinear for the whole step carries no timing
    let sliding = collinearity_times(
        [Vec3::ZERO, Vec3::X, Vec3::new(2.0, 0.0, 0.0)],
        [Vec3::ZERO, Vec3::X, Vec3::new(0.5, 0.0, 0.0)],
        THRESHOLD,
    );
    assert!(sliding.is_empty());
}

#[test]
fn separated_parallel_motion_has_no_coplanarity() {
    let start = [
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    ];
    let offset = Vec3::new(0.3, 0.1, 0.0);
    let end = start.map(|p| p + offset);
    assert!(coplanarity_times(&start, &end, THRESHOLD).is_empty());
}

// ─── Closest Point Tests ──────────────────────────────────────

#[test]
fn closest_point_triangle_regions() {
    let a = Vec3::ZERO;
    let b = Vec3::X;
    let c = Vec3::Y;

    let inside = closest_point_triangle(Vec3::new(0.25, 0.25, 3.0), a, b, c);
    assert!((inside.point - Vec3::new(0.25, 0.25, 0.0)).length() < 1e-15);
    let [u, v, w] = inside.barycentric;
    assert!((u - 0.5).abs() < 1e-15 && (v - 0.25).abs() < 1e-15 && (w - 0.25).abs() < 1e-15);

    let vertex = closest_point_triangle(Vec3::new(-1.0, -1.0, 0.0), a, b, c);
    assert_eq!(vertex.point, a);
    assert_eq!(vertex.barycentric, [1.0, 0.0, 0.0]);

    let edge = closest_point_triangle(Vec3::new(0.5, -2.0, 1.0), a, b, c);
    assert!((edge.point - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-15);

    let hypotenuse = closest_point_triangle(Vec3::new(1.0, 1.0, 0.0), a, b, c);
    assert!((hypotenuse.point - Vec3::new(0.5, 0.5, 0.0)).length() < 1e-15);
    assert!((hypotenuse.barycentric.iter().sum::<f64>() - 1.0).abs() < 1e-15);
}

#[test]
fn closest_point_on_collinear_triangle_does_not_produce_nan() {
    let a = Vec3::ZERO;
    let b = Vec3::X;
    let c = Vec3::new(2.0, 0.0, 0.0);
    let hit = closest_point_triangle(Vec3::new(1.5, 1.0, 0.0), a, b, c);
    assert!(hit.point.is_finite());
    assert!((hit.point - Vec3::new(1.5, 0.0, 0.0)).length() < 1e-12);
}

#[test]
fn barycentric_sums_to_one_and_extends_outside() {
    let a = Vec3::ZERO;
    let b = Vec3::X;
    let c = Vec3::Y;
    let [u, v, w] = barycentric(a, b, c, Vec3::new(1.0 / 3.0, 1.0 / 3.0, 0.0)).unwrap();
    assert!((u - 1.0 / 3.0).abs() < 1e-15);
    assert!((v - 1.0 / 3.0).abs() < 1e-15);
    assert!((w - 1.0 / 3.0).abs() < 1e-15);

    let outside = barycentric(a, b, c, Vec3::new(2.0, 0.0, 0.0)).unwrap();
    assert!(outside[0] < 0.0);
    assert!((outside.iter().sum::<f64>() - 1.0).abs() < 1e-15);

    assert!(barycentric(a, b, b, Vec3::ZERO).is_none());
}

#[test]
fn closest_point_segment_clamps() {
    let (t, p) = closest_point_segment(Vec3::new(3.0, 1.0, 0.0), Vec3::ZERO, Vec3::X);
    assert_eq!(t, 1.0);
    assert_eq!(p, Vec3::X);

    let (t, p) = closest_point_segment(Vec3::ONE, Vec3::ONE, Vec3::ONE);
    assert_eq!(t, 0.0);
    assert_eq!(p, Vec3::ONE);
}

#[test]
fn crossing_segments_meet() {
    let pair = closest_points_segments(
        Vec3::new(-1.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    );
    assert!(pair.distance_sq < 1e-30);
    assert!((pair.s - 0.5).abs() < 1e-15);
    assert!((pair.t - 0.5).abs() < 1e-15);
}

#[test]
fn parallel_segments_report_perpendicular_gap() {
    let pair = closest_points_segments(
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 0.001, 0.0),
        Vec3::new(1.0, 0.001, 0.0),
    );
    assert!((pair.distance_sq.sqrt() - 0.001).abs() < 1e-15);
    let gap = pair.on_second - pair.on_first;
    assert!(gap.dot(Vec3::X).abs() < 1e-15);
}

#[test]
fn degenerate_segments_reduce_to_points() {
    let pair = closest_points_segments(Vec3::ZERO, Vec3::ZERO, Vec3::ONE, Vec3::ONE);
    assert_eq!(pair.s, 0.0);
    assert_eq!(pair.t, 0.0);
    assert!((pair.distance_sq - 3.0).abs() < 1e-15);

    let pair = closest_points_segments(
        Vec3::new(0.5, 1.0, 0.0),
        Vec3::new(0.5, 1.0, 0.0),
        Vec3::ZERO,
        Vec3::X,
    );
    assert!((pair.t - 0.5).abs() < 1e-15);
    assert!((pair.distance_sq - 1.0).abs() < 1e-15);
}

#[test]
fn segment_distance_never_exceeds_sampled_distance() {
    let mut rng = StdRng::seed_from_u64(0x5e6);
    for _ in 0..200 {
        let (p1, q1) = (random_point(&mut rng), random_point(&mut rng));
        let (p2, q2) = (random_point(&mut rng), random_point(&mut rng));
        let pair = closest_points_segments(p1, q1, p2, q2);
        assert!((0.0..=1.0).contains(&pair.s));
        assert!((0.0..=1.0).contains(&pair.t));

        for i in 0..=16 {
            for j in 0..=16 {
                let a = p1.lerp(q1, i as f64 / 16.0);
                let b = p2.lerp(q2, j as f64 / 16.0);
                assert!(pair.distance_sq <= (a - b).length_squared() + 1e-12);
            }
        }
    }
}

#[test]
fn triangle_distance_never_exceeds_vertex_distance() {
    let mut rng = StdRng::seed_from_u64(0x7a1);
    for _ in 0..200 {
        let v: Vec<Vec3> = (0..4).map(|_| random_point(&mut rng)).collect();
        let hit = closest_point_triangle(v[0], v[1], v[2], v[3]);
        let d = (hit.point - v[0]).length_squared();
        for corner in &v[1..] {
            assert!(d <= (*corner - v[0]).length_squared() + 1e-12);
        }
        let [u, bv, w] = hit.barycentric;
        let rebuilt = v[1] * u + v[2] * bv + v[3] * w;
        assert!((rebuilt - hit.point).length() < 1e-9);
    }
}
