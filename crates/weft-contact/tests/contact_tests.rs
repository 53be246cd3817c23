//! Integration tests for weft-contact records, configuration and geometry.

use weft_contact::collision::sort_by_time;
use weft_contact::{
    BroadPhaseKind, Collision, CollisionConfig, CollisionKind, ContinuousCollision, Coordinates,
    GeometryQuery, GeometryStore, Impact, MeshQuery, PrimitivePair, VelocityChange,
};
use weft_math::Vec3;
use weft_mesh::generators::{append_rod, quad_grid, single_triangle};
use weft_types::{EdgeId, TriangleId, VertexId, WeftError};

fn vf(p: u32, f: [u32; 3]) -> PrimitivePair {
    PrimitivePair::vertex_face(VertexId(p), f.map(VertexId))
}

fn ee(a: [u32; 2], b: [u32; 2]) -> PrimitivePair {
    PrimitivePair::edge_edge(a.map(VertexId), b.map(VertexId))
}

fn impact_at(time: f64) -> Impact {
    Impact {
        time,
        normal: Vec3::Z,
        relative_velocity: -1.0,
        coords: Coordinates::Face {
            u: 0.2,
            v: 0.3,
            w: 0.5,
        },
    }
}

// ─── Primitive Pair Tests ─────────────────────────────────────

#[test]
fn pair_vertices_order() {
    assert_eq!(
        vf(7, [1, 2, 3]).vertices(),
        [VertexId(7), VertexId(1), VertexId(2), VertexId(3)]
    );
    assert_eq!(
        ee([4, 5], [8, 9]).vertices(),
        [VertexId(4), VertexId(5), VertexId(8), VertexId(9)]
    );
    assert_eq!(vf(0, [1, 2, 3]).kind(), CollisionKind::VertexFace);
    assert_eq!(ee([0, 1], [2, 3]).kind(), CollisionKind::EdgeEdge);
}

#[test]
fn shared_vertices_detected() {
    assert!(vf(2, [1, 2, 3]).shares_vertex());
    assert!(!vf(0, [1, 2, 3]).shares_vertex());
    assert!(ee([0, 1], [1, 2]).shares_vertex());
    assert!(!ee([0, 1], [2, 3]).shares_vertex());
    // An edge whose endpoints coincide is adjacent to itself
    assert!(ee([0, 0], [2, 3]).shares_vertex());
}

#[test]
fn pair_fixed_and_immune() {
    let mesh = quad_grid(1, 1, 1.0, 1.0);
    let mut store = GeometryStore::from_mesh(&mesh, 1.0, 0.0, &[true, true, true, false]).unwrap();
    let pair = vf(3, [0, 1, 2]);
    assert!(!pair.is_fixed(&store));
    store.set_fixed(VertexId(3), true);
    assert!(pair.is_fixed(&store));

    assert!(!pair.has_immune(&store));
    store.set_collision_immune(VertexId(1), true);
    assert!(pair.has_immune(&store));
}

// ─── Coordinates Tests ────────────────────────────────────────

#[test]
fn face_coefficients() {
    let coords = Coordinates::Face {
        u: 0.2,
        v: 0.3,
        w: 0.5,
    };
    assert_eq!(coords.coefficients(), [1.0, -0.2, -0.3, -0.5]);
    assert_eq!(coords.weights(), vec![0.2, 0.3, 0.5]);
    let sum: f64 = coords.coefficients().iter().sum();
    assert!(sum.abs() < 1e-12);
}

#[test]
fn edge_coefficients() {
    let coords = Coordinates::Edges { s: 0.25, t: 0.75 };
    assert_eq!(coords.coefficients(), [-0.75, -0.25, 0.25, 0.75]);
    assert_eq!(coords.weights(), vec![0.25, 0.75]);
    let sum: f64 = coords.coefficients().iter().sum();
    assert!(sum.abs() < 1e-12);
}

// ─── Continuous Record Tests ──────────────────────────────────

#[test]
fn record_starts_unanalysed() {
    let record = ContinuousCollision::new(vf(0, [1, 2, 3]));
    assert!(!record.is_analysed());
    assert!(record.impact().is_none());
}

#[test]
fn record_is_populated_once() {
    let mut record = ContinuousCollision::new(vf(0, [1, 2, 3]));
    record.set_impact(impact_at(0.4)).unwrap();
    assert!(record.is_analysed());
    assert_eq!(record.time(), 0.4);
    assert_eq!(record.normal(), Vec3::Z);
    assert_eq!(record.relative_velocity(), -1.0);

    let err = record.set_impact(impact_at(0.1)).unwrap_err();
    assert!(matches!(err, WeftError::AlreadyAnalysed));
    assert_eq!(record.time(), 0.4);
}

#[test]
#[should_panic]
fn reading_unanalysed_time_panics() {
    let record = ContinuousCollision::new(ee([0, 1], [2, 3]));
    let _ = record.time();
}

#[test]
fn sort_puts_earliest_first_and_unanalysed_last() {
    let mut records: Vec<ContinuousCollision> = [0.9, 0.1, 0.5]
        .into_iter()
        .enumerate()
        .map(|(i, t)| {
            let mut r = ContinuousCollision::new(vf(i as u32 + 10, [1, 2, 3]));
            r.set_impact(impact_at(t)).unwrap();
            r
        })
        .collect();
    records.insert(0, ContinuousCollision::new(vf(0, [1, 2, 3])));

    sort_by_time(&mut records);
    let times: Vec<Option<f64>> = records.iter().map(|r| r.impact().map(|i| i.time)).collect();
    assert_eq!(times, vec![Some(0.1), Some(0.5), Some(0.9), None]);
}

#[test]
fn collision_enum_wraps_records() {
    let record = ContinuousCollision::new(ee([0, 1], [2, 3]));
    let collision = Collision::from(record.clone());
    assert_eq!(collision.kind(), CollisionKind::EdgeEdge);
    assert_eq!(*collision.pair(), record.pair);
}

#[test]
fn record_serialization() {
    let mut record = ContinuousCollision::new(vf(4, [1, 2, 3]));
    record.set_impact(impact_at(0.25)).unwrap();
    let json = serde_json::to_string(&record).unwrap();
    let recovered: ContinuousCollision = serde_json::from_str(&json).unwrap();
    assert_eq!(recovered, record);
}

// ─── Config Tests ─────────────────────────────────────────────

#[test]
fn default_config_is_valid() {
    assert!(CollisionConfig::default().validate().is_ok());
    assert!(CollisionConfig::debug().validate().is_ok());
    assert!(CollisionConfig::high_quality().validate().is_ok());
    assert_eq!(CollisionConfig::default().broad_phase, BroadPhaseKind::Grid);
    assert_eq!(CollisionConfig::high_quality().broad_phase, BroadPhaseKind::Bvh);
}

#[test]
fn config_toml_partial_document() {
    let config = CollisionConfig::from_toml_str(
        r#"
        broad_phase = "bvh"
        edit_pad = 0.01
        "#,
    )
    .unwrap();
    assert_eq!(config.broad_phase, BroadPhaseKind::Bvh);
    assert_eq!(config.edit_pad, 0.01);
    assert_eq!(
        config.touch_distance_sq,
        CollisionConfig::default().touch_distance_sq
    );
    assert_eq!(config.grid_cell_size, None);
}

#[test]
fn config_toml_round_trip() {
    let config = CollisionConfig {
        grid_cell_size: Some(0.05),
        ..CollisionConfig::debug()
    };
    let text = config.to_toml_string().unwrap();
    let recovered = CollisionConfig::from_toml_str(&text).unwrap();
    assert_eq!(recovered, config);
}

#[test]
fn config_rejects_bad_values() {
    let negative_pad = CollisionConfig {
        edit_pad: -1.0,
        ..Default::default()
    };
    assert!(matches!(
        negative_pad.validate(),
        Err(WeftError::InvalidConfig(_))
    ));

    let zero_cell = CollisionConfig {
        grid_cell_size: Some(0.0),
        ..Default::default()
    };
    assert!(zero_cell.validate().is_err());

    let zero_touch = CollisionConfig {
        touch_distance_sq: 0.0,
        ..Default::default()
    };
    assert!(zero_touch.validate().is_err());

    assert!(CollisionConfig::from_toml_str("continuous_pad = -0.5").is_err());
    assert!(matches!(
        CollisionConfig::from_toml_str("broad_phase = \"octree\""),
        Err(WeftError::Serialization(_))
    ));
}

#[test]
fn narrow_params_follow_config() {
    let config = CollisionConfig::high_quality();
    let params = config.narrow_params();
    assert_eq!(params.touch_distance_sq, config.touch_distance_sq);
    assert_eq!(params.barycentric_tolerance, config.barycentric_tolerance);
    assert_eq!(params.coefficient_threshold, config.coefficient_threshold);
}

// ─── Geometry Store Tests ─────────────────────────────────────

#[test]
fn store_from_mesh() {
    let mesh = quad_grid(2, 2, 1.0, 1.0);
    let pinned = vec![false; mesh.vertex_count()];
    let store = GeometryStore::from_mesh(&mesh, 0.5, 0.01, &pinned).unwrap();
    assert_eq!(store.vertex_count(), 9);
    assert_eq!(store.triangles().len(), 8);
    // 2x2 grid: 12 boundary/axis edges + 4 diagonals
    assert_eq!(store.edges().len(), 16);
    assert_eq!(store.position(VertexId(4)), mesh.position(4));
    assert_eq!(store.velocity(VertexId(4)), Vec3::ZERO);
    assert_eq!(store.inverse_mass(VertexId(0)), 2.0);
    assert_eq!(store.radius(VertexId(8)), 0.01);
    assert_eq!(store.triangle(TriangleId(0)), mesh.triangle(0).map(VertexId));
}

#[test]
fn store_includes_rod_edges() {
    let mut mesh = single_triangle(Vec3::ZERO, Vec3::X, Vec3::Y);
    let first = append_rod(&mut mesh, 2, Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 1.0));
    let store = GeometryStore::from_mesh(&mesh, 1.0, 0.0, &vec![false; mesh.vertex_count()])
        .unwrap();
    assert_eq!(store.edges().len(), 5);
    assert!(store
        .edges()
        .contains(&[VertexId(first), VertexId(first + 1)]));
}

#[test]
fn store_rejects_bad_input() {
    let mesh = quad_grid(1, 1, 1.0, 1.0);
    assert!(GeometryStore::from_mesh(&mesh, 1.0, 0.0, &[false; 3]).is_err());
    assert!(GeometryStore::from_mesh(&mesh, 0.0, 0.0, &[false; 4]).is_err());
    assert!(GeometryStore::from_mesh(&mesh, 1.0, -0.1, &[false; 4]).is_err());
}

#[test]
fn fixed_vertices_have_zero_inverse_mass() {
    let mesh = quad_grid(1, 1, 1.0, 1.0);
    let mut store = GeometryStore::from_mesh(&mesh, 2.0, 0.0, &[true, false, false, false])
        .unwrap();
    assert_eq!(store.inverse_mass(VertexId(0)), 0.0);
    assert_eq!(store.inverse_mass(VertexId(1)), 0.5);
    store.set_fixed(VertexId(0), false);
    assert_eq!(store.inverse_mass(VertexId(0)), 0.5);
}

#[test]
fn store_advance_and_velocity_changes() {
    let mesh = quad_grid(1, 1, 1.0, 1.0);
    let mut store = GeometryStore::from_mesh(&mesh, 1.0, 0.0, &[true, false, false, false])
        .unwrap();
    store.set_velocity(VertexId(1), Vec3::new(0.0, 0.0, 2.0));
    assert_eq!(
        store.predicted_position(VertexId(1), 0.5),
        mesh.position(1) + Vec3::new(0.0, 0.0, 1.0)
    );

    store.apply_velocity_changes(&[
        VelocityChange {
            vertex: VertexId(0),
            delta: Vec3::X,
        },
        VelocityChange {
            vertex: VertexId(1),
            delta: Vec3::new(0.0, 0.0, -2.0),
        },
    ]);
    assert_eq!(store.velocity(VertexId(0)), Vec3::ZERO);
    assert_eq!(store.velocity(VertexId(1)), Vec3::ZERO);

    store.set_velocity(VertexId(2), Vec3::Y);
    store.advance(0.25);
    assert_eq!(
        store.position(VertexId(2)),
        mesh.position(2) + Vec3::new(0.0, 0.25, 0.0)
    );

    let mut out = mesh.clone();
    store.write_positions(&mut out).unwrap();
    assert_eq!(out.position(2), store.position(VertexId(2)));
}

#[test]
fn edge_lookup_by_id() {
    let mesh = single_triangle(Vec3::ZERO, Vec3::X, Vec3::Y);
    let store = GeometryStore::from_mesh(&mesh, 1.0, 0.0, &[false; 3]).unwrap();
    // Edges are sorted by endpoint pair
    assert_eq!(store.edge(EdgeId(0)), [VertexId(0), VertexId(1)]);
    assert_eq!(store.edge(EdgeId(2)), [VertexId(1), VertexId(2)]);
}
