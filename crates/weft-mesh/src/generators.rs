//! Procedural mesh generators for tests and benchmarks.
//!
//! These generators produce deterministic, resolution-configurable meshes
//! with consistent winding order.

use weft_math::Vec3;

use crate::mesh::TriangleMesh;

/// Generates a flat rectangular quad grid in the XY plane.
///
/// The grid spans `[-width/2, width/2]` in X and `[-height/2, height/2]` in Y,
/// centered at the origin at Z=0.
///
/// # Arguments
/// - `cols`: Number of quads along X (vertex count = cols + 1).
/// - `rows`: Number of quads along Y (vertex count = rows + 1).
/// - `width`: Total width.
/// - `height`: Total height.
///
/// # Example
/// ```
/// use weft_mesh::generators::quad_grid;
/// let mesh = quad_grid(2, 2, 1.0, 1.0);
/// assert_eq!(mesh.vertex_count(), 9);  // 3×3 vertices
/// assert_eq!(mesh.triangle_count(), 8); // 2×2 quads × 2 tris each
/// ```
pub fn quad_grid(cols: usize, rows: usize, width: f64, height: f64) -> TriangleMesh {
    let verts_x = cols + 1;
    let verts_y = rows + 1;
    let mut mesh = TriangleMesh::with_capacity(verts_x * verts_y, cols * rows * 2);

    let half_w = width / 2.0;
    let half_h = height / 2.0;

    for j in 0..verts_y {
        for i in 0..verts_x {
            let u = i as f64 / cols as f64;
            let v = j as f64 / rows as f64;
            mesh.push_vertex(Vec3::new(-half_w + u * width, half_h - v * height, 0.0));
        }
    }

    // Two triangles per quad
    for j in 0..rows {
        for i in 0..cols {
            let top_left = (j * verts_x + i) as u32;
            let top_right = top_left + 1;
            let bot_left = top_left + verts_x as u32;
            let bot_right = bot_left + 1;

            mesh.push_triangle([top_left, bot_left, top_right]);
            mesh.push_triangle([top_right, bot_left, bot_right]);
        }
    }

    mesh
}

/// Generates a straight rod of `segments` segments from `start` to `end`.
///
/// # Example
/// ```
/// use weft_math::Vec3;
/// use weft_mesh::generators::rod;
/// let mesh = rod(4, Vec3::ZERO, Vec3::X);
/// assert_eq!(mesh.vertex_count(), 5);
/// assert_eq!(mesh.rod_count(), 4);
/// ```
pub fn rod(segments: usize, start: Vec3, end: Vec3) -> TriangleMesh {
    let mut mesh = TriangleMesh::with_capacity(segments + 1, 0);
    append_rod(&mut mesh, segments, start, end);
    mesh
}

/// Appends a straight rod to an existing mesh, returning its first vertex index.
pub fn append_rod(mesh: &mut TriangleMesh, segments: usize, start: Vec3, end: Vec3) -> u32 {
    let segments = segments.max(1);
    let first = mesh.vertex_count() as u32;
    for k in 0..=segments {
        mesh.push_vertex(start.lerp(end, k as f64 / segments as f64));
    }
    for k in 0..segments as u32 {
        mesh.push_rod([first + k, first + k + 1]);
    }
    first
}

/// A mesh holding the single triangle `abc`.
pub fn single_triangle(a: Vec3, b: Vec3, c: Vec3) -> TriangleMesh {
    let mut mesh = TriangleMesh::with_capacity(3, 1);
    append_triangle(&mut mesh, a, b, c);
    mesh
}

/// Appends a free-standing triangle to an existing mesh, returning its first vertex index.
pub fn append_triangle(mesh: &mut TriangleMesh, a: Vec3, b: Vec3, c: Vec3) -> u32 {
    let i0 = mesh.push_vertex(a);
    let i1 = mesh.push_vertex(b);
    let i2 = mesh.push_vertex(c);
    mesh.push_triangle([i0, i1, i2]);
    i0
}

/// Generates a closed regular tetrahedron centered at the origin.
pub fn tetrahedron(size: f64) -> TriangleMesh {
    let s = size * 0.5;
    let mut mesh = TriangleMesh::with_capacity(4, 4);
    mesh.push_vertex(Vec3::new(s, s, s));
    mesh.push_vertex(Vec3::new(s, -s, -s));
    mesh.push_vertex(Vec3::new(-s, s, -s));
    mesh.push_vertex(Vec3::new(-s, -s, s));
    // Outward winding
    mesh.push_triangle([0, 1, 2]);
    mesh.push_triangle([0, 3, 1]);
    mesh.push_triangle([0, 2, 3]);
    mesh.push_triangle([1, 3, 2]);
    mesh
}
