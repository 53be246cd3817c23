//! Core mesh type with SoA (Structure of Arrays) layout.
//!
//! Each coordinate channel is stored contiguously:
//! - `pos_x: [x0, x1, x2, ...]`
//! - `pos_y: [y0, y1, y2, ...]`
//! - `pos_z: [z0, z1, z2, ...]`
//!
//! Triangles and rod segments index into these arrays. A vertex may be
//! shared by both (a rod attached to a surface).

use serde::{Deserialize, Serialize};
use weft_math::{Aabb, Vec3};
use weft_types::{WeftError, WeftResult};

/// Triangulated surfaces plus rod segments, stored in SoA layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    // --- Vertex data (SoA) ---
    /// X coordinates of all vertices.
    pub pos_x: Vec<f64>,
    /// Y coordinates of all vertices.
    pub pos_y: Vec<f64>,
    /// Z coordinates of all vertices.
    pub pos_z: Vec<f64>,

    // --- Element data ---
    /// Triangle indices, flat: `[t0v0, t0v1, t0v2, t1v0, ...]`.
    pub indices: Vec<u32>,
    /// Rod segment indices, flat: `[r0v0, r0v1, r1v0, ...]`.
    #[serde(default)]
    pub rods: Vec<u32>,
}

impl TriangleMesh {
    /// Returns the number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.pos_x.len()
    }

    /// Returns the number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Returns the number of rod segments.
    #[inline]
    pub fn rod_count(&self) -> usize {
        self.rods.len() / 2
    }

    /// Position of vertex `i`.
    #[inline]
    pub fn position(&self, i: usize) -> Vec3 {
        Vec3::new(self.pos_x[i], self.pos_y[i], self.pos_z[i])
    }

    /// Returns the three vertex indices of triangle `t`.
    #[inline]
    pub fn triangle(&self, t: usize) -> [u32; 3] {
        let base = t * 3;
        [self.indices[base], self.indices[base + 1], self.indices[base + 2]]
    }

    /// Returns the two vertex indices of rod segment `r`.
    #[inline]
    pub fn rod(&self, r: usize) -> [u32; 2] {
        [self.rods[r * 2], self.rods[r * 2 + 1]]
    }

    /// Sets the position of vertex `i`.
    #[inline]
    pub fn set_position(&mut self, i: usize, p: Vec3) {
        self.pos_x[i] = p.x;
        self.pos_y[i] = p.y;
        self.pos_z[i] = p.z;
    }

    /// Appends a vertex and returns its index.
    pub fn push_vertex(&mut self, p: Vec3) -> u32 {
        let index = self.pos_x.len() as u32;
        self.pos_x.push(p.x);
        self.pos_y.push(p.y);
        self.pos_z.push(p.z);
        index
    }

    /// Appends a triangle.
    pub fn push_triangle(&mut self, tri: [u32; 3]) {
        self.indices.extend_from_slice(&tri);
    }

    /// Appends a rod segment.
    pub fn push_rod(&mut self, seg: [u32; 2]) {
        self.rods.extend_from_slice(&seg);
    }

    /// Creates an empty mesh with pre-allocated capacity.
    pub fn with_capacity(vertex_capacity: usize, triangle_capacity: usize) -> Self {
        Self {
            pos_x: Vec::with_capacity(vertex_capacity),
            pos_y: Vec::with_capacity(vertex_capacity),
            pos_z: Vec::with_capacity(vertex_capacity),
            indices: Vec::with_capacity(triangle_capacity * 3),
            rods: Vec::new(),
        }
    }

    /// Bounds of all vertex positions, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<Aabb> {
        let mut iter = (0..self.vertex_count()).map(|i| self.position(i));
        let first = iter.next()?;
        let mut aabb = Aabb::from_point(first);
        for p in iter {
            aabb.include(p);
        }
        Some(aabb)
    }

    /// Validates mesh integrity.
    ///
    /// Checks:
    /// - All SoA arrays have the same length
    /// - Element indices are within bounds
    /// - No degenerate elements (repeated vertex indices)
    /// - Positions are finite
    pub fn validate(&self) -> WeftResult<()> {
        let n = self.pos_x.len();

        if self.pos_y.len() != n || self.pos_z.len() != n {
            return Err(WeftError::InvalidMesh(
                "Position arrays have inconsistent lengths".into(),
            ));
        }
        if self.indices.len() % 3 != 0 {
            return Err(WeftError::InvalidMesh(
                "Index count is not divisible by 3".into(),
            ));
        }
        if self.rods.len() % 2 != 0 {
            return Err(WeftError::InvalidMesh(
                "Rod index count is not divisible by 2".into(),
            ));
        }

        for (i, &idx) in self.indices.iter().chain(self.rods.iter()).enumerate() {
            if idx as usize >= n {
                return Err(WeftError::InvalidMesh(format!(
                    "Index {} at position {} is out of range (vertex count: {})",
                    idx, i, n
                )));
            }
        }

        for t in 0..self.triangle_count() {
            let [a, b, c] = self.triangle(t);
            if a == b || b == c || a == c {
                return Err(WeftError::InvalidMesh(format!(
                    "Triangle {} has repeated vertex indices: [{}, {}, {}]",
                    t, a, b, c
                )));
            }
        }
        for r in 0..self.rod_count() {
            let [a, b] = self.rod(r);
            if a == b {
                return Err(WeftError::InvalidMesh(format!(
                    "Rod segment {} connects vertex {} to itself",
                    r, a
                )));
            }
        }

        for i in 0..n {
            if !self.position(i).is_finite() {
                return Err(WeftError::InvalidMesh(format!(
                    "Vertex {} has a non-finite position",
                    i
                )));
            }
        }

        Ok(())
    }

    /// Constructs a mesh from interleaved AoS position data
    /// `[x0, y0, z0, x1, y1, z1, ...]`.
    pub fn from_interleaved(positions: &[f64], indices: &[u32], rods: &[u32]) -> WeftResult<Self> {
        if positions.len() % 3 != 0 {
            return Err(WeftError::InvalidMesh(
                "Interleaved positions length not divisible by 3".into(),
            ));
        }

        let n = positions.len() / 3;
        let mut mesh = Self::with_capacity(n, indices.len() / 3);
        for p in positions.chunks_exact(3) {
            mesh.pos_x.push(p[0]);
            mesh.pos_y.push(p[1]);
            mesh.pos_z.push(p[2]);
        }
        mesh.indices = indices.to_vec();
        mesh.rods = rods.to_vec();

        mesh.validate()?;
        Ok(mesh)
    }
}
