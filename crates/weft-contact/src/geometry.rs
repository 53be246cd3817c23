//! Geometry queries consumed by the collision core, plus a concrete SoA store.
//!
//! The collision core never owns geometry. Everything it needs is read
//! through [`GeometryQuery`] (per-vertex state) and [`MeshQuery`]
//! (element connectivity). [`GeometryStore`] is the stock implementation.

use weft_math::Vec3;
use weft_mesh::{Topology, TriangleMesh};
use weft_types::{EdgeId, TriangleId, VertexId, WeftError, WeftResult};

/// Per-vertex state of the simulated geometry.
///
/// Ids are assumed to be in range; passing an out-of-range id is a
/// contract violation and implementations may panic.
pub trait GeometryQuery: Sync {
    /// Number of vertices.
    fn vertex_count(&self) -> usize;

    /// Current position.
    fn position(&self, v: VertexId) -> Vec3;

    /// Current velocity.
    fn velocity(&self, v: VertexId) -> Vec3;

    /// Mass of the vertex.
    fn mass(&self, v: VertexId) -> f64;

    /// Collision radius (thickness) of the vertex.
    fn radius(&self, v: VertexId) -> f64;

    /// Whether the vertex is scripted / pinned and ignores impulses.
    fn is_fixed(&self, v: VertexId) -> bool;

    /// Whether the vertex is excluded from collision handling altogether.
    fn is_collision_immune(&self, v: VertexId) -> bool;

    /// Inverse mass; zero for fixed vertices and non-positive masses.
    fn inverse_mass(&self, v: VertexId) -> f64 {
        if self.is_fixed(v) {
            return 0.0;
        }
        let m = self.mass(v);
        if m > 0.0 && m.is_finite() {
            1.0 / m
        } else {
            0.0
        }
    }

    /// Position at the end of a step of length `dt` under constant velocity.
    fn predicted_position(&self, v: VertexId, dt: f64) -> Vec3 {
        self.position(v) + self.velocity(v) * dt
    }
}

/// Element connectivity on top of per-vertex state.
pub trait MeshQuery: GeometryQuery {
    /// All edges (triangle edges and rod segments), indexed by [`EdgeId`].
    fn edges(&self) -> &[[VertexId; 2]];

    /// All triangles, indexed by [`TriangleId`].
    fn triangles(&self) -> &[[VertexId; 3]];

    /// Endpoints of edge `e`.
    fn edge(&self, e: EdgeId) -> [VertexId; 2] {
        self.edges()[e.index()]
    }

    /// Corners of triangle `t`.
    fn triangle(&self, t: TriangleId) -> [VertexId; 3] {
        self.triangles()[t.index()]
    }
}

/// Velocity correction for a single vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityChange {
    /// Receiving vertex.
    pub vertex: VertexId,
    /// Velocity increment.
    pub delta: Vec3,
}

/// SoA geometry store.
///
/// # Layout
///
/// All per-vertex arrays have length `vertex_count`:
/// ```text
/// pos_x: [x0, x1, x2, ...]
/// vel_x: [vx0, vx1, ...]
/// ...
/// ```
#[derive(Debug, Clone)]
pub struct GeometryStore {
    // ─── Position ───
    pub pos_x: Vec<f64>,
    pub pos_y: Vec<f64>,
    pub pos_z: Vec<f64>,

    // ─── Velocity ───
    pub vel_x: Vec<f64>,
    pub vel_y: Vec<f64>,
    pub vel_z: Vec<f64>,

    // ─── Per-vertex mass (inverse mass is zero when fixed) ───
    pub mass: Vec<f64>,
    pub inv_mass: Vec<f64>,

    // ─── Collision attributes ───
    pub radius: Vec<f64>,
    pub fixed: Vec<bool>,
    pub immune: Vec<bool>,

    edges: Vec<[VertexId; 2]>,
    triangles: Vec<[VertexId; 3]>,
}

impl GeometryStore {
    /// Builds a store from a mesh with uniform mass and radius.
    ///
    /// Copies positions from the mesh; velocities start at zero. Edges are
    /// numbered as in [`Topology::build`]. Pinned vertices become fixed
    /// (`inv_mass = 0`).
    pub fn from_mesh(
        mesh: &TriangleMesh,
        vertex_mass: f64,
        radius: f64,
        pinned: &[bool],
    ) -> WeftResult<Self> {
        mesh.validate()?;
        let topology = Topology::build(mesh);
        Self::from_mesh_with_topology(mesh, &topology, vertex_mass, radius, pinned)
    }

    /// Same as [`from_mesh`](Self::from_mesh) with a prebuilt topology.
    pub fn from_mesh_with_topology(
        mesh: &TriangleMesh,
        topology: &Topology,
        vertex_mass: f64,
        radius: f64,
        pinned: &[bool],
    ) -> WeftResult<Self> {
        let n = mesh.vertex_count();

        if pinned.len() != n {
            return Err(WeftError::InvalidMesh(format!(
                "Pinned array length ({}) != vertex count ({})",
                pinned.len(),
                n
            )));
        }
        if !(vertex_mass > 0.0 && vertex_mass.is_finite()) {
            return Err(WeftError::InvalidArgument(format!(
                "vertex mass must be positive and finite, got {vertex_mass}"
            )));
        }
        if !(radius >= 0.0 && radius.is_finite()) {
            return Err(WeftError::InvalidArgument(format!(
                "radius must be non-negative and finite, got {radius}"
            )));
        }

        let inv_mass = pinned
            .iter()
            .map(|&p| if p { 0.0 } else { 1.0 / vertex_mass })
            .collect();

        let edges = topology
            .edges
            .iter()
            .map(|&[a, b]| [VertexId(a), VertexId(b)])
            .collect();
        let triangles = (0..mesh.triangle_count())
            .map(|t| mesh.triangle(t).map(VertexId))
            .collect();

        Ok(Self {
            pos_x: mesh.pos_x.clone(),
            pos_y: mesh.pos_y.clone(),
            pos_z: mesh.pos_z.clone(),
            vel_x: vec![0.0; n],
            vel_y: vec![0.0; n],
            vel_z: vec![0.0; n],
            mass: vec![vertex_mass; n],
            inv_mass,
            radius: vec![radius; n],
            fixed: pinned.to_vec(),
            immune: vec![false; n],
            edges,
            triangles,
        })
    }

    /// Sets the position of vertex `v`.
    pub fn set_position(&mut self, v: VertexId, p: Vec3) {
        let i = v.index();
        self.pos_x[i] = p.x;
        self.pos_y[i] = p.y;
        self.pos_z[i] = p.z;
    }

    /// Sets the velocity of vertex `v`.
    pub fn set_velocity(&mut self, v: VertexId, vel: Vec3) {
        let i = v.index();
        self.vel_x[i] = vel.x;
        self.vel_y[i] = vel.y;
        self.vel_z[i] = vel.z;
    }

    /// Pins or unpins vertex `v`.
    pub fn set_fixed(&mut self, v: VertexId, fixed: bool) {
        let i = v.index();
        self.fixed[i] = fixed;
        self.inv_mass[i] = if fixed { 0.0 } else { 1.0 / self.mass[i] };
    }

    /// Marks vertex `v` as collision-immune.
    pub fn set_collision_immune(&mut self, v: VertexId, immune: bool) {
        self.immune[v.index()] = immune;
    }

    /// Sets the collision radius of vertex `v`.
    pub fn set_radius(&mut self, v: VertexId, radius: f64) {
        self.radius[v.index()] = radius;
    }

    /// Moves every vertex by `dt · velocity`. Fixed vertices move too
    /// (scripted motion).
    pub fn advance(&mut self, dt: f64) {
        for i in 0..self.pos_x.len() {
            self.pos_x[i] += dt * self.vel_x[i];
            self.pos_y[i] += dt * self.vel_y[i];
            self.pos_z[i] += dt * self.vel_z[i];
        }
    }

    /// Adds velocity corrections. Changes addressed to fixed vertices are dropped.
    pub fn apply_velocity_changes(&mut self, changes: &[VelocityChange]) {
        for change in changes {
            let i = change.vertex.index();
            if self.fixed[i] {
                continue;
            }
            self.vel_x[i] += change.delta.x;
            self.vel_y[i] += change.delta.y;
            self.vel_z[i] += change.delta.z;
        }
    }

    /// Copies the store's positions back into a mesh of the same size.
    pub fn write_positions(&self, mesh: &mut TriangleMesh) -> WeftResult<()> {
        if mesh.vertex_count() != self.pos_x.len() {
            return Err(WeftError::InvalidMesh(format!(
                "mesh has {} vertices, store has {}",
                mesh.vertex_count(),
                self.pos_x.len()
            )));
        }
        mesh.pos_x.copy_from_slice(&self.pos_x);
        mesh.pos_y.copy_from_slice(&self.pos_y);
        mesh.pos_z.copy_from_slice(&self.pos_z);
        Ok(())
    }
}

impl GeometryQuery for GeometryStore {
    #[inline]
    fn vertex_count(&self) -> usize {
        self.pos_x.len()
    }

    #[inline]
    fn position(&self, v: VertexId) -> Vec3 {
        let i = v.index();
        Vec3::new(self.pos_x[i], self.pos_y[i], self.pos_z[i])
    }

    #[inline]
    fn velocity(&self, v: VertexId) -> Vec3 {
        let i = v.index();
        Vec3::new(self.vel_x[i], self.vel_y[i], self.vel_z[i])
    }

    #[inline]
    fn mass(&self, v: VertexId) -> f64 {
        self.mass[v.index()]
    }

    #[inline]
    fn radius(&self, v: VertexId) -> f64 {
        self.radius[v.index()]
    }

    #[inline]
    fn is_fixed(&self, v: VertexId) -> bool {
        self.fixed[v.index()]
    }

    #[inline]
    fn is_collision_immune(&self, v: VertexId) -> bool {
        self.immune[v.index()]
    }

    #[inline]
    fn inverse_mass(&self, v: VertexId) -> f64 {
        self.inv_mass[v.index()]
    }
}

impl MeshQuery for GeometryStore {
    fn edges(&self) -> &[[VertexId; 2]] {
        &self.edges
    }

    fn triangles(&self) -> &[[VertexId; 3]] {
        &self.triangles
    }
}
