//! Broad phase collision detection trait.
//!
//! Keeps three independent sets of element boxes (points, edges,
//! triangles) and answers "which elements might overlap this box?". The
//! narrow phase then refines the candidates into actual collisions.

use serde::{Deserialize, Serialize};
use weft_math::Aabb;
use weft_types::{EdgeId, TriangleId, VertexId};

use crate::bvh::BvhBroadPhase;
use crate::config::{BroadPhaseKind, CollisionConfig};
use crate::geometry::{GeometryQuery, MeshQuery};
use crate::grid::GridBroadPhase;

/// Element class of a stored box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElementClass {
    /// Vertices.
    Point,
    /// Edges and rod segments.
    Edge,
    /// Triangles.
    Triangle,
}

impl ElementClass {
    /// All classes, in storage order.
    pub const ALL: [ElementClass; 3] = [Self::Point, Self::Edge, Self::Triangle];

    /// Storage slot of the class.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::Point => 0,
            Self::Edge => 1,
            Self::Triangle => 2,
        }
    }
}

/// Trait for broad phase collision detection.
///
/// Ids must be unique within a class. Queries return every element whose
/// stored box overlaps the query box, sorted ascending and deduplicated.
///
/// # Implementations
/// - [`GridBroadPhase`]: Uniform hash grid
/// - [`BvhBroadPhase`]: Bounding volume hierarchy
pub trait BroadPhase: Send {
    /// Registers a box. Re-inserting a live id is a contract violation.
    fn insert(&mut self, class: ElementClass, id: u32, aabb: Aabb);

    /// Replaces the box of a registered id.
    fn update(&mut self, class: ElementClass, id: u32, aabb: Aabb);

    /// Deregisters an id. Unknown ids are ignored.
    fn remove(&mut self, class: ElementClass, id: u32);

    /// Ids of the class whose stored box overlaps `aabb`.
    fn query(&self, class: ElementClass, aabb: &Aabb) -> Vec<u32>;

    /// Number of registered ids in a class.
    fn len(&self, class: ElementClass) -> usize;

    /// Removes every element of every class.
    fn clear(&mut self);

    /// Returns the broad phase strategy name.
    fn name(&self) -> &str;

    /// Called before a full rebuild re-registers the mesh.
    fn begin_rebuild(&mut self, _mesh: &dyn MeshQuery) {}

    /// Called once a full rebuild has registered every element.
    fn end_rebuild(&mut self) {}

    /// Returns true if the class holds no elements.
    fn is_empty(&self, class: ElementClass) -> bool {
        self.len(class) == 0
    }

    /// Registers a vertex box.
    fn add_point(&mut self, id: VertexId, aabb: Aabb) {
        self.insert(ElementClass::Point, id.0, aabb);
    }

    /// Registers an edge box.
    fn add_edge(&mut self, id: EdgeId, aabb: Aabb) {
        self.insert(ElementClass::Edge, id.0, aabb);
    }

    /// Registers a triangle box.
    fn add_triangle(&mut self, id: TriangleId, aabb: Aabb) {
        self.insert(ElementClass::Triangle, id.0, aabb);
    }

    /// Moves a registered vertex to a new box.
    fn update_point(&mut self, id: VertexId, aabb: Aabb) {
        self.update(ElementClass::Point, id.0, aabb);
    }

    /// Moves a registered edge to a new box.
    fn update_edge(&mut self, id: EdgeId, aabb: Aabb) {
        self.update(ElementClass::Edge, id.0, aabb);
    }

    /// Moves a registered triangle to a new box.
    fn update_triangle(&mut self, id: TriangleId, aabb: Aabb) {
        self.update(ElementClass::Triangle, id.0, aabb);
    }

    /// Deregisters a vertex.
    fn remove_point(&mut self, id: VertexId) {
        self.remove(ElementClass::Point, id.0);
    }

    /// Deregisters an edge.
    fn remove_edge(&mut self, id: EdgeId) {
        self.remove(ElementClass::Edge, id.0);
    }

    /// Deregisters a triangle.
    fn remove_triangle(&mut self, id: TriangleId) {
        self.remove(ElementClass::Triangle, id.0);
    }

    /// Vertices whose box overlaps `aabb`, ascending.
    fn query_points(&self, aabb: &Aabb) -> Vec<VertexId> {
        self.query(ElementClass::Point, aabb)
            .into_iter()
            .map(VertexId)
            .collect()
    }

    /// Edges whose box overlaps `aabb`, ascending.
    fn query_edges(&self, aabb: &Aabb) -> Vec<EdgeId> {
        self.query(ElementClass::Edge, aabb)
            .into_iter()
            .map(EdgeId)
            .collect()
    }

    /// Triangles whose box overlaps `aabb`, ascending.
    fn query_triangles(&self, aabb: &Aabb) -> Vec<TriangleId> {
        self.query(ElementClass::Triangle, aabb)
            .into_iter()
            .map(TriangleId)
            .collect()
    }

    /// Clears and re-registers every element with its current-position box,
    /// padded by `epsilon` plus the element's largest vertex radius.
    fn rebuild_static(&mut self, mesh: &dyn MeshQuery, epsilon: f64) {
        self.begin_rebuild(mesh);
        self.clear();
        for i in 0..mesh.vertex_count() {
            let v = VertexId(i as u32);
            self.add_point(v, static_box(mesh, &[v], epsilon));
        }
        for (i, edge) in mesh.edges().iter().enumerate() {
            self.add_edge(EdgeId(i as u32), static_box(mesh, edge, epsilon));
        }
        for (i, tri) in mesh.triangles().iter().enumerate() {
            self.add_triangle(TriangleId(i as u32), static_box(mesh, tri, epsilon));
        }
        self.end_rebuild();
    }

    /// Clears and re-registers every element with the box of its current and
    /// predicted (`x + dt·v`) positions, padded by `pad`.
    fn rebuild_continuous(&mut self, mesh: &dyn MeshQuery, dt: f64, pad: f64) {
        self.begin_rebuild(mesh);
        self.clear();
        for i in 0..mesh.vertex_count() {
            let v = VertexId(i as u32);
            self.add_point(v, swept_box(mesh, &[v], dt, pad));
        }
        for (i, edge) in mesh.edges().iter().enumerate() {
            self.add_edge(EdgeId(i as u32), swept_box(mesh, edge, dt, pad));
        }
        for (i, tri) in mesh.triangles().iter().enumerate() {
            self.add_triangle(TriangleId(i as u32), swept_box(mesh, tri, dt, pad));
        }
        self.end_rebuild();
    }
}

/// Box of the current positions of `vertices`, padded by `epsilon` plus the
/// largest radius among them. `vertices` must not be empty.
pub fn static_box<G: GeometryQuery + ?Sized>(
    geometry: &G,
    vertices: &[VertexId],
    epsilon: f64,
) -> Aabb {
    let mut aabb = Aabb::from_point(geometry.position(vertices[0]));
    let mut radius = 0.0_f64;
    for &v in vertices {
        aabb.include(geometry.position(v));
        radius = radius.max(geometry.radius(v));
    }
    aabb.padded(epsilon + radius)
}

/// Box of the current and predicted positions of `vertices`, padded by
/// `pad`. `vertices` must not be empty.
pub fn swept_box<G: GeometryQuery + ?Sized>(
    geometry: &G,
    vertices: &[VertexId],
    dt: f64,
    pad: f64,
) -> Aabb {
    let mut aabb = Aabb::from_point(geometry.position(vertices[0]));
    for &v in vertices {
        aabb.include(geometry.position(v));
        aabb.include(geometry.predicted_position(v, dt));
    }
    aabb.padded(pad)
}

/// Mean edge length, the characteristic length scale of the mesh.
pub fn average_edge_length(mesh: &dyn MeshQuery) -> Option<f64> {
    let edges = mesh.edges();
    if edges.is_empty() {
        return None;
    }
    let total: f64 = edges
        .iter()
        .map(|&[a, b]| (mesh.position(b) - mesh.position(a)).length())
        .sum();
    let mean = total / edges.len() as f64;
    (mean > 0.0 && mean.is_finite()).then_some(mean)
}

/// Creates the broad phase selected by the configuration.
pub fn from_config(config: &CollisionConfig) -> Box<dyn BroadPhase + Send + Sync> {
    match config.broad_phase {
        BroadPhaseKind::Grid => Box::new(match config.grid_cell_size {
            Some(cell) => GridBroadPhase::new(cell),
            None => GridBroadPhase::adaptive(),
        }),
        BroadPhaseKind::Bvh => Box::new(BvhBroadPhase::new()),
    }
}
