//! Mesh topology queries.
//!
//! Builds adjacency data from the triangle and rod index buffers. Edge ids
//! are assigned in ascending `(v_min, v_max)` order so that two builds of
//! the same mesh always agree on numbering.

use std::collections::{BTreeMap, BTreeSet};

use weft_types::{EdgeId, TriangleId, VertexId};

use crate::mesh::TriangleMesh;

/// Precomputed topology information for a mesh.
///
/// Built once when a mesh is loaded (or after remeshing). Consumed by the
/// geometry store (edge list), the edit safety oracle (edit footprints)
/// and the edit constructors (wings of a flipped or split edge).
#[derive(Debug, Clone)]
pub struct Topology {
    /// For each vertex, the list of triangles that contain it.
    pub vertex_triangles: Vec<Vec<u32>>,

    /// For each vertex, the edges incident to it.
    pub vertex_edges: Vec<Vec<u32>>,

    /// Unique edges as `[v_min, v_max]`, triangle edges and rod segments together.
    pub edges: Vec<[u32; 2]>,

    /// For each edge, the adjacent triangles (empty for a free rod segment).
    pub edge_triangles: Vec<Vec<u32>>,

    /// Edges shared by exactly two triangles.
    pub interior_edges: Vec<InteriorEdge>,

    edge_lookup: BTreeMap<(u32, u32), u32>,
}

/// An interior (non-boundary) edge with its two adjacent triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteriorEdge {
    /// Id of the shared edge.
    pub edge: EdgeId,
    /// Index of vertex A of the shared edge.
    pub v0: u32,
    /// Index of vertex B of the shared edge.
    pub v1: u32,
    /// The "wing" vertex of triangle A (not on the edge).
    pub wing_a: u32,
    /// The "wing" vertex of triangle B (not on the edge).
    pub wing_b: u32,
    /// Index of adjacent triangle A.
    pub tri_a: u32,
    /// Index of adjacent triangle B.
    pub tri_b: u32,
}

#[inline]
fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

impl Topology {
    /// Build topology from a mesh.
    pub fn build(mesh: &TriangleMesh) -> Self {
        let vertex_count = mesh.vertex_count();
        let tri_count = mesh.triangle_count();

        let mut vertex_triangles: Vec<Vec<u32>> = vec![Vec::new(); vertex_count];
        for t in 0..tri_count {
            for v in mesh.triangle(t) {
                vertex_triangles[v as usize].push(t as u32);
            }
        }

        // Key: (min_vertex, max_vertex) to canonicalize edge direction
        let mut edge_map: BTreeMap<(u32, u32), Vec<u32>> = BTreeMap::new();
        for t in 0..tri_count {
            let [a, b, c] = mesh.triangle(t);
            for (v0, v1) in [(a, b), (b, c), (c, a)] {
                edge_map.entry(edge_key(v0, v1)).or_default().push(t as u32);
            }
        }
        for r in 0..mesh.rod_count() {
            let [a, b] = mesh.rod(r);
            edge_map.entry(edge_key(a, b)).or_default();
        }

        let mut edges = Vec::with_capacity(edge_map.len());
        let mut edge_triangles = Vec::with_capacity(edge_map.len());
        let mut vertex_edges: Vec<Vec<u32>> = vec![Vec::new(); vertex_count];
        let mut interior_edges = Vec::new();
        let mut edge_lookup = BTreeMap::new();

        for ((v0, v1), tris) in edge_map {
            let edge_idx = edges.len() as u32;
            edges.push([v0, v1]);
            edge_lookup.insert((v0, v1), edge_idx);
            vertex_edges[v0 as usize].push(edge_idx);
            vertex_edges[v1 as usize].push(edge_idx);

            if let [tri_a, tri_b] = tris[..] {
                interior_edges.push(InteriorEdge {
                    edge: EdgeId(edge_idx),
                    v0,
                    v1,
                    wing_a: find_wing_vertex(mesh, tri_a, v0, v1),
                    wing_b: find_wing_vertex(mesh, tri_b, v0, v1),
                    tri_a,
                    tri_b,
                });
            }
            edge_triangles.push(tris);
        }

        Self {
            vertex_triangles,
            vertex_edges,
            edges,
            edge_triangles,
            interior_edges,
            edge_lookup,
        }
    }

    /// Number of unique edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Id of the edge joining `a` and `b`, in either order.
    pub fn edge_index(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        self.edge_lookup
            .get(&edge_key(a.0, b.0))
            .copied()
            .map(EdgeId)
    }

    /// Wing data of `edge` if exactly two triangles share it.
    pub fn interior_edge(&self, edge: EdgeId) -> Option<InteriorEdge> {
        // interior_edges is built in edge order, so it is sorted by edge id
        self.interior_edges
            .binary_search_by_key(&edge, |ie| ie.edge)
            .ok()
            .map(|i| self.interior_edges[i])
    }

    /// Triangles incident to vertex `v`.
    pub fn triangles_of(&self, v: VertexId) -> impl Iterator<Item = TriangleId> + '_ {
        self.vertex_triangles[v.index()].iter().map(|&t| TriangleId(t))
    }

    /// Edges incident to vertex `v`.
    pub fn edges_of(&self, v: VertexId) -> impl Iterator<Item = EdgeId> + '_ {
        self.vertex_edges[v.index()].iter().map(|&e| EdgeId(e))
    }

    /// Returns the 1-ring vertex neighborhood of vertex `v`.
    ///
    /// These are all vertices connected to `v` by an edge, in ascending order.
    pub fn one_ring(&self, v: u32) -> BTreeSet<u32> {
        self.vertex_edges[v as usize]
            .iter()
            .map(|&e| {
                let [a, b] = self.edges[e as usize];
                if a == v {
                    b
                } else {
                    a
                }
            })
            .collect()
    }

    /// Returns the number of boundary edges (edges with only 1 adjacent triangle).
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_triangles
            .iter()
            .filter(|tris| tris.len() == 1)
            .count()
    }

    /// Returns true if the surface is closed (no boundary edges).
    pub fn is_closed(&self) -> bool {
        self.boundary_edge_count() == 0
    }
}

/// Find the vertex in triangle `tri` that is not v0 or v1 (the "wing" vertex).
fn find_wing_vertex(mesh: &TriangleMesh, tri: u32, v0: u32, v1: u32) -> u32 {
    let [a, b, c] = mesh.triangle(tri as usize);
    if a != v0 && a != v1 {
        a
    } else if b != v0 && b != v1 {
        b
    } else {
        c
    }
}
