//! Mesh-edit safety checks.
//!
//! Before a remeshing step applies an edit (vertex relocation, edge
//! collapse, split or flip) it asks whether the edit would create a new
//! intersection. The edit is modelled as a pseudo-motion: the vertices it
//! moves travel linearly from their old to their new positions while
//! everything else stays put. The check sweeps that motion with the
//! continuous-time kernels and then tests the final configuration for
//! edges passing through triangles.
//!
//! The check reads the geometry and the broad phase and never modifies
//! either.

use std::collections::{BTreeMap, BTreeSet};

use weft_math::{Aabb, Vec3};
use weft_mesh::Topology;
use weft_types::{EdgeId, TriangleId, VertexId, WeftError, WeftResult};

use crate::broad::BroadPhase;
use crate::config::{CollisionConfig, NarrowPhaseParams};
use crate::geometry::MeshQuery;
use crate::narrow::{edge_edge_ccd, segment_hits_triangle, vertex_face_ccd};

/// A vertex displaced by an edit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexMove {
    /// Moving vertex. May be a new id beyond the geometry's vertex count.
    pub vertex: VertexId,
    /// Position before the edit.
    pub from: Vec3,
    /// Position after the edit.
    pub to: Vec3,
}

/// A local mesh edit as seen by the safety check.
///
/// `edges` and `triangles` list the elements touching the edit after it is
/// applied, in terms of vertex ids; their start positions use `from` for
/// moving vertices. Retired ids are store elements the edit removes or
/// replaces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshEdit {
    /// Vertices the edit moves or creates.
    pub moves: Vec<VertexMove>,
    /// Post-edit edges touching the edit.
    pub edges: Vec<[VertexId; 2]>,
    /// Post-edit triangles touching the edit.
    pub triangles: Vec<[VertexId; 3]>,
    /// Store edges removed or replaced by the edit.
    pub retired_edges: Vec<EdgeId>,
    /// Store triangles removed or replaced by the edit.
    pub retired_triangles: Vec<TriangleId>,
}

fn check_vertex<G: MeshQuery + ?Sized>(
    topology: &Topology,
    geometry: &G,
    v: VertexId,
) -> WeftResult<()> {
    if v.index() >= geometry.vertex_count() || v.index() >= topology.vertex_triangles.len() {
        return Err(WeftError::InvalidArgument(format!(
            "vertex {} out of range",
            v.0
        )));
    }
    Ok(())
}

fn check_edge<G: MeshQuery + ?Sized>(geometry: &G, e: EdgeId) -> WeftResult<[VertexId; 2]> {
    geometry
        .edges()
        .get(e.index())
        .copied()
        .ok_or_else(|| WeftError::InvalidArgument(format!("edge {} out of range", e.0)))
}

impl MeshEdit {
    /// Moves `vertex` to `to`. Every element incident to it moves along.
    ///
    /// `topology` must describe the same element numbering as `geometry`.
    pub fn relocate<G: MeshQuery + ?Sized>(
        topology: &Topology,
        geometry: &G,
        vertex: VertexId,
        to: Vec3,
    ) -> WeftResult<Self> {
        check_vertex(topology, geometry, vertex)?;
        Ok(Self {
            moves: vec![VertexMove {
                vertex,
                from: geometry.position(vertex),
                to,
            }],
            edges: topology.edges_of(vertex).map(|e| geometry.edge(e)).collect(),
            triangles: topology
                .triangles_of(vertex)
                .map(|t| geometry.triangle(t))
                .collect(),
            retired_edges: Vec::new(),
            retired_triangles: Vec::new(),
        })
    }

    /// Collapses `edge` into a single vertex at `target`.
    ///
    /// Both endpoints sweep to `target`. Triangles containing the edge
    /// disappear; the other elements around either endpoint follow their
    /// endpoint.
    pub fn collapse<G: MeshQuery + ?Sized>(
        topology: &Topology,
        geometry: &G,
        edge: EdgeId,
        target: Vec3,
    ) -> WeftResult<Self> {
        let [a, b] = check_edge(geometry, edge)?;
        check_vertex(topology, geometry, a)?;
        check_vertex(topology, geometry, b)?;

        let incident_edges: BTreeSet<EdgeId> =
            topology.edges_of(a).chain(topology.edges_of(b)).collect();
        let incident_triangles: BTreeSet<TriangleId> = topology
            .triangles_of(a)
            .chain(topology.triangles_of(b))
            .collect();

        let edges = incident_edges
            .iter()
            .filter(|&&e| e != edge)
            .map(|&e| geometry.edge(e))
            .collect();
        let triangles = incident_triangles
            .iter()
            .map(|&t| geometry.triangle(t))
            .filter(|tri| !(tri.contains(&a) && tri.contains(&b)))
            .collect();

        Ok(Self {
            moves: vec![
                VertexMove {
                    vertex: a,
                    from: geometry.position(a),
                    to: target,
                },
                VertexMove {
                    vertex: b,
                    from: geometry.position(b),
                    to: target,
                },
            ],
            edges,
            triangles,
            retired_edges: incident_edges.into_iter().collect(),
            retired_triangles: incident_triangles.into_iter().collect(),
        })
    }

    /// Splits `edge` with a new vertex that starts at the edge midpoint and
    /// ends at `at`.
    ///
    /// The new vertex takes the next free id (`geometry.vertex_count()`).
    pub fn split<G: MeshQuery + ?Sized>(
        topology: &Topology,
        geometry: &G,
        edge: EdgeId,
        at: Vec3,
    ) -> WeftResult<Self> {
        let [a, b] = check_edge(geometry, edge)?;
        let n = VertexId(geometry.vertex_count() as u32);
        let midpoint = geometry.position(a).lerp(geometry.position(b), 0.5);

        let adjacent: Vec<TriangleId> = topology
            .edge_triangles
            .get(edge.index())
            .map(|tris| tris.iter().map(|&t| TriangleId(t)).collect())
            .unwrap_or_default();

        let mut edges = vec![[a, n], [n, b]];
        let mut triangles = Vec::with_capacity(adjacent.len() * 2);
        for &t in &adjacent {
            let tri = geometry.triangle(t);
            if let Some(&wing) = tri.iter().find(|&&v| v != a && v != b) {
                edges.push([n, wing]);
            }
            triangles.push(tri.map(|v| if v == b { n } else { v }));
            triangles.push(tri.map(|v| if v == a { n } else { v }));
        }

        Ok(Self {
            moves: vec![VertexMove {
                vertex: n,
                from: midpoint,
                to: at,
            }],
            edges,
            triangles,
            retired_edges: vec![edge],
            retired_triangles: adjacent,
        })
    }

    /// Flips an interior `edge` to connect the two wing vertices.
    pub fn flip<G: MeshQuery + ?Sized>(
        topology: &Topology,
        geometry: &G,
        edge: EdgeId,
    ) -> WeftResult<Self> {
        let wings = topology.interior_edge(edge).ok_or_else(|| {
            WeftError::InvalidArgument(format!("edge {} is not shared by two triangles", edge.0))
        })?;
        let (v0, v1) = (VertexId(wings.v0), VertexId(wings.v1));
        let (wa, wb) = (VertexId(wings.wing_a), VertexId(wings.wing_b));

        if topology.edge_index(wa, wb).is_some() {
            return Err(WeftError::InvalidArgument(format!(
                "flipping edge {} would duplicate edge ({}, {})",
                edge.0, wa.0, wb.0
            )));
        }

        // Keep the winding of triangle A: it runs p → q → wa
        let tri_a = geometry.triangle(TriangleId(wings.tri_a));
        let runs_forward = (0..3).any(|k| tri_a[k] == v0 && tri_a[(k + 1) % 3] == v1);
        let (p, q) = if runs_forward { (v0, v1) } else { (v1, v0) };

        Ok(Self {
            moves: Vec::new(),
            edges: vec![[wa, wb]],
            triangles: vec![[p, wb, wa], [wb, q, wa]],
            retired_edges: vec![edge],
            retired_triangles: vec![TriangleId(wings.tri_a), TriangleId(wings.tri_b)],
        })
    }

    /// Number of vertices the edit moves or creates.
    pub fn moving_vertex_count(&self) -> usize {
        self.moves.len()
    }
}

/// Tolerances of the edit safety check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditCheckParams {
    /// Padding of swept boxes.
    pub pad: f64,
    /// Narrow-phase tolerances.
    pub narrow: NarrowPhaseParams,
}

impl Default for EditCheckParams {
    fn default() -> Self {
        Self::from(&CollisionConfig::default())
    }
}

impl From<&CollisionConfig> for EditCheckParams {
    fn from(config: &CollisionConfig) -> Self {
        Self {
            pad: config.edit_pad,
            narrow: config.narrow_params(),
        }
    }
}

/// Start and end positions under the edit's pseudo-motion.
struct EditFrame<'a, G: ?Sized> {
    geometry: &'a G,
    moves: BTreeMap<VertexId, (Vec3, Vec3)>,
    retired_edges: BTreeSet<EdgeId>,
    retired_triangles: BTreeSet<TriangleId>,
}

impl<'a, G: MeshQuery + ?Sized> EditFrame<'a, G> {
    fn new(edit: &MeshEdit, geometry: &'a G) -> WeftResult<Self> {
        let moves: BTreeMap<VertexId, (Vec3, Vec3)> = edit
            .moves
            .iter()
            .map(|m| (m.vertex, (m.from, m.to)))
            .collect();

        let known = |v: &VertexId| moves.contains_key(v) || v.index() < geometry.vertex_count();
        let all_known = edit.edges.iter().flatten().all(known)
            && edit.triangles.iter().flatten().all(known);
        if !all_known {
            return Err(WeftError::InvalidArgument(
                "edit references a vertex that is neither stored nor moved".into(),
            ));
        }

        Ok(Self {
            geometry,
            moves,
            retired_edges: edit.retired_edges.iter().copied().collect(),
            retired_triangles: edit.retired_triangles.iter().copied().collect(),
        })
    }

    fn is_moving(&self, v: VertexId) -> bool {
        self.moves.contains_key(&v)
    }

    fn start(&self, v: VertexId) -> Vec3 {
        match self.moves.get(&v) {
            Some(&(from, _)) => from,
            None => self.geometry.position(v),
        }
    }

    fn end(&self, v: VertexId) -> Vec3 {
        match self.moves.get(&v) {
            Some(&(_, to)) => to,
            None => self.geometry.position(v),
        }
    }

    fn is_immune(&self, v: VertexId) -> bool {
        v.index() < self.geometry.vertex_count() && self.geometry.is_collision_immune(v)
    }

    /// Store vertices that take part in the edit or are excluded from collisions.
    fn skip_point(&self, v: VertexId) -> bool {
        self.is_moving(v) || self.is_immune(v)
    }

    fn skip_edge(&self, e: EdgeId) -> bool {
        self.retired_edges.contains(&e)
            || self
                .geometry
                .edge(e)
                .iter()
                .any(|&v| self.skip_point(v))
    }

    fn skip_triangle(&self, t: TriangleId) -> bool {
        self.retired_triangles.contains(&t)
            || self
                .geometry
                .triangle(t)
                .iter()
                .any(|&v| self.skip_point(v))
    }

    /// Box over the start and end positions of `vertices`.
    fn swept_box(&self, vertices: &[VertexId], pad: f64) -> Aabb {
        let mut aabb = Aabb::from_point(self.start(vertices[0]));
        for &v in vertices {
            aabb.include(self.start(v));
            aabb.include(self.end(v));
        }
        aabb.padded(pad)
    }

    /// Box over the end positions of `vertices`.
    fn final_box(&self, vertices: &[VertexId], pad: f64) -> Aabb {
        let mut aabb = Aabb::from_point(self.end(vertices[0]));
        for &v in vertices {
            aabb.include(self.end(v));
        }
        aabb.padded(pad)
    }
}

/// Whether applying `edit` would create a new intersection.
///
/// `broad_phase` must hold boxes for `geometry`'s current elements. An edit
/// that cannot be checked (it references unknown vertices) is reported as
/// colliding.
pub fn would_edit_collide<G: MeshQuery + ?Sized>(
    edit: &MeshEdit,
    geometry: &G,
    broad_phase: &dyn BroadPhase,
    params: &EditCheckParams,
) -> bool {
    match check_edit(edit, geometry, broad_phase, params) {
        Ok(collides) => collides,
        Err(err) => {
            tracing::warn!(%err, "edit could not be checked, rejecting it");
            true
        }
    }
}

/// [`would_edit_collide`] with malformed edits reported as errors.
pub fn check_edit<G: MeshQuery + ?Sized>(
    edit: &MeshEdit,
    geometry: &G,
    broad_phase: &dyn BroadPhase,
    params: &EditCheckParams,
) -> WeftResult<bool> {
    let frame = EditFrame::new(edit, geometry)?;
    let narrow = &params.narrow;
    let pad = params.pad;

    // Moving vertices against static triangles
    for m in &edit.moves {
        if m.from == m.to {
            continue;
        }
        let aabb = Aabb::new(m.from.min(m.to), m.from.max(m.to)).padded(pad);
        for t in broad_phase.query_triangles(&aabb) {
            if frame.skip_triangle(t) {
                continue;
            }
            let [a, b, c] = geometry.triangle(t).map(|v| geometry.position(v));
            if vertex_face_ccd(&[m.from, a, b, c], &[m.to, a, b, c], narrow).is_some() {
                tracing::debug!(vertex = m.vertex.0, triangle = t.0, "edit sweeps a vertex through a triangle");
                return Ok(true);
            }
        }
    }

    // Moving triangles against static points
    for tri in &edit.triangles {
        if !tri.iter().any(|&v| frame.is_moving(v)) {
            continue;
        }
        let aabb = frame.swept_box(tri, pad);
        let start_tri = tri.map(|v| frame.start(v));
        let end_tri = tri.map(|v| frame.end(v));
        for p in broad_phase.query_points(&aabb) {
            if frame.skip_point(p) || tri.contains(&p) {
                continue;
            }
            let x = geometry.position(p);
            let start = [x, start_tri[0], start_tri[1], start_tri[2]];
            let end = [x, end_tri[0], end_tri[1], end_tri[2]];
            if vertex_face_ccd(&start, &end, narrow).is_some() {
                tracing::debug!(vertex = p.0, "edit sweeps a triangle through a vertex");
                return Ok(true);
            }
        }
    }

    // Moving edges against static edges
    for edge in &edit.edges {
        if !edge.iter().any(|&v| frame.is_moving(v)) {
            continue;
        }
        let aabb = frame.swept_box(edge, pad);
        for e in broad_phase.query_edges(&aabb) {
            let other = geometry.edge(e);
            if frame.skip_edge(e) || other.iter().any(|v| edge.contains(v)) {
                continue;
            }
            let [c0, c1] = other.map(|v| geometry.position(v));
            let start = [frame.start(edge[0]), frame.start(edge[1]), c0, c1];
            let end = [frame.end(edge[0]), frame.end(edge[1]), c0, c1];
            if edge_edge_ccd(&start, &end, narrow).is_some() {
                tracing::debug!(edge = e.0, "edit sweeps an edge through an edge");
                return Ok(true);
            }
        }
    }

    // Final configuration: edit edges through store triangles
    for edge in &edit.edges {
        let aabb = frame.final_box(edge, pad);
        let (p, q) = (frame.end(edge[0]), frame.end(edge[1]));
        for t in broad_phase.query_triangles(&aabb) {
            let tri = geometry.triangle(t);
            if frame.skip_triangle(t) || tri.iter().any(|v| edge.contains(v)) {
                continue;
            }
            if segment_hits_triangle(p, q, tri.map(|v| geometry.position(v)), narrow) {
                tracing::debug!(triangle = t.0, "edited edge passes through a triangle");
                return Ok(true);
            }
        }
    }

    // Final configuration: store edges through edit triangles
    for tri in &edit.triangles {
        let aabb = frame.final_box(tri, pad);
        let corners = tri.map(|v| frame.end(v));
        for e in broad_phase.query_edges(&aabb) {
            let other = geometry.edge(e);
            if frame.skip_edge(e) || other.iter().any(|v| tri.contains(v)) {
                continue;
            }
            let [p, q] = other.map(|v| geometry.position(v));
            if segment_hits_triangle(p, q, corners, narrow) {
                tracing::debug!(edge = e.0, "edge passes through an edited triangle");
                return Ok(true);
            }
        }
    }

    Ok(false)
}
