//! Collision pass orchestration: broad → narrow, with telemetry.
//!
//! The pipeline owns the broad-phase index and the tolerances. Each pass
//! rebuilds the index from the geometry, gathers candidate pairs, runs the
//! narrow phase and reports what it found. Applying impulses and iterating
//! until the step is collision-free is left to the caller.

use weft_math::Aabb;
use weft_telemetry::{CollisionEvent, EventBus, EventKind, RebuildMode};
use weft_types::{EdgeId, VertexId, WeftError, WeftResult};

use crate::broad::{self, static_box, swept_box, BroadPhase, ElementClass};
use crate::collision::{sort_by_time, ContinuousCollision, PrimitivePair, ProximityCollision};
use crate::config::CollisionConfig;
use crate::geometry::MeshQuery;
use crate::narrow::{proximity, try_analyse};
use crate::safety::{self, EditCheckParams, MeshEdit};

/// Result of a continuous-time pass.
#[derive(Debug, Clone, Default)]
pub struct ContinuousPass {
    /// Confirmed collisions, earliest first.
    pub collisions: Vec<ContinuousCollision>,
    /// Vertex-face pairs handed to the narrow phase.
    pub vertex_face_candidates: usize,
    /// Edge-edge pairs handed to the narrow phase.
    pub edge_edge_candidates: usize,
    /// Pairs that touched but had no usable normal.
    pub degenerate: usize,
}

impl ContinuousPass {
    /// Time of the earliest collision, as a fraction of the step.
    pub fn earliest_time(&self) -> Option<f64> {
        self.collisions.first().and_then(|c| c.impact()).map(|i| i.time)
    }

    /// Returns true if nothing collided.
    pub fn is_empty(&self) -> bool {
        self.collisions.is_empty()
    }
}

/// Result of a proximity pass.
#[derive(Debug, Clone, Default)]
pub struct ProximityPass {
    /// Pairs closer than their radius sum.
    pub contacts: Vec<ProximityCollision>,
    /// Vertex-face pairs tested.
    pub vertex_face_candidates: usize,
    /// Edge-edge pairs tested.
    pub edge_edge_candidates: usize,
    /// Pairs at zero distance with no usable normal.
    pub degenerate: usize,
}

impl ProximityPass {
    /// Largest penetration depth (0 when there are no contacts).
    pub fn max_penetration(&self) -> f64 {
        self.contacts
            .iter()
            .map(|c| c.penetration)
            .fold(0.0, f64::max)
    }
}

/// Collision pipeline: broad phase plus narrow phase over one geometry.
pub struct CollisionPipeline {
    broad: Box<dyn BroadPhase + Send + Sync>,
    config: CollisionConfig,
    bus: Option<EventBus>,
    pass: u64,
}

impl CollisionPipeline {
    /// Creates a pipeline with the broad phase selected by `config`.
    pub fn new(config: CollisionConfig) -> WeftResult<Self> {
        config.validate()?;
        Ok(Self {
            broad: broad::from_config(&config),
            config,
            bus: None,
            pass: 0,
        })
    }

    /// Replaces the broad phase.
    pub fn with_broad_phase(mut self, broad: Box<dyn BroadPhase + Send + Sync>) -> Self {
        self.broad = broad;
        self
    }

    /// Attaches an event bus. Events are flushed at the end of every pass.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// The validated configuration the pipeline was built with.
    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    /// The broad-phase index populated by the most recent pass.
    pub fn broad_phase(&self) -> &dyn BroadPhase {
        self.broad.as_ref()
    }

    /// Mutable access to the index, e.g. for incremental box updates
    /// between passes.
    pub fn broad_phase_mut(&mut self) -> &mut (dyn BroadPhase + Send + Sync) {
        self.broad.as_mut()
    }

    /// The attached event bus, if any, for registering more sinks.
    pub fn event_bus_mut(&mut self) -> Option<&mut EventBus> {
        self.bus.as_mut()
    }

    /// Number of completed passes.
    pub fn pass_count(&self) -> u64 {
        self.pass
    }

    /// Finds every collision during a step of length `dt`, earliest first.
    pub fn detect_continuous(
        &mut self,
        mesh: &dyn MeshQuery,
        dt: f64,
    ) -> WeftResult<ContinuousPass> {
        if !(dt >= 0.0 && dt.is_finite()) {
            return Err(WeftError::InvalidArgument(format!(
                "timestep must be non-negative and finite, got {dt}"
            )));
        }

        let pad = self.config.continuous_pad;
        self.broad.rebuild_continuous(mesh, dt, pad);
        self.emit_rebuild(RebuildMode::Continuous);

        let (vertex_face, edge_edge) =
            gather_candidates(self.broad.as_ref(), mesh, |vs| swept_box(mesh, vs, dt, pad));
        self.emit(EventKind::CandidatesGathered {
            vertex_face: vertex_face.len() as u32,
            edge_edge: edge_edge.len() as u32,
        });

        let params = self.config.narrow_params();
        let mut pass = ContinuousPass {
            vertex_face_candidates: vertex_face.len(),
            edge_edge_candidates: edge_edge.len(),
            ..Default::default()
        };

        for pair in vertex_face.into_iter().chain(edge_edge) {
            let mut record = ContinuousCollision::new(pair);
            match try_analyse(&mut record, mesh, dt, &params) {
                Ok(true) => pass.collisions.push(record),
                Ok(false) => {}
                Err(WeftError::DegenerateGeometry(reason)) => {
                    tracing::warn!(?pair, %reason, "degenerate collision skipped");
                    pass.degenerate += 1;
                }
                Err(err) => return Err(err),
            }
        }
        sort_by_time(&mut pass.collisions);

        if pass.degenerate > 0 {
            self.emit(EventKind::DegenerateSkipped {
                count: pass.degenerate as u32,
            });
        }
        self.emit(EventKind::ContinuousCollisions {
            confirmed: pass.collisions.len() as u32,
            earliest_time: pass.earliest_time(),
        });
        tracing::debug!(
            pass = self.pass,
            vertex_face = pass.vertex_face_candidates,
            edge_edge = pass.edge_edge_candidates,
            confirmed = pass.collisions.len(),
            degenerate = pass.degenerate,
            "continuous collision pass"
        );
        self.finish_pass();
        Ok(pass)
    }

    /// Finds every pair currently closer than its radius sum.
    pub fn detect_proximity(&mut self, mesh: &dyn MeshQuery) -> WeftResult<ProximityPass> {
        let epsilon = self.config.proximity_epsilon;
        self.broad.rebuild_static(mesh, epsilon);
        self.emit_rebuild(RebuildMode::Static);

        let (vertex_face, edge_edge) =
            gather_candidates(self.broad.as_ref(), mesh, |vs| static_box(mesh, vs, epsilon));
        self.emit(EventKind::CandidatesGathered {
            vertex_face: vertex_face.len() as u32,
            edge_edge: edge_edge.len() as u32,
        });

        let mut pass = ProximityPass {
            vertex_face_candidates: vertex_face.len(),
            edge_edge_candidates: edge_edge.len(),
            ..Default::default()
        };
        for pair in vertex_face.iter().chain(&edge_edge) {
            match proximity(pair, mesh) {
                Ok(Some(contact)) => pass.contacts.push(contact),
                Ok(None) => {}
                Err(WeftError::DegenerateGeometry(reason)) => {
                    tracing::warn!(?pair, %reason, "degenerate contact skipped");
                    pass.degenerate += 1;
                }
                Err(err) => return Err(err),
            }
        }

        if pass.degenerate > 0 {
            self.emit(EventKind::DegenerateSkipped {
                count: pass.degenerate as u32,
            });
        }
        self.emit(EventKind::ProximityContacts {
            contacts: pass.contacts.len() as u32,
            max_penetration: pass.max_penetration(),
        });
        tracing::debug!(
            pass = self.pass,
            contacts = pass.contacts.len(),
            max_penetration = pass.max_penetration(),
            "proximity pass"
        );
        self.finish_pass();
        Ok(pass)
    }

    /// Edit safety check against the index built by the most recent pass.
    pub fn would_edit_collide(&mut self, edit: &MeshEdit, mesh: &dyn MeshQuery) -> bool {
        let params = EditCheckParams::from(&self.config);
        let collides = safety::would_edit_collide(edit, mesh, self.broad.as_ref(), &params);
        if collides {
            self.emit(EventKind::EditRejected {
                moving_vertices: edit.moving_vertex_count() as u32,
            });
            if let Some(bus) = self.bus.as_mut() {
                bus.flush();
            }
        }
        collides
    }

    fn emit(&self, kind: EventKind) {
        if let Some(bus) = &self.bus {
            bus.emit(CollisionEvent::new(self.pass, kind));
        }
    }

    fn emit_rebuild(&self, mode: RebuildMode) {
        self.emit(EventKind::BroadPhaseRebuilt {
            backend: self.broad.name().to_string(),
            mode,
            points: self.broad.len(ElementClass::Point) as u32,
            edges: self.broad.len(ElementClass::Edge) as u32,
            triangles: self.broad.len(ElementClass::Triangle) as u32,
        });
    }

    fn finish_pass(&mut self) {
        if let Some(bus) = self.bus.as_mut() {
            bus.flush();
        }
        self.pass += 1;
    }
}

impl std::fmt::Debug for CollisionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionPipeline")
            .field("broad", &self.broad.name())
            .field("config", &self.config)
            .field("bus", &self.bus)
            .field("pass", &self.pass)
            .finish()
    }
}

/// Candidate pairs from the broad phase, minus adjacent, fully fixed and
/// immune pairs. `bounds` must produce the same boxes the index holds.
fn gather_candidates<F>(
    broad: &dyn BroadPhase,
    mesh: &dyn MeshQuery,
    bounds: F,
) -> (Vec<PrimitivePair>, Vec<PrimitivePair>)
where
    F: Fn(&[VertexId]) -> Aabb,
{
    let keep = |pair: &PrimitivePair| {
        !pair.shares_vertex() && !pair.is_fixed(mesh) && !pair.has_immune(mesh)
    };

    let mut vertex_face = Vec::new();
    for i in 0..mesh.vertex_count() {
        let v = VertexId(i as u32);
        for t in broad.query_triangles(&bounds(&[v])) {
            let pair = PrimitivePair::vertex_face(v, mesh.triangle(t));
            if keep(&pair) {
                vertex_face.push(pair);
            }
        }
    }

    let mut edge_edge = Vec::new();
    for (i, edge) in mesh.edges().iter().enumerate() {
        for e in broad.query_edges(&bounds(edge)) {
            if e <= EdgeId(i as u32) {
                continue;
            }
            let pair = PrimitivePair::edge_edge(*edge, mesh.edge(e));
            if keep(&pair) {
                edge_edge.push(pair);
            }
        }
    }

    (vertex_face, edge_edge)
}
