//! Uniform hash-grid broad phase.
//!
//! Partitions space into cubic cells and bins each element box into every
//! cell it overlaps. A query visits the cells under the query box and tests
//! the stored boxes of the ids it finds. Elements that would cover more than
//! [`MAX_CELLS_PER_ELEMENT`] cells live in an oversized list that every
//! query scans, so one huge element cannot flood the table.

use std::collections::{BTreeSet, HashMap};

use weft_math::{Aabb, Vec3};

use crate::broad::{average_edge_length, BroadPhase, ElementClass};
use crate::geometry::MeshQuery;

/// Elements spanning more cells than this are kept in the oversized list.
pub const MAX_CELLS_PER_ELEMENT: u64 = 64;

/// Cell size used until a rebuild can derive one from the mesh.
const FALLBACK_CELL_SIZE: f64 = 1.0;

type CellKey = (i32, i32, i32);

/// Inclusive range of cells covered by a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRange {
    lo: CellKey,
    hi: CellKey,
}

impl CellRange {
    fn cell_count(&self) -> u64 {
        let span = |lo: i32, hi: i32| (i64::from(hi) - i64::from(lo) + 1).max(0) as u64;
        span(self.lo.0, self.hi.0)
            .saturating_mul(span(self.lo.1, self.hi.1))
            .saturating_mul(span(self.lo.2, self.hi.2))
    }

    fn for_each(&self, mut f: impl FnMut(CellKey)) {
        for x in self.lo.0..=self.hi.0 {
            for y in self.lo.1..=self.hi.1 {
                for z in self.lo.2..=self.hi.2 {
                    f((x, y, z));
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    aabb: Aabb,
    /// `None` for oversized elements.
    cells: Option<CellRange>,
}

/// One grid per element class.
#[derive(Debug, Clone, Default)]
struct HashGrid {
    cells: HashMap<CellKey, Vec<u32>>,
    entries: HashMap<u32, Entry>,
    oversized: BTreeSet<u32>,
}

impl HashGrid {
    fn insert(&mut self, id: u32, aabb: Aabb, inv_cell_size: f64) {
        let range = cell_range(&aabb, inv_cell_size);
        let cells = if range.cell_count() > MAX_CELLS_PER_ELEMENT {
            self.oversized.insert(id);
            None
        } else {
            range.for_each(|key| self.cells.entry(key).or_default().push(id));
            Some(range)
        };
        self.entries.insert(id, Entry { aabb, cells });
    }

    fn remove(&mut self, id: u32) -> Option<Entry> {
        let entry = self.entries.remove(&id)?;
        match entry.cells {
            Some(range) => range.for_each(|key| {
                if let Some(bucket) = self.cells.get_mut(&key) {
                    if let Some(pos) = bucket.iter().position(|&e| e == id) {
                        bucket.swap_remove(pos);
                    }
                    if bucket.is_empty() {
                        self.cells.remove(&key);
                    }
                }
            }),
            None => {
                self.oversized.remove(&id);
            }
        }
        Some(entry)
    }

    fn update(&mut self, id: u32, aabb: Aabb, inv_cell_size: f64) {
        if let Some(entry) = self.entries.get_mut(&id) {
            let range = cell_range(&aabb, inv_cell_size);
            // Same cells: only the stored box changes
            if entry.cells == Some(range) {
                entry.aabb = aabb;
                return;
            }
        }
        self.remove(id);
        self.insert(id, aabb, inv_cell_size);
    }

    fn query(&self, aabb: &Aabb, inv_cell_size: f64) -> Vec<u32> {
        let range = cell_range(aabb, inv_cell_size);
        let mut hits: Vec<u32> = if range.cell_count() > self.entries.len() as u64 {
            // Visiting the cells would cost more than scanning every element
            self.entries
                .iter()
                .filter(|(_, e)| e.aabb.overlaps(aabb))
                .map(|(&id, _)| id)
                .collect()
        } else {
            let mut hits = Vec::new();
            range.for_each(|key| {
                if let Some(bucket) = self.cells.get(&key) {
                    for &id in bucket {
                        if self.entries[&id].aabb.overlaps(aabb) {
                            hits.push(id);
                        }
                    }
                }
            });
            for &id in &self.oversized {
                if self.entries[&id].aabb.overlaps(aabb) {
                    hits.push(id);
                }
            }
            hits
        };
        hits.sort_unstable();
        hits.dedup();
        hits
    }

    fn rehash(&mut self, inv_cell_size: f64) {
        let entries: Vec<(u32, Aabb)> = self.entries.iter().map(|(&id, e)| (id, e.aabb)).collect();
        self.cells.clear();
        self.entries.clear();
        self.oversized.clear();
        for (id, aabb) in entries {
            self.insert(id, aabb, inv_cell_size);
        }
    }
}

fn cell_coord(x: f64, inv_cell_size: f64) -> i32 {
    // Float-to-int casts saturate, so far-away boxes clamp to the edge cells
    (x * inv_cell_size).floor() as i32
}

fn cell_key(p: Vec3, inv_cell_size: f64) -> CellKey {
    (
        cell_coord(p.x, inv_cell_size),
        cell_coord(p.y, inv_cell_size),
        cell_coord(p.z, inv_cell_size),
    )
}

fn cell_range(aabb: &Aabb, inv_cell_size: f64) -> CellRange {
    CellRange {
        lo: cell_key(aabb.min, inv_cell_size),
        hi: cell_key(aabb.max, inv_cell_size),
    }
}

/// Uniform hash-grid broad phase with one grid per element class.
#[derive(Debug, Clone)]
pub struct GridBroadPhase {
    /// Configured cell size; `None` derives it on every rebuild.
    fixed_cell_size: Option<f64>,
    /// Inverse cell size (cached for performance).
    inv_cell_size: f64,
    grids: [HashGrid; 3],
}

impl GridBroadPhase {
    /// Create a grid with a fixed cell size.
    pub fn new(cell_size: f64) -> Self {
        let cell_size = sanitize_cell_size(cell_size);
        Self {
            fixed_cell_size: Some(cell_size),
            inv_cell_size: 1.0 / cell_size,
            grids: Default::default(),
        }
    }

    /// Create a grid that sizes its cells from the mesh's average edge
    /// length whenever it is rebuilt.
    pub fn adaptive() -> Self {
        Self {
            fixed_cell_size: None,
            inv_cell_size: 1.0 / FALLBACK_CELL_SIZE,
            grids: Default::default(),
        }
    }

    /// Current cell size.
    pub fn cell_size(&self) -> f64 {
        1.0 / self.inv_cell_size
    }

    /// Changes the cell size, rehashing every stored element.
    pub fn set_cell_size(&mut self, cell_size: f64) {
        let cell_size = sanitize_cell_size(cell_size);
        self.inv_cell_size = 1.0 / cell_size;
        for grid in &mut self.grids {
            grid.rehash(self.inv_cell_size);
        }
    }

    /// Number of oversized elements of a class.
    pub fn oversized_count(&self, class: ElementClass) -> usize {
        self.grids[class.index()].oversized.len()
    }
}

fn sanitize_cell_size(cell_size: f64) -> f64 {
    if cell_size.is_finite() {
        cell_size.max(1e-9)
    } else {
        FALLBACK_CELL_SIZE
    }
}

impl BroadPhase for GridBroadPhase {
    fn insert(&mut self, class: ElementClass, id: u32, aabb: Aabb) {
        let grid = &mut self.grids[class.index()];
        debug_assert!(
            !grid.entries.contains_key(&id),
            "{class:?} {id} is already registered; use update"
        );
        if grid.entries.contains_key(&id) {
            grid.update(id, aabb, self.inv_cell_size);
        } else {
            grid.insert(id, aabb, self.inv_cell_size);
        }
    }

    fn update(&mut self, class: ElementClass, id: u32, aabb: Aabb) {
        self.grids[class.index()].update(id, aabb, self.inv_cell_size);
    }

    fn remove(&mut self, class: ElementClass, id: u32) {
        self.grids[class.index()].remove(id);
    }

    fn query(&self, class: ElementClass, aabb: &Aabb) -> Vec<u32> {
        self.grids[class.index()].query(aabb, self.inv_cell_size)
    }

    fn len(&self, class: ElementClass) -> usize {
        self.grids[class.index()].entries.len()
    }

    fn clear(&mut self) {
        for grid in &mut self.grids {
            grid.cells.clear();
            grid.entries.clear();
            grid.oversized.clear();
        }
    }

    fn name(&self) -> &str {
        "grid"
    }

    fn begin_rebuild(&mut self, mesh: &dyn MeshQuery) {
        if self.fixed_cell_size.is_none() {
            if let Some(length) = average_edge_length(mesh) {
                self.inv_cell_size = 1.0 / sanitize_cell_size(length);
            }
        }
    }
}
