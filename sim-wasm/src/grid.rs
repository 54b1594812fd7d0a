use crate::agent::{Agent, AgentId};
use crate::cell::{Cell, CellId, CellIndex};
use crate::config::{VisibleRange, WorldBounds};
use crate::error::SimError;
use crate::math::{is_finite3, Vec3};

pub const MAX_SUBDIVISIONS: usize = 128;

// Sign pattern of the 8 corners of the sight cube.
const CORNER_SIGNS: [[f32; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, 1.0, 1.0],
    [1.0, -1.0, -1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, -1.0],
    [1.0, 1.0, 1.0],
];

/// Uniform partition of the world into `subdivisions³` cells. Cells are
/// stored flat in id order, so a `CellId` doubles as the vector index.
pub struct Grid {
    bounds: WorldBounds,
    subdivisions: usize,
    cell_size: Vec3,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(bounds: WorldBounds, subdivisions: usize) -> Result<Self, SimError> {
        if subdivisions == 0 || subdivisions > MAX_SUBDIVISIONS {
            return Err(SimError::InvalidSubdivisions(subdivisions));
        }

        let extent = bounds.extent();
        let n = subdivisions as f32;
        let cell_size = [extent[0] / n, extent[1] / n, extent[2] / n];

        let mut cells = Vec::with_capacity(subdivisions * subdivisions * subdivisions);
        for i in 0..subdivisions {
            for j in 0..subdivisions {
                for k in 0..subdivisions {
                    let index = CellIndex::new(i, j, k);
                    cells.push(Cell::new(cell_id_for(subdivisions, index), index));
                }
            }
        }

        log::info!(
            "grid {n}x{n}x{n}, cell dimensions {:?}",
            cell_size,
            n = subdivisions
        );

        Ok(Self {
            bounds,
            subdivisions,
            cell_size,
            cells,
        })
    }

    pub fn bounds(&self) -> &WorldBounds {
        &self.bounds
    }

    pub fn subdivisions(&self) -> usize {
        self.subdivisions
    }

    pub fn cell_size(&self) -> Vec3 {
        self.cell_size
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Floor index along each axis, without range checks. Positions outside
    /// the world give negative or `>= subdivisions` components.
    pub fn raw_index_for(&self, position: Vec3) -> [i64; 3] {
        let mut raw = [0_i64; 3];
        for axis in 0..3 {
            raw[axis] =
                ((position[axis] - self.bounds.min[axis]) / self.cell_size[axis]).floor() as i64;
        }
        raw
    }

    pub fn cell_index_for(&self, position: Vec3) -> Option<CellIndex> {
        if !is_finite3(position) {
            return None;
        }

        let raw = self.raw_index_for(position);
        let n = self.subdivisions as i64;
        if raw.iter().any(|&c| c < 0 || c >= n) {
            return None;
        }

        Some(CellIndex::new(raw[0] as usize, raw[1] as usize, raw[2] as usize))
    }

    pub fn cell_id(&self, index: CellIndex) -> CellId {
        cell_id_for(self.subdivisions, index)
    }

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id.index())
    }

    pub fn cell_at(&self, index: CellIndex) -> &Cell {
        &self.cells[self.cell_id(index).index()]
    }

    pub fn cell_for(&self, agent: &Agent) -> Result<&Cell, SimError> {
        self.cell_index_for(agent.position)
            .map(|index| self.cell_at(index))
            .ok_or(SimError::OutOfBounds {
                agent: agent.id(),
                position: agent.position,
            })
    }

    /// Cells overlapping the axis-aligned cube of half-width `sight_distance`
    /// around `position`. This over-approximates the sight sphere.
    pub fn visible_cells(
        &self,
        position: Vec3,
        sight_distance: f32,
        range: VisibleRange,
    ) -> Vec<&Cell> {
        let mut visible = Vec::new();
        self.for_each_visible_cell(position, sight_distance, range, |cell| visible.push(cell));
        visible
    }

    pub fn for_each_visible_agent<F>(
        &self,
        position: Vec3,
        sight_distance: f32,
        range: VisibleRange,
        mut callback: F,
    ) where
        F: FnMut(AgentId),
    {
        self.for_each_visible_cell(position, sight_distance, range, |cell| {
            for agent in cell.iter() {
                callback(agent);
            }
        });
    }

    fn for_each_visible_cell<'a, F>(
        &'a self,
        position: Vec3,
        sight_distance: f32,
        range: VisibleRange,
        mut callback: F,
    ) where
        F: FnMut(&'a Cell),
    {
        let (start, end) = self.visible_box(position, sight_distance, range);
        for i in start[0]..end[0] {
            for j in start[1]..end[1] {
                for k in start[2]..end[2] {
                    callback(self.cell_at(CellIndex::new(i, j, k)));
                }
            }
        }
    }

    // Half-open [start, end) per axis.
    fn visible_box(
        &self,
        position: Vec3,
        sight_distance: f32,
        range: VisibleRange,
    ) -> ([usize; 3], [usize; 3]) {
        let n = self.subdivisions as i64;
        let mut min_index = [n; 3];
        let mut max_index = [-1_i64; 3];

        for signs in CORNER_SIGNS {
            let corner = [
                position[0] + signs[0] * sight_distance,
                position[1] + signs[1] * sight_distance,
                position[2] + signs[2] * sight_distance,
            ];
            let raw = self.raw_index_for(corner);
            for axis in 0..3 {
                min_index[axis] = min_index[axis].min(raw[axis]);
                max_index[axis] = max_index[axis].max(raw[axis]);
            }
        }

        let mut start = [0_usize; 3];
        let mut end = [0_usize; 3];
        for axis in 0..3 {
            let lo = min_index[axis].clamp(0, n - 1) as usize;
            let hi = max_index[axis].clamp(0, n - 1) as usize;
            start[axis] = lo;
            end[axis] = match range {
                VisibleRange::Inclusive => hi + 1,
                VisibleRange::Exclusive => hi,
            };
        }
        (start, end)
    }

    pub fn insert(&mut self, agent: AgentId, cell: CellId) -> bool {
        self.cells[cell.index()].insert(agent)
    }

    pub fn remove(&mut self, agent: AgentId, cell: CellId) -> bool {
        self.cells[cell.index()].remove(agent)
    }

    /// Moves `agent` into the cell its position maps to, if that differs from
    /// its cached cell. Returns whether a move happened.
    pub fn rebucket(&mut self, agent: &mut Agent) -> Result<bool, SimError> {
        let index = self
            .cell_index_for(agent.position)
            .ok_or(SimError::OutOfBounds {
                agent: agent.id(),
                position: agent.position,
            })?;
        let id = self.cell_id(index);

        if agent.cell == Some(id) {
            return Ok(false);
        }
        if let Some(previous) = agent.cell {
            self.remove(agent.id(), previous);
        }
        self.insert(agent.id(), id);
        agent.cell = Some(id);
        Ok(true)
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    pub fn population(&self) -> usize {
        self.cells.iter().map(Cell::len).sum()
    }

    pub fn occupied_cells(&self) -> usize {
        self.cells.iter().filter(|cell| !cell.is_empty()).count()
    }
}

fn cell_id_for(subdivisions: usize, index: CellIndex) -> CellId {
    let n = subdivisions;
    CellId((index.i * n * n + index.j * n + index.k) as u32)
}
