//! Boundary-indexed access to the cell store
//!
//! Any position, including negative ones and ones past the end, maps to a
//! cell reference. Periodic roads wrap; open roads hand out a shared
//! sentinel that always reads empty and swallows writes.

use super::rules;
use super::store::{CellStore, LaneStore};
use super::types::{Cell, EMPTY};

/// Edge policy of a road
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Positions wrap modulo the road size
    Periodic,
    /// Positions outside the road resolve to an empty sentinel
    Open,
}

impl Boundary {
    /// Index inside `[0, size)` for `pos`, or `None` when it falls off an open road
    pub fn resolve(self, pos: isize, size: usize) -> Option<usize> {
        if size == 0 {
            return None;
        }
        match self {
            Boundary::Periodic => Some(pos.rem_euclid(size as isize) as usize),
            Boundary::Open => (0..size as isize).contains(&pos).then_some(pos as usize),
        }
    }
}

/// Read/write access to one lane through its boundary policy
pub trait CellAccess {
    fn size(&self) -> usize;

    /// Value of the current array at `pos`
    fn get_at(&self, pos: isize) -> Cell;

    /// Current array
    fn at(&mut self, pos: isize) -> &mut Cell;

    /// Next array, written during a move
    fn at_temp(&mut self, pos: isize) -> &mut Cell;

    /// Next flow markers, written during a move
    fn at_flow_temp(&mut self, pos: isize) -> &mut bool;

    /// Distance to the next occupied cell ahead of `pos`
    fn next_car_dist(&self, pos: isize) -> i32 {
        rules::next_car_dist(self.size(), |d| self.get_at(pos + d) != EMPTY)
    }
}

/// Single-lane road: a cell store seen through a boundary
#[derive(Debug, Clone)]
pub struct Road {
    store: CellStore,
    boundary: Boundary,
    sentinel: Cell,
    flow_sentinel: bool,
}

impl Road {
    pub fn new(store: CellStore, boundary: Boundary) -> Self {
        Self {
            store,
            boundary,
            sentinel: EMPTY,
            flow_sentinel: false,
        }
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    pub fn store(&self) -> &CellStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut CellStore {
        &mut self.store
    }

    pub fn cells(&self) -> &[Cell] {
        self.store.cells()
    }

    /// Cell `pos` of the `step`-th snapshot; empty when out of range
    pub fn get_history_at(&self, step: usize, pos: isize) -> Cell {
        self.boundary
            .resolve(pos, self.store.size())
            .and_then(|i| self.store.history().get(step).map(|row| row[i]))
            .unwrap_or(EMPTY)
    }

    /// Flow marker `pos` of the `step`-th snapshot; no flow when out of range
    pub fn get_flow_at(&self, step: usize, pos: isize) -> bool {
        self.boundary
            .resolve(pos, self.store.size())
            .and_then(|i| self.store.flow_history().get(step).map(|row| row[i]))
            .unwrap_or(false)
    }

    fn sentinel(&mut self) -> &mut Cell {
        self.sentinel = EMPTY;
        &mut self.sentinel
    }
}

impl CellAccess for Road {
    fn size(&self) -> usize {
        self.store.size()
    }

    fn get_at(&self, pos: isize) -> Cell {
        match self.boundary.resolve(pos, self.store.size()) {
            Some(i) => self.store.cells[i],
            None => EMPTY,
        }
    }

    fn at(&mut self, pos: isize) -> &mut Cell {
        match self.boundary.resolve(pos, self.store.size()) {
            Some(i) => &mut self.store.cells[i],
            None => self.sentinel(),
        }
    }

    fn at_temp(&mut self, pos: isize) -> &mut Cell {
        match self.boundary.resolve(pos, self.store.size()) {
            Some(i) => &mut self.store.next[i],
            None => self.sentinel(),
        }
    }

    fn at_flow_temp(&mut self, pos: isize) -> &mut bool {
        match self.boundary.resolve(pos, self.store.size()) {
            Some(i) => &mut self.store.flow_next[i],
            None => {
                self.flow_sentinel = false;
                &mut self.flow_sentinel
            }
        }
    }
}

/// Multi-lane road: a lane store seen through a boundary
#[derive(Debug, Clone)]
pub struct LaneRoad {
    store: LaneStore,
    boundary: Boundary,
    sentinel: Cell,
    flow_sentinel: bool,
}

impl LaneRoad {
    pub fn new(store: LaneStore, boundary: Boundary) -> Self {
        Self {
            store,
            boundary,
            sentinel: EMPTY,
            flow_sentinel: false,
        }
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    pub fn store(&self) -> &LaneStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut LaneStore {
        &mut self.store
    }

    pub fn size(&self) -> usize {
        self.store.size()
    }

    pub fn lanes(&self) -> usize {
        self.store.lanes()
    }

    pub fn get_at(&self, pos: isize, lane: usize) -> Cell {
        match self.boundary.resolve(pos, self.store.size()) {
            Some(i) if lane < self.store.lanes() => self.store.cells[i][lane],
            _ => EMPTY,
        }
    }

    pub fn at(&mut self, pos: isize, lane: usize) -> &mut Cell {
        match self.boundary.resolve(pos, self.store.size()) {
            Some(i) if lane < self.store.lanes() => &mut self.store.cells[i][lane],
            _ => {
                self.sentinel = EMPTY;
                &mut self.sentinel
            }
        }
    }

    pub fn next_car_dist(&self, pos: isize, lane: usize) -> i32 {
        rules::next_car_dist(self.size(), |d| self.get_at(pos + d, lane) != EMPTY)
    }

    pub fn get_history_at(&self, step: usize, pos: isize, lane: usize) -> Cell {
        self.boundary
            .resolve(pos, self.store.size())
            .filter(|_| lane < self.store.lanes())
            .and_then(|i| self.store.history().get(step).map(|row| row[i][lane]))
            .unwrap_or(EMPTY)
    }

    pub fn get_flow_at(&self, step: usize, pos: isize, lane: usize) -> bool {
        self.boundary
            .resolve(pos, self.store.size())
            .filter(|_| lane < self.store.lanes())
            .and_then(|i| self.store.flow_history().get(step).map(|row| row[i][lane]))
            .unwrap_or(false)
    }

    /// Single-lane view used by the shared update rules
    pub fn lane(&mut self, lane: usize) -> LaneView<'_> {
        LaneView { road: self, lane }
    }
}

/// One lane of a [`LaneRoad`]
pub struct LaneView<'a> {
    road: &'a mut LaneRoad,
    lane: usize,
}

impl CellAccess for LaneView<'_> {
    fn size(&self) -> usize {
        self.road.size()
    }

    fn get_at(&self, pos: isize) -> Cell {
        self.road.get_at(pos, self.lane)
    }

    fn at(&mut self, pos: isize) -> &mut Cell {
        self.road.at(pos, self.lane)
    }

    fn at_temp(&mut self, pos: isize) -> &mut Cell {
        let lane = self.lane;
        let road = &mut *self.road;
        match road.boundary.resolve(pos, road.store.size()) {
            Some(i) => &mut road.store.next[i][lane],
            None => {
                road.sentinel = EMPTY;
                &mut road.sentinel
            }
        }
    }

    fn at_flow_temp(&mut self, pos: isize) -> &mut bool {
        let lane = self.lane;
        let road = &mut *self.road;
        match road.boundary.resolve(pos, road.store.size()) {
            Some(i) => &mut road.store.flow_next[i][lane],
            None => {
                road.flow_sentinel = false;
                &mut road.flow_sentinel
            }
        }
    }
}
