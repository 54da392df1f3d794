//! Raw cell state: current array, next buffers and history
//!
//! No indexing policy lives here; see `boundary` for that.

use crate::error::{try_copied, try_filled, try_grid, CaError};

use super::types::{Cell, EMPTY};

/// Double-buffered single-lane cell state plus its recorded history
#[derive(Debug, Clone)]
pub struct CellStore {
    pub(crate) cells: Vec<Cell>,
    pub(crate) next: Vec<Cell>,
    pub(crate) flow_next: Vec<bool>,
    history: Vec<Vec<Cell>>,
    flow_history: Vec<Vec<bool>>,
}

impl CellStore {
    /// Empty road of `size` cells; nothing is recorded yet
    pub fn new(size: usize) -> Result<Self, CaError> {
        Ok(Self {
            cells: try_filled(size, EMPTY)?,
            next: try_filled(size, EMPTY)?,
            flow_next: try_filled(size, false)?,
            history: Vec::new(),
            flow_history: Vec::new(),
        })
    }

    /// Store seeded with a fixed array, initial state already recorded
    pub fn from_cells(cells: Vec<Cell>) -> Result<Self, CaError> {
        let mut store = Self::new(cells.len())?;
        store.cells = cells;
        store.try_record()?;
        Ok(store)
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn history(&self) -> &[Vec<Cell>] {
        &self.history
    }

    pub fn flow_history(&self) -> &[Vec<bool>] {
        &self.flow_history
    }

    pub fn count_cars(&self) -> usize {
        self.cells.iter().filter(|&&c| c != EMPTY).count()
    }

    /// Clears the next buffers before a move
    pub fn clear_next(&mut self) {
        self.next.fill(EMPTY);
        self.flow_next.fill(false);
    }

    /// Makes the next buffer current; the old array becomes scratch space
    pub fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.cells, &mut self.next);
    }

    /// Appends the current array and the latest flow markers to the history
    pub fn record(&mut self) {
        self.history.push(self.cells.clone());
        self.flow_history.push(self.flow_next.clone());
    }

    /// [`CellStore::record`] for construction, where running out of memory is an error
    pub fn try_record(&mut self) -> Result<(), CaError> {
        let cells = try_copied(&self.cells)?;
        let flow = try_copied(&self.flow_next)?;
        reserve_one(&mut self.history, cells.len())?;
        reserve_one(&mut self.flow_history, flow.len())?;
        self.history.push(cells);
        self.flow_history.push(flow);
        Ok(())
    }
}

/// Lane-extended counterpart of [`CellStore`], indexed `[position][lane]`
#[derive(Debug, Clone)]
pub struct LaneStore {
    lanes: usize,
    pub(crate) cells: Vec<Vec<Cell>>,
    pub(crate) next: Vec<Vec<Cell>>,
    pub(crate) flow_next: Vec<Vec<bool>>,
    history: Vec<Vec<Vec<Cell>>>,
    flow_history: Vec<Vec<Vec<bool>>>,
}

impl LaneStore {
    pub fn new(size: usize, lanes: usize) -> Result<Self, CaError> {
        Ok(Self {
            lanes,
            cells: try_grid(size, lanes, EMPTY)?,
            next: try_grid(size, lanes, EMPTY)?,
            flow_next: try_grid(size, lanes, false)?,
            history: Vec::new(),
            flow_history: Vec::new(),
        })
    }

    /// Store seeded with a fixed `[position][lane]` grid, initial state recorded
    ///
    /// Rows shorter than the widest one are padded with empty cells.
    pub fn from_cells(mut cells: Vec<Vec<Cell>>) -> Result<Self, CaError> {
        let lanes = cells.iter().map(Vec::len).max().unwrap_or(0).max(1);
        for row in &mut cells {
            if row.len() < lanes {
                row.try_reserve_exact(lanes - row.len())
                    .map_err(|_| CaError::AllocationFailure { requested: lanes })?;
                row.resize(lanes, EMPTY);
            }
        }
        let mut store = Self::new(cells.len(), lanes)?;
        store.cells = cells;
        store.try_record()?;
        Ok(store)
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn lanes(&self) -> usize {
        self.lanes
    }

    pub fn cells(&self) -> &[Vec<Cell>] {
        &self.cells
    }

    pub fn history(&self) -> &[Vec<Vec<Cell>>] {
        &self.history
    }

    pub fn flow_history(&self) -> &[Vec<Vec<bool>>] {
        &self.flow_history
    }

    pub fn count_cars(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|&&c| c != EMPTY)
            .count()
    }

    /// Values of one lane, in position order
    pub fn lane(&self, lane: usize) -> Vec<Cell> {
        self.cells.iter().map(|cell| cell[lane]).collect()
    }

    pub fn clear_next(&mut self) {
        for cell in &mut self.next {
            cell.fill(EMPTY);
        }
        for flow in &mut self.flow_next {
            flow.fill(false);
        }
    }

    pub fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.cells, &mut self.next);
    }

    pub fn record(&mut self) {
        self.history.push(self.cells.clone());
        self.flow_history.push(self.flow_next.clone());
    }

    pub fn try_record(&mut self) -> Result<(), CaError> {
        let cells = copied_grid(&self.cells)?;
        let flow = copied_grid(&self.flow_next)?;
        reserve_one(&mut self.history, cells.len())?;
        reserve_one(&mut self.flow_history, flow.len())?;
        self.history.push(cells);
        self.flow_history.push(flow);
        Ok(())
    }
}

fn copied_grid<T: Copy>(rows: &[Vec<T>]) -> Result<Vec<Vec<T>>, CaError> {
    let mut copy = Vec::new();
    copy.try_reserve_exact(rows.len())
        .map_err(|_| CaError::AllocationFailure {
            requested: rows.len(),
        })?;
    for row in rows {
        copy.push(try_copied(row)?);
    }
    Ok(copy)
}

fn reserve_one<T>(history: &mut Vec<T>, requested: usize) -> Result<(), CaError> {
    history
        .try_reserve(1)
        .map_err(|_| CaError::AllocationFailure { requested })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_lane_count_is_an_error() {
        let err = LaneStore::new(3, usize::MAX).unwrap_err();
        assert_eq!(
            err,
            CaError::AllocationFailure {
                requested: usize::MAX
            }
        );
    }

    #[test]
    fn short_rows_are_padded() {
        let store = LaneStore::from_cells(vec![vec![1, EMPTY, 2], vec![0], vec![]]).unwrap();
        assert_eq!(store.lanes(), 3);
        assert_eq!(store.cells()[1], vec![0, EMPTY, EMPTY]);
        assert_eq!(store.cells()[2], vec![EMPTY; 3]);
        assert_eq!(store.history().len(), 1);
        assert_eq!(store.flow_history()[0], vec![vec![false; 3]; 3]);
    }

    #[test]
    fn construction_records_the_initial_state() {
        let store = CellStore::from_cells(vec![EMPTY, 2, EMPTY]).unwrap();
        assert_eq!(store.history(), &[vec![EMPTY, 2, EMPTY]]);
        assert_eq!(store.flow_history(), &[vec![false; 3]]);
    }
}
