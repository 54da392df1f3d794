//! Statistics over a recorded history
//!
//! The initial snapshot is skipped when counting but still counts towards
//! the normalization, so a run of `n` steps divides by `n + 1`.

use ordered_float::OrderedFloat;

use super::boundary::Boundary;
use super::types::{Cell, EMPTY};

/// Fraction of steps each cell was occupied
pub fn occupancy(history: &[Vec<Cell>]) -> Vec<f64> {
    let height = history.len();
    let width = history.first().map_or(0, Vec::len);
    (0..width)
        .map(|i| {
            let hits = history.iter().skip(1).filter(|row| row[i] != EMPTY).count();
            hits as f64 / height as f64
        })
        .collect()
}

/// Fraction of steps a vehicle crossed from each cell into the next one
pub fn flow(flow_history: &[Vec<bool>], boundary: Boundary) -> Vec<f64> {
    let height = flow_history.len();
    let width = flow_history.first().map_or(0, Vec::len);
    (0..width)
        .map(|i| {
            let next = boundary.resolve(i as isize + 1, width);
            let hits = flow_history
                .iter()
                .skip(1)
                .filter(|row| row[i] && next.is_some_and(|n| row[n]))
                .count();
            hits as f64 / height as f64
        })
        .collect()
}

/// Multi-lane occupancy, summed over lanes
pub fn lane_occupancy(history: &[Vec<Vec<Cell>>]) -> Vec<f64> {
    let height = history.len();
    let width = history.first().map_or(0, Vec::len);
    let lanes = history.first().and_then(|row| row.first()).map_or(1, Vec::len);
    (0..width)
        .map(|i| {
            let hits: usize = history
                .iter()
                .skip(1)
                .map(|row| row[i].iter().filter(|&&c| c != EMPTY).count())
                .sum();
            hits as f64 / (height * lanes) as f64
        })
        .collect()
}

/// Multi-lane flow, summed over lanes
pub fn lane_flow(flow_history: &[Vec<Vec<bool>>], boundary: Boundary) -> Vec<f64> {
    let height = flow_history.len();
    let width = flow_history.first().map_or(0, Vec::len);
    let lanes = flow_history.first().and_then(|row| row.first()).map_or(1, Vec::len);
    (0..width)
        .map(|i| {
            let next = boundary.resolve(i as isize + 1, width);
            let hits: usize = flow_history
                .iter()
                .skip(1)
                .map(|row| {
                    (0..lanes)
                        .filter(|&l| row[i][l] && next.is_some_and(|n| row[n][l]))
                        .count()
                })
                .sum();
            hits as f64 / (height * lanes) as f64
        })
        .collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// True when vehicles remain but none moved during the latest step
pub fn is_flux_halted<'a>(latest_flow: impl IntoIterator<Item = &'a bool>, cars: usize) -> bool {
    cars != 0 && !latest_flow.into_iter().any(|&marked| marked)
}

/// One measured curve of a parameter sweep
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Series {
    pub fn push(&mut self, x: f64, y: f64) {
        self.x.push(x);
        self.y.push(y);
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn points(&self) -> impl DoubleEndedIterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }

    /// Point with the largest `y`; the first one wins ties
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.points()
            .rev()
            .max_by_key(|&(_, y)| OrderedFloat(y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_snapshot_is_not_counted() {
        let history = vec![vec![1, 1], vec![EMPTY, 2], vec![EMPTY, 3], vec![0, EMPTY]];
        assert_eq!(occupancy(&history), vec![0.25, 0.5]);
    }

    #[test]
    fn flow_needs_both_markers() {
        let flows = vec![
            vec![true, true, true],
            vec![true, true, false],
            vec![false, true, true],
        ];
        let periodic = flow(&flows, Boundary::Periodic);
        assert_eq!(periodic, vec![1.0 / 3.0, 1.0 / 3.0, 0.0]);
        let open = flow(&flows, Boundary::Open);
        assert_eq!(open[2], 0.0);
    }

    #[test]
    fn halted_only_with_cars_left() {
        assert!(is_flux_halted(&[false, false], 3));
        assert!(!is_flux_halted(&[false, false], 0));
        assert!(!is_flux_halted(&[false, true], 3));
    }

    #[test]
    fn peak_prefers_first_maximum() {
        let mut series = Series::default();
        series.push(0.1, 0.2);
        series.push(0.2, 0.5);
        series.push(0.3, 0.5);
        series.push(0.4, 0.1);
        assert_eq!(series.peak(), Some((0.2, 0.5)));
        assert_eq!(series.len(), 4);
    }
}
