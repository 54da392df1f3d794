//! Stop signs on a periodic road

use sorted_vec::SortedVec;

use crate::error::CaError;

use super::boundary::CellAccess;
use super::rng::RandomSource;
use super::rules::{ring_distance, standard_velocity};
use super::types::{Cell, ConfigWarning};

/// Positions of the stop signs, kept sorted for lookup
#[derive(Debug, Clone)]
pub struct StopSigns {
    positions: SortedVec<usize>,
    size: usize,
}

impl StopSigns {
    /// Places `size * density` signs at distinct random cells
    ///
    /// A road cannot hold a sign on every cell; the count is capped at
    /// `size - 2`.
    pub fn place(
        size: usize,
        density: f64,
        random: &mut RandomSource,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<Self, CaError> {
        let density = super::types::checked_fraction("stop_density", density, 0.1, warnings);
        let mut count = (size as f64 * density) as usize;
        if count >= size {
            let capped = size.saturating_sub(2);
            warnings.push(ConfigWarning::report("stops", count as f64, capped as f64));
            count = capped;
        }
        Ok(Self::from_positions(size, random.sample_positions(size, count)?))
    }

    pub fn from_positions(size: usize, positions: Vec<usize>) -> Self {
        let positions = positions.into_iter().filter(|&p| p < size).collect();
        Self {
            positions: SortedVec::from_unsorted(positions),
            size,
        }
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Distance from `pos` to the first sign ahead; `i32::MAX` without signs
    pub fn next_stop_dist(&self, pos: usize) -> i32 {
        let ahead = self.positions.partition_point(|&s| s <= pos);
        match self.positions.get(ahead).or(self.positions.first()) {
            Some(&stop) => ring_distance(pos, stop, self.size),
            None => i32::MAX,
        }
    }

    /// Ordinary update, then one extra unit of braking near a sign
    pub fn velocity<A: CellAccess>(
        &self,
        road: &A,
        i: usize,
        vmax: i32,
        random: &mut RandomSource,
        rand_prob: f64,
    ) -> Cell {
        let pos = i as isize;
        let v = standard_velocity(road.get_at(pos), road.next_car_dist(pos), vmax, random, rand_prob);
        if v > 1 && self.next_stop_dist(i) < 2 * vmax {
            v - 1
        } else {
            v
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_wraps_around_the_ring() {
        let stops = StopSigns::from_positions(20, vec![15, 3]);
        assert_eq!(stops.next_stop_dist(0), 3);
        assert_eq!(stops.next_stop_dist(3), 12);
        assert_eq!(stops.next_stop_dist(16), 7);
    }

    #[test]
    fn sign_on_own_cell_is_a_full_lap_away() {
        let stops = StopSigns::from_positions(10, vec![4]);
        assert_eq!(stops.next_stop_dist(4), 10);
    }

    #[test]
    fn no_signs_means_no_distance() {
        let stops = StopSigns::from_positions(10, vec![]);
        assert_eq!(stops.next_stop_dist(0), i32::MAX);
    }

    #[test]
    fn sign_count_is_capped() {
        let mut random = RandomSource::scripted([]);
        let mut warnings = Vec::new();
        let stops = StopSigns::place(10, 1.0, &mut random, &mut warnings).unwrap();
        assert_eq!(stops.positions().len(), 8);
        assert_eq!(warnings.len(), 1);
    }
}
