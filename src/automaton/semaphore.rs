//! Traffic lights on a periodic road
//!
//! Each light counts down from [`SEMAPHORE_INIT`] and is red while its
//! counter sits below [`SEMAPHORE_OPEN`]. A red light acts as a parked
//! vehicle for anyone approaching it.

use crate::error::CaError;

use super::boundary::CellAccess;
use super::rng::RandomSource;
use super::rules::{ring_distance, standard_velocity};
use super::types::{Cell, ConfigWarning};

pub const SEMAPHORE_INIT: i32 = 100;
pub const SEMAPHORE_OPEN: i32 = 50;

#[derive(Debug, Clone)]
pub struct Semaphores {
    positions: Vec<usize>,
    counters: Vec<i32>,
    history: Vec<Vec<i32>>,
    size: usize,
}

impl Semaphores {
    /// Places `size * density` lights, at random cells or evenly spaced from cell 0
    pub fn place(
        size: usize,
        density: f64,
        random_placement: bool,
        random: &mut RandomSource,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<Self, CaError> {
        let density =
            super::types::checked_fraction("semaphore_density", density, 0.1, warnings);
        let mut count = (size as f64 * density) as usize;
        if count >= size {
            let capped = size.saturating_sub(2);
            warnings.push(ConfigWarning::report("semaphores", count as f64, capped as f64));
            count = capped;
        }

        let positions = if random_placement {
            random.sample_positions(size, count)?
        } else if count == 0 {
            Vec::new()
        } else {
            (0..size).step_by(size / count).take(count).collect()
        };
        let counters = positions
            .iter()
            .map(|_| random.uniform_int(SEMAPHORE_INIT as usize) as i32)
            .collect();
        Ok(Self::from_parts(size, positions, counters))
    }

    /// Lights at fixed positions with the given starting counters
    pub fn from_parts(size: usize, positions: Vec<usize>, counters: Vec<i32>) -> Self {
        Self {
            history: vec![counters.clone()],
            positions,
            counters,
            size,
        }
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn counters(&self) -> &[i32] {
        &self.counters
    }

    /// Counter vectors, one per step, starting with the initial one
    pub fn history(&self) -> &[Vec<i32>] {
        &self.history
    }

    pub fn is_red(&self, light: usize) -> bool {
        self.counters[light] < SEMAPHORE_OPEN
    }

    /// Distance from `pos` to the nearest red light ahead; `i32::MAX` when all are green
    pub fn next_red_dist(&self, pos: usize) -> i32 {
        (0..self.positions.len())
            .filter(|&k| self.is_red(k))
            .map(|k| ring_distance(pos, self.positions[k], self.size))
            .min()
            .unwrap_or(i32::MAX)
    }

    /// Ordinary update against whichever is closer, the next car or the next red light
    pub fn velocity<A: CellAccess>(
        &self,
        road: &A,
        i: usize,
        vmax: i32,
        random: &mut RandomSource,
        rand_prob: f64,
    ) -> Cell {
        let pos = i as isize;
        let gap = road.next_car_dist(pos).min(self.next_red_dist(i));
        standard_velocity(road.get_at(pos), gap, vmax, random, rand_prob)
    }

    /// Advances every countdown by one step and records the result
    pub fn tick(&mut self) {
        for counter in &mut self.counters {
            *counter = if *counter == 0 {
                SEMAPHORE_INIT
            } else {
                *counter - 1
            };
        }
        self.history.push(self.counters.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_wraps_back_to_init() {
        let mut lights = Semaphores::from_parts(10, vec![5], vec![1]);
        lights.tick();
        lights.tick();
        lights.tick();
        assert_eq!(lights.history(), &[vec![1], vec![0], vec![100], vec![99]]);
    }

    #[test]
    fn only_red_lights_block() {
        let lights = Semaphores::from_parts(10, vec![3, 6], vec![70, 10]);
        assert_eq!(lights.next_red_dist(0), 6);
        assert_eq!(lights.next_red_dist(7), 9);
    }

    #[test]
    fn even_placement_starts_at_zero() {
        let mut random = RandomSource::scripted([]);
        let mut warnings = Vec::new();
        let lights = Semaphores::place(20, 0.2, false, &mut random, &mut warnings).unwrap();
        assert_eq!(lights.positions(), &[0, 5, 10, 15]);
        assert!(warnings.is_empty());
    }
}
