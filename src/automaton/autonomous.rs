//! Autonomous vehicles on a periodic road
//!
//! Tagged vehicles look one car ahead: when the leader is free to speed up
//! they tolerate a one-cell tighter gap instead of braking, which damps
//! the start of stop-and-go waves. They never slow down at random.

use log::warn;

use super::boundary::CellAccess;
use super::rng::RandomSource;
use super::rules::{accelerate_or_brake, brake, can_accelerate, randomize, standard_velocity};
use super::types::{Cell, ConfigWarning, EMPTY};

/// Which parts of the autonomous behaviour are active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutonomousMode {
    /// Cooperative braking and no random slow-down
    #[default]
    Full,
    /// Ordinary braking, no random slow-down
    NoRandomization,
    /// Cooperative braking, random slow-down kept
    InstantReaction,
}

impl AutonomousMode {
    fn cooperative(self) -> bool {
        !matches!(self, AutonomousMode::NoRandomization)
    }

    fn randomizes(self) -> bool {
        matches!(self, AutonomousMode::InstantReaction)
    }
}

/// Positions of the tagged vehicles, followed through every move
#[derive(Debug, Clone)]
pub struct AutonomousCars {
    positions: Vec<usize>,
    mode: AutonomousMode,
}

impl AutonomousCars {
    /// Tags `size * density` of the placed vehicles at random
    pub fn place(
        cells: &[Cell],
        density: f64,
        mode: AutonomousMode,
        random: &mut RandomSource,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Self {
        let density = super::types::checked_fraction("aut_density", density, 0.5, warnings);
        let count = (cells.len() as f64 * density) as usize;
        let mut positions: Vec<usize> = cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c != EMPTY)
            .map(|(i, _)| i)
            .collect();
        random.shuffle(&mut positions);
        positions.truncate(count);
        Self { positions, mode }
    }

    /// Tags the vehicles at the given positions; empty cells are ignored
    pub fn from_positions(cells: &[Cell], positions: Vec<usize>, mode: AutonomousMode) -> Self {
        let positions = positions
            .into_iter()
            .filter(|&p| {
                let occupied = cells.get(p).is_some_and(|&c| c != EMPTY);
                if !occupied {
                    warn!("No vehicle at position {p}; it will not be autonomous.");
                }
                occupied
            })
            .collect();
        Self { positions, mode }
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn mode(&self) -> AutonomousMode {
        self.mode
    }

    pub fn is_autonomous(&self, pos: usize) -> bool {
        self.positions.contains(&pos)
    }

    /// New velocity of the vehicle at `i`
    pub fn velocity<A: CellAccess>(
        &self,
        road: &A,
        i: usize,
        vmax: i32,
        random: &mut RandomSource,
        rand_prob: f64,
    ) -> Cell {
        let pos = i as isize;
        let v = road.get_at(pos);
        let gap = road.next_car_dist(pos);
        if !self.is_autonomous(i) {
            return standard_velocity(v, gap, vmax, random, rand_prob);
        }

        let v = if self.mode.cooperative() {
            cooperative_velocity(road, pos, v, gap, vmax)
        } else {
            accelerate_or_brake(v, gap, vmax)
        };
        if self.mode.randomizes() {
            randomize(v, random.bernoulli(rand_prob))
        } else {
            v
        }
    }

    /// Moves the tags along with their vehicles; call before the move, with final velocities
    ///
    /// Cells are visited in index order and each occupied cell moves the
    /// first tag that currently points at it. A tag already moved ahead this
    /// step can therefore be picked up again by the vehicle it landed on.
    pub fn advance(&mut self, cells: &[Cell]) {
        let size = cells.len();
        for (i, &v) in cells.iter().enumerate() {
            if v == EMPTY {
                continue;
            }
            if let Some(tag) = self.positions.iter_mut().find(|p| **p == i) {
                *tag = (i + v as usize) % size;
            }
        }
    }
}

/// Accelerate/brake rule that takes the leader's freedom to move into account
///
/// The leader's velocity is read as it currently stands, so a leader that
/// was already updated this step is seen with its new velocity.
fn cooperative_velocity<A: CellAccess>(road: &A, pos: isize, v: Cell, gap: i32, vmax: i32) -> Cell {
    let leader = pos + gap as isize;
    let leader_v = road.get_at(leader);
    let leader_gap = road.next_car_dist(leader);

    if can_accelerate(leader_v, leader_gap, vmax) && gap <= v {
        if can_accelerate(v, gap, vmax) {
            v + 1
        } else if leader_v >= v {
            brake(v, gap, v - 1)
        } else {
            brake(v, gap, v)
        }
    } else {
        accelerate_or_brake(v, gap, vmax)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::boundary::{Boundary, Road};
    use crate::automaton::store::CellStore;

    fn road(cells: Vec<Cell>) -> Road {
        Road::new(CellStore::from_cells(cells).unwrap(), Boundary::Periodic)
    }

    #[test]
    fn keeps_speed_behind_a_free_leader() {
        // Follower at 0 with v=2 has gap 2; leader at 2 can accelerate.
        let road = road(vec![2, EMPTY, 2, EMPTY, EMPTY, EMPTY, EMPTY, EMPTY, EMPTY, EMPTY]);
        let cars = AutonomousCars::from_positions(road.cells(), vec![0], AutonomousMode::Full);
        let mut random = RandomSource::scripted([]);
        assert_eq!(cars.velocity(&road, 0, 5, &mut random, 0.0), 2);
    }

    #[test]
    fn brakes_behind_a_blocked_leader() {
        let road = road(vec![2, EMPTY, 0, 0, EMPTY, EMPTY]);
        let cars = AutonomousCars::from_positions(road.cells(), vec![0], AutonomousMode::Full);
        let mut random = RandomSource::scripted([]);
        assert_eq!(cars.velocity(&road, 0, 5, &mut random, 0.0), 1);
    }

    #[test]
    fn tags_follow_their_vehicles() {
        let mut cars =
            AutonomousCars::from_positions(&[3, EMPTY, EMPTY, EMPTY, 1], vec![0, 1, 4], AutonomousMode::Full);
        assert_eq!(cars.positions(), &[0, 4]);
        cars.advance(&[3, EMPTY, EMPTY, EMPTY, 1]);
        assert_eq!(cars.positions(), &[3, 0]);
    }

    #[test]
    fn tag_moved_onto_a_later_vehicle_is_taken_first() {
        let cells = [1, 1, EMPTY, EMPTY, EMPTY];
        let mut cars = AutonomousCars::from_positions(&cells, vec![0, 1], AutonomousMode::Full);
        cars.advance(&cells);
        assert_eq!(cars.positions(), &[2, 1]);
    }
}
