//! Multi-lane roads
//!
//! Before the ordinary per-lane update, every vehicle that cannot speed up
//! in its own lane looks for a neighbouring lane where it could. The left
//! lane is tried first, and a vehicle changes lane at most once per step.

use log::{debug, error};

use crate::error::CaError;

use super::boundary::{Boundary, LaneRoad};
use super::rng::RandomSource;
use super::rules::{self, can_accelerate, standard_velocity};
use super::single_lane::{ConservationReport, Injection};
use super::store::LaneStore;
use super::types::{CaParams, Cell, EMPTY};

#[derive(Debug, Clone)]
pub struct MultiLane {
    road: LaneRoad,
    vmax: i32,
    rand_prob: f64,
    injection: Option<Injection>,
    random: RandomSource,
}

impl MultiLane {
    /// `lanes` lanes, each with `size * density` vehicles at random cells
    pub fn new(
        params: &CaParams,
        lanes: usize,
        boundary: Boundary,
        mut random: RandomSource,
    ) -> Result<Self, CaError> {
        let lanes = lanes.max(1);
        let mut store = LaneStore::new(params.size, lanes)?;
        for lane in 0..lanes {
            for pos in random.sample_positions(params.size, params.vehicles_per_lane())? {
                store.cells[pos][lane] = params.init_vel;
            }
        }
        store.try_record()?;
        debug!(
            "Placed {} vehicles on {} lanes of {} cells",
            store.count_cars(),
            lanes,
            params.size
        );

        Ok(Self {
            road: LaneRoad::new(store, boundary),
            vmax: params.vmax,
            rand_prob: params.rand_prob,
            injection: None,
            random,
        })
    }

    /// Road starting from a fixed `[position][lane]` grid
    pub fn from_cells(
        cells: Vec<Vec<Cell>>,
        boundary: Boundary,
        vmax: i32,
        rand_prob: f64,
        random: RandomSource,
    ) -> Result<Self, CaError> {
        Ok(Self {
            road: LaneRoad::new(LaneStore::from_cells(cells)?, boundary),
            vmax: vmax.max(1),
            rand_prob,
            injection: None,
            random,
        })
    }

    pub fn with_injection(mut self, injection: Injection) -> Self {
        self.injection = Some(injection);
        self
    }

    pub fn road(&self) -> &LaneRoad {
        &self.road
    }

    pub fn road_mut(&mut self) -> &mut LaneRoad {
        &mut self.road
    }

    pub fn vmax(&self) -> i32 {
        self.vmax
    }

    pub fn lanes(&self) -> usize {
        self.road.lanes()
    }

    pub fn size(&self) -> usize {
        self.road.size()
    }

    pub fn count_cars(&self) -> usize {
        self.road.store().count_cars()
    }

    /// Whether a vehicle at `pos` with velocity `v` may move into `lane`
    ///
    /// The target cell must be free, nobody behind in that lane may be able
    /// to reach it this step, and the vehicle must be able to speed up there.
    pub fn can_change_to(&self, pos: usize, lane: usize, v: Cell) -> bool {
        let pos = pos as isize;
        if lane >= self.lanes() || self.road.get_at(pos, lane) != EMPTY {
            return false;
        }
        let clear_behind = (1..=self.vmax).all(|s| {
            let behind = self.road.get_at(pos - s as isize, lane);
            behind == EMPTY || behind < s
        });
        clear_behind && self.road.next_car_dist(pos, lane) > v + 1
    }

    fn change_lanes(&mut self) {
        let (size, lanes) = (self.size(), self.lanes());
        let mut changed = vec![false; size * lanes];

        for i in 0..size {
            for lane in 0..lanes {
                if changed[i * lanes + lane] {
                    continue;
                }
                let pos = i as isize;
                let v = self.road.get_at(pos, lane);
                if v == EMPTY || can_accelerate(v, self.road.next_car_dist(pos, lane), self.vmax) {
                    continue;
                }

                let target = [lane.checked_sub(1), Some(lane + 1)]
                    .into_iter()
                    .flatten()
                    .find(|&k| self.can_change_to(i, k, v));
                if let Some(k) = target {
                    *self.road.at(pos, k) = v;
                    *self.road.at(pos, lane) = EMPTY;
                    changed[i * lanes + k] = true;
                }
            }
        }
    }

    /// Advances every lane by one time step
    pub fn step(&mut self) {
        if self.lanes() > 1 {
            self.change_lanes();
        }

        for i in 0..self.size() {
            let pos = i as isize;
            for lane in 0..self.lanes() {
                let v = self.road.get_at(pos, lane);
                if v == EMPTY {
                    continue;
                }
                let gap = self.road.next_car_dist(pos, lane);
                *self.road.at(pos, lane) =
                    standard_velocity(v, gap, self.vmax, &mut self.random, self.rand_prob);
            }
        }

        self.road.store_mut().clear_next();
        for lane in 0..self.lanes() {
            rules::move_vehicles(&mut self.road.lane(lane));
        }
        self.road.store_mut().swap_buffers();

        if let Some(injection) = self.injection {
            for lane in 0..self.lanes() {
                if self.road.get_at(0, lane) == EMPTY
                    && self.random.bernoulli(injection.new_car_prob)
                {
                    *self.road.at(0, lane) = injection.new_car_speed;
                }
            }
        }
        self.road.store_mut().record();
    }

    /// Runs `iterations` steps; see [`super::SingleLane::evolve`]
    pub fn evolve(&mut self, iterations: usize) -> Option<ConservationReport> {
        let before = self.count_cars();
        for _ in 0..iterations {
            self.step();
        }
        let after = self.count_cars();

        if self.road.boundary() == Boundary::Periodic && before != after {
            error!("Vehicle count changed from {before} to {after} on a periodic road");
            return Some(ConservationReport { before, after });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(size: usize, lanes: usize, cars: &[(usize, usize, Cell)]) -> Vec<Vec<Cell>> {
        let mut cells = vec![vec![EMPTY; lanes]; size];
        for &(pos, lane, v) in cars {
            cells[pos][lane] = v;
        }
        cells
    }

    #[test]
    fn blocked_vehicle_overtakes_in_free_lane() {
        let cells = grid(10, 2, &[(0, 0, 1), (1, 0, 0)]);
        let mut road =
            MultiLane::from_cells(cells, Boundary::Periodic, 5, 0.0, RandomSource::scripted([]))
                .unwrap();
        road.step();
        assert_eq!(road.road().get_at(2, 1), 2);
        assert_eq!(road.road().get_at(2, 0), 1);
        assert_eq!(road.count_cars(), 2);
    }

    #[test]
    fn left_lane_is_tried_first() {
        let cells = grid(10, 3, &[(0, 1, 1), (1, 1, 0)]);
        let mut road =
            MultiLane::from_cells(cells, Boundary::Periodic, 5, 0.0, RandomSource::scripted([]))
                .unwrap();
        road.step();
        assert_eq!(road.road().get_at(2, 0), 2);
        assert_eq!(road.road().get_at(2, 1), 1);
        assert!(road.road().store().lane(2).iter().all(|&c| c == EMPTY));
    }

    #[test]
    fn vehicle_changes_at_most_one_lane_per_step() {
        // A vehicle at vmax never counts as free, so after moving right it
        // would want to change again from the lane it just entered.
        let cells = grid(20, 3, &[(0, 0, 2)]);
        let mut road =
            MultiLane::from_cells(cells, Boundary::Periodic, 2, 0.0, RandomSource::scripted([]))
                .unwrap();
        road.step();
        assert_eq!(road.road().get_at(2, 1), 2);
        assert!(road.road().store().lane(0).iter().all(|&c| c == EMPTY));
        assert!(road.road().store().lane(2).iter().all(|&c| c == EMPTY));

        // Next step it is in lane 1 and tries the left lane first
        road.step();
        assert_eq!(road.road().get_at(4, 0), 2);
        assert_eq!(road.count_cars(), 1);
    }

    #[test]
    fn fast_follower_blocks_the_change() {
        let cells = grid(10, 2, &[(5, 0, 1), (6, 0, 0), (3, 1, 3)]);
        let road =
            MultiLane::from_cells(cells, Boundary::Periodic, 5, 0.0, RandomSource::scripted([]))
                .unwrap();
        assert!(!road.can_change_to(5, 1, 1));
    }

    #[test]
    fn single_lane_never_changes() {
        let cells = grid(6, 1, &[(0, 0, 1), (1, 0, 0)]);
        let mut road =
            MultiLane::from_cells(cells, Boundary::Periodic, 5, 0.0, RandomSource::scripted([]))
                .unwrap();
        assert_eq!(road.evolve(4), None);
        assert_eq!(road.lanes(), 1);
    }

    #[test]
    fn open_lanes_inject_independently() {
        let mut road = MultiLane::from_cells(
            grid(8, 3, &[]),
            Boundary::Open,
            5,
            0.0,
            RandomSource::scripted([true, false, true]),
        )
        .unwrap()
        .with_injection(Injection {
            new_car_prob: 1.0,
            new_car_speed: 1,
        });
        road.step();
        assert_eq!(road.road().get_at(0, 0), 1);
        assert_eq!(road.road().get_at(0, 1), EMPTY);
        assert_eq!(road.road().get_at(0, 2), 1);
        assert_eq!(road.count_cars(), 2);
    }
}
