//! Single-lane automaton: a road, an update rule and an optional entry ramp

use log::{debug, error};

use crate::error::CaError;

use super::autonomous::{AutonomousCars, AutonomousMode};
use super::boundary::{Boundary, CellAccess, Road};
use super::rng::RandomSource;
use super::rules::{self, standard_velocity};
use super::semaphore::Semaphores;
use super::stops::StopSigns;
use super::store::CellStore;
use super::types::{checked_fraction, CaParams, Cell, ConfigWarning, EMPTY};

/// Velocity rule applied to every vehicle during a step
#[derive(Debug, Clone)]
pub enum Rule {
    Standard,
    Autonomous(AutonomousCars),
    Stops(StopSigns),
    Semaphores(Semaphores),
}

/// Vehicles entering an open road at cell 0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Injection {
    pub new_car_prob: f64,
    pub new_car_speed: Cell,
}

impl Injection {
    /// Clamps the probability into `[0, 1]` and the speed into `[0, vmax]`
    pub fn checked(
        new_car_prob: f64,
        new_car_speed: Cell,
        vmax: i32,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Self {
        let new_car_prob = checked_fraction("new_car_prob", new_car_prob, 0.5, warnings);
        let mut speed = new_car_speed;
        if !(0..=vmax).contains(&speed) {
            speed = speed.clamp(0, vmax);
            warnings.push(ConfigWarning::report(
                "new_car_speed",
                new_car_speed as f64,
                speed as f64,
            ));
        }
        Self {
            new_car_prob,
            new_car_speed: speed,
        }
    }
}

/// Vehicle counts around an `evolve` call on a periodic road that disagree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConservationReport {
    pub before: usize,
    pub after: usize,
}

#[derive(Debug, Clone)]
pub struct SingleLane {
    road: Road,
    vmax: i32,
    rand_prob: f64,
    rule: Rule,
    injection: Option<Injection>,
    random: RandomSource,
}

impl SingleLane {
    /// Road with `size * density` vehicles at random cells, all at `init_vel`
    ///
    /// `params` must already be sanitized.
    pub fn new(
        params: &CaParams,
        boundary: Boundary,
        mut random: RandomSource,
    ) -> Result<Self, CaError> {
        let mut store = CellStore::new(params.size)?;
        for pos in random.sample_positions(params.size, params.vehicles_per_lane())? {
            store.cells[pos] = params.init_vel;
        }
        store.try_record()?;
        debug!(
            "Placed {} vehicles on {} cells",
            store.count_cars(),
            params.size
        );

        Ok(Self {
            road: Road::new(store, boundary),
            vmax: params.vmax,
            rand_prob: params.rand_prob,
            rule: Rule::Standard,
            injection: None,
            random,
        })
    }

    /// Road starting from a fixed array; slow-downs come from `random`
    pub fn from_cells(
        cells: Vec<Cell>,
        boundary: Boundary,
        vmax: i32,
        rand_prob: f64,
        random: RandomSource,
    ) -> Result<Self, CaError> {
        Ok(Self {
            road: Road::new(CellStore::from_cells(cells)?, boundary),
            vmax: vmax.max(1),
            rand_prob,
            rule: Rule::Standard,
            injection: None,
            random,
        })
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_injection(mut self, injection: Injection) -> Self {
        self.injection = Some(injection);
        self
    }

    /// Tags a random share of the vehicles already on the road
    pub fn with_autonomous(
        mut self,
        density: f64,
        mode: AutonomousMode,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Self {
        let cars = AutonomousCars::place(self.road.cells(), density, mode, &mut self.random, warnings);
        self.with_rule(Rule::Autonomous(cars))
    }

    pub fn with_stops(
        mut self,
        density: f64,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<Self, CaError> {
        let stops = StopSigns::place(self.road.size(), density, &mut self.random, warnings)?;
        Ok(self.with_rule(Rule::Stops(stops)))
    }

    pub fn with_semaphores(
        mut self,
        density: f64,
        random_placement: bool,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<Self, CaError> {
        let lights = Semaphores::place(
            self.road.size(),
            density,
            random_placement,
            &mut self.random,
            warnings,
        )?;
        Ok(self.with_rule(Rule::Semaphores(lights)))
    }

    pub fn road(&self) -> &Road {
        &self.road
    }

    pub fn road_mut(&mut self) -> &mut Road {
        &mut self.road
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn injection(&self) -> Option<Injection> {
        self.injection
    }

    pub fn vmax(&self) -> i32 {
        self.vmax
    }

    pub fn size(&self) -> usize {
        self.road.size()
    }

    pub fn count_cars(&self) -> usize {
        self.road.store().count_cars()
    }

    /// Advances the road by one time step
    pub fn step(&mut self) {
        for i in 0..self.road.size() {
            let pos = i as isize;
            if self.road.get_at(pos) == EMPTY {
                continue;
            }
            let v = match &self.rule {
                Rule::Standard => standard_velocity(
                    self.road.get_at(pos),
                    self.road.next_car_dist(pos),
                    self.vmax,
                    &mut self.random,
                    self.rand_prob,
                ),
                Rule::Autonomous(cars) => {
                    cars.velocity(&self.road, i, self.vmax, &mut self.random, self.rand_prob)
                }
                Rule::Stops(stops) => {
                    stops.velocity(&self.road, i, self.vmax, &mut self.random, self.rand_prob)
                }
                Rule::Semaphores(lights) => {
                    lights.velocity(&self.road, i, self.vmax, &mut self.random, self.rand_prob)
                }
            };
            *self.road.at(pos) = v;
        }

        match &mut self.rule {
            Rule::Autonomous(cars) => cars.advance(self.road.cells()),
            Rule::Semaphores(lights) => lights.tick(),
            Rule::Standard | Rule::Stops(_) => {}
        }

        self.road.store_mut().clear_next();
        rules::move_vehicles(&mut self.road);
        self.road.store_mut().swap_buffers();

        if let Some(injection) = self.injection {
            if self.road.get_at(0) == EMPTY && self.random.bernoulli(injection.new_car_prob) {
                *self.road.at(0) = injection.new_car_speed;
            }
        }
        self.road.store_mut().record();
    }

    /// Runs `iterations` steps
    ///
    /// On a periodic road the vehicle count must not change; a mismatch is
    /// logged and handed back instead of aborting the run.
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
    use crate::automaton::rng::{RandomAlgorithm, Seed};

    #[test]
    fn lone_vehicle_reaches_vmax() {
        let mut cells = vec![EMPTY; 30];
        cells[0] = 0;
        let mut lane =
            SingleLane::from_cells(cells, Boundary::Periodic, 3, 0.0, RandomSource::scripted([]))
                .unwrap();
        lane.evolve(5);
        assert_eq!(lane.road().cells().iter().max(), Some(&3));
        assert_eq!(lane.count_cars(), 1);
    }

    #[test]
    fn vehicle_leaves_open_road() {
        let mut cells = vec![EMPTY; 5];
        cells[4] = 2;
        let mut lane =
            SingleLane::from_cells(cells, Boundary::Open, 5, 0.0, RandomSource::scripted([]))
                .unwrap();
        lane.step();
        assert_eq!(lane.count_cars(), 0);
    }

    #[test]
    fn injection_needs_an_empty_entry_cell() {
        let mut cells = vec![EMPTY; 10];
        cells[0] = 0;
        cells[1] = 0;
        let mut lane =
            SingleLane::from_cells(cells, Boundary::Open, 5, 0.0, RandomSource::scripted([]))
                .unwrap()
                .with_injection(Injection {
                    new_car_prob: 1.0,
                    new_car_speed: 2,
                });
        // One slow-down draw per vehicle; the blocked entry cell skips the entry draw.
        lane.random = RandomSource::scripted([false, false, true]);
        lane.step();
        assert_eq!(lane.road().cells()[0], 0);
        assert_eq!(lane.count_cars(), 2);
    }

    #[test]
    fn random_placement_uses_init_vel() {
        let params = CaParams::new(50, 0.3, 5, 0.2, 2);
        let lane = SingleLane::new(
            &params,
            Boundary::Periodic,
            RandomSource::new(RandomAlgorithm::Std, Seed::Fixed(9)),
        )
        .unwrap();
        assert_eq!(lane.count_cars(), 15);
        assert!(lane
            .road()
            .cells()
            .iter()
            .all(|&c| c == EMPTY || c == 2));
    }
}
