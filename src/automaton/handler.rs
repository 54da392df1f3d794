//! Uniform front end over every automaton variant
//!
//! Callers build an [`Automaton`] from a [`CaType`], the shared parameters
//! and the variant argument bag, and never need to know which concrete
//! road sits behind it.

use log::info;

use crate::error::CaError;

use super::autonomous::{AutonomousCars, AutonomousMode};
use super::boundary::{Boundary, CellAccess};
use super::junction::Junction;
use super::multilane::MultiLane;
use super::rng::RandomSource;
use super::single_lane::{ConservationReport, Injection, Rule, SingleLane};
use super::stats;
use super::types::{Args, CaParams, CaType, Cell, ConfigWarning, EMPTY};

pub const DEFAULT_NEW_CAR_PROB: f64 = 0.1;
pub const DEFAULT_NEW_CAR_SPEED: i32 = 1;
pub const DEFAULT_AUT_DENSITY: f64 = 0.1;
pub const DEFAULT_STOP_DENSITY: f64 = 0.1;
pub const DEFAULT_SEMAPHORE_DENSITY: f64 = 0.1;
pub const DEFAULT_LANES: i32 = 2;

/// The concrete road behind an [`Automaton`]
#[derive(Debug, Clone)]
pub enum Backing {
    Single(SingleLane),
    Junction(Junction),
    MultiLane(MultiLane),
}

#[derive(Debug, Clone)]
pub struct Automaton {
    kind: CaType,
    backing: Backing,
    warnings: Vec<ConfigWarning>,
}

impl Automaton {
    /// Builds the automaton `kind`, clamping any invalid value with a warning
    ///
    /// Fails only when the cell buffers cannot be allocated.
    pub fn new(
        kind: CaType,
        mut params: CaParams,
        args: &Args,
        mut random: RandomSource,
    ) -> Result<Self, CaError> {
        let mut warnings = params.sanitize();
        let periodic = |random: RandomSource| SingleLane::new(&params, Boundary::Periodic, random);

        let backing = match kind {
            CaType::Circular => Backing::Single(periodic(random)?),
            CaType::Open => {
                let injection = open_injection(args, 0, params.vmax, &mut warnings);
                Backing::Single(
                    SingleLane::new(&params, Boundary::Open, random)?.with_injection(injection),
                )
            }
            CaType::Autonomous | CaType::AutonomousNoRandom | CaType::AutonomousInstantReaction => {
                let density = args.double_or(0, DEFAULT_AUT_DENSITY);
                Backing::Single(periodic(random)?.with_autonomous(
                    density,
                    autonomous_mode(kind),
                    &mut warnings,
                ))
            }
            CaType::Stop => {
                let density = args.double_or(0, DEFAULT_STOP_DENSITY);
                Backing::Single(periodic(random)?.with_stops(density, &mut warnings)?)
            }
            CaType::Semaphore => {
                let density = args.double_or(0, DEFAULT_SEMAPHORE_DENSITY);
                let random_placement = args.bool_or(0, true);
                Backing::Single(periodic(random)?.with_semaphores(
                    density,
                    random_placement,
                    &mut warnings,
                )?)
            }
            CaType::SimpleJunction => {
                let injection = open_injection(args, 0, params.vmax, &mut warnings);
                let target_lane = args.int_or(1, 1);
                let source_random = random.fork();
                Backing::Junction(Junction::new(
                    &params,
                    injection,
                    target_lane,
                    source_random,
                    random,
                )?)
            }
            CaType::CircularMultiLane => {
                let lanes = checked_lanes(args, &mut warnings);
                Backing::MultiLane(MultiLane::new(&params, lanes, Boundary::Periodic, random)?)
            }
            CaType::OpenMultiLane => {
                let lanes = checked_lanes(args, &mut warnings);
                let injection = open_injection(args, 1, params.vmax, &mut warnings);
                Backing::MultiLane(
                    MultiLane::new(&params, lanes, Boundary::Open, random)?
                        .with_injection(injection),
                )
            }
        };

        info!(
            "Created {} automaton: size={}, density={}, vmax={}, rand_prob={}",
            kind.name(),
            params.size,
            params.density,
            params.vmax,
            params.rand_prob
        );
        Ok(Self {
            kind,
            backing,
            warnings,
        })
    }

    /// Periodic road from a fixed array with scripted slow-downs
    pub fn circular_fixture(
        cells: Vec<Cell>,
        rand_values: Vec<bool>,
        vmax: i32,
    ) -> Result<Self, CaError> {
        let lane = SingleLane::from_cells(
            cells,
            Boundary::Periodic,
            vmax,
            0.0,
            RandomSource::scripted(rand_values),
        )?;
        Ok(lane.into())
    }

    /// Open road from a fixed array; entry decisions share the scripted queue
    pub fn open_fixture(
        cells: Vec<Cell>,
        rand_values: Vec<bool>,
        vmax: i32,
        new_car_speed: Cell,
    ) -> Result<Self, CaError> {
        let mut warnings = Vec::new();
        let injection = Injection::checked(DEFAULT_NEW_CAR_PROB, new_car_speed, vmax, &mut warnings);
        let lane = SingleLane::from_cells(
            cells,
            Boundary::Open,
            vmax,
            0.0,
            RandomSource::scripted(rand_values),
        )?
        .with_injection(injection);
        let mut automaton: Self = lane.into();
        automaton.warnings = warnings;
        Ok(automaton)
    }

    /// Periodic road from a fixed array with the vehicles at `autonomous` tagged
    pub fn autonomous_fixture(
        cells: Vec<Cell>,
        autonomous: Vec<usize>,
        rand_values: Vec<bool>,
        vmax: i32,
    ) -> Result<Self, CaError> {
        let cars = AutonomousCars::from_positions(&cells, autonomous, AutonomousMode::Full);
        let lane = SingleLane::from_cells(
            cells,
            Boundary::Periodic,
            vmax,
            0.0,
            RandomSource::scripted(rand_values),
        )?
        .with_rule(Rule::Autonomous(cars));
        Ok(lane.into())
    }

    pub fn kind(&self) -> CaType {
        self.kind
    }

    pub fn backing(&self) -> &Backing {
        &self.backing
    }

    /// Every value that was clamped during construction
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    pub fn step(&mut self) {
        match &mut self.backing {
            Backing::Single(lane) => lane.step(),
            Backing::Junction(junction) => junction.step(),
            Backing::MultiLane(road) => road.step(),
        }
    }

    /// Runs `iterations` steps, reporting a vehicle count change on periodic roads
    pub fn evolve(&mut self, iterations: usize) -> Option<ConservationReport> {
        match &mut self.backing {
            Backing::Single(lane) => lane.evolve(iterations),
            Backing::Junction(junction) => {
                junction.evolve(iterations);
                None
            }
            Backing::MultiLane(road) => road.evolve(iterations),
        }
    }

    /// Single-lane road that reads are served from, if any
    fn observed(&self) -> Option<&SingleLane> {
        match &self.backing {
            Backing::Single(lane) => Some(lane),
            Backing::Junction(junction) => Some(junction.observed()),
            Backing::MultiLane(_) => None,
        }
    }

    pub fn size(&self) -> usize {
        match &self.backing {
            Backing::MultiLane(road) => road.size(),
            _ => self.observed().map_or(0, SingleLane::size),
        }
    }

    pub fn lanes(&self) -> usize {
        match &self.backing {
            Backing::MultiLane(road) => road.lanes(),
            _ => 1,
        }
    }

    pub fn vmax(&self) -> i32 {
        match &self.backing {
            Backing::MultiLane(road) => road.vmax(),
            _ => self.observed().map_or(1, SingleLane::vmax),
        }
    }

    pub fn count_cars(&self) -> usize {
        match &self.backing {
            Backing::MultiLane(road) => road.count_cars(),
            _ => self.observed().map_or(0, SingleLane::count_cars),
        }
    }

    /// Current cell at `pos` (lane 0 on multi-lane roads)
    pub fn get_at(&self, pos: isize) -> Cell {
        self.get_lane_at(pos, 0)
    }

    pub fn get_lane_at(&self, pos: isize, lane: usize) -> Cell {
        match &self.backing {
            Backing::MultiLane(road) => road.road().get_at(pos, lane),
            _ if lane != 0 => EMPTY,
            _ => self.observed().map_or(EMPTY, |l| l.road().get_at(pos)),
        }
    }

    /// Writable current cell at `pos` (lane 0 on multi-lane roads)
    pub fn at(&mut self, pos: isize) -> &mut Cell {
        match &mut self.backing {
            Backing::Single(lane) => lane.road_mut().at(pos),
            Backing::Junction(junction) => junction.observed_mut().road_mut().at(pos),
            Backing::MultiLane(road) => road.road_mut().at(pos, 0),
        }
    }

    pub fn get_history_at(&self, step: usize, pos: isize) -> Cell {
        match &self.backing {
            Backing::MultiLane(road) => road.road().get_history_at(step, pos, 0),
            _ => self
                .observed()
                .map_or(EMPTY, |l| l.road().get_history_at(step, pos)),
        }
    }

    pub fn get_flow_at(&self, step: usize, pos: isize) -> bool {
        match &self.backing {
            Backing::MultiLane(road) => road.road().get_flow_at(step, pos, 0),
            _ => self
                .observed()
                .is_some_and(|l| l.road().get_flow_at(step, pos)),
        }
    }

    /// Number of recorded snapshots, the initial state included
    pub fn history_len(&self) -> usize {
        match &self.backing {
            Backing::MultiLane(road) => road.road().store().history().len(),
            _ => self
                .observed()
                .map_or(0, |l| l.road().store().history().len()),
        }
    }

    /// Recorded cell snapshots of one lane
    pub fn history(&self, lane: usize) -> Vec<Vec<Cell>> {
        match &self.backing {
            Backing::MultiLane(road) => road
                .road()
                .store()
                .history()
                .iter()
                .map(|row| row.iter().map(|cell| cell.get(lane).copied().unwrap_or(EMPTY)).collect())
                .collect(),
            _ => self
                .observed()
                .map(|l| l.road().store().history().to_vec())
                .unwrap_or_default(),
        }
    }

    /// Recorded flow snapshots of one lane
    pub fn flow_history(&self, lane: usize) -> Vec<Vec<bool>> {
        match &self.backing {
            Backing::MultiLane(road) => road
                .road()
                .store()
                .flow_history()
                .iter()
                .map(|row| row.iter().map(|cell| cell.get(lane).copied().unwrap_or(false)).collect())
                .collect(),
            _ => self
                .observed()
                .map(|l| l.road().store().flow_history().to_vec())
                .unwrap_or_default(),
        }
    }

    /// Counter history of the traffic lights, if this road has any
    pub fn semaphore_history(&self) -> Option<&[Vec<i32>]> {
        match self.observed()?.rule() {
            Rule::Semaphores(lights) => Some(lights.history()),
            _ => None,
        }
    }

    pub fn occupancy(&self) -> Vec<f64> {
        match &self.backing {
            Backing::MultiLane(road) => stats::lane_occupancy(road.road().store().history()),
            _ => self
                .observed()
                .map(|l| stats::occupancy(l.road().store().history()))
                .unwrap_or_default(),
        }
    }

    pub fn flow(&self) -> Vec<f64> {
        match &self.backing {
            Backing::MultiLane(road) => {
                stats::lane_flow(road.road().store().flow_history(), road.road().boundary())
            }
            _ => self
                .observed()
                .map(|l| stats::flow(l.road().store().flow_history(), l.road().boundary()))
                .unwrap_or_default(),
        }
    }

    pub fn mean_flow(&self) -> f64 {
        stats::mean(&self.flow())
    }

    /// Whether vehicles remain on the road but none moved in the last step
    pub fn is_flux_halted(&self) -> bool {
        let cars = self.count_cars();
        match &self.backing {
            Backing::MultiLane(road) => road
                .road()
                .store()
                .flow_history()
                .last()
                .is_some_and(|row| stats::is_flux_halted(row.iter().flatten(), cars)),
            _ => self
                .observed()
                .and_then(|l| l.road().store().flow_history().last())
                .is_some_and(|row| stats::is_flux_halted(row, cars)),
        }
    }

    /// Current state as text, one line per lane
    pub fn render_current(&self) -> String {
        match &self.backing {
            Backing::MultiLane(road) => (0..road.lanes())
                .map(|lane| render_row(&road.road().store().lane(lane)))
                .collect::<Vec<_>>()
                .join("\n"),
            _ => self
                .observed()
                .map(|l| render_row(l.road().cells()))
                .unwrap_or_default(),
        }
    }

    /// Every recorded snapshot of one lane as text, oldest first
    pub fn render_history(&self, lane: usize) -> Vec<String> {
        self.history(lane).iter().map(|row| render_row(row)).collect()
    }
}

impl From<SingleLane> for Automaton {
    fn from(lane: SingleLane) -> Self {
        let kind = match (lane.rule(), lane.road().boundary()) {
            (Rule::Standard, Boundary::Periodic) => CaType::Circular,
            (Rule::Standard, Boundary::Open) => CaType::Open,
            (Rule::Autonomous(cars), _) => match cars.mode() {
                AutonomousMode::Full => CaType::Autonomous,
                AutonomousMode::NoRandomization => CaType::AutonomousNoRandom,
                AutonomousMode::InstantReaction => CaType::AutonomousInstantReaction,
            },
            (Rule::Stops(_), _) => CaType::Stop,
            (Rule::Semaphores(_), _) => CaType::Semaphore,
        };
        Self {
            kind,
            backing: Backing::Single(lane),
            warnings: Vec::new(),
        }
    }
}

impl From<Junction> for Automaton {
    fn from(junction: Junction) -> Self {
        Self {
            kind: CaType::SimpleJunction,
            backing: Backing::Junction(junction),
            warnings: Vec::new(),
        }
    }
}

impl From<MultiLane> for Automaton {
    fn from(road: MultiLane) -> Self {
        let kind = match road.road().boundary() {
            Boundary::Periodic => CaType::CircularMultiLane,
            Boundary::Open => CaType::OpenMultiLane,
        };
        Self {
            kind,
            backing: Backing::MultiLane(road),
            warnings: Vec::new(),
        }
    }
}

/// Text form of one snapshot: `.` for an empty cell, the velocity otherwise
pub fn render_row(cells: &[Cell]) -> String {
    cells
        .iter()
        .map(|&c| match c {
            EMPTY => '.',
            v => char::from_digit(v as u32, 36).unwrap_or('#'),
        })
        .collect()
}

fn autonomous_mode(kind: CaType) -> AutonomousMode {
    match kind {
        CaType::AutonomousNoRandom => AutonomousMode::NoRandomization,
        CaType::AutonomousInstantReaction => AutonomousMode::InstantReaction,
        _ => AutonomousMode::Full,
    }
}

fn open_injection(
    args: &Args,
    speed_slot: usize,
    vmax: i32,
    warnings: &mut Vec<ConfigWarning>,
) -> Injection {
    Injection::checked(
        args.double_or(0, DEFAULT_NEW_CAR_PROB),
        args.int_or(speed_slot, DEFAULT_NEW_CAR_SPEED),
        vmax,
        warnings,
    )
}

fn checked_lanes(args: &Args, warnings: &mut Vec<ConfigWarning>) -> usize {
    let lanes = args.int_or(0, DEFAULT_LANES);
    if lanes < 1 {
        warnings.push(ConfigWarning::report("lanes", lanes as f64, 1.0));
        return 1;
    }
    lanes as usize
}
