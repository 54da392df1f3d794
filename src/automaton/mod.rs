//! Nagel–Schreckenberg freeway automata
//!
//! Everything needed to build, step and measure a road lives here; the
//! experiments and the command line sit on top of [`Automaton`].

mod autonomous;
mod boundary;
mod handler;
mod junction;
mod multilane;
mod rng;
mod rules;
mod semaphore;
mod single_lane;
mod stats;
mod stops;
mod store;
mod types;

pub use autonomous::{AutonomousCars, AutonomousMode};
pub use boundary::{Boundary, CellAccess, LaneRoad, LaneView, Road};
pub use handler::{
    render_row, Automaton, Backing, DEFAULT_AUT_DENSITY, DEFAULT_LANES, DEFAULT_NEW_CAR_PROB,
    DEFAULT_NEW_CAR_SPEED, DEFAULT_SEMAPHORE_DENSITY, DEFAULT_STOP_DENSITY,
};
pub use junction::{Connection, Junction};
pub use multilane::MultiLane;
pub use rng::{RandomAlgorithm, RandomSource, Seed};
pub use rules::{
    accelerate_or_brake, brake, can_accelerate, move_vehicles, next_car_dist, randomize,
    ring_distance, standard_velocity,
};
pub use semaphore::{Semaphores, SEMAPHORE_INIT, SEMAPHORE_OPEN};
pub use single_lane::{ConservationReport, Injection, Rule, SingleLane};
pub use stats::{is_flux_halted, mean, Series};
pub use stops::StopSigns;
pub use store::{CellStore, LaneStore};
pub use types::{Args, CaParams, CaType, Cell, ConfigWarning, EMPTY};
