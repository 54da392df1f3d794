//! Core types for the freeway automata
//!
//! Cell values, the variant tag, construction parameters and the
//! variant-specific argument bag.

use log::warn;

/// A single road cell: `EMPTY` or the velocity of the vehicle occupying it
pub type Cell = i32;

/// Value of an unoccupied cell
pub const EMPTY: Cell = -1;

/// Every concrete automaton the facade can build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaType {
    /// Single lane, periodic boundary
    Circular,
    /// Single lane, open boundary with injection at cell 0
    Open,
    /// Periodic, with cooperative autonomous vehicles
    Autonomous,
    /// Periodic, autonomous vehicles only skip randomization
    AutonomousNoRandom,
    /// Periodic, autonomous vehicles only use the cooperative rule
    AutonomousInstantReaction,
    /// Periodic, with stop signs
    Stop,
    /// Periodic, with traffic lights
    Semaphore,
    /// Two open automata where one feeds the other
    SimpleJunction,
    /// Several lanes, periodic boundary
    CircularMultiLane,
    /// Several lanes, open boundary
    OpenMultiLane,
}

impl CaType {
    pub const ALL: [CaType; 10] = [
        CaType::Circular,
        CaType::Open,
        CaType::Autonomous,
        CaType::AutonomousNoRandom,
        CaType::AutonomousInstantReaction,
        CaType::Stop,
        CaType::Semaphore,
        CaType::SimpleJunction,
        CaType::CircularMultiLane,
        CaType::OpenMultiLane,
    ];

    /// Whether vehicles can enter and leave the road
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            CaType::Open | CaType::SimpleJunction | CaType::OpenMultiLane
        )
    }

    pub fn is_multilane(&self) -> bool {
        matches!(self, CaType::CircularMultiLane | CaType::OpenMultiLane)
    }

    /// Short name used on the command line and in logs
    pub fn name(&self) -> &'static str {
        match self {
            CaType::Circular => "circular",
            CaType::Open => "open",
            CaType::Autonomous => "autonomous",
            CaType::AutonomousNoRandom => "autonomous-norand",
            CaType::AutonomousInstantReaction => "autonomous-instant",
            CaType::Stop => "stop",
            CaType::Semaphore => "semaphore",
            CaType::SimpleJunction => "simple-junction",
            CaType::CircularMultiLane => "circular-multilane",
            CaType::OpenMultiLane => "open-multilane",
        }
    }

    pub fn from_name(name: &str) -> Option<CaType> {
        CaType::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// A configuration value that was out of range and got replaced
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigWarning {
    pub parameter: &'static str,
    pub given: f64,
    pub used: f64,
}

impl ConfigWarning {
    /// Logs the correction and returns it so callers can keep a record
    pub fn report(parameter: &'static str, given: f64, used: f64) -> Self {
        warn!("Invalid {parameter}={given}. Using {parameter}={used}.");
        Self {
            parameter,
            given,
            used,
        }
    }
}

/// Parameters shared by every automaton
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaParams {
    pub size: usize,
    pub density: f64,
    pub vmax: i32,
    pub rand_prob: f64,
    /// Velocity given to vehicles placed at construction
    pub init_vel: i32,
}

impl Default for CaParams {
    fn default() -> Self {
        Self {
            size: 100,
            density: 0.2,
            vmax: 5,
            rand_prob: 0.2,
            init_vel: 1,
        }
    }
}

impl CaParams {
    pub fn new(size: usize, density: f64, vmax: i32, rand_prob: f64, init_vel: i32) -> Self {
        Self {
            size,
            density,
            vmax,
            rand_prob,
            init_vel,
        }
    }

    /// Replaces invalid values with safe defaults, one warning per fix
    pub fn sanitize(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if self.size == 0 {
            warnings.push(ConfigWarning::report("size", 0.0, 1.0));
            self.size = 1;
        }
        if !(0.0..=1.0).contains(&self.density) {
            warnings.push(ConfigWarning::report("density", self.density, 0.1));
            self.density = 0.1;
        }
        if self.vmax < 1 {
            warnings.push(ConfigWarning::report("vmax", self.vmax as f64, 1.0));
            self.vmax = 1;
        }
        if !(0.0..=1.0).contains(&self.rand_prob) {
            warnings.push(ConfigWarning::report("rand_prob", self.rand_prob, 0.0));
            self.rand_prob = 0.0;
        }
        if !(0..=self.vmax).contains(&self.init_vel) {
            let used = self.init_vel.clamp(0, self.vmax);
            warnings.push(ConfigWarning::report(
                "init_vel",
                self.init_vel as f64,
                used as f64,
            ));
            self.init_vel = used;
        }
        warnings
    }

    /// Number of vehicles placed on one lane at construction
    pub fn vehicles_per_lane(&self) -> usize {
        (self.size as f64 * self.density) as usize
    }
}

/// Ordered, variant-specific extra arguments
///
/// Index meaning depends on the variant:
/// * Open: doubles `[new_car_prob]`, ints `[new_car_speed]`
/// * Autonomous: doubles `[aut_density]`
/// * Stop: doubles `[stop_density]`
/// * Semaphore: doubles `[semaphore_density]`, bools `[random_placement]`
/// * SimpleJunction: doubles `[new_car_prob]`, ints `[new_car_speed, target_lane]`
/// * Multi-lane: ints `[lanes]`, open also doubles `[new_car_prob]` and ints `[_, new_car_speed]`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    doubles: Vec<f64>,
    ints: Vec<i32>,
    bools: Vec<bool>,
}

impl Args {
    pub fn new(doubles: Vec<f64>, ints: Vec<i32>, bools: Vec<bool>) -> Self {
        Self {
            doubles,
            ints,
            bools,
        }
    }

    pub fn double(&self, i: usize) -> Option<f64> {
        self.doubles.get(i).copied()
    }

    pub fn int(&self, i: usize) -> Option<i32> {
        self.ints.get(i).copied()
    }

    pub fn bool(&self, i: usize) -> Option<bool> {
        self.bools.get(i).copied()
    }

    /// Reads a double, logging and falling back when the slot is missing
    pub fn double_or(&self, i: usize, default: f64) -> f64 {
        self.double(i).unwrap_or_else(|| {
            warn!("Missing double argument at index {i}. Using {default}.");
            default
        })
    }

    pub fn int_or(&self, i: usize, default: i32) -> i32 {
        self.int(i).unwrap_or_else(|| {
            warn!("Missing int argument at index {i}. Using {default}.");
            default
        })
    }

    pub fn bool_or(&self, i: usize, default: bool) -> bool {
        self.bool(i).unwrap_or_else(|| {
            warn!("Missing bool argument at index {i}. Using {default}.");
            default
        })
    }

    /// Overwrites a double slot, growing the bag when needed
    pub fn set_double(&mut self, i: usize, value: f64) {
        if self.doubles.len() <= i {
            self.doubles.resize(i + 1, 0.0);
        }
        self.doubles[i] = value;
    }

    pub fn set_int(&mut self, i: usize, value: i32) {
        if self.ints.len() <= i {
            self.ints.resize(i + 1, 0);
        }
        self.ints[i] = value;
    }

    pub fn set_bool(&mut self, i: usize, value: bool) {
        if self.bools.len() <= i {
            self.bools.resize(i + 1, false);
        }
        self.bools[i] = value;
    }
}

/// Checks a probability-like value, clamping it to `fallback` when outside `[0, 1]`
pub(crate) fn checked_fraction(
    parameter: &'static str,
    value: f64,
    fallback: f64,
    warnings: &mut Vec<ConfigWarning>,
) -> f64 {
    if (0.0..=1.0).contains(&value) {
        value
    } else {
        warnings.push(ConfigWarning::report(parameter, value, fallback));
        fallback
    }
}
