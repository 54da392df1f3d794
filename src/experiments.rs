//! Parameter sweeps and fixed-run measurements
//!
//! Each sweep point builds its own automaton with its own generator, seeded
//! with the base seed plus the point index, so the points can run on
//! separate threads and a sweep is reproducible for a fixed seed.

use std::thread;

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info, warn};

use crate::automaton::{
    Args, Automaton, CaParams, CaType, Cell, RandomAlgorithm, RandomSource, Seed, Series,
};
use crate::error::CaError;

/// Everything an experiment may need; each experiment reads its own subset
#[derive(Debug, Clone)]
pub struct ExperimentParams {
    pub ca: CaType,
    pub size: usize,
    pub iterations: usize,
    pub lanes: usize,
    pub vmax: i32,
    pub vmax_min: i32,
    pub vmax_max: i32,
    pub density: f64,
    pub density_min: f64,
    pub density_max: f64,
    pub rand_prob: f64,
    pub rand_prob_min: f64,
    pub rand_prob_max: f64,
    pub init_vel: i32,
    pub aut_density_min: f64,
    pub aut_density_max: f64,
    pub new_car_prob_min: f64,
    pub new_car_prob_max: f64,
    pub stop_density_min: f64,
    pub stop_density_max: f64,
    pub semaphore_density_min: f64,
    pub semaphore_density_max: f64,
    /// Sweep step; integer sweeps round it to at least one
    pub dt: f64,
    /// Divide mean flow by density in density sweeps
    pub per_density: bool,
    pub random_semaphores: bool,
    pub seed: Seed,
    pub algorithm: RandomAlgorithm,
    pub threads: usize,
    pub args: Args,
}

impl Default for ExperimentParams {
    fn default() -> Self {
        Self {
            ca: CaType::Circular,
            size: 100,
            iterations: 100,
            lanes: 2,
            vmax: 5,
            vmax_min: 1,
            vmax_max: 20,
            density: 0.2,
            density_min: 0.0,
            density_max: 1.0,
            rand_prob: 0.2,
            rand_prob_min: 0.0,
            rand_prob_max: 1.0,
            init_vel: 1,
            aut_density_min: 0.0,
            aut_density_max: 1.0,
            new_car_prob_min: 0.0,
            new_car_prob_max: 1.0,
            stop_density_min: 0.0,
            stop_density_max: 1.0,
            semaphore_density_min: 0.0,
            semaphore_density_max: 1.0,
            dt: 0.1,
            per_density: false,
            random_semaphores: true,
            seed: Seed::Clock,
            algorithm: RandomAlgorithm::Std,
            threads: 1,
            args: Args::default(),
        }
    }
}

impl ExperimentParams {
    fn ca_params(&self) -> CaParams {
        CaParams::new(self.size, self.density, self.vmax, self.rand_prob, self.init_vel)
    }

    fn random(&self, point: usize) -> RandomSource {
        RandomSource::new(self.algorithm, self.seed.offset(point as u64))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Experiment {
    TrafficMap,
    FlowMap,
    Occupancy,
    Flow,
    FlowVsDensity,
    MultilaneFlowVsDensity,
    FlowVsVmax,
    FlowVsRandProb,
    FlowVsAutDensity,
    FlowVsNewCarProb,
    FlowVsStopDensity,
    FlowVsSemaphoreDensity,
    EscapeTimeVsDensity,
    EscapeTimeVsRandProb,
    EscapeTimeVsVmax,
    DischargeVsDensity,
}

impl Experiment {
    pub const ALL: [Experiment; 16] = [
        Experiment::TrafficMap,
        Experiment::FlowMap,
        Experiment::Occupancy,
        Experiment::Flow,
        Experiment::FlowVsDensity,
        Experiment::MultilaneFlowVsDensity,
        Experiment::FlowVsVmax,
        Experiment::FlowVsRandProb,
        Experiment::FlowVsAutDensity,
        Experiment::FlowVsNewCarProb,
        Experiment::FlowVsStopDensity,
        Experiment::FlowVsSemaphoreDensity,
        Experiment::EscapeTimeVsDensity,
        Experiment::EscapeTimeVsRandProb,
        Experiment::EscapeTimeVsVmax,
        Experiment::DischargeVsDensity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Experiment::TrafficMap => "traffic-map",
            Experiment::FlowMap => "flow-map",
            Experiment::Occupancy => "occupancy",
            Experiment::Flow => "flow",
            Experiment::FlowVsDensity => "flow-vs-density",
            Experiment::MultilaneFlowVsDensity => "multilane-flow-vs-density",
            Experiment::FlowVsVmax => "flow-vs-vmax",
            Experiment::FlowVsRandProb => "flow-vs-rand-prob",
            Experiment::FlowVsAutDensity => "flow-vs-aut-density",
            Experiment::FlowVsNewCarProb => "flow-vs-new-car-prob",
            Experiment::FlowVsStopDensity => "flow-vs-stop-density",
            Experiment::FlowVsSemaphoreDensity => "flow-vs-semaphore-density",
            Experiment::EscapeTimeVsDensity => "escape-time-vs-density",
            Experiment::EscapeTimeVsRandProb => "escape-time-vs-rand-prob",
            Experiment::EscapeTimeVsVmax => "escape-time-vs-vmax",
            Experiment::DischargeVsDensity => "discharge-vs-density",
        }
    }

    pub fn from_name(name: &str) -> Option<Experiment> {
        Experiment::ALL.into_iter().find(|e| e.name() == name)
    }

    /// File name the result is written to when no other name is given
    pub fn default_file_name(&self, per_density: bool) -> String {
        match self {
            Experiment::FlowVsDensity | Experiment::MultilaneFlowVsDensity if per_density => {
                "flow_per_density.csv".to_string()
            }
            _ => format!("{}.csv", self.name().replace('-', "_")),
        }
    }
}

/// What an experiment produces
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// One row per recorded step
    Map(Vec<Vec<Cell>>),
    /// One value per cell
    Values(Vec<f64>),
    Series(Series),
}

/// Runs `experiment` and returns its measurement
pub fn run(experiment: Experiment, params: &ExperimentParams) -> Result<Outcome> {
    info!(
        "Running {} on the {} automaton",
        experiment.name(),
        params.ca.name()
    );
    let outcome = match experiment {
        Experiment::TrafficMap => Outcome::Map(evolved(params, params.ca)?.history(0)),
        Experiment::FlowMap => Outcome::Map(
            evolved(params, params.ca)?
                .flow_history(0)
                .into_iter()
                .map(|row| row.into_iter().map(Cell::from).collect())
                .collect(),
        ),
        Experiment::Occupancy => Outcome::Values(evolved(params, params.ca)?.occupancy()),
        Experiment::Flow => Outcome::Values(evolved(params, params.ca)?.flow()),
        Experiment::FlowVsDensity => Outcome::Series(flow_vs_density(params, params.ca)?),
        Experiment::MultilaneFlowVsDensity => {
            let ca = if params.ca.is_multilane() {
                params.ca
            } else {
                warn!(
                    "{} is not a multi-lane automaton; using {}",
                    params.ca.name(),
                    CaType::CircularMultiLane.name()
                );
                CaType::CircularMultiLane
            };
            Outcome::Series(flow_vs_density(params, ca)?)
        }
        Experiment::FlowVsVmax => {
            let points = int_range(params.vmax_min, params.vmax_max, params.dt);
            Outcome::Series(sweep(params, &points, |p, i| {
                let mut ca_params = params.ca_params();
                ca_params.vmax = p as i32;
                mean_flow(params, params.ca, ca_params, &lane_args(params, params.ca), i)
            })?)
        }
        Experiment::FlowVsRandProb => {
            let points = float_range(params.rand_prob_min, params.rand_prob_max, params.dt)?;
            Outcome::Series(sweep(params, &points, |p, i| {
                let mut ca_params = params.ca_params();
                ca_params.rand_prob = p;
                mean_flow(params, params.ca, ca_params, &lane_args(params, params.ca), i)
            })?)
        }
        Experiment::FlowVsAutDensity => {
            let ca = match params.ca {
                CaType::Autonomous | CaType::AutonomousNoRandom | CaType::AutonomousInstantReaction => {
                    params.ca
                }
                _ => CaType::Autonomous,
            };
            let points = float_range(params.aut_density_min, params.aut_density_max, params.dt)?;
            Outcome::Series(sweep(params, &points, |p, i| {
                let args = Args::new(vec![p], vec![], vec![]);
                mean_flow(params, ca, params.ca_params(), &args, i)
            })?)
        }
        Experiment::FlowVsNewCarProb => {
            if !matches!(params.ca, CaType::Open | CaType::SimpleJunction) {
                return Err(CaError::ArgumentError {
                    experiment: experiment.name(),
                    ca: params.ca,
                }
                .into());
            }
            let points = float_range(params.new_car_prob_min, params.new_car_prob_max, params.dt)?;
            Outcome::Series(sweep(params, &points, |p, i| {
                let mut args = params.args.clone();
                args.set_double(0, p);
                mean_flow(params, params.ca, params.ca_params(), &args, i)
            })?)
        }
        Experiment::FlowVsStopDensity => {
            let points = float_range(params.stop_density_min, params.stop_density_max, params.dt)?;
            Outcome::Series(sweep(params, &points, |p, i| {
                let args = Args::new(vec![p], vec![], vec![]);
                mean_flow(params, CaType::Stop, params.ca_params(), &args, i)
            })?)
        }
        Experiment::FlowVsSemaphoreDensity => {
            let points =
                float_range(params.semaphore_density_min, params.semaphore_density_max, params.dt)?;
            Outcome::Series(sweep(params, &points, |p, i| {
                let args = Args::new(vec![p], vec![], vec![params.random_semaphores]);
                mean_flow(params, CaType::Semaphore, params.ca_params(), &args, i)
            })?)
        }
        Experiment::EscapeTimeVsDensity => {
            let ca = discharge_type(params.ca);
            let points = float_range(params.density_min, params.density_max, params.dt)?;
            Outcome::Series(sweep(params, &points, |p, i| {
                let mut ca_params = params.ca_params();
                ca_params.density = p;
                escape_time(params, ca, ca_params, i).map(|steps| Some(steps as f64))
            })?)
        }
        Experiment::EscapeTimeVsRandProb => {
            let ca = discharge_type(params.ca);
            let points = float_range(params.rand_prob_min, params.rand_prob_max, params.dt)?;
            Outcome::Series(sweep(params, &points, |p, i| {
                let mut ca_params = params.ca_params();
                ca_params.rand_prob = p;
                escape_time(params, ca, ca_params, i).map(|steps| Some(steps as f64))
            })?)
        }
        Experiment::EscapeTimeVsVmax => {
            let ca = discharge_type(params.ca);
            let points = int_range(params.vmax_min, params.vmax_max, params.dt);
            Outcome::Series(sweep(params, &points, |p, i| {
                let mut ca_params = params.ca_params();
                ca_params.vmax = p as i32;
                escape_time(params, ca, ca_params, i).map(|steps| Some(steps as f64))
            })?)
        }
        Experiment::DischargeVsDensity => {
            let ca = discharge_type(params.ca);
            let points = float_range(params.density_min, params.density_max, params.dt)?;
            Outcome::Series(sweep(params, &points, |p, i| {
                let mut ca_params = params.ca_params();
                ca_params.density = p;
                let steps = escape_time(params, ca, ca_params, i)?;
                Ok((steps != 0).then(|| params.size as f64 * p / steps as f64))
            })?)
        }
    };
    info!("{} finished", experiment.name());
    Ok(outcome)
}

/// Density sweep measuring mean flow, optionally per unit density
fn flow_vs_density(params: &ExperimentParams, ca: CaType) -> Result<Series> {
    let points = float_range(params.density_min, params.density_max, params.dt)?;
    let args = lane_args(params, ca);
    sweep(params, &points, |d, i| {
        let mut ca_params = params.ca_params();
        ca_params.density = d;
        let flow = mean_flow(params, ca, ca_params, &args, i)?;
        Ok(flow.map(|f| match params.per_density {
            true if d > 0.0 => f / d,
            true => 0.0,
            false => f,
        }))
    })
}

/// Argument bag with the lane count filled in for multi-lane types
fn lane_args(params: &ExperimentParams, ca: CaType) -> Args {
    let mut args = params.args.clone();
    if ca.is_multilane() {
        args.set_int(0, params.lanes as i32);
    }
    args
}

fn discharge_type(ca: CaType) -> CaType {
    if matches!(ca, CaType::Open | CaType::SimpleJunction) {
        ca
    } else {
        warn!(
            "{} cannot discharge; using {}",
            ca.name(),
            CaType::Open.name()
        );
        CaType::Open
    }
}

/// Automaton built from the base parameters and evolved for the configured iterations
fn evolved(params: &ExperimentParams, ca: CaType) -> Result<Automaton> {
    let mut automaton = Automaton::new(ca, params.ca_params(), &lane_args(params, ca), params.random(0))
        .with_context(|| format!("Failed to create the {} automaton", ca.name()))?;
    automaton.evolve(params.iterations);
    Ok(automaton)
}

fn mean_flow(
    params: &ExperimentParams,
    ca: CaType,
    ca_params: CaParams,
    args: &Args,
    point: usize,
) -> Result<Option<f64>> {
    let mut automaton = Automaton::new(ca, ca_params, args, params.random(point))
        .with_context(|| format!("Failed to create the {} automaton", ca.name()))?;
    automaton.evolve(params.iterations);
    Ok(Some(automaton.mean_flow()))
}

/// Steps an open road with no entering vehicles until it is empty
fn escape_time(
    params: &ExperimentParams,
    ca: CaType,
    ca_params: CaParams,
    point: usize,
) -> Result<usize> {
    let mut args = params.args.clone();
    args.set_double(0, 0.0);
    let mut automaton = Automaton::new(ca, ca_params, &args, params.random(point))
        .with_context(|| format!("Failed to create the {} automaton", ca.name()))?;

    let mut steps = 0;
    while automaton.count_cars() != 0 {
        automaton.step();
        steps += 1;
        if automaton.is_flux_halted() {
            bail!(
                "Flux halted after {steps} steps with {} vehicles left",
                automaton.count_cars()
            );
        }
    }
    Ok(steps)
}

/// Evaluates `measure` at every point, spread over the configured threads
///
/// Points that measure `None` are left out of the series.
fn sweep<F>(params: &ExperimentParams, points: &[f64], measure: F) -> Result<Series>
where
    F: Fn(f64, usize) -> Result<Option<f64>> + Sync,
{
    let workers = params.threads.clamp(1, points.len().max(1));
    debug!("Sweeping {} points on {} threads", points.len(), workers);

    let mut results: Vec<(usize, Result<Option<f64>>)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let measure = &measure;
                scope.spawn(move || {
                    (worker..points.len())
                        .step_by(workers)
                        .map(|i| (i, measure(points[i], i)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().map_err(|_| anyhow!("A sweep worker panicked")))
            .collect::<Result<Vec<_>>>()
    })?
    .into_iter()
    .flatten()
    .collect();
    results.sort_by_key(|(i, _)| *i);

    let mut series = Series::default();
    for (i, result) in results {
        let value = result.with_context(|| format!("Sweep point {} failed", points[i]))?;
        if let Some(y) = value {
            series.push(points[i], y);
        }
    }
    Ok(series)
}

/// `min, min + dt, ...` up to and including `max`
pub fn float_range(min: f64, max: f64, dt: f64) -> Result<Vec<f64>> {
    if dt.is_nan() || dt <= 0.0 {
        bail!("Sweep step must be positive, got {dt}");
    }
    let steps = ((max - min) / dt + 1e-9).floor();
    if steps < 0.0 {
        return Ok(Vec::new());
    }
    Ok((0..=steps as usize).map(|k| min + k as f64 * dt).collect())
}

/// Integer sweep from `min` to `max` with a step of at least one
pub fn int_range(min: i32, max: i32, dt: f64) -> Vec<f64> {
    let step = (dt as usize).max(1);
    if min > max {
        return Vec::new();
    }
    (min..=max).step_by(step).map(f64::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_range_includes_the_end() {
        let points = float_range(0.1, 0.5, 0.1).unwrap();
        assert_eq!(points.len(), 5);
        assert!((points[4] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_step_is_rejected() {
        assert!(float_range(0.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn int_range_steps_by_at_least_one() {
        assert_eq!(int_range(1, 4, 0.1), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(int_range(1, 7, 3.0), vec![1.0, 4.0, 7.0]);
    }
}
