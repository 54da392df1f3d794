use freeway_ca::automaton::{CaType, Seed, Series};
use freeway_ca::error::CaError;
use freeway_ca::experiments::{self, Experiment, ExperimentParams, Outcome};

fn small_params(ca: CaType) -> ExperimentParams {
    ExperimentParams {
        ca,
        size: 60,
        iterations: 40,
        dt: 0.25,
        seed: Seed::Fixed(3),
        ..ExperimentParams::default()
    }
}

fn series(outcome: Outcome) -> Series {
    match outcome {
        Outcome::Series(series) => series,
        other => panic!("Expected a series, got {:?}", other),
    }
}

#[test]
fn test_traffic_map_has_one_row_per_step() {
    let outcome = experiments::run(Experiment::TrafficMap, &small_params(CaType::Circular))
        .expect("Traffic map failed");
    let Outcome::Map(rows) = outcome else {
        panic!("Traffic map did not produce a map");
    };
    assert_eq!(rows.len(), 41);
    assert!(rows.iter().all(|row| row.len() == 60));
}

#[test]
fn test_flow_map_holds_markers_only() {
    let outcome = experiments::run(Experiment::FlowMap, &small_params(CaType::Open))
        .expect("Flow map failed");
    let Outcome::Map(rows) = outcome else {
        panic!("Flow map did not produce a map");
    };
    assert_eq!(rows.len(), 41);
    assert!(rows.iter().flatten().all(|&m| m == 0 || m == 1));
}

#[test]
fn test_per_cell_measurements() {
    let params = small_params(CaType::Circular);
    for experiment in [Experiment::Occupancy, Experiment::Flow] {
        let outcome = experiments::run(experiment, &params).expect("Measurement failed");
        let Outcome::Values(values) = outcome else {
            panic!("{} did not produce per-cell values", experiment.name());
        };
        assert_eq!(values.len(), 60);
    }
}

#[test]
fn test_flow_vs_density_covers_the_range() {
    let result = series(
        experiments::run(Experiment::FlowVsDensity, &small_params(CaType::Circular))
            .expect("Density sweep failed"),
    );
    assert_eq!(result.x, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    assert_eq!(result.y[0], 0.0, "An empty road has no flow");
    assert!(result.y.iter().all(|y| (0.0..=1.0).contains(y)));
}

#[test]
fn test_sweep_is_independent_of_thread_count() {
    let single = ExperimentParams {
        threads: 1,
        ..small_params(CaType::Circular)
    };
    let parallel = ExperimentParams {
        threads: 4,
        ..small_params(CaType::Circular)
    };
    let a = experiments::run(Experiment::FlowVsRandProb, &single).expect("Sweep failed");
    let b = experiments::run(Experiment::FlowVsRandProb, &parallel).expect("Sweep failed");
    assert_eq!(a, b, "Thread count changed the sweep result");
}

#[test]
fn test_new_car_prob_sweep_rejects_closed_roads() {
    let err = experiments::run(Experiment::FlowVsNewCarProb, &small_params(CaType::Circular))
        .expect_err("Sweep should fail on a circular road");
    assert_eq!(
        err.downcast_ref::<CaError>(),
        Some(&CaError::ArgumentError {
            experiment: "flow-vs-new-car-prob",
            ca: CaType::Circular,
        })
    );
}

#[test]
fn test_new_car_prob_sweep_on_open_road() {
    let result = series(
        experiments::run(Experiment::FlowVsNewCarProb, &small_params(CaType::Open))
            .expect("Entry sweep failed"),
    );
    assert_eq!(result.len(), 5);
}

#[test]
fn test_multilane_sweep_switches_type() {
    let params = ExperimentParams {
        lanes: 3,
        ..small_params(CaType::Circular)
    };
    let result = series(
        experiments::run(Experiment::MultilaneFlowVsDensity, &params).expect("Lane sweep failed"),
    );
    assert_eq!(result.len(), 5);
}

#[test]
fn test_integer_sweep_over_vmax() {
    let params = ExperimentParams {
        vmax_min: 1,
        vmax_max: 6,
        dt: 1.0,
        ..small_params(CaType::Circular)
    };
    let result = series(experiments::run(Experiment::FlowVsVmax, &params).expect("Sweep failed"));
    assert_eq!(result.x, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
}

#[test]
fn test_escape_time_is_measured_per_density() {
    let params = ExperimentParams {
        density_min: 0.2,
        density_max: 0.8,
        dt: 0.3,
        rand_prob: 0.0,
        ..small_params(CaType::Open)
    };
    let result = series(
        experiments::run(Experiment::EscapeTimeVsDensity, &params).expect("Escape sweep failed"),
    );
    assert_eq!(result.len(), 3);
    assert_eq!(result.x.len(), 3);
    assert!(
        result.y.iter().all(|&steps| steps > 0.0 && steps.fract() == 0.0),
        "Escape times must be whole positive step counts: {:?}",
        result.y
    );
}

#[test]
fn test_discharge_is_positive() {
    let params = ExperimentParams {
        density_min: 0.25,
        density_max: 0.5,
        rand_prob: 0.0,
        ..small_params(CaType::Circular)
    };
    let result = series(
        experiments::run(Experiment::DischargeVsDensity, &params).expect("Discharge sweep failed"),
    );
    assert_eq!(result.len(), 2);
    assert!(result.y.iter().all(|&rate| rate > 0.0));
}

#[test]
fn test_zero_step_is_an_error() {
    let params = ExperimentParams {
        dt: 0.0,
        ..small_params(CaType::Circular)
    };
    assert!(experiments::run(Experiment::FlowVsDensity, &params).is_err());
}
