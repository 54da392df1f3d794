use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser};
use log::{error, info};

use freeway_ca::automaton::{Args, Automaton, CaParams, CaType, RandomAlgorithm, RandomSource, Seed};
use freeway_ca::experiments::{self, Experiment, ExperimentParams};
use freeway_ca::export;

#[derive(Parser)]
#[command(name = "freeway_ca")]
#[command(about = "Nagel-Schreckenberg freeway traffic simulations")]
struct Cli {
    /// Automaton to run (circular, open, autonomous, autonomous-norand,
    /// autonomous-instant, stop, semaphore, simple-junction,
    /// circular-multilane, open-multilane)
    #[arg(long, default_value = "circular")]
    ca: String,

    /// Experiment to run instead of a plain evolution
    #[arg(long)]
    experiment: Option<String>,

    /// Number of cells per lane
    #[arg(long, default_value = "100")]
    size: usize,

    /// Steps to evolve
    #[arg(long, default_value = "100")]
    iterations: usize,

    /// Lanes of the multi-lane automata
    #[arg(long, default_value = "2")]
    lanes: usize,

    #[arg(long, default_value = "5")]
    vmax: i32,

    #[arg(long, default_value = "0.2")]
    density: f64,

    /// Probability of a random slow-down
    #[arg(long, default_value = "0.2")]
    rand_prob: f64,

    /// Velocity of the vehicles placed at the start
    #[arg(long, default_value = "1")]
    init_vel: i32,

    /// Probability that a vehicle enters an open road
    #[arg(long, default_value = "0.1")]
    new_car_prob: f64,

    /// Velocity of vehicles entering an open road
    #[arg(long, default_value = "1")]
    new_car_speed: i32,

    /// Share of autonomous vehicles
    #[arg(long, default_value = "0.1")]
    aut_density: f64,

    #[arg(long, default_value = "0.1")]
    stop_density: f64,

    #[arg(long, default_value = "0.1")]
    semaphore_density: f64,

    /// Place traffic lights at random instead of evenly
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    random_semaphores: bool,

    /// Junction road that is observed; 0 is the source road
    #[arg(long, default_value = "1")]
    target_lane: i32,

    #[arg(long, default_value = "0.0")]
    density_min: f64,
    #[arg(long, default_value = "1.0")]
    density_max: f64,
    #[arg(long, default_value = "1")]
    vmax_min: i32,
    #[arg(long, default_value = "20")]
    vmax_max: i32,
    #[arg(long, default_value = "0.0")]
    rand_prob_min: f64,
    #[arg(long, default_value = "1.0")]
    rand_prob_max: f64,
    #[arg(long, default_value = "0.0")]
    aut_density_min: f64,
    #[arg(long, default_value = "1.0")]
    aut_density_max: f64,
    #[arg(long, default_value = "0.0")]
    new_car_prob_min: f64,
    #[arg(long, default_value = "1.0")]
    new_car_prob_max: f64,
    #[arg(long, default_value = "0.0")]
    stop_density_min: f64,
    #[arg(long, default_value = "1.0")]
    stop_density_max: f64,
    #[arg(long, default_value = "0.0")]
    semaphore_density_min: f64,
    #[arg(long, default_value = "1.0")]
    semaphore_density_max: f64,

    /// Step of every sweep
    #[arg(long, default_value = "0.1")]
    dt: f64,

    /// Divide the mean flow by the density in density sweeps
    #[arg(long)]
    per_density: bool,

    /// Random seed; taken from the clock when absent
    #[arg(long)]
    seed: Option<u64>,

    /// Generator: std, small, chacha8 or chacha20
    #[arg(long, default_value = "std")]
    rng: String,

    /// Worker threads for sweeps
    #[arg(long, default_value = "1")]
    threads: usize,

    /// Output file for the result
    #[arg(long)]
    out: Option<PathBuf>,

    /// Print the road before and after the run, then the traffic map of every lane
    #[arg(long)]
    show: bool,
}

impl Cli {
    /// Variant arguments in the order the automaton expects them
    fn variant_args(&self, ca: CaType) -> Args {
        match ca {
            CaType::Open => Args::new(vec![self.new_car_prob], vec![self.new_car_speed], vec![]),
            CaType::SimpleJunction => Args::new(
                vec![self.new_car_prob],
                vec![self.new_car_speed, self.target_lane],
                vec![],
            ),
            CaType::Autonomous | CaType::AutonomousNoRandom | CaType::AutonomousInstantReaction => {
                Args::new(vec![self.aut_density], vec![], vec![])
            }
            CaType::Stop => Args::new(vec![self.stop_density], vec![], vec![]),
            CaType::Semaphore => Args::new(
                vec![self.semaphore_density],
                vec![],
                vec![self.random_semaphores],
            ),
            CaType::CircularMultiLane => Args::new(vec![], vec![self.lanes as i32], vec![]),
            CaType::OpenMultiLane => Args::new(
                vec![self.new_car_prob],
                vec![self.lanes as i32, self.new_car_speed],
                vec![],
            ),
            CaType::Circular => Args::default(),
        }
    }

    fn seed(&self) -> Seed {
        self.seed.map_or(Seed::Clock, Seed::Fixed)
    }

    fn experiment_params(&self, ca: CaType, algorithm: RandomAlgorithm) -> ExperimentParams {
        ExperimentParams {
            ca,
            size: self.size,
            iterations: self.iterations,
            lanes: self.lanes,
            vmax: self.vmax,
            vmax_min: self.vmax_min,
            vmax_max: self.vmax_max,
            density: self.density,
            density_min: self.density_min,
            density_max: self.density_max,
            rand_prob: self.rand_prob,
            rand_prob_min: self.rand_prob_min,
            rand_prob_max: self.rand_prob_max,
            init_vel: self.init_vel,
            aut_density_min: self.aut_density_min,
            aut_density_max: self.aut_density_max,
            new_car_prob_min: self.new_car_prob_min,
            new_car_prob_max: self.new_car_prob_max,
            stop_density_min: self.stop_density_min,
            stop_density_max: self.stop_density_max,
            semaphore_density_min: self.semaphore_density_min,
            semaphore_density_max: self.semaphore_density_max,
            dt: self.dt,
            per_density: self.per_density,
            random_semaphores: self.random_semaphores,
            seed: self.seed(),
            algorithm,
            threads: self.threads,
            args: self.variant_args(ca),
        }
    }
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,freeway_ca=info"),
    )
    .init();

    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let ca = CaType::from_name(&cli.ca).ok_or_else(|| anyhow!("Unknown automaton '{}'", cli.ca))?;
    let algorithm = RandomAlgorithm::from_name(&cli.rng)
        .ok_or_else(|| anyhow!("Unknown generator '{}'", cli.rng))?;

    match &cli.experiment {
        Some(name) => {
            let experiment = Experiment::from_name(name)
                .ok_or_else(|| anyhow!("Unknown experiment '{name}'"))?;
            run_experiment(cli, experiment, ca, algorithm)
        }
        None => run_evolution(cli, ca, algorithm),
    }
}

fn run_experiment(
    cli: &Cli,
    experiment: Experiment,
    ca: CaType,
    algorithm: RandomAlgorithm,
) -> Result<()> {
    let params = cli.experiment_params(ca, algorithm);
    let outcome = experiments::run(experiment, &params)
        .with_context(|| format!("Experiment {} failed", experiment.name()))?;

    let path = cli
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(experiment.default_file_name(cli.per_density)));
    export::write_outcome_file(&path, &outcome)?;

    info!("=== RUN COMPLETE ===");
    info!("Experiment: {}", experiment.name());
    info!("Output: {}", path.display());
    Ok(())
}

/// Evolve one automaton and report what happened
fn run_evolution(cli: &Cli, ca: CaType, algorithm: RandomAlgorithm) -> Result<()> {
    let params = CaParams::new(cli.size, cli.density, cli.vmax, cli.rand_prob, cli.init_vel);
    let random = RandomSource::new(algorithm, cli.seed());
    let mut automaton = Automaton::new(ca, params, &cli.variant_args(ca), random)
        .with_context(|| format!("Failed to create the {} automaton", ca.name()))?;

    if cli.show {
        println!("Initial state:");
        println!("{}", automaton.render_current());
        println!();
    }

    let initial_cars = automaton.count_cars();
    let conservation = automaton.evolve(cli.iterations);

    if cli.show {
        println!("=== Final State ===");
        println!("{}", automaton.render_current());
        for lane in 0..automaton.lanes() {
            println!();
            println!("Traffic map, lane {lane}:");
            println!("{}", export::render_map(&automaton.history(lane)));
        }
    }

    if let Some(path) = &cli.out {
        let map = experiments::Outcome::Map(automaton.history(0));
        export::write_outcome_file(path, &map)?;
    }

    info!("=== RUN COMPLETE ===");
    info!("Automaton: {}", ca.name());
    info!("Steps: {}", automaton.history_len().saturating_sub(1));
    info!("Vehicles: {} at start, {} at end", initial_cars, automaton.count_cars());
    info!("Mean flow: {:.4}", automaton.mean_flow());
    if let Some(report) = conservation {
        info!(
            "Vehicle count not conserved: {} before, {} after",
            report.before, report.after
        );
    }
    Ok(())
}
