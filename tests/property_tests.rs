//! Invariants that hold for any road size, density, speed limit and seed

use freeway_ca::automaton::{
    Args, Automaton, Boundary, CaParams, CaType, Cell, MultiLane, RandomAlgorithm, RandomSource,
    Seed, EMPTY,
};
use proptest::prelude::*;

const PERIODIC: [CaType; 7] = [
    CaType::Circular,
    CaType::Autonomous,
    CaType::AutonomousNoRandom,
    CaType::AutonomousInstantReaction,
    CaType::Stop,
    CaType::Semaphore,
    CaType::CircularMultiLane,
];

fn build(kind: CaType, params: CaParams, lanes: i32, seed: u64) -> Automaton {
    let args = if kind.is_multilane() {
        Args::new(vec![], vec![lanes], vec![])
    } else {
        Args::default()
    };
    let random = RandomSource::new(RandomAlgorithm::ChaCha8, Seed::Fixed(seed));
    Automaton::new(kind, params, &args, random).expect("Failed to build automaton")
}

fn occupied(row: &[Cell]) -> usize {
    row.iter().filter(|&&c| c != EMPTY).count()
}

fn arb_params() -> impl Strategy<Value = CaParams> {
    (10usize..80, 0.0f64..=1.0, 1i32..8, 0.0f64..=1.0)
        .prop_map(|(size, density, vmax, rand_prob)| CaParams::new(size, density, vmax, rand_prob, 1))
}

proptest! {
    #[test]
    fn periodic_roads_keep_every_vehicle(
        kind in prop::sample::select(PERIODIC.to_vec()),
        params in arb_params(),
        lanes in 1i32..5,
        seed in any::<u64>(),
    ) {
        let mut ca = build(kind, params, lanes, seed);
        let start = ca.count_cars();
        let report = ca.evolve(30);
        prop_assert!(report.is_none(), "{} lost or gained vehicles: {:?}", kind.name(), report);

        // A cell holds one vehicle, so two vehicles on one cell show up
        // as a drop in the count of some snapshot
        let histories: Vec<Vec<Vec<Cell>>> = (0..ca.lanes()).map(|lane| ca.history(lane)).collect();
        for step in 0..ca.history_len() {
            let total: usize = histories.iter().map(|history| occupied(&history[step])).sum();
            prop_assert_eq!(total, start, "{} step {}", kind.name(), step);
        }
        for row in histories.iter().flatten() {
            prop_assert!(row.iter().all(|&c| c == EMPTY || (0..=ca.vmax()).contains(&c)));
        }
    }

    #[test]
    fn single_lane_moves_stay_within_the_gap(
        kind in prop::sample::select(vec![CaType::Circular, CaType::Stop, CaType::Semaphore]),
        params in arb_params(),
        seed in any::<u64>(),
    ) {
        let mut ca = build(kind, params, 1, seed);
        ca.evolve(20);

        let size = ca.size() as isize;
        for pair in ca.history(0).windows(2) {
            let (before, after) = (&pair[0], &pair[1]);
            for (q, &v) in after.iter().enumerate() {
                if v == EMPTY {
                    continue;
                }
                let origin = (q as isize - v as isize).rem_euclid(size) as usize;
                prop_assert_ne!(before[origin], EMPTY);
                let gap = (1..=size)
                    .find(|d| before[((origin as isize + d) % size) as usize] != EMPTY)
                    .unwrap_or(size);
                prop_assert!((v as isize) < gap, "moved {} with a gap of {}", v, gap);
            }
        }
    }

    #[test]
    fn multilane_vehicles_come_from_a_neighbouring_lane(
        params in arb_params(),
        lanes in 3i32..6,
        seed in any::<u64>(),
    ) {
        let mut ca = build(CaType::CircularMultiLane, params, lanes, seed);
        ca.evolve(20);

        let size = ca.size() as isize;
        let histories: Vec<Vec<Vec<Cell>>> = (0..ca.lanes()).map(|lane| ca.history(lane)).collect();
        for t in 0..ca.history_len() - 1 {
            for lane in 0..ca.lanes() {
                for (q, &v) in histories[lane][t + 1].iter().enumerate() {
                    if v == EMPTY {
                        continue;
                    }
                    let origin = (q as isize - v as isize).rem_euclid(size) as usize;
                    let from = lane.saturating_sub(1);
                    let to = (lane + 1).min(ca.lanes() - 1);
                    prop_assert!(
                        (from..=to).any(|k| histories[k][t][origin] != EMPTY),
                        "step {}: vehicle at cell {} of lane {} has no origin within one lane",
                        t, q, lane
                    );
                }
            }
        }
    }

    #[test]
    fn lone_vehicle_changes_at_most_one_lane(
        size in 8usize..40,
        lanes in 2usize..6,
        lane in 0usize..6,
        vmax in 1i32..6,
        v in 0i32..6,
    ) {
        let lane = lane % lanes;
        let v = v.min(vmax);
        let mut cells = vec![vec![EMPTY; lanes]; size];
        cells[0][lane] = v;
        let mut road =
            MultiLane::from_cells(cells, Boundary::Periodic, vmax, 0.0, RandomSource::scripted([]))
                .expect("Failed to build road");
        road.step();

        let found: Vec<usize> = (0..lanes)
            .filter(|&k| road.road().store().lane(k).iter().any(|&c| c != EMPTY))
            .collect();
        prop_assert_eq!(found.len(), 1);
        prop_assert!(found[0].abs_diff(lane) <= 1, "moved from lane {} to lane {}", lane, found[0]);
    }
}
