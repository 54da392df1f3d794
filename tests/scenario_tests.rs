//! Fixed three-step evolutions with scripted slow-downs

use freeway_ca::automaton::{Automaton, Cell, EMPTY};

const E: Cell = EMPTY;

fn initial_road() -> Vec<Cell> {
    vec![1, E, E, 1, E, 1, 1, E, E, 1, E, E, E, 1, E, E, 1, E, E, E]
}

/// Periodic road, every vehicle draws a slow-down each step
#[test]
fn test_circular_road_three_steps() {
    let (f, t) = (false, true);
    let queue = vec![
        f, f, f, f, t, f, t, t, f, f, t, f, f, f, f, t, f, f, t, f, f,
    ];
    let mut ca = Automaton::circular_fixture(initial_road(), queue, 5).unwrap();

    assert!(ca.evolve(3).is_none(), "Vehicle count changed on a ring");
    assert_eq!(ca.history_len(), 4);

    let expected = vec![E, 2, E, 1, 0, E, E, 1, E, 1, E, E, E, E, 2, E, E, E, 2, E];
    let actual: Vec<Cell> = (0..20).map(|i| ca.get_at(i)).collect();
    assert_eq!(actual, expected, "Unexpected final road: {}", ca.render_current());
}

/// Open road; entry decisions are drawn from the same queue after each move
#[test]
fn test_open_road_three_steps() {
    let (f, t) = (false, true);
    let queue = vec![
        f, f, f, f, t, f, t, f, t, f, f, t, f, f, f, t, f, t, f, f, t, f, f, f,
    ];
    let mut ca = Automaton::open_fixture(initial_road(), queue, 5, 1).unwrap();

    ca.evolve(3);
    assert_eq!(ca.history_len(), 4);

    let expected = vec![E, 1, 0, E, E, 1, E, 1, 0, E, E, E, E, E, E, 3, E, E, 2, E];
    let actual: Vec<Cell> = (0..20).map(|i| ca.get_at(i)).collect();
    assert_eq!(actual, expected, "Unexpected final road: {}", ca.render_current());
}

/// Autonomous vehicles skip the slow-down draw, so the queue is shorter
#[test]
fn test_autonomous_road_three_steps() {
    let (f, t) = (false, true);
    let queue = vec![f, f, f, t, t, t, f, t, f, f, f, t, f, t, f];
    let mut ca = Automaton::autonomous_fixture(initial_road(), vec![0, 1, 3, 5], queue, 5).unwrap();

    assert!(ca.evolve(3).is_none(), "Vehicle count changed on a ring");
    assert_eq!(ca.history_len(), 4);

    let expected = vec![E, E, E, E, 1, 0, E, 1, E, E, E, E, 2, E, E, 2, E, 1, E, 1];
    let actual: Vec<Cell> = (0..20).map(|i| ca.get_at(i)).collect();
    assert_eq!(actual, expected, "Unexpected final road: {}", ca.render_current());
}

/// The initial state is the first recorded snapshot
#[test]
fn test_history_starts_with_initial_state() {
    let mut ca = Automaton::circular_fixture(initial_road(), vec![], 5).unwrap();
    ca.evolve(2);

    for (i, &cell) in initial_road().iter().enumerate() {
        assert_eq!(ca.get_history_at(0, i as isize), cell);
    }
    assert_eq!(ca.history(0).len(), 3);
    assert_eq!(ca.flow_history(0).len(), 3);
    assert!(
        ca.flow_history(0)[0].iter().all(|&marked| !marked),
        "No vehicle has moved before the first step"
    );
}
