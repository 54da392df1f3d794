//! The Nagel–Schreckenberg update rules
//!
//! Velocities are updated in place, in index order. The occupancy of the
//! current array does not change until the move, so every gap is measured
//! against the layout at the start of the step. The move then writes into
//! the next buffer, which is swapped in afterwards.

use super::boundary::CellAccess;
use super::rng::RandomSource;
use super::types::{Cell, EMPTY};

/// Smallest positive distance `d` for which `occupied(d)` holds
///
/// The scan is capped at `2 * size` so an empty road still terminates.
pub fn next_car_dist(size: usize, occupied: impl Fn(isize) -> bool) -> i32 {
    let limit = 2 * size as isize;
    let mut dist: isize = 1;
    while dist < limit && !occupied(dist) {
        dist += 1;
    }
    dist as i32
}

/// Whether a vehicle at velocity `v` with `gap` free cells ahead may speed up
pub fn can_accelerate(v: Cell, gap: i32, vmax: i32) -> bool {
    v < vmax && gap > v + 1
}

/// Brakes to `gap - 1` when the gap is within `threshold`
pub fn brake(v: Cell, gap: i32, threshold: i32) -> Cell {
    if v > 0 && gap <= threshold {
        gap - 1
    } else {
        v
    }
}

/// Rules 2 and 3: accelerate if possible, otherwise brake to the gap
pub fn accelerate_or_brake(v: Cell, gap: i32, vmax: i32) -> Cell {
    if can_accelerate(v, gap, vmax) {
        v + 1
    } else {
        brake(v, gap, v)
    }
}

/// Rule 4: one unit of random slow-down
pub fn randomize(v: Cell, slow_down: bool) -> Cell {
    if slow_down && v > 0 {
        v - 1
    } else {
        v
    }
}

/// Rules 2 to 4 for an ordinary vehicle
///
/// A slow-down outcome is drawn for every vehicle, stopped or not, so a
/// scripted queue is consumed one entry per vehicle.
pub fn standard_velocity(
    v: Cell,
    gap: i32,
    vmax: i32,
    random: &mut RandomSource,
    rand_prob: f64,
) -> Cell {
    let v = accelerate_or_brake(v, gap, vmax);
    let slow_down = random.bernoulli(rand_prob);
    randomize(v, slow_down)
}

/// Distance travelled from `from` to reach `to` on a ring of `size` cells
///
/// A marker on the vehicle's own cell is a full lap away.
pub fn ring_distance(from: usize, to: usize, size: usize) -> i32 {
    match (to + size - from) % size {
        0 => size as i32,
        d => d as i32,
    }
}

/// Rule 5: writes every vehicle into the next buffer and marks the cells it crossed
///
/// The caller clears the next buffers before and swaps them in after.
pub fn move_vehicles<A: CellAccess>(road: &mut A) {
    for i in 0..road.size() as isize {
        let v = road.get_at(i);
        if v == EMPTY {
            continue;
        }
        *road.at_temp(i + v as isize) = v;
        for j in i..i + v as isize {
            *road.at_flow_temp(j) = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accelerates_only_with_room() {
        assert_eq!(accelerate_or_brake(2, 4, 5), 3);
        assert_eq!(accelerate_or_brake(2, 3, 5), 2);
        assert_eq!(accelerate_or_brake(5, 10, 5), 5);
    }

    #[test]
    fn brakes_to_gap_minus_one() {
        assert_eq!(accelerate_or_brake(4, 2, 5), 1);
        assert_eq!(accelerate_or_brake(1, 1, 5), 0);
        assert_eq!(accelerate_or_brake(0, 1, 5), 0);
    }

    #[test]
    fn stopped_vehicle_is_not_slowed_further() {
        assert_eq!(randomize(0, true), 0);
        assert_eq!(randomize(3, true), 2);
        assert_eq!(randomize(3, false), 3);
    }

    #[test]
    fn gap_scan_stops_at_first_vehicle() {
        let cells = [EMPTY, EMPTY, 1, EMPTY];
        let gap = next_car_dist(cells.len(), |d| cells[(d as usize) % 4] != EMPTY);
        assert_eq!(gap, 2);
    }
}
