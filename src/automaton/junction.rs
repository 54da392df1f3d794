//! Two open roads meeting at a junction
//!
//! The junction owns its source road outright. Every iteration advances the
//! source first, then the target.

use super::boundary::{Boundary, CellAccess};
use super::rng::RandomSource;
use super::single_lane::{Injection, SingleLane};
use super::types::{CaParams, Cell};
use crate::error::CaError;

/// Where the source road meets the target and how strongly it feeds it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    pub position: usize,
    pub weight: f64,
}

impl Connection {
    /// Moves vehicles from `source` into `target` at the connection point
    ///
    /// Vehicles are not transferred yet: both roads evolve independently and
    /// the connection only records where they meet.
    pub fn transfer(&self, _source: &mut SingleLane, _target: &mut SingleLane) {}
}

#[derive(Debug, Clone)]
pub struct Junction {
    source: Box<SingleLane>,
    target: SingleLane,
    connection: Connection,
    target_lane: i32,
}

impl Junction {
    /// Two open roads with the same parameters, joined at the middle
    pub fn new(
        params: &CaParams,
        injection: Injection,
        target_lane: i32,
        source_random: RandomSource,
        target_random: RandomSource,
    ) -> Result<Self, CaError> {
        let source = SingleLane::new(params, Boundary::Open, source_random)?.with_injection(injection);
        let target = SingleLane::new(params, Boundary::Open, target_random)?.with_injection(injection);
        Ok(Self::from_parts(source, target, target_lane))
    }

    /// Junction built from existing roads
    pub fn from_parts(source: SingleLane, target: SingleLane, target_lane: i32) -> Self {
        Self {
            connection: Connection {
                position: target.size() / 2,
                weight: 1.0,
            },
            source: Box::new(source),
            target,
            target_lane,
        }
    }

    pub fn source(&self) -> &SingleLane {
        &self.source
    }

    pub fn target(&self) -> &SingleLane {
        &self.target
    }

    pub fn connection(&self) -> Connection {
        self.connection
    }

    pub fn target_lane(&self) -> i32 {
        self.target_lane
    }

    /// The road that cell reads are served from
    pub fn observed(&self) -> &SingleLane {
        if self.target_lane == 0 {
            &self.source
        } else {
            &self.target
        }
    }

    pub fn observed_mut(&mut self) -> &mut SingleLane {
        if self.target_lane == 0 {
            &mut self.source
        } else {
            &mut self.target
        }
    }

    pub fn get_at(&self, pos: isize) -> Cell {
        self.observed().road().get_at(pos)
    }

    pub fn step(&mut self) {
        self.source.step();
        self.target.step();
        self.connection.transfer(&mut self.source, &mut self.target);
    }

    pub fn evolve(&mut self, iterations: usize) {
        for _ in 0..iterations {
            self.step();
        }
    }
}
