//! Random source owned by each automaton
//!
//! Every automaton carries its own generator so independent runs never
//! share state. In scripted mode the slow-down and injection decisions
//! come from a fixed queue instead of the generator.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;
use rand::rngs::{SmallRng, StdRng};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::{ChaCha20Rng, ChaCha8Rng};

use crate::error::{try_filled, CaError};

/// Generator algorithm backing a [`RandomSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RandomAlgorithm {
    #[default]
    Std,
    Small,
    ChaCha8,
    ChaCha20,
}

impl RandomAlgorithm {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "std" => Some(Self::Std),
            "small" => Some(Self::Small),
            "chacha8" => Some(Self::ChaCha8),
            "chacha20" => Some(Self::ChaCha20),
            _ => None,
        }
    }
}

/// How a generator gets its seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Seed {
    Fixed(u64),
    /// Derived from the wall clock at construction
    #[default]
    Clock,
}

impl Seed {
    pub fn value(self) -> u64 {
        match self {
            Seed::Fixed(seed) => seed,
            Seed::Clock => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default(),
        }
    }

    /// Seed for the `offset`-th independent run of a sweep
    pub fn offset(self, offset: u64) -> Seed {
        match self {
            Seed::Fixed(seed) => Seed::Fixed(seed.wrapping_add(offset)),
            Seed::Clock => Seed::Fixed(Seed::Clock.value().wrapping_add(offset)),
        }
    }
}

/// One of the supported generators
#[derive(Debug, Clone)]
pub enum SimRng {
    Std(StdRng),
    Small(SmallRng),
    ChaCha8(ChaCha8Rng),
    ChaCha20(ChaCha20Rng),
}

impl SimRng {
    pub fn new(algorithm: RandomAlgorithm, seed: u64) -> Self {
        match algorithm {
            RandomAlgorithm::Std => SimRng::Std(StdRng::seed_from_u64(seed)),
            RandomAlgorithm::Small => SimRng::Small(SmallRng::seed_from_u64(seed)),
            RandomAlgorithm::ChaCha8 => SimRng::ChaCha8(ChaCha8Rng::seed_from_u64(seed)),
            RandomAlgorithm::ChaCha20 => SimRng::ChaCha20(ChaCha20Rng::seed_from_u64(seed)),
        }
    }
}

impl RngCore for SimRng {
    fn next_u32(&mut self) -> u32 {
        match self {
            SimRng::Std(rng) => rng.next_u32(),
            SimRng::Small(rng) => rng.next_u32(),
            SimRng::ChaCha8(rng) => rng.next_u32(),
            SimRng::ChaCha20(rng) => rng.next_u32(),
        }
    }

    fn next_u64(&mut self) -> u64 {
        match self {
            SimRng::Std(rng) => rng.next_u64(),
            SimRng::Small(rng) => rng.next_u64(),
            SimRng::ChaCha8(rng) => rng.next_u64(),
            SimRng::ChaCha20(rng) => rng.next_u64(),
        }
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        match self {
            SimRng::Std(rng) => rng.fill_bytes(dst),
            SimRng::Small(rng) => rng.fill_bytes(dst),
            SimRng::ChaCha8(rng) => rng.fill_bytes(dst),
            SimRng::ChaCha20(rng) => rng.fill_bytes(dst),
        }
    }
}

/// Randomness consumed by an automaton
#[derive(Debug, Clone)]
pub struct RandomSource {
    algorithm: RandomAlgorithm,
    rng: SimRng,
    /// Pre-recorded outcomes for [`RandomSource::bernoulli`], consumed front to back
    script: Option<VecDeque<bool>>,
}

impl RandomSource {
    pub fn new(algorithm: RandomAlgorithm, seed: Seed) -> Self {
        let seed = seed.value();
        debug!("Seeding {:?} generator with {}", algorithm, seed);
        Self {
            algorithm,
            rng: SimRng::new(algorithm, seed),
            script: None,
        }
    }

    /// Deterministic source whose Bernoulli draws replay `outcomes`
    ///
    /// Once the queue runs dry every draw reports `false`.
    pub fn scripted(outcomes: impl IntoIterator<Item = bool>) -> Self {
        Self {
            algorithm: RandomAlgorithm::Std,
            rng: SimRng::new(RandomAlgorithm::Std, 0),
            script: Some(outcomes.into_iter().collect()),
        }
    }

    pub fn is_scripted(&self) -> bool {
        self.script.is_some()
    }

    pub fn algorithm(&self) -> RandomAlgorithm {
        self.algorithm
    }

    /// Independent source of the same kind, seeded from this one
    ///
    /// A scripted source forks into an empty script.
    pub fn fork(&mut self) -> Self {
        if self.is_scripted() {
            return Self::scripted([]);
        }
        let seed = self.rng.next_u64();
        Self {
            algorithm: self.algorithm,
            rng: SimRng::new(self.algorithm, seed),
            script: None,
        }
    }

    /// Draws a Bernoulli(`p`) outcome
    pub fn bernoulli(&mut self, p: f64) -> bool {
        match &mut self.script {
            Some(queue) => queue.pop_front().unwrap_or(false),
            None => self.rng.random_bool(p.clamp(0.0, 1.0)),
        }
    }

    /// Uniform integer in `[0, bound)`, zero when `bound` is zero
    pub fn uniform_int(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        self.rng.random_range(0..bound)
    }

    /// Uniform real in `[0, 1)`
    pub fn uniform_real(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    /// Picks `count` distinct values out of `0..n` in random order
    pub fn sample_positions(&mut self, n: usize, count: usize) -> Result<Vec<usize>, CaError> {
        let mut positions = try_filled(n, 0)?;
        for (i, pos) in positions.iter_mut().enumerate() {
            *pos = i;
        }
        self.shuffle(&mut positions);
        positions.truncate(count.min(n));
        Ok(positions)
    }
}
