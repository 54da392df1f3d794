//! Freeway traffic cellular automata
//!
//! Nagel–Schreckenberg roads with periodic and open boundaries, autonomous
//! vehicles, stop signs, traffic lights, junctions and multiple lanes, plus
//! the sweeps used to measure them.

pub mod automaton;
pub mod error;
pub mod experiments;
pub mod export;
