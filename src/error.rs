//! Errors surfaced to callers of the automata
//!
//! Out-of-range parameters are never errors; they are clamped and logged
//! (see [`crate::automaton::ConfigWarning`]). Only the cases below reach
//! the orchestration layer.

use std::error::Error;
use std::fmt;

use crate::automaton::CaType;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaError {
    /// An experiment was requested against an automaton that cannot run it.
    ArgumentError {
        /// Name of the rejected experiment.
        experiment: &'static str,
        /// The automaton it was requested on.
        ca: CaType,
    },
    /// The cell buffers could not be allocated.
    AllocationFailure {
        /// Number of cells that were requested.
        requested: usize,
    },
}

impl fmt::Display for CaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArgumentError { experiment, ca } => {
                write!(
                    f,
                    "experiment '{experiment}' is not valid for the {} automaton",
                    ca.name()
                )
            }
            Self::AllocationFailure { requested } => {
                write!(f, "not enough memory for {requested} cells")
            }
        }
    }
}

impl Error for CaError {}

/// Allocates a vector of `len` copies of `value`, reporting failure instead of aborting
pub(crate) fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>, CaError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| CaError::AllocationFailure { requested: len })?;
    buffer.resize(len, value);
    Ok(buffer)
}

/// `rows` rows of `width` copies of `value`, every row allocated fallibly
pub(crate) fn try_grid<T: Clone>(rows: usize, width: usize, value: T) -> Result<Vec<Vec<T>>, CaError> {
    let mut grid = Vec::new();
    grid.try_reserve_exact(rows)
        .map_err(|_| CaError::AllocationFailure {
            requested: rows.saturating_mul(width),
        })?;
    for _ in 0..rows {
        grid.push(try_filled(width, value.clone())?);
    }
    Ok(grid)
}

/// Fallible copy of a slice
pub(crate) fn try_copied<T: Copy>(items: &[T]) -> Result<Vec<T>, CaError> {
    let mut copy = Vec::new();
    copy.try_reserve_exact(items.len())
        .map_err(|_| CaError::AllocationFailure {
            requested: items.len(),
        })?;
    copy.extend_from_slice(items);
    Ok(copy)
}
