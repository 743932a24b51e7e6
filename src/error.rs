//! Error types for the simulation core.

use std::fmt;

/// Errors that can occur while aggregating or injecting into the lattice.
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// `Reducer` was asked for a coarse-cell size that doesn't evenly divide
    /// the grid dimensions.
    IndivisibleCellSize { width: usize, height: usize, cell_x: usize, cell_y: usize },
    /// `Injector::spawn_at_x` was asked for a concentration above the
    /// reachable maximum of 6/7 (six direction slots per cell).
    ConcentrationInfeasible { concentration: f64 },
    /// A fan-out worker panicked; the supervisor aborts the step.
    WorkerPanicked,
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::IndivisibleCellSize { width, height, cell_x, cell_y } => write!(
                f,
                "grid {}x{} is not evenly divisible by coarse cell size {}x{}",
                width, height, cell_x, cell_y
            ),
            SimError::ConcentrationInfeasible { concentration } => write!(
                f,
                "concentration {} exceeds the reachable maximum of 6/7 (six direction slots per cell)",
                concentration
            ),
            SimError::WorkerPanicked => write!(f, "a simulation worker thread panicked"),
        }
    }
}

impl std::error::Error for SimError {}
