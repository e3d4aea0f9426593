//! Solver lifecycle and meta-solvers for motionforge.
//!
//! This crate drives concrete solvers over a
//! [`Problem`](motionforge_core::Problem):
//! - The [`Solver`](solver::Solver) lifecycle: setup, start-feasibility
//!   policy, watchdog deadlines with cooperative cancellation, elapsed-time
//!   stamping.
//! - [`RacingSolver`](racing::RacingSolver): races N independently seeded
//!   workers and returns the first feasible result.
//! - [`NearestNeighborSolver`](nearest::NearestNeighborSolver): warm-starts
//!   from a case base with a leave-one-out-calibrated infeasibility
//!   predictor.
//!
//! Concrete nonlinear solve routines (SQP, IK iterations) live outside this
//! crate; they plug in through [`Solver::solve_raw`](solver::Solver::solve_raw)
//! and [`ScratchSolver::from_config`](solver::ScratchSolver::from_config).

pub mod deadline;
pub mod error;
pub mod nearest;
pub mod racing;
pub mod result;
pub mod solver;

#[cfg(test)]
mod test_utils;

pub use deadline::{CancelToken, Deadline};
pub use error::SolverError;
pub use nearest::{calibrate_threshold, Case, NearestNeighborSolver, ThresholdTally};
pub use racing::RacingSolver;
pub use result::{BasicResult, SolverResult};
pub use solver::{OnInfeasibleStart, ScratchSolver, Solver};
