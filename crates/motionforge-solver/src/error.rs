//! Error types for motionforge-solver.

use thiserror::Error;

/// Main error type for solver lifecycle operations.
#[derive(Debug, Error)]
pub enum SolverError {
    /// `solve` was called before `setup`.
    #[error("solver has no problem configured; call setup first")]
    NotConfigured,

    /// The start state violates the problem's preconditions.
    ///
    /// Only raised under the default infeasibility policy; see
    /// [`OnInfeasibleStart`](crate::solver::OnInfeasibleStart).
    #[error("start state is infeasible: {0}")]
    InfeasibleStart(String),

    /// Invalid meta-solver construction.
    #[error("invalid solver setup: {0}")]
    Invalid(String),
}

/// Result type alias for motionforge-solver operations.
pub type Result<T> = std::result::Result<T, SolverError>;
