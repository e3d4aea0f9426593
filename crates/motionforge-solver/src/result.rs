//! Solver result contract.

use std::time::Duration;

use motionforge_core::Trajectory;

/// Payload returned by a solve attempt.
///
/// Concrete solvers usually carry extra diagnostics; the orchestration layer
/// only relies on the fields here. Absence of a trajectory means failure,
/// and every result type must offer a canonical abnormal instance for
/// failures that happen before the core solve routine ran (timeout,
/// suppressed infeasible start).
pub trait SolverResult: Send + 'static {
    /// Result of a solver that failed without running.
    fn abnormal() -> Self;

    /// The solution trajectory, absent on failure.
    fn trajectory(&self) -> Option<&Trajectory>;

    /// Number of calls spent.
    fn n_calls(&self) -> usize;

    /// Wall-clock time of the solve, stamped by the lifecycle wrapper.
    fn elapsed(&self) -> Option<Duration>;

    /// Stamps the wall-clock time.
    fn set_elapsed(&mut self, elapsed: Duration);

    /// True when a trajectory is present.
    fn is_success(&self) -> bool {
        self.trajectory().is_some()
    }
}

/// Minimal concrete result used by the bundled solvers and tests.
#[derive(Debug, Clone, Default)]
pub struct BasicResult {
    /// Solution trajectory, absent on failure.
    pub trajectory: Option<Trajectory>,
    /// Wall-clock solve time.
    pub elapsed: Option<Duration>,
    /// Calls spent.
    pub n_calls: usize,
}

impl BasicResult {
    /// Successful result carrying a trajectory.
    pub fn solved(trajectory: Trajectory, n_calls: usize) -> Self {
        Self {
            trajectory: Some(trajectory),
            elapsed: None,
            n_calls,
        }
    }

    /// Failed result that still ran the core solver.
    pub fn failed(n_calls: usize) -> Self {
        Self {
            trajectory: None,
            elapsed: None,
            n_calls,
        }
    }
}

impl SolverResult for BasicResult {
    fn abnormal() -> Self {
        Self::default()
    }

    fn trajectory(&self) -> Option<&Trajectory> {
        self.trajectory.as_ref()
    }

    fn n_calls(&self) -> usize {
        self.n_calls
    }

    fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = Some(elapsed);
    }
}
