//! Solver lifecycle: setup, timeout-bounded solve, infeasibility policy.

use std::time::Instant;

use motionforge_config::SolverConfig;
use motionforge_core::{Problem, Trajectory};
use tracing::{debug, warn};

use crate::deadline::{CancelToken, Deadline};
use crate::error::SolverError;
use crate::result::SolverResult;

/// Policy for a start state that fails the feasibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnInfeasibleStart {
    /// Fail loudly with [`SolverError::InfeasibleStart`].
    #[default]
    Fail,
    /// Return the canonical abnormal result instead.
    Abnormal,
}

/// A solver driving one problem under the shared lifecycle.
///
/// The lifecycle is Unconfigured → Ready → Solving → Done: a freshly built
/// solver has no problem (`problem()` is `None`), [`setup`](Solver::setup)
/// makes it Ready, and [`solve`](Solver::solve) runs one attempt to
/// completion. Implementors provide `solve_raw`, the solver-specific
/// routine; the provided `solve`/`solve_with` template arms the deadline,
/// applies the infeasibility policy, and stamps elapsed time:
///
/// 1. When the config carries a timeout, a watchdog flips the cancellation
///    token at expiry; `solve_raw` must poll the token at its loop
///    boundaries and return an abnormal result once it is set. A routine
///    that never polls can overrun the deadline by its longest non-polling
///    stretch.
/// 2. The start state is checked against the problem; infeasible starts
///    fail or degrade to an abnormal result per the caller's policy.
/// 3. `solve_raw` runs with the optional warm-start guide.
/// 4. Elapsed wall-clock time is stamped on the result, whatever the
///    outcome.
///
/// Retries are deliberately not part of this layer; meta-solvers race or
/// warm-start fresh attempts instead.
pub trait Solver: Send {
    /// Result payload produced by this solver.
    type Result: SolverResult;
    /// Warm-start hint accepted by this solver.
    type Guide;

    /// Shared configuration (call budget, timeout).
    fn config(&self) -> &SolverConfig;

    /// The configured problem, if `setup` has run.
    fn problem(&self) -> Option<&Problem>;

    /// Solver-specific preparation; stores the problem.
    fn setup(&mut self, problem: Problem) -> Result<(), SolverError>;

    /// Solver-specific solve routine.
    ///
    /// Runs after the feasibility gate, with the deadline already armed.
    /// Must poll `cancel` cooperatively.
    fn solve_raw(&mut self, guide: Option<&Self::Guide>, cancel: &CancelToken) -> Self::Result;

    /// Re-seeds solver-owned randomness. No-op for deterministic solvers.
    fn reseed(&mut self, _seed: u64) {}

    /// Solves with the default fail-loudly infeasibility policy.
    fn solve(&mut self, guide: Option<&Self::Guide>) -> Result<Self::Result, SolverError> {
        self.solve_with(guide, OnInfeasibleStart::Fail)
    }

    /// Solves under an explicit infeasible-start policy.
    fn solve_with(
        &mut self,
        guide: Option<&Self::Guide>,
        on_infeasible: OnInfeasibleStart,
    ) -> Result<Self::Result, SolverError> {
        let started = Instant::now();

        let feasibility = match self.problem() {
            None => return Err(SolverError::NotConfigured),
            Some(problem) => problem.check_start_feasibility(),
        };

        let cancel = CancelToken::new();
        let timeout = self.config().timeout();
        let _deadline = timeout.map(|limit| Deadline::arm(&cancel, limit));

        let mut result = if feasibility.feasible {
            debug!(?timeout, "starting solve");
            self.solve_raw(guide, &cancel)
        } else {
            match on_infeasible {
                OnInfeasibleStart::Fail => {
                    return Err(SolverError::InfeasibleStart(feasibility.report));
                }
                OnInfeasibleStart::Abnormal => {
                    warn!(report = %feasibility.report, "infeasible start, returning abnormal");
                    Self::Result::abnormal()
                }
            }
        };

        result.set_elapsed(started.elapsed());
        debug!(
            success = result.is_success(),
            n_calls = result.n_calls(),
            "solve finished"
        );
        Ok(result)
    }
}

/// A solver constructible from configuration alone, guided by trajectories.
///
/// Meta-solvers use this to spawn internal scratch solvers without knowing
/// their concrete construction details.
pub trait ScratchSolver: Solver<Guide = Trajectory> + Sized {
    /// Builds a fresh solver from shared configuration.
    fn from_config(config: SolverConfig) -> Self;
}
