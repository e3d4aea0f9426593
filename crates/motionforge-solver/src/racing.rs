//! Parallel racing meta-solver.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use motionforge_config::SolverConfig;
use motionforge_core::Problem;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::deadline::CancelToken;
use crate::error::SolverError;
use crate::result::SolverResult;
use crate::solver::Solver;

/// Poll interval while draining worker results, bounding how long an outer
/// deadline cancellation waits before taking effect.
const DRAIN_POLL: Duration = Duration::from_millis(20);

/// Races N independent clones of an inner solver; first feasible wins.
///
/// Each worker runs on its own thread with an independently re-seeded clone
/// of the configured inner solver and a private cancellation token. Results
/// fan into a channel in wall-clock arrival order; the first one carrying a
/// trajectory wins, the remaining workers are cancelled and joined before
/// the solve returns. If every worker fails, the canonical abnormal result
/// comes back.
///
/// The winner is whichever worker's schedule and seed got there first, so
/// results are not deterministic across runs; that is the intended trade
/// for expected-latency reduction on multi-core hardware.
pub struct RacingSolver<S> {
    inner: S,
    n_workers: usize,
    base_seed: Option<u64>,
}

impl<S: Solver> RacingSolver<S> {
    /// Wraps a configured inner solver with an explicit worker count.
    pub fn new(inner: S, n_workers: usize) -> Result<Self, SolverError> {
        if n_workers == 0 {
            return Err(SolverError::Invalid(
                "racing requires at least one worker".into(),
            ));
        }
        Ok(Self {
            inner,
            n_workers,
            base_seed: None,
        })
    }

    /// Wraps an inner solver, taking the worker count and base seed from
    /// its configuration.
    pub fn from_config(inner: S) -> Result<Self, SolverError> {
        let n_workers = inner.config().racing.n_workers;
        let base_seed = inner.config().random_seed;
        let mut racing = Self::new(inner, n_workers)?;
        racing.base_seed = base_seed;
        Ok(racing)
    }

    /// Fixes the base seed so worker seeding is reproducible.
    pub fn with_base_seed(mut self, seed: u64) -> Self {
        self.base_seed = Some(seed);
        self
    }

    /// Number of racing workers.
    pub fn n_workers(&self) -> usize {
        self.n_workers
    }

    fn seeder(&self) -> ChaCha8Rng {
        match self.base_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::seed_from_u64(rand::rng().random()),
        }
    }
}

impl<S> Solver for RacingSolver<S>
where
    S: Solver + Clone + Send + 'static,
    S::Guide: Clone + Send + 'static,
{
    type Result = S::Result;
    type Guide = S::Guide;

    fn config(&self) -> &SolverConfig {
        self.inner.config()
    }

    fn problem(&self) -> Option<&Problem> {
        self.inner.problem()
    }

    fn setup(&mut self, problem: Problem) -> Result<(), SolverError> {
        self.inner.setup(problem)
    }

    fn reseed(&mut self, seed: u64) {
        self.base_seed = Some(seed);
    }

    fn solve_raw(&mut self, guide: Option<&Self::Guide>, cancel: &CancelToken) -> Self::Result {
        let (result_tx, result_rx) = mpsc::channel();
        let mut seeder = self.seeder();

        let mut workers = Vec::with_capacity(self.n_workers);
        for index in 0..self.n_workers {
            let mut solver = self.inner.clone();
            let seed: u64 = seeder.random();
            solver.reseed(seed);

            let token = CancelToken::new();
            let worker_token = token.clone();
            let tx = result_tx.clone();
            let guide = guide.cloned();
            let handle = std::thread::spawn(move || {
                let result = solver.solve_raw(guide.as_ref(), &worker_token);
                // The receiver may be gone once a winner was picked.
                let _ = tx.send(result);
            });
            debug!(worker = index, seed, "spawned racing worker");
            workers.push((token, handle));
        }
        drop(result_tx);

        let mut winner = None;
        let mut remaining = self.n_workers;
        while remaining > 0 {
            match result_rx.recv_timeout(DRAIN_POLL) {
                Ok(result) => {
                    remaining -= 1;
                    if result.is_success() {
                        winner = Some(result);
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if cancel.is_cancelled() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        for (token, _) in &workers {
            token.cancel();
        }
        for (_, handle) in workers {
            let _ = handle.join();
        }

        debug!(won = winner.is_some(), "race finished");
        winner.unwrap_or_else(S::Result::abnormal)
    }
}
