//! Shared test scaffolding: scripted stub solvers and tiny problems.

use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use motionforge_config::SolverConfig;
use motionforge_core::constraint::{BoxLimits, ConfigTarget};
use motionforge_core::{Problem, Trajectory};
use nalgebra::DVector;

use crate::deadline::CancelToken;
use crate::error::SolverError;
use crate::result::{BasicResult, SolverResult};
use crate::solver::Solver;

/// Scripted behavior of a [`StubSolver`].
#[derive(Debug, Clone, Copy)]
pub enum StubBehavior {
    /// Succeed after a short delay.
    Succeed,
    /// Run to completion but report failure.
    Fail,
    /// Spin until the cancellation token fires, then report abnormal.
    RunUntilCancelled,
    /// Only the clone with this worker index succeeds; all others spin
    /// until cancelled. The original solver has index 0 and clones count up
    /// from 1 in creation order.
    SucceedOnlyWorker(usize),
}

/// Deterministic solver double with shared instrumentation.
///
/// Clones share the instrumentation counters, so assertions can observe
/// what racing workers did after the fact.
pub struct StubSolver {
    config: SolverConfig,
    problem: Option<Arc<Problem>>,
    behavior: StubBehavior,
    worker_index: usize,
    clone_counter: Arc<AtomicUsize>,
    raw_solves: Arc<AtomicUsize>,
    active: Arc<AtomicIsize>,
    last_guide: Arc<Mutex<Option<Trajectory>>>,
    seeds: Arc<Mutex<Vec<u64>>>,
}

impl StubSolver {
    pub fn new(config: SolverConfig, behavior: StubBehavior) -> Self {
        Self {
            config,
            problem: None,
            behavior,
            worker_index: 0,
            clone_counter: Arc::new(AtomicUsize::new(0)),
            raw_solves: Arc::new(AtomicUsize::new(0)),
            active: Arc::new(AtomicIsize::new(0)),
            last_guide: Arc::new(Mutex::new(None)),
            seeds: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Total `solve_raw` invocations across this solver and all clones.
    pub fn raw_solves(&self) -> usize {
        self.raw_solves.load(Ordering::SeqCst)
    }

    /// Number of `solve_raw` calls currently in flight.
    pub fn active(&self) -> isize {
        self.active.load(Ordering::SeqCst)
    }

    /// Guide passed to the most recent `solve_raw`, if any.
    pub fn last_guide(&self) -> Option<Trajectory> {
        self.last_guide.lock().unwrap().clone()
    }

    /// Seeds observed by `reseed`, in order.
    pub fn seeds(&self) -> Vec<u64> {
        self.seeds.lock().unwrap().clone()
    }

    fn succeed(&self) -> BasicResult {
        let dim = self
            .problem
            .as_ref()
            .map(|p| p.start().len())
            .unwrap_or(1);
        let marker = DVector::from_element(dim, self.worker_index as f64);
        let trajectory = Trajectory::new(vec![marker.clone(), marker]).unwrap();
        BasicResult::solved(trajectory, 1)
    }

    fn spin_until_cancelled(&self, cancel: &CancelToken) -> BasicResult {
        while !cancel.is_cancelled() {
            std::thread::sleep(Duration::from_millis(1));
        }
        BasicResult::abnormal()
    }
}

impl Clone for StubSolver {
    fn clone(&self) -> Self {
        let worker_index = self.clone_counter.fetch_add(1, Ordering::SeqCst) + 1;
        Self {
            config: self.config.clone(),
            problem: self.problem.clone(),
            behavior: self.behavior,
            worker_index,
            clone_counter: Arc::clone(&self.clone_counter),
            raw_solves: Arc::clone(&self.raw_solves),
            active: Arc::clone(&self.active),
            last_guide: Arc::clone(&self.last_guide),
            seeds: Arc::clone(&self.seeds),
        }
    }
}

impl Solver for StubSolver {
    type Result = BasicResult;
    type Guide = Trajectory;

    fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn problem(&self) -> Option<&Problem> {
        self.problem.as_deref()
    }

    fn setup(&mut self, problem: Problem) -> Result<(), SolverError> {
        self.problem = Some(Arc::new(problem));
        Ok(())
    }

    fn solve_raw(&mut self, guide: Option<&Trajectory>, cancel: &CancelToken) -> BasicResult {
        self.raw_solves.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_add(1, Ordering::SeqCst);
        *self.last_guide.lock().unwrap() = guide.cloned();

        let result = match self.behavior {
            StubBehavior::Succeed => {
                std::thread::sleep(Duration::from_millis(2));
                self.succeed()
            }
            StubBehavior::Fail => {
                std::thread::sleep(Duration::from_millis(2));
                BasicResult::failed(1)
            }
            StubBehavior::RunUntilCancelled => self.spin_until_cancelled(cancel),
            StubBehavior::SucceedOnlyWorker(winner) => {
                if self.worker_index == winner {
                    std::thread::sleep(Duration::from_millis(5));
                    self.succeed()
                } else {
                    self.spin_until_cancelled(cancel)
                }
            }
        };

        self.active.fetch_add(-1, Ordering::SeqCst);
        result
    }

    fn reseed(&mut self, seed: u64) {
        self.seeds.lock().unwrap().push(seed);
    }
}

/// Two-dimensional problem whose start sits comfortably inside the bounds.
pub fn trivial_problem() -> Problem {
    Problem::new(
        DVector::from_vec(vec![0.2, 0.3]),
        BoxLimits::new(
            DVector::from_element(2, -1.0),
            DVector::from_element(2, 1.0),
        )
        .unwrap(),
        Box::new(ConfigTarget::new(DVector::zeros(2))),
    )
    .unwrap()
}

/// Problem whose start violates the box bounds.
pub fn infeasible_problem() -> Problem {
    Problem::new(
        DVector::from_vec(vec![2.0, 0.0]),
        BoxLimits::new(
            DVector::from_element(2, -1.0),
            DVector::from_element(2, 1.0),
        )
        .unwrap(),
        Box::new(ConfigTarget::new(DVector::zeros(2))),
    )
    .unwrap()
}
