//! End-to-end exercise of the public API: a small damped-Newton goal solver
//! run through the lifecycle, the racing meta-solver, and the warm-start
//! meta-solver.

use std::sync::Arc;

use motionforge_config::SolverConfig;
use motionforge_core::constraint::{BoxLimits, ConfigTarget};
use motionforge_core::{Constraint, Problem, Trajectory};
use motionforge_solver::{
    BasicResult, CancelToken, Case, NearestNeighborSolver, RacingSolver, ScratchSolver, Solver,
    SolverError, SolverResult,
};
use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Damped Gauss-Newton descent on the goal residual.
///
/// Enough of a solver to exercise the orchestration layer: it iterates
/// `q ← q − (JᵀJ + λI)⁻¹ Jᵀ f` from the start (or a guide's endpoint) and
/// reports the two-waypoint trajectory once the goal tolerance is met.
#[derive(Clone)]
struct NewtonGoalSolver {
    config: SolverConfig,
    problem: Option<Arc<Problem>>,
    rng: ChaCha8Rng,
}

impl NewtonGoalSolver {
    const DAMPING: f64 = 1e-9;
}

impl Solver for NewtonGoalSolver {
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

    fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    fn solve_raw(&mut self, guide: Option<&Trajectory>, cancel: &CancelToken) -> BasicResult {
        let problem = Arc::clone(self.problem.as_ref().expect("setup ran"));
        let dim = problem.start().len();
        let mut q = guide
            .map(|t| t.last().clone())
            .unwrap_or_else(|| problem.start().clone());

        for call in 1..=self.config.max_calls {
            if cancel.is_cancelled() {
                return BasicResult::abnormal();
            }

            let (residual, jacobian) = problem.goal().evaluate_single(&q, true);
            if residual.norm_squared() <= problem.goal_tolerance() {
                let trajectory =
                    Trajectory::new(vec![problem.start().clone(), q]).expect("non-empty");
                return BasicResult::solved(trajectory, call);
            }

            let jacobian = jacobian.expect("jacobian requested");
            let hessian = jacobian.transpose() * &jacobian
                + DMatrix::identity(dim, dim) * Self::DAMPING;
            match hessian.cholesky() {
                Some(factor) => {
                    let step = factor.solve(&(jacobian.transpose() * residual));
                    q -= step;
                }
                // Singular normal equations: restart from a random interior
                // configuration.
                None => q = problem.bounds().sample(&mut self.rng),
            }
        }
        BasicResult::failed(self.config.max_calls)
    }
}

impl ScratchSolver for NewtonGoalSolver {
    fn from_config(config: SolverConfig) -> Self {
        let seed = config.random_seed.unwrap_or(0);
        Self {
            config,
            problem: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

fn reach_problem(goal: DVector<f64>) -> Problem {
    Problem::new(
        DVector::from_vec(vec![0.4, -0.3]),
        BoxLimits::new(
            DVector::from_element(2, -1.0),
            DVector::from_element(2, 1.0),
        )
        .unwrap(),
        Box::new(ConfigTarget::new(goal)),
    )
    .unwrap()
}

#[test]
fn lifecycle_solves_a_reach_problem() {
    init_tracing();
    let goal = DVector::from_vec(vec![0.1, 0.2]);
    let mut solver = NewtonGoalSolver::from_config(SolverConfig::default());
    solver.setup(reach_problem(goal.clone())).unwrap();

    let result = solver.solve(None).unwrap();
    let trajectory = result.trajectory().expect("goal is reachable");
    assert!(result.elapsed().is_some());
    approx::assert_relative_eq!(trajectory.last().clone(), goal, epsilon = 1e-3);

    let problem = solver.problem().unwrap();
    assert!(problem.is_satisfied(trajectory));
}

#[test]
fn racing_returns_a_feasible_result() {
    init_tracing();
    let inner = NewtonGoalSolver::from_config(SolverConfig::default());
    let mut racing = RacingSolver::new(inner, 3).unwrap().with_base_seed(5);
    racing.setup(reach_problem(DVector::from_vec(vec![-0.2, 0.5]))).unwrap();

    let result = racing.solve(None).unwrap();
    let trajectory = result.trajectory().expect("every worker can reach the goal");
    assert!(racing.problem().unwrap().is_satisfied(trajectory));
}

#[test]
fn warm_start_pipeline_solves_from_a_case_base() {
    init_tracing();
    let goal = DVector::from_vec(vec![0.3, 0.3]);
    let near_goal = Trajectory::new(vec![DVector::from_vec(vec![0.29, 0.31])]).unwrap();

    let cases = vec![
        Case::new(DVector::from_vec(vec![0.0]), Some(near_goal)),
        Case::new(DVector::from_vec(vec![0.1]), Some(
            Trajectory::new(vec![DVector::zeros(2)]).unwrap(),
        )),
        Case::new(DVector::from_vec(vec![5.0]), None),
        Case::new(DVector::from_vec(vec![5.1]), None),
    ];

    let mut config = SolverConfig::default();
    config.warm_start.knn = 2;
    config.warm_start.infeasibility_threshold = Some(2);

    let mut solver =
        NearestNeighborSolver::<NewtonGoalSolver>::from_config(config, cases).unwrap();
    solver.setup(reach_problem(goal)).unwrap();

    // A query near the feasible cases warm-starts and solves.
    let result = solver.solve(Some(&DVector::from_vec(vec![0.05]))).unwrap();
    assert!(result.is_success());

    // A query in the infeasible region short-circuits.
    let result = solver.solve(Some(&DVector::from_vec(vec![5.05]))).unwrap();
    assert!(!result.is_success());
}
