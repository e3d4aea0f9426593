//! Nearest-neighbor warm-start meta-solver.

use motionforge_config::SolverConfig;
use motionforge_core::{Problem, Trajectory};
use nalgebra::DVector;
use tracing::{debug, trace};

use crate::deadline::CancelToken;
use crate::error::SolverError;
use crate::result::SolverResult;
use crate::solver::{ScratchSolver, Solver};

/// One case-base entry: a query descriptor and the trajectory that solved
/// it, or `None` when that query region is known infeasible.
#[derive(Debug, Clone)]
pub struct Case {
    /// Fixed-length feature vector describing the query.
    pub features: DVector<f64>,
    /// Reference trajectory; absent for infeasible regions.
    pub trajectory: Option<Trajectory>,
}

impl Case {
    /// Creates a case-base entry.
    pub fn new(features: DVector<f64>, trajectory: Option<Trajectory>) -> Self {
        Self {
            features,
            trajectory,
        }
    }
}

/// Mismatch count of one candidate threshold during calibration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdTally {
    /// Candidate infeasibility threshold.
    pub threshold: usize,
    /// Leave-one-out prediction mismatches at this threshold.
    pub mismatches: usize,
}

/// Indices of the `knn` cases nearest to `query` by squared Euclidean
/// feature distance, optionally excluding one index (the query's own case
/// during leave-one-out calibration).
fn k_nearest_indices(
    cases: &[Case],
    query: &DVector<f64>,
    knn: usize,
    exclude: Option<usize>,
) -> Vec<usize> {
    let mut ranked: Vec<(usize, f64)> = cases
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != exclude)
        .map(|(i, case)| (i, (&case.features - query).norm_squared()))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked.truncate(knn);
    ranked.into_iter().map(|(i, _)| i).collect()
}

/// Calibrates the infeasibility-prediction threshold by leave-one-out
/// cross-validation over the case base.
///
/// For each candidate threshold `t` in `1..knn`, every case is predicted
/// infeasible iff at least `t` of its `knn` nearest neighbors (excluding
/// itself) carry no trajectory; mismatches against the case's own ground
/// truth are tallied. The first threshold with the minimum tally wins.
/// With `knn == 1` the candidate range is empty and the threshold defaults
/// to 1.
pub fn calibrate_threshold(cases: &[Case], knn: usize) -> (usize, Vec<ThresholdTally>) {
    let tallies: Vec<ThresholdTally> = (1..knn)
        .map(|threshold| {
            let mismatches = cases
                .iter()
                .enumerate()
                .filter(|(i, case)| {
                    let neighbors = k_nearest_indices(cases, &case.features, knn, Some(*i));
                    let absent = neighbors
                        .iter()
                        .filter(|&&n| cases[n].trajectory.is_none())
                        .count();
                    let predicted_infeasible = absent >= threshold;
                    predicted_infeasible != case.trajectory.is_none()
                })
                .count();
            ThresholdTally {
                threshold,
                mismatches,
            }
        })
        .collect();

    let best = tallies
        .iter()
        .min_by_key(|tally| tally.mismatches)
        .map(|tally| tally.threshold)
        .unwrap_or(1);
    trace!(?tallies, best, "leave-one-out threshold calibration");
    (best, tallies)
}

/// Warm-starts an inner solver from the nearest case-base trajectory.
///
/// Queries retrieve the `knn` nearest cases by feature distance. When the
/// number of trajectory-less neighbors reaches the infeasibility threshold,
/// the query is predicted infeasible and the inner solver is not invoked at
/// all. Otherwise the nearest trajectory-bearing neighbor guides exactly one
/// inner solve attempt; there is no fallback to farther neighbors when that
/// attempt fails.
pub struct NearestNeighborSolver<S> {
    inner: S,
    cases: Vec<Case>,
    knn: usize,
    threshold: usize,
    calibration: Vec<ThresholdTally>,
}

impl<S: Solver<Guide = Trajectory>> NearestNeighborSolver<S> {
    /// Wraps an inner solver around a case base.
    ///
    /// An explicit `threshold` skips calibration; `None` runs the
    /// leave-one-out search.
    pub fn new(
        inner: S,
        cases: Vec<Case>,
        knn: usize,
        threshold: Option<usize>,
    ) -> Result<Self, SolverError> {
        if knn == 0 {
            return Err(SolverError::Invalid("knn must be at least 1".into()));
        }
        if cases.is_empty() {
            return Err(SolverError::Invalid("case base must not be empty".into()));
        }
        let dim = cases[0].features.len();
        if cases.iter().any(|case| case.features.len() != dim) {
            return Err(SolverError::Invalid(
                "case feature vectors must share one dimension".into(),
            ));
        }

        let (threshold, calibration) = match threshold {
            Some(explicit) => (explicit, Vec::new()),
            None => calibrate_threshold(&cases, knn),
        };
        debug!(knn, threshold, cases = cases.len(), "warm-start solver ready");

        Ok(Self {
            inner,
            cases,
            knn,
            threshold,
            calibration,
        })
    }

    /// Builds the meta-solver and its internal scratch solver from
    /// configuration.
    pub fn from_config(config: SolverConfig, cases: Vec<Case>) -> Result<Self, SolverError>
    where
        S: ScratchSolver,
    {
        let knn = config.warm_start.knn;
        let threshold = config.warm_start.infeasibility_threshold;
        Self::new(S::from_config(config), cases, knn, threshold)
    }

    /// The infeasibility-prediction threshold in effect.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Per-threshold mismatch tallies from calibration; empty when an
    /// explicit threshold was supplied.
    pub fn calibration(&self) -> &[ThresholdTally] {
        &self.calibration
    }

    /// The wrapped scratch solver.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S> Solver for NearestNeighborSolver<S>
where
    S: Solver<Guide = Trajectory>,
{
    type Result = S::Result;
    type Guide = DVector<f64>;

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
        self.inner.reseed(seed);
    }

    fn solve_raw(&mut self, query: Option<&DVector<f64>>, cancel: &CancelToken) -> Self::Result {
        let Some(query) = query else {
            return self.inner.solve_raw(None, cancel);
        };

        let neighbors = k_nearest_indices(&self.cases, query, self.knn, None);
        let absent = neighbors
            .iter()
            .filter(|&&n| self.cases[n].trajectory.is_none())
            .count();
        if absent >= self.threshold {
            debug!(absent, threshold = self.threshold, "query predicted infeasible");
            return S::Result::abnormal();
        }

        let guide = neighbors
            .iter()
            .find_map(|&n| self.cases[n].trajectory.clone());
        match guide {
            Some(guide) => self.inner.solve_raw(Some(&guide), cancel),
            None => S::Result::abnormal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{trivial_problem, StubBehavior, StubSolver};

    fn feature(x: f64) -> DVector<f64> {
        DVector::from_vec(vec![x])
    }

    fn marker_trajectory(tag: f64) -> Trajectory {
        Trajectory::new(vec![DVector::from_vec(vec![tag, tag])]).unwrap()
    }

    /// A feasible cluster near the origin with one infeasible interloper,
    /// and an infeasible cluster far away.
    fn clustered_cases() -> Vec<Case> {
        vec![
            Case::new(feature(0.0), Some(marker_trajectory(1.0))),
            Case::new(feature(0.1), Some(marker_trajectory(2.0))),
            Case::new(feature(0.15), None),
            Case::new(feature(0.2), Some(marker_trajectory(4.0))),
            Case::new(feature(0.3), Some(marker_trajectory(5.0))),
            Case::new(feature(10.0), None),
            Case::new(feature(10.1), None),
            Case::new(feature(10.2), None),
        ]
    }

    fn stub() -> StubSolver {
        StubSolver::new(SolverConfig::default(), StubBehavior::Succeed)
    }

    #[test]
    fn calibration_minimizes_loo_mismatches() {
        let (threshold, tallies) = calibrate_threshold(&clustered_cases(), 3);

        // Threshold 1 misclassifies every feasible neighbor of the
        // interloper; threshold 2 only misses the interloper itself.
        assert_eq!(
            tallies,
            vec![
                ThresholdTally {
                    threshold: 1,
                    mismatches: 5
                },
                ThresholdTally {
                    threshold: 2,
                    mismatches: 1
                },
            ]
        );
        assert_eq!(threshold, 2);
    }

    #[test]
    fn calibration_ties_resolve_to_smallest_threshold() {
        // Two clean clusters of four: every case's three nearest neighbors
        // stay inside its own cluster, so every threshold is perfect and
        // the tie resolves to 1.
        let cases = vec![
            Case::new(feature(0.0), Some(marker_trajectory(1.0))),
            Case::new(feature(0.1), Some(marker_trajectory(2.0))),
            Case::new(feature(0.2), Some(marker_trajectory(3.0))),
            Case::new(feature(0.3), Some(marker_trajectory(4.0))),
            Case::new(feature(9.0), None),
            Case::new(feature(9.1), None),
            Case::new(feature(9.2), None),
            Case::new(feature(9.3), None),
        ];
        let (threshold, tallies) = calibrate_threshold(&cases, 3);
        assert!(tallies.iter().all(|t| t.mismatches == 0));
        assert_eq!(threshold, 1);
    }

    #[test]
    fn knn_of_one_defaults_to_threshold_one() {
        let solver = NearestNeighborSolver::new(stub(), clustered_cases(), 1, None).unwrap();
        assert_eq!(solver.threshold(), 1);
        assert!(solver.calibration().is_empty());
    }

    #[test]
    fn explicit_threshold_skips_calibration() {
        let solver = NearestNeighborSolver::new(stub(), clustered_cases(), 3, Some(3)).unwrap();
        assert_eq!(solver.threshold(), 3);
        assert!(solver.calibration().is_empty());
    }

    #[test]
    fn predicted_infeasible_short_circuits_inner_solver() {
        let inner = stub();
        let probe = inner.clone();
        let mut solver = NearestNeighborSolver::new(inner, clustered_cases(), 3, None).unwrap();
        solver.setup(trivial_problem()).unwrap();

        let result = solver.solve(Some(&feature(10.05))).unwrap();
        assert!(!result.is_success());
        assert_eq!(probe.raw_solves(), 0);
    }

    #[test]
    fn warm_start_uses_nearest_trajectory_bearing_neighbor() {
        let inner = stub();
        let probe = inner.clone();
        let mut solver = NearestNeighborSolver::new(inner, clustered_cases(), 3, None).unwrap();
        solver.setup(trivial_problem()).unwrap();

        // Nearest neighbor (0.15) has no trajectory; the guide must come
        // from the next-nearest case at 0.2.
        let result = solver.solve(Some(&feature(0.16))).unwrap();
        assert!(result.is_success());
        assert_eq!(probe.raw_solves(), 1);
        assert_eq!(probe.last_guide(), Some(marker_trajectory(4.0)));
    }

    #[test]
    fn no_query_delegates_without_guide() {
        let inner = stub();
        let probe = inner.clone();
        let mut solver = NearestNeighborSolver::new(inner, clustered_cases(), 3, None).unwrap();
        solver.setup(trivial_problem()).unwrap();

        let result = solver.solve(None).unwrap();
        assert!(result.is_success());
        assert_eq!(probe.raw_solves(), 1);
        assert_eq!(probe.last_guide(), None);
    }

    #[test]
    fn rejects_empty_case_base_and_ragged_features() {
        assert!(NearestNeighborSolver::new(stub(), vec![], 3, None).is_err());

        let ragged = vec![
            Case::new(feature(0.0), None),
            Case::new(DVector::zeros(2), None),
        ];
        assert!(NearestNeighborSolver::new(stub(), ragged, 3, None).is_err());
    }
}
