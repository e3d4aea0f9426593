//! Self-collision constraints, geometric and learned.

use nalgebra::{DMatrix, DVector};

use crate::constraint::{Constraint, Evaluation, Polarity};
use crate::error::{CoreError, Result};
use crate::kinematics::{CollisionScorer, SphereMap};
use crate::robot::RobotState;

/// Pairwise inter-sphere self-collision constraint.
///
/// The residual per checked pair is the squared center distance minus the
/// squared sum of radii, positive while the spheres stay apart. At
/// construction, candidate pairs closer than 3× their radius sum at the
/// all-zero configuration are excluded from the checked set: links that sit
/// that close by design would otherwise contribute permanently violated
/// residuals.
pub struct PairwiseSelfCollision {
    map: Box<dyn SphereMap>,
    checked_pairs: Vec<(usize, usize)>,
    sq_thresholds: DVector<f64>,
}

/// Margin factor applied to the radius sum when filtering pairs at the
/// all-zero configuration. Larger spheres get a proportionally larger
/// exclusion margin.
const FILTER_MARGIN: f64 = 3.0;

impl PairwiseSelfCollision {
    /// Creates the constraint, filtering design-adjacent sphere pairs.
    pub fn new(mut map: Box<dyn SphereMap>, state: &dyn RobotState) -> Result<Self> {
        map.reflect(state)?;

        let n_features = map.n_features();
        let radii = map.radii().to_vec();
        let mut candidates = Vec::new();
        for a in 0..n_features {
            for b in (a + 1)..n_features {
                candidates.push((a, b));
            }
        }

        let q_zero = DMatrix::zeros(1, map.dim_config());
        let (sqdists, _) = map.pair_sqdists(&q_zero, &candidates, false);

        let mut checked_pairs = Vec::new();
        let mut thresholds = Vec::new();
        for (idx, &(a, b)) in candidates.iter().enumerate() {
            let radius_sum = radii[a] + radii[b];
            let dist = sqdists[(0, idx)].sqrt();
            if dist - FILTER_MARGIN * radius_sum >= 0.0 {
                checked_pairs.push((a, b));
                thresholds.push(radius_sum * radius_sum);
            }
        }

        Ok(Self {
            map,
            checked_pairs,
            sq_thresholds: DVector::from_vec(thresholds),
        })
    }

    /// Sphere-index pairs that survived the construction-time filter.
    pub fn checked_pairs(&self) -> &[(usize, usize)] {
        &self.checked_pairs
    }
}

impl Constraint for PairwiseSelfCollision {
    fn polarity(&self) -> Polarity {
        Polarity::Inequality
    }

    fn evaluate(&self, qs: &DMatrix<f64>, with_jacobian: bool) -> Evaluation {
        let n = qs.nrows();
        let n_pairs = self.checked_pairs.len();
        let (sqdists, gradients) = self.map.pair_sqdists(qs, &self.checked_pairs, with_jacobian);

        let mut values = DMatrix::zeros(n, n_pairs);
        for i in 0..n {
            for p in 0..n_pairs {
                values[(i, p)] = sqdists[(i, p)] - self.sq_thresholds[p];
            }
        }

        Evaluation {
            values,
            jacobians: gradients,
        }
    }

    fn reflect(&mut self, state: &dyn RobotState) -> Result<()> {
        self.map.reflect(state)
    }

    fn label(&self) -> &'static str {
        "PairwiseSelfCollision"
    }
}

/// Learned self-collision constraint over a scalar collision score.
///
/// The residual is `threshold - score`, positive while the scorer considers
/// the configuration safe; the gradient is the negated score gradient. For
/// robots with a floating base the 3 trailing base dimensions are irrelevant
/// to self collision: they are stripped before inference and a zero gradient
/// is padded back in.
pub struct NeuralSelfCollision {
    scorer: Box<dyn CollisionScorer>,
    floating_base: bool,
    threshold: f64,
}

impl NeuralSelfCollision {
    /// Decision threshold on the learned score.
    const THRESHOLD: f64 = 0.5;

    /// Creates the constraint and feeds the robot's joint angles into the
    /// scorer context.
    pub fn new(
        scorer: Box<dyn CollisionScorer>,
        state: &dyn RobotState,
        floating_base: bool,
    ) -> Result<Self> {
        let mut constraint = Self {
            scorer,
            floating_base,
            threshold: Self::THRESHOLD,
        };
        constraint.reflect(state)?;
        Ok(constraint)
    }
}

impl Constraint for NeuralSelfCollision {
    fn polarity(&self) -> Polarity {
        Polarity::Inequality
    }

    fn evaluate(&self, qs: &DMatrix<f64>, with_jacobian: bool) -> Evaluation {
        let (n, dim) = qs.shape();
        let eval_dim = if self.floating_base { dim - 3 } else { dim };

        let mut values = DMatrix::zeros(n, 1);
        let mut jacs = with_jacobian.then(|| Vec::with_capacity(n));
        for i in 0..n {
            let q = qs.row(i).transpose();
            let q_eval = q.rows(0, eval_dim).into_owned();
            let (score, gradient) = self.scorer.infer(&q_eval, with_jacobian);
            values[(i, 0)] = self.threshold - score;

            if let Some(jacs) = jacs.as_mut() {
                let gradient = gradient.expect("scorer gradient requested");
                let mut jac = DMatrix::zeros(1, dim);
                for k in 0..eval_dim {
                    jac[(0, k)] = -gradient[k];
                }
                jacs.push(jac);
            }
        }

        Evaluation {
            values,
            jacobians: jacs,
        }
    }

    fn reflect(&mut self, state: &dyn RobotState) -> Result<()> {
        let names = self.scorer.joint_names().to_vec();
        let mut angles = Vec::with_capacity(names.len());
        for name in &names {
            let angle = state
                .joint_angle(name)
                .ok_or_else(|| CoreError::UnknownJoint(name.clone()))?;
            angles.push(angle);
        }
        self.scorer.set_context(&DVector::from_vec(angles));
        Ok(())
    }

    fn label(&self) -> &'static str {
        "NeuralSelfCollision"
    }
}
