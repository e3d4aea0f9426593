//! Box limits on the configuration vector.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};
use rand::Rng;

use crate::constraint::{Constraint, Evaluation, Polarity};
use crate::error::{CoreError, Result};
use crate::robot::{JointLimit, RobotState};

/// Inequality constraint keeping the configuration inside `[lb, ub]`.
///
/// The residual stacks the lower margins then the upper margins,
/// `[q - lb; ub - q]`, so a strictly interior configuration yields all
/// positive components. The Jacobian is the constant `[I; -I]` block.
///
/// # Example
///
/// ```
/// use motionforge_core::constraint::{BoxLimits, Constraint};
/// use nalgebra::DVector;
///
/// let limits = BoxLimits::new(
///     DVector::from_vec(vec![-1.0, -1.0]),
///     DVector::from_vec(vec![1.0, 1.0]),
/// ).unwrap();
///
/// let (margins, _) = limits.evaluate_single(&DVector::zeros(2), false);
/// assert_eq!(margins.as_slice(), &[1.0, 1.0, 1.0, 1.0]);
/// ```
#[derive(Debug, Clone)]
pub struct BoxLimits {
    lb: DVector<f64>,
    ub: DVector<f64>,
}

/// Default range substituted for joints whose description leaves a limit
/// unspecified (continuous joints): one full wrap in either direction.
const WRAP_AROUND_BOUND: f64 = 2.0 * PI;

impl BoxLimits {
    /// Creates box limits from explicit bounds.
    pub fn new(lb: DVector<f64>, ub: DVector<f64>) -> Result<Self> {
        if lb.len() != ub.len() {
            return Err(CoreError::Dimension(format!(
                "lower bound has {} entries, upper bound {}",
                lb.len(),
                ub.len()
            )));
        }
        Ok(Self { lb, ub })
    }

    /// Builds bounds from joint-limit metadata, in order.
    ///
    /// Unspecified limits fall back to the wrap-around default of ±2π.
    /// When `base_bounds` is given, its entries are appended after the
    /// joint bounds to cover a floating-base pose.
    pub fn from_joint_limits(
        limits: &[JointLimit],
        base_bounds: Option<(&DVector<f64>, &DVector<f64>)>,
    ) -> Result<Self> {
        let mut lb = Vec::with_capacity(limits.len());
        let mut ub = Vec::with_capacity(limits.len());
        for limit in limits {
            lb.push(limit.lower.filter(|l| l.is_finite()).unwrap_or(-WRAP_AROUND_BOUND));
            ub.push(limit.upper.filter(|u| u.is_finite()).unwrap_or(WRAP_AROUND_BOUND));
        }
        if let Some((base_lb, base_ub)) = base_bounds {
            if base_lb.len() != base_ub.len() {
                return Err(CoreError::Dimension(format!(
                    "base lower bound has {} entries, upper bound {}",
                    base_lb.len(),
                    base_ub.len()
                )));
            }
            lb.extend(base_lb.iter());
            ub.extend(base_ub.iter());
        }
        Self::new(DVector::from_vec(lb), DVector::from_vec(ub))
    }

    /// Lower bounds.
    pub fn lb(&self) -> &DVector<f64> {
        &self.lb
    }

    /// Upper bounds.
    pub fn ub(&self) -> &DVector<f64> {
        &self.ub
    }

    /// Configuration-space dimensionality.
    pub fn dim(&self) -> usize {
        self.lb.len()
    }

    /// Draws a configuration uniformly inside the box.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        DVector::from_iterator(
            self.lb.len(),
            self.lb
                .iter()
                .zip(self.ub.iter())
                .map(|(lo, hi)| lo + (hi - lo) * rng.random::<f64>()),
        )
    }
}

impl Constraint for BoxLimits {
    fn polarity(&self) -> Polarity {
        Polarity::Inequality
    }

    fn evaluate(&self, qs: &DMatrix<f64>, with_jacobian: bool) -> Evaluation {
        let (n, dim) = qs.shape();
        assert_eq!(dim, self.lb.len(), "configuration dimension mismatch");

        let mut values = DMatrix::zeros(n, 2 * dim);
        for i in 0..n {
            for j in 0..dim {
                values[(i, j)] = qs[(i, j)] - self.lb[j];
                values[(i, dim + j)] = self.ub[j] - qs[(i, j)];
            }
        }

        let jacobians = with_jacobian.then(|| {
            let mut single = DMatrix::zeros(2 * dim, dim);
            for j in 0..dim {
                single[(j, j)] = 1.0;
                single[(dim + j, j)] = -1.0;
            }
            vec![single; n]
        });

        Evaluation { values, jacobians }
    }

    fn reflect(&mut self, _state: &dyn RobotState) -> Result<()> {
        Ok(())
    }

    fn label(&self) -> &'static str {
        "BoxLimits"
    }
}
