//! Constraint contract and concrete constraint variants.
//!
//! A constraint maps a batch of configurations to a stacked residual vector
//! and, on request, per-configuration Jacobians. Equality constraints are
//! satisfied where the residual is zero, inequality constraints where every
//! residual component is strictly positive.
//!
//! Constructors that depend on robot or geometry state take that state as an
//! argument and reflect it immediately, so every constraint value is ready
//! to evaluate from birth. [`Constraint::reflect`] refreshes the internal
//! cache when the robot moves; it overwrites the previous snapshot rather
//! than accumulating state.

mod box_limits;
mod collision;
mod composite;
mod self_collision;
mod target;

use nalgebra::{DMatrix, DVector};

use crate::error::Result;
use crate::robot::RobotState;

pub use box_limits::BoxLimits;
pub use collision::{CollisionFree, PointCollisionFree, ReducedCollisionFree};
pub use composite::Composite;
pub use self_collision::{NeuralSelfCollision, PairwiseSelfCollision};
pub use target::{ConfigTarget, PoseTarget, RelativePose};


/// Residual polarity of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// Satisfied where the residual vector is zero.
    Equality,
    /// Satisfied where every residual component is strictly positive.
    Inequality,
}

/// Result of evaluating a constraint over a batch of configurations.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Stacked residuals, one row per configuration.
    pub values: DMatrix<f64>,
    /// Per-configuration Jacobians (`output dim × config dim`); present iff
    /// the evaluation was asked for them.
    pub jacobians: Option<Vec<DMatrix<f64>>>,
}

impl Evaluation {
    /// Evaluation of a batch without Jacobians.
    pub fn values_only(values: DMatrix<f64>) -> Self {
        Self {
            values,
            jacobians: None,
        }
    }

    /// Number of configurations in the batch.
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    /// True when the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }
}

/// Vector-valued residual constraint over robot configurations.
///
/// `evaluate` takes a batch with one configuration per row and returns the
/// stacked residuals along with per-configuration Jacobians when requested.
/// Skipping the Jacobians lets implementations avoid the dominant cost of
/// an evaluation, so feasibility-only callers should pass
/// `with_jacobian = false`.
///
/// Evaluation is `&self` and constraints are shared read-only between
/// racing workers, hence the `Send + Sync` bound; mutation happens only
/// through `reflect`.
pub trait Constraint: Send + Sync {
    /// Residual polarity.
    fn polarity(&self) -> Polarity;

    /// Evaluates a batch of configurations (one per row).
    fn evaluate(&self, qs: &DMatrix<f64>, with_jacobian: bool) -> Evaluation;

    /// Propagates the robot's current state into the constraint's cache.
    ///
    /// State-independent constraints implement this as a no-op.
    fn reflect(&mut self, state: &dyn RobotState) -> Result<()>;

    /// Identity used in diagnostics.
    fn label(&self) -> &'static str;

    /// Sub-constraints of a composite; empty for leaf constraints.
    fn members(&self) -> &[Box<dyn Constraint>] {
        &[]
    }

    /// Evaluates a single configuration, unwrapping the batch of one.
    fn evaluate_single(
        &self,
        q: &DVector<f64>,
        with_jacobian: bool,
    ) -> (DVector<f64>, Option<DMatrix<f64>>) {
        let qs = DMatrix::from_rows(&[q.transpose()]);
        let eval = self.evaluate(&qs, with_jacobian);
        let values = eval.values.row(0).transpose();
        let jacobian = eval.jacobians.map(|mut jacs| jacs.swap_remove(0));
        (values, jacobian)
    }

    /// Inequality reading of satisfaction: all residuals strictly positive.
    fn satisfied_at(&self, q: &DVector<f64>) -> bool {
        let (values, _) = self.evaluate_single(q, false);
        values.iter().all(|v| *v > 0.0)
    }
}
