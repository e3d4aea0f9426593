//! Equality constraints pinning configurations or end-effector poses.

use nalgebra::{DMatrix, DVector, Isometry3};

use crate::constraint::{Constraint, Evaluation, Polarity};
use crate::error::{CoreError, Result};
use crate::kinematics::{FeatureMap, PoseMap};
use crate::robot::RobotState;

/// Equality constraint `q - q_desired` with identity Jacobian.
///
/// # Example
///
/// ```
/// use motionforge_core::constraint::{ConfigTarget, Constraint};
/// use nalgebra::DVector;
///
/// let target = ConfigTarget::new(DVector::zeros(2));
/// let (residual, jac) = target.evaluate_single(&DVector::from_vec(vec![1.0, 1.0]), true);
/// assert_eq!(residual.as_slice(), &[1.0, 1.0]);
/// assert!(jac.unwrap().is_identity(0.0));
/// ```
#[derive(Debug, Clone)]
pub struct ConfigTarget {
    desired: DVector<f64>,
}

impl ConfigTarget {
    /// Creates the constraint from the desired configuration.
    pub fn new(desired: DVector<f64>) -> Self {
        Self { desired }
    }

    /// Feature-vector description of this goal: the desired configuration.
    pub fn description(&self) -> &DVector<f64> {
        &self.desired
    }
}

impl Constraint for ConfigTarget {
    fn polarity(&self) -> Polarity {
        Polarity::Equality
    }

    fn evaluate(&self, qs: &DMatrix<f64>, with_jacobian: bool) -> Evaluation {
        let (n, dim) = qs.shape();
        assert_eq!(dim, self.desired.len(), "configuration dimension mismatch");

        let mut values = DMatrix::zeros(n, dim);
        for i in 0..n {
            for j in 0..dim {
                values[(i, j)] = qs[(i, j)] - self.desired[j];
            }
        }
        let jacobians = with_jacobian.then(|| vec![DMatrix::identity(dim, dim); n]);
        Evaluation { values, jacobians }
    }

    fn reflect(&mut self, _state: &dyn RobotState) -> Result<()> {
        Ok(())
    }

    fn label(&self) -> &'static str {
        "ConfigTarget"
    }
}

/// Equality constraint pinning tracked end-effector poses to desired values.
///
/// Each desired pose is a 6-vector `(x, y, z, roll, pitch, yaw)`; residuals
/// stack the per-feature pose differences and Jacobians come straight from
/// the kinematics map.
pub struct PoseTarget {
    map: Box<dyn FeatureMap>,
    desired: Vec<DVector<f64>>,
}

impl PoseTarget {
    /// Creates the constraint from per-feature desired pose vectors.
    pub fn new(
        desired: Vec<DVector<f64>>,
        mut map: Box<dyn FeatureMap>,
        state: &dyn RobotState,
    ) -> Result<Self> {
        if desired.len() != map.n_features() {
            return Err(CoreError::Dimension(format!(
                "{} desired poses for {} tracked features",
                desired.len(),
                map.n_features()
            )));
        }
        let dim_task = map.dim_task();
        for pose in &desired {
            if pose.len() != dim_task {
                return Err(CoreError::Dimension(format!(
                    "desired pose has {} entries, task space is {dim_task}-dimensional",
                    pose.len()
                )));
            }
        }
        map.reflect(state)?;
        Ok(Self { map, desired })
    }

    /// Creates the constraint from rigid transforms, one per tracked feature.
    ///
    /// Translations become the positional part and rotations are unrolled
    /// to roll/pitch/yaw.
    pub fn from_isometries(
        targets: &[Isometry3<f64>],
        map: Box<dyn FeatureMap>,
        state: &dyn RobotState,
    ) -> Result<Self> {
        if map.dim_task() != 6 {
            return Err(CoreError::Dimension(format!(
                "pose targets need a 6-dimensional task space, map has {}",
                map.dim_task()
            )));
        }
        let desired = targets
            .iter()
            .map(|iso| {
                let t = &iso.translation.vector;
                let (roll, pitch, yaw) = iso.rotation.euler_angles();
                DVector::from_vec(vec![t.x, t.y, t.z, roll, pitch, yaw])
            })
            .collect();
        Self::new(desired, map, state)
    }

    /// Feature-vector description of this goal: the stacked desired poses.
    pub fn description(&self) -> DVector<f64> {
        let total = self.desired.iter().map(|pose| pose.len()).sum();
        DVector::from_iterator(total, self.desired.iter().flat_map(|d| d.iter().copied()))
    }
}

impl Constraint for PoseTarget {
    fn polarity(&self) -> Polarity {
        Polarity::Equality
    }

    fn evaluate(&self, qs: &DMatrix<f64>, with_jacobian: bool) -> Evaluation {
        let (n, dim) = qs.shape();
        let n_features = self.map.n_features();
        let dim_task = self.map.dim_task();
        let feval = self.map.map(qs);

        let mut values = DMatrix::zeros(n, n_features * dim_task);
        for i in 0..n {
            for j in 0..n_features {
                let diff = &feval.values[i][j] - &self.desired[j];
                for k in 0..dim_task {
                    values[(i, j * dim_task + k)] = diff[k];
                }
            }
        }

        let jacobians = with_jacobian.then(|| {
            let mut jacs = Vec::with_capacity(n);
            for i in 0..n {
                let mut jac = DMatrix::zeros(n_features * dim_task, dim);
                for j in 0..n_features {
                    jac.rows_mut(j * dim_task, dim_task)
                        .copy_from(&feval.jacobians[i][j]);
                }
                jacs.push(jac);
            }
            jacs
        });

        Evaluation { values, jacobians }
    }

    fn reflect(&mut self, state: &dyn RobotState) -> Result<()> {
        self.map.reflect(state)
    }

    fn label(&self) -> &'static str {
        "PoseTarget"
    }
}

/// Equality constraint on the relative pose between two tracked features.
///
/// Built from a map tracking exactly two features. The constructor clones
/// the map and appends a third, synthetic feature rigidly offset from the
/// first; the residual then matches the second feature against that
/// synthetic target. The caller's original map is never touched.
pub struct RelativePose {
    map: Box<dyn PoseMap>,
    offset: DVector<f64>,
}

impl RelativePose {
    /// Creates the constraint from the desired offset of feature 1 relative
    /// to feature 0.
    pub fn new(
        offset: DVector<f64>,
        map: &dyn PoseMap,
        state: &dyn RobotState,
    ) -> Result<Self> {
        if map.n_features() != 2 {
            return Err(CoreError::FeatureCount {
                label: "RelativePose",
                expected: 2,
                found: map.n_features(),
            });
        }
        let mut map = map.clone_map();
        map.attach_offset_feature(0, &offset);
        map.reflect(state)?;
        Ok(Self { map, offset })
    }

    /// The rigid offset defining the synthetic target feature.
    pub fn offset(&self) -> &DVector<f64> {
        &self.offset
    }
}

impl Constraint for RelativePose {
    fn polarity(&self) -> Polarity {
        Polarity::Equality
    }

    fn evaluate(&self, qs: &DMatrix<f64>, with_jacobian: bool) -> Evaluation {
        let n = qs.nrows();
        let dim_task = self.map.dim_task();
        let feval = self.map.map(qs);

        // Features: 0 = anchor, 1 = tracked, 2 = synthetic offset target.
        let mut values = DMatrix::zeros(n, dim_task);
        for i in 0..n {
            let diff = &feval.values[i][1] - &feval.values[i][2];
            for k in 0..dim_task {
                values[(i, k)] = diff[k];
            }
        }

        let jacobians = with_jacobian.then(|| {
            (0..n)
                .map(|i| &feval.jacobians[i][1] - &feval.jacobians[i][2])
                .collect()
        });

        Evaluation { values, jacobians }
    }

    fn reflect(&mut self, state: &dyn RobotState) -> Result<()> {
        self.map.reflect(state)
    }

    fn label(&self) -> &'static str {
        "RelativePose"
    }
}
