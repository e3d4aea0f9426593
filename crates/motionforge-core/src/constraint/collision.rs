//! Obstacle-collision constraints backed by a signed-distance field.

use nalgebra::DMatrix;

use crate::constraint::{Constraint, Evaluation, Polarity};
use crate::error::Result;
use crate::kinematics::{DistanceField, SphereMap};
use crate::robot::RobotState;

/// Collision-free constraint for a point-shaped robot.
///
/// The configuration itself is treated as a spatial point and fed to the
/// distance field; the residual is its signed clearance. Gradients come
/// from a forward difference over the configuration dimensions.
pub struct PointCollisionFree {
    field: Box<dyn DistanceField>,
}

impl PointCollisionFree {
    /// Forward-difference step over configuration dimensions.
    const STEP: f64 = 1e-6;

    /// Creates the constraint from a distance field.
    pub fn new(field: impl DistanceField + 'static) -> Self {
        Self {
            field: Box::new(field),
        }
    }
}

impl Constraint for PointCollisionFree {
    fn polarity(&self) -> Polarity {
        Polarity::Inequality
    }

    fn evaluate(&self, qs: &DMatrix<f64>, with_jacobian: bool) -> Evaluation {
        let (n, dim) = qs.shape();
        let clearances = self.field.distances(qs);
        let values = DMatrix::from_iterator(n, 1, clearances.iter().copied());

        let jacobians = with_jacobian.then(|| {
            let mut jacs = vec![DMatrix::zeros(1, dim); n];
            for j in 0..dim {
                let mut shifted = qs.clone();
                shifted.column_mut(j).add_scalar_mut(Self::STEP);
                let shifted_clearances = self.field.distances(&shifted);
                for i in 0..n {
                    jacs[i][(0, j)] = (shifted_clearances[i] - clearances[i]) / Self::STEP;
                }
            }
            jacs
        });

        Evaluation { values, jacobians }
    }

    fn reflect(&mut self, _state: &dyn RobotState) -> Result<()> {
        Ok(())
    }

    fn label(&self) -> &'static str {
        "PointCollisionFree"
    }
}

/// Collision-free constraint for an articulated robot tracked by spheres.
///
/// Each tracked feature point must keep a clearance of at least its sphere
/// radius from the nearest obstacle: the residual per feature is
/// `sdf(x) - radius`. Jacobians chain a forward-difference gradient of the
/// distance field over task space with the feature Jacobians supplied by
/// the kinematics map.
pub struct CollisionFree {
    map: Box<dyn SphereMap>,
    field: Box<dyn DistanceField>,
}

impl CollisionFree {
    /// Forward-difference step over task-space dimensions.
    const STEP: f64 = 1e-7;

    /// Creates the constraint and reflects the robot state into the map.
    pub fn new(
        mut map: Box<dyn SphereMap>,
        field: impl DistanceField + 'static,
        state: &dyn RobotState,
    ) -> Result<Self> {
        map.reflect(state)?;
        Ok(Self {
            map,
            field: Box::new(field),
        })
    }

    /// Number of tracked spheres.
    pub fn n_features(&self) -> usize {
        self.map.n_features()
    }
}

impl Constraint for CollisionFree {
    fn polarity(&self) -> Polarity {
        Polarity::Inequality
    }

    fn evaluate(&self, qs: &DMatrix<f64>, with_jacobian: bool) -> Evaluation {
        let (n, dim) = qs.shape();
        let n_features = self.map.n_features();
        let dim_task = self.map.dim_task();
        let feval = self.map.map(qs);

        // All feature points of the whole batch, stacked row-wise for one
        // distance-field query.
        let mut points = DMatrix::zeros(n * n_features, dim_task);
        for i in 0..n {
            for j in 0..n_features {
                points
                    .row_mut(i * n_features + j)
                    .copy_from(&feval.values[i][j].transpose());
            }
        }
        let clearances = self.field.distances(&points);

        let radii = self.map.radii();
        let mut values = DMatrix::zeros(n, n_features);
        for i in 0..n {
            for j in 0..n_features {
                values[(i, j)] = clearances[i * n_features + j] - radii[j];
            }
        }

        let jacobians = with_jacobian.then(|| {
            let mut gradients = DMatrix::zeros(n * n_features, dim_task);
            for k in 0..dim_task {
                let mut shifted = points.clone();
                shifted.column_mut(k).add_scalar_mut(Self::STEP);
                let shifted_clearances = self.field.distances(&shifted);
                for r in 0..n * n_features {
                    gradients[(r, k)] = (shifted_clearances[r] - clearances[r]) / Self::STEP;
                }
            }

            let mut jacs = Vec::with_capacity(n);
            for i in 0..n {
                let mut jac = DMatrix::zeros(n_features, dim);
                for j in 0..n_features {
                    let row = gradients.row(i * n_features + j) * &feval.jacobians[i][j];
                    jac.row_mut(j).copy_from(&row);
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
        "CollisionFree"
    }
}

/// [`CollisionFree`] reduced to the single worst feature per configuration.
///
/// The residual is the minimum margin over all tracked spheres and the
/// Jacobian is the gradient of exactly that arg-min feature, shrinking the
/// output dimension to one.
pub struct ReducedCollisionFree {
    inner: CollisionFree,
}

impl ReducedCollisionFree {
    /// Creates the constraint and reflects the robot state into the map.
    pub fn new(
        map: Box<dyn SphereMap>,
        field: impl DistanceField + 'static,
        state: &dyn RobotState,
    ) -> Result<Self> {
        Ok(Self {
            inner: CollisionFree::new(map, field, state)?,
        })
    }
}

impl Constraint for ReducedCollisionFree {
    fn polarity(&self) -> Polarity {
        Polarity::Inequality
    }

    fn evaluate(&self, qs: &DMatrix<f64>, with_jacobian: bool) -> Evaluation {
        let full = self.inner.evaluate(qs, with_jacobian);
        let n = full.values.nrows();
        let dim = qs.ncols();

        let mut values = DMatrix::zeros(n, 1);
        let mut jacs = with_jacobian.then(|| Vec::with_capacity(n));
        for i in 0..n {
            let row = full.values.row(i);
            let (closest, margin) = row
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.total_cmp(b))
                .expect("sphere map tracks at least one feature");
            values[(i, 0)] = *margin;

            if let Some(jacs) = jacs.as_mut() {
                let full_jacs = full.jacobians.as_ref().expect("jacobians requested");
                let mut jac = DMatrix::zeros(1, dim);
                jac.row_mut(0).copy_from(&full_jacs[i].row(closest));
                jacs.push(jac);
            }
        }

        Evaluation {
            values,
            jacobians: jacs,
        }
    }

    fn reflect(&mut self, state: &dyn RobotState) -> Result<()> {
        self.inner.reflect(state)
    }

    fn label(&self) -> &'static str {
        "ReducedCollisionFree"
    }
}
