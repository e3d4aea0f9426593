//! External kinematics, geometry, and inference interfaces.
//!
//! Forward kinematics, signed-distance geometry, and learned self-collision
//! scoring are computed outside this crate. Constraints consume them through
//! the traits here: a [`FeatureMap`] turns configuration batches into
//! task-space feature values with Jacobians, a [`DistanceField`] reports
//! signed clearance of spatial points, and a [`CollisionScorer`] produces a
//! learned collision score with its gradient.

use nalgebra::{DMatrix, DVector};

use crate::error::Result;
use crate::robot::RobotState;

/// Batched output of a [`FeatureMap`].
#[derive(Debug, Clone)]
pub struct FeatureEval {
    /// `values[i][j]`: task-space value of feature `j` at configuration `i`.
    pub values: Vec<Vec<DVector<f64>>>,
    /// `jacobians[i][j]`: partial derivative of feature `j` w.r.t. the
    /// configuration, `dim_task × dim_config`.
    pub jacobians: Vec<Vec<DMatrix<f64>>>,
}

/// Batched forward map from configurations to tracked feature values.
///
/// A feature is a point or pose rigidly attached to the kinematic chain.
/// Implementations must re-read the underlying robot's state whenever
/// [`reflect`](FeatureMap::reflect) runs; between reflections the map is a
/// pure function of the configuration.
pub trait FeatureMap: Send + Sync {
    /// Number of tracked features.
    fn n_features(&self) -> usize;

    /// Task-space dimensionality of each feature value.
    fn dim_task(&self) -> usize;

    /// Configuration-space dimensionality the map expects.
    fn dim_config(&self) -> usize;

    /// Evaluates all features over a batch of configurations (one row each).
    fn map(&self, qs: &DMatrix<f64>) -> FeatureEval;

    /// Propagates the robot's current state into the map.
    fn reflect(&mut self, state: &dyn RobotState) -> Result<()>;
}

/// Feature map over 6-dimensional poses (position + roll/pitch/yaw), with
/// support for synthetic offset features.
pub trait PoseMap: FeatureMap {
    /// Appends a synthetic feature rigidly offset from an existing feature.
    ///
    /// The new feature's pose is the parent's pose composed with a fixed
    /// translation; its Jacobian derives from the parent's.
    fn attach_offset_feature(&mut self, parent: usize, offset: &DVector<f64>);

    /// Returns an independent copy of this map.
    ///
    /// Constraints that mutate their map (see
    /// [`RelativePose`](crate::constraint::RelativePose)) work on a copy so
    /// the caller's original is unaffected.
    fn clone_map(&self) -> Box<dyn PoseMap>;
}

/// Feature map over collision spheres attached to the kinematic chain.
pub trait SphereMap: FeatureMap {
    /// Clearance radius of each tracked sphere, indexed like the features.
    fn radii(&self) -> &[f64];

    /// Squared inter-sphere distances for the given feature-index pairs.
    ///
    /// Returns one row per configuration and one column per pair. When
    /// `with_jacobian` is set, also returns per-configuration gradients of
    /// the squared distances w.r.t. the configuration (`pairs × dim_config`).
    fn pair_sqdists(
        &self,
        qs: &DMatrix<f64>,
        pairs: &[(usize, usize)],
        with_jacobian: bool,
    ) -> (DMatrix<f64>, Option<Vec<DMatrix<f64>>>);
}

/// Batched signed-distance query: spatial points to signed clearance.
///
/// Positive values mean free space, negative values penetration. Implemented
/// for any closure from a point batch (one row per point) to a distance
/// vector, so ad hoc geometry can be passed inline:
///
/// ```
/// use motionforge_core::kinematics::DistanceField;
/// use nalgebra::{DMatrix, DVector};
///
/// // Unit sphere at the origin.
/// let field = |points: &DMatrix<f64>| {
///     DVector::from_iterator(points.nrows(), points.row_iter().map(|p| p.norm() - 1.0))
/// };
/// let query = DMatrix::from_row_slice(1, 3, &[2.0, 0.0, 0.0]);
/// assert_eq!(field.distances(&query)[0], 1.0);
/// ```
pub trait DistanceField: Send + Sync {
    /// Signed clearance of each point (one row per point).
    fn distances(&self, points: &DMatrix<f64>) -> DVector<f64>;
}

impl<F> DistanceField for F
where
    F: Fn(&DMatrix<f64>) -> DVector<f64> + Send + Sync,
{
    fn distances(&self, points: &DMatrix<f64>) -> DVector<f64> {
        self(points)
    }
}

/// Learned scalar collision score with gradient.
///
/// The scorer owns its evaluation joint ordering; `set_context` receives the
/// angles of exactly those joints whenever the owning constraint reflects.
pub trait CollisionScorer: Send + Sync {
    /// Collision score of a configuration, with gradient when requested.
    fn infer(&self, q: &DVector<f64>, with_grad: bool) -> (f64, Option<DVector<f64>>);

    /// Updates the scorer's context from externally queried joint angles.
    fn set_context(&mut self, joint_angles: &DVector<f64>);

    /// Joint names the scorer evaluates, in context order.
    fn joint_names(&self) -> &[String];
}
