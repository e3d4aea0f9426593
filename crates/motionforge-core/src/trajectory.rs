//! Waypoint trajectories and motion-step validity.

use nalgebra::{DMatrix, DVector};

use crate::constraint::Constraint;
use crate::error::{CoreError, Result};

/// Non-empty sequence of configuration waypoints of uniform dimension.
///
/// # Example
///
/// ```
/// use motionforge_core::trajectory::Trajectory;
/// use nalgebra::DVector;
///
/// let traj = Trajectory::new(vec![
///     DVector::from_vec(vec![0.0, 0.0]),
///     DVector::from_vec(vec![1.0, 0.5]),
/// ]).unwrap();
/// assert_eq!(traj.len(), 2);
/// assert_eq!(traj.last()[0], 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    waypoints: Vec<DVector<f64>>,
}

impl Trajectory {
    /// Creates a trajectory from waypoints.
    ///
    /// Fails on an empty sequence or mismatched waypoint dimensions.
    pub fn new(waypoints: Vec<DVector<f64>>) -> Result<Self> {
        let first = waypoints
            .first()
            .ok_or_else(|| CoreError::Dimension("trajectory needs at least one waypoint".into()))?;
        let dim = first.len();
        if let Some(bad) = waypoints.iter().find(|w| w.len() != dim) {
            return Err(CoreError::Dimension(format!(
                "waypoint of dimension {} in a {dim}-dimensional trajectory",
                bad.len()
            )));
        }
        Ok(Self { waypoints })
    }

    /// Number of waypoints.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Always false: trajectories are non-empty by construction.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Configuration-space dimensionality.
    pub fn dim(&self) -> usize {
        self.waypoints[0].len()
    }

    /// First waypoint.
    pub fn first(&self) -> &DVector<f64> {
        &self.waypoints[0]
    }

    /// Final waypoint.
    pub fn last(&self) -> &DVector<f64> {
        self.waypoints.last().expect("trajectory is non-empty")
    }

    /// All waypoints in order.
    pub fn waypoints(&self) -> &[DVector<f64>] {
        &self.waypoints
    }

    /// Iterates the waypoints in order.
    pub fn iter(&self) -> std::slice::Iter<'_, DVector<f64>> {
        self.waypoints.iter()
    }

    /// Waypoints as a batch matrix, one row per configuration.
    pub fn as_batch(&self) -> DMatrix<f64> {
        let rows: Vec<_> = self.waypoints.iter().map(|w| w.transpose()).collect();
        DMatrix::from_rows(&rows)
    }
}

impl std::ops::Index<usize> for Trajectory {
    type Output = DVector<f64>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.waypoints[index]
    }
}

/// Checks a straight-line segment against an inequality constraint at the
/// given per-dimension step resolution.
///
/// The segment is subdivided until every sub-step fits inside the
/// resolution box and each sample must satisfy the constraint. Segments
/// already within the resolution degenerate to checking the endpoints.
pub fn is_valid_motion_step(
    step: &DVector<f64>,
    q1: &DVector<f64>,
    q2: &DVector<f64>,
    ineq: &dyn Constraint,
) -> bool {
    let delta = q2 - q1;
    let n_div = delta
        .iter()
        .zip(step.iter())
        .map(|(d, s)| (d.abs() / s).ceil() as usize)
        .max()
        .unwrap_or(0)
        .max(1);

    (0..=n_div).all(|k| {
        let t = k as f64 / n_div as f64;
        let q = q1 + &delta * t;
        ineq.satisfied_at(&q)
    })
}
