//! Robot-model reflection target and joint-limit metadata.
//!
//! The robot model itself (URDF loading, link/joint representation) lives
//! outside this crate. Constraints only need two things from it: current
//! joint angles by name at reflection time, and joint-limit metadata when
//! building box bounds.

use nalgebra::DVector;

/// Anything exposing current joint angles by name.
///
/// Passed opaquely through to kinematics maps and inference models whenever
/// a constraint's [`reflect`](crate::constraint::Constraint::reflect) entry
/// point runs.
pub trait RobotState {
    /// Current angle of the named joint, or `None` if the joint is unknown.
    fn joint_angle(&self, name: &str) -> Option<f64>;
}

/// Joint-limit metadata, typically read out of a robot description.
///
/// `None` bounds mean the description left the limit unspecified
/// (continuous joints); [`BoxLimits::from_joint_limits`] substitutes a
/// wrap-around default range for those.
///
/// [`BoxLimits::from_joint_limits`]: crate::constraint::BoxLimits::from_joint_limits
#[derive(Debug, Clone)]
pub struct JointLimit {
    /// Joint name as it appears in the robot description.
    pub name: String,
    /// Lower position bound, if specified.
    pub lower: Option<f64>,
    /// Upper position bound, if specified.
    pub upper: Option<f64>,
}

impl JointLimit {
    /// Creates limit metadata for a bounded joint.
    pub fn new(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            name: name.into(),
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    /// Creates limit metadata for a continuous (unbounded) joint.
    pub fn continuous(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lower: None,
            upper: None,
        }
    }
}

/// Fixed-angle robot state backed by a name/angle table.
///
/// Convenient for tests and for planners that snapshot joint angles before
/// reflecting constraints.
#[derive(Debug, Clone, Default)]
pub struct AngleTable {
    entries: Vec<(String, f64)>,
}

impl AngleTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the angle for a named joint, replacing any previous entry.
    pub fn set(&mut self, name: impl Into<String>, angle: f64) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = angle;
        } else {
            self.entries.push((name, angle));
        }
    }

    /// Builds a table from parallel name and angle sequences.
    pub fn from_pairs<I, N>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, f64)>,
        N: Into<String>,
    {
        let mut table = Self::new();
        for (name, angle) in pairs {
            table.set(name, angle);
        }
        table
    }

    /// Angles of the given joints, in order.
    pub fn angles(&self, names: &[String]) -> Option<DVector<f64>> {
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            out.push(self.joint_angle(name)?);
        }
        Some(DVector::from_vec(out))
    }
}

impl RobotState for AngleTable {
    fn joint_angle(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| *a)
    }
}
