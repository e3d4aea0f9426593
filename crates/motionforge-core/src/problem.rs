//! Problem descriptor and feasibility semantics.

use nalgebra::DVector;

use crate::constraint::{BoxLimits, Constraint, Polarity};
use crate::error::{CoreError, Result};
use crate::trajectory::{is_valid_motion_step, Trajectory};

/// Outcome of the start-feasibility check.
#[derive(Debug, Clone)]
pub struct StartFeasibility {
    /// True when the start state violates nothing.
    pub feasible: bool,
    /// Human-readable report enumerating each violated constraint; empty
    /// when feasible.
    pub report: String,
}

impl StartFeasibility {
    fn ok() -> Self {
        Self {
            feasible: true,
            report: String::new(),
        }
    }
}

/// Immutable description of one planning query.
///
/// Aggregates the start state, box bounds, the equality goal constraint,
/// optional global inequality/equality constraints, the admissible squared
/// goal residual, and the per-dimension motion-step resolution. Created once
/// per query and consumed read-only by solvers.
pub struct Problem {
    start: DVector<f64>,
    bounds: BoxLimits,
    goal: Box<dyn Constraint>,
    global_ineq: Option<Box<dyn Constraint>>,
    global_eq: Option<Box<dyn Constraint>>,
    admissible_goal_sq_err: f64,
    motion_step: MotionStep,
    skip_start_check: bool,
}

#[derive(Debug, Clone)]
enum MotionStep {
    Uniform(f64),
    PerDimension(DVector<f64>),
}

impl Problem {
    /// Default admissible squared residual for goal satisfaction.
    pub const DEFAULT_GOAL_TOLERANCE: f64 = 1e-6;

    /// Default uniform motion-step resolution.
    pub const DEFAULT_MOTION_STEP: f64 = 0.1;

    /// Creates a problem from its mandatory parts.
    ///
    /// Fails unless the goal constraint is an equality.
    pub fn new(start: DVector<f64>, bounds: BoxLimits, goal: Box<dyn Constraint>) -> Result<Self> {
        if goal.polarity() != Polarity::Equality {
            return Err(CoreError::Polarity {
                expected: Polarity::Equality,
                found: goal.polarity(),
                label: goal.label(),
            });
        }
        if start.len() != bounds.dim() {
            return Err(CoreError::Dimension(format!(
                "start has {} entries, bounds are {}-dimensional",
                start.len(),
                bounds.dim()
            )));
        }
        Ok(Self {
            start,
            bounds,
            goal,
            global_ineq: None,
            global_eq: None,
            admissible_goal_sq_err: Self::DEFAULT_GOAL_TOLERANCE,
            motion_step: MotionStep::Uniform(Self::DEFAULT_MOTION_STEP),
            skip_start_check: false,
        })
    }

    /// Attaches the global inequality constraint.
    pub fn with_global_ineq(mut self, constraint: Box<dyn Constraint>) -> Result<Self> {
        if constraint.polarity() != Polarity::Inequality {
            return Err(CoreError::Polarity {
                expected: Polarity::Inequality,
                found: constraint.polarity(),
                label: constraint.label(),
            });
        }
        self.global_ineq = Some(constraint);
        Ok(self)
    }

    /// Attaches the global equality constraint.
    pub fn with_global_eq(mut self, constraint: Box<dyn Constraint>) -> Result<Self> {
        if constraint.polarity() != Polarity::Equality {
            return Err(CoreError::Polarity {
                expected: Polarity::Equality,
                found: constraint.polarity(),
                label: constraint.label(),
            });
        }
        self.global_eq = Some(constraint);
        Ok(self)
    }

    /// Overrides the admissible squared goal residual.
    pub fn with_goal_tolerance(mut self, sq_err: f64) -> Self {
        self.admissible_goal_sq_err = sq_err;
        self
    }

    /// Sets a uniform motion-step resolution broadcast over all dimensions.
    pub fn with_motion_step(mut self, step: f64) -> Self {
        self.motion_step = MotionStep::Uniform(step);
        self
    }

    /// Sets an explicit per-dimension motion-step resolution.
    pub fn with_motion_step_vector(mut self, step: DVector<f64>) -> Self {
        self.motion_step = MotionStep::PerDimension(step);
        self
    }

    /// Disables the start-feasibility check. Debug escape hatch only.
    pub fn skipping_start_check(mut self) -> Self {
        self.skip_start_check = true;
        self
    }

    /// Start configuration.
    pub fn start(&self) -> &DVector<f64> {
        &self.start
    }

    /// Box bounds on the configuration.
    pub fn bounds(&self) -> &BoxLimits {
        &self.bounds
    }

    /// Equality goal constraint.
    pub fn goal(&self) -> &dyn Constraint {
        &*self.goal
    }

    /// Global inequality constraint, if any.
    pub fn global_ineq(&self) -> Option<&dyn Constraint> {
        self.global_ineq.as_deref()
    }

    /// Global equality constraint, if any.
    pub fn global_eq(&self) -> Option<&dyn Constraint> {
        self.global_eq.as_deref()
    }

    /// Admissible squared goal residual.
    pub fn goal_tolerance(&self) -> f64 {
        self.admissible_goal_sq_err
    }

    /// True iff a global equality constraint is present.
    pub fn is_constrained(&self) -> bool {
        self.global_eq.is_some()
    }

    /// Per-dimension motion-step resolution, scalar broadcast as needed.
    pub fn motion_step(&self) -> DVector<f64> {
        match &self.motion_step {
            MotionStep::Uniform(step) => DVector::from_element(self.start.len(), *step),
            MotionStep::PerDimension(step) => step.clone(),
        }
    }

    /// Checks that the start state lies strictly inside the box bounds and
    /// is accepted by the global inequality constraint.
    ///
    /// When the inequality constraint is a composite, each violated member
    /// is reported individually.
    pub fn check_start_feasibility(&self) -> StartFeasibility {
        if self.skip_start_check {
            return StartFeasibility::ok();
        }

        let mut violations = Vec::new();
        if !self
            .start
            .iter()
            .zip(self.bounds.ub().iter())
            .all(|(q, ub)| q < ub)
        {
            violations.push("start violates BoxLimits upper bound".to_string());
        }
        if !self
            .start
            .iter()
            .zip(self.bounds.lb().iter())
            .all(|(q, lb)| q > lb)
        {
            violations.push("start violates BoxLimits lower bound".to_string());
        }

        if let Some(ineq) = &self.global_ineq {
            if !ineq.satisfied_at(&self.start) {
                let members = ineq.members();
                if members.is_empty() {
                    violations.push(format!("start violates {}", ineq.label()));
                } else {
                    for member in members {
                        if !member.satisfied_at(&self.start) {
                            violations.push(format!("start violates {}", member.label()));
                        }
                    }
                }
            }
        }

        StartFeasibility {
            feasible: violations.is_empty(),
            report: violations.join(", "),
        }
    }

    /// Checks whether a trajectory solves this problem.
    ///
    /// The final waypoint must satisfy the goal within tolerance, every
    /// waypoint must strictly satisfy the global inequality constraint, and
    /// every consecutive pair must pass the motion-step validity check.
    /// Equality-constraint adherence at interior waypoints is not checked:
    /// verifying manifold adherence between waypoints is out of scope.
    pub fn is_satisfied(&self, trajectory: &Trajectory) -> bool {
        let (goal_residual, _) = self.goal.evaluate_single(trajectory.last(), false);
        if goal_residual.norm_squared() > self.admissible_goal_sq_err {
            return false;
        }

        if let Some(ineq) = &self.global_ineq {
            let eval = ineq.evaluate(&trajectory.as_batch(), false);
            if !eval.values.iter().all(|v| *v > 0.0) {
                return false;
            }

            let step = self.motion_step();
            for pair in trajectory.waypoints().windows(2) {
                if !is_valid_motion_step(&step, &pair[0], &pair[1], &**ineq) {
                    return false;
                }
            }
        }

        true
    }
}
