//! Constraint evaluation for trajectory optimization.
//!
//! This crate provides the constraint layer of motionforge:
//! - The [`Constraint`](constraint::Constraint) contract: batched residual
//!   and Jacobian evaluation with a polarity tag and robot-state reflection.
//! - Concrete constraint variants: box limits, obstacle and self collision
//!   (geometric and learned), configuration and pose targets.
//! - The [`Composite`](constraint::Composite) combinator merging
//!   same-polarity constraints into one vector function.
//! - The [`Problem`](problem::Problem) descriptor with start and trajectory
//!   feasibility semantics.
//!
//! Forward kinematics, signed-distance geometry, and learned inference are
//! consumed through the traits in [`kinematics`]; concrete robots live
//! outside this crate.

pub mod constraint;
pub mod error;
pub mod kinematics;
pub mod problem;
pub mod robot;
pub mod trajectory;

pub use constraint::{Constraint, Evaluation, Polarity};
pub use error::CoreError;
pub use problem::{Problem, StartFeasibility};
pub use trajectory::Trajectory;
