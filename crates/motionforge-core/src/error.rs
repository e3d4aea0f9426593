//! Error types for motionforge-core.

use thiserror::Error;

use crate::constraint::Polarity;

/// Main error type for constraint and problem construction.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A composite or problem slot received a constraint of the wrong polarity.
    #[error("expected {expected:?} constraint, got {found:?} ({label})")]
    Polarity {
        expected: Polarity,
        found: Polarity,
        label: &'static str,
    },

    /// A composite was built from an empty member list.
    #[error("composite constraint requires at least one member")]
    EmptyComposite,

    /// A kinematics map did not carry the feature count a constraint requires.
    #[error("{label} requires exactly {expected} tracked features, map has {found}")]
    FeatureCount {
        label: &'static str,
        expected: usize,
        found: usize,
    },

    /// Mismatched vector/matrix dimensions at construction.
    #[error("dimension mismatch: {0}")]
    Dimension(String),

    /// Reflection asked for a joint the robot state does not expose.
    #[error("robot state has no joint named {0:?}")]
    UnknownJoint(String),
}

/// Result type alias for motionforge-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
