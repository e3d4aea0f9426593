//! Configuration system for motionforge solvers.
//!
//! Load solver configuration from TOML or YAML files to control call
//! budgets, timeouts, and meta-solver parameters without code changes.
//!
//! # Examples
//!
//! Load configuration from a TOML string:
//!
//! ```
//! use motionforge_config::SolverConfig;
//! use std::time::Duration;
//!
//! let config = SolverConfig::from_toml_str(r#"
//!     max_calls = 500
//!     timeout_secs = 2.5
//!
//!     [racing]
//!     n_workers = 8
//! "#).unwrap();
//!
//! assert_eq!(config.max_calls, 500);
//! assert_eq!(config.timeout(), Some(Duration::from_millis(2500)));
//! assert_eq!(config.racing.n_workers, 8);
//! ```
//!
//! Use the defaults when no file is present:
//!
//! ```
//! use motionforge_config::SolverConfig;
//!
//! let config = SolverConfig::load("solver.toml").unwrap_or_default();
//! assert!(config.timeout().is_none());
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Shared solver configuration consumed by every concrete solver and by the
/// lifecycle wrapper.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SolverConfig {
    /// Maximum number of calls the solver may spend on one problem.
    #[serde(default = "default_max_calls")]
    pub max_calls: usize,

    /// Wall-clock timeout in seconds; `None` solves without a deadline.
    #[serde(default)]
    pub timeout_secs: Option<f64>,

    /// Base seed for reproducible solver randomness.
    #[serde(default)]
    pub random_seed: Option<u64>,

    /// Racing meta-solver parameters.
    #[serde(default)]
    pub racing: RacingConfig,

    /// Warm-start meta-solver parameters.
    #[serde(default)]
    pub warm_start: WarmStartConfig,
}

fn default_max_calls() -> usize {
    10_000
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_calls: default_max_calls(),
            timeout_secs: None,
            random_seed: None,
            racing: RacingConfig::default(),
            warm_start: WarmStartConfig::default(),
        }
    }
}

impl SolverConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration with the given timeout in seconds.
    pub fn with_timeout(mut self, secs: f64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file doesn't exist, contains invalid TOML,
    /// or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Timeout as a `Duration`, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs_f64)
    }

    /// Checks internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(timeout) = self.timeout_secs {
            if !timeout.is_finite() || timeout <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "timeout_secs must be positive and finite, got {timeout}"
                )));
            }
        }
        if self.max_calls == 0 {
            return Err(ConfigError::Invalid("max_calls must be at least 1".into()));
        }
        self.racing.validate()?;
        self.warm_start.validate()
    }
}

/// Parameters for the parallel racing meta-solver.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RacingConfig {
    /// Number of independent solver workers to race.
    #[serde(default = "default_n_workers")]
    pub n_workers: usize,
}

fn default_n_workers() -> usize {
    4
}

impl Default for RacingConfig {
    fn default() -> Self {
        Self {
            n_workers: default_n_workers(),
        }
    }
}

impl RacingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.n_workers == 0 {
            return Err(ConfigError::Invalid(
                "racing.n_workers must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Parameters for the nearest-neighbor warm-start meta-solver.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct WarmStartConfig {
    /// Number of nearest cases retrieved per query.
    #[serde(default = "default_knn")]
    pub knn: usize,

    /// Explicit infeasibility-prediction threshold; `None` calibrates one
    /// by leave-one-out cross-validation over the case base.
    #[serde(default)]
    pub infeasibility_threshold: Option<usize>,
}

fn default_knn() -> usize {
    1
}

impl Default for WarmStartConfig {
    fn default() -> Self {
        Self {
            knn: default_knn(),
            infeasibility_threshold: None,
        }
    }
}

impl WarmStartConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.knn == 0 {
            return Err(ConfigError::Invalid(
                "warm_start.knn must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
