// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Solver configuration loaded from TOML.
//!
//! Every field has a default, so an empty document is a valid configuration:
//!
//! ```
//! use premia_solver::config::{BounderKind, SolverConfig};
//! use std::time::Duration;
//!
//! let config = SolverConfig::from_toml_str(r#"
//!     [termination]
//!     time_limit_secs = 30
//!     node_limit = 1000000
//!
//!     [search]
//!     bounder = "independent"
//!     branching = "most_constrained"
//!
//!     [execution]
//!     threads = 4
//! "#).unwrap();
//!
//! assert_eq!(config.time_limit(), Some(Duration::from_secs(30)));
//! assert_eq!(config.search.bounder, BounderKind::Independent);
//! assert!(config.execution.decompose);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Relaxation used to bound partial selections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BounderKind {
    /// Multiple-choice knapsack relaxation over the global budgets.
    #[default]
    Knapsack,
    /// Best locally feasible reward per entity; ignores global budgets.
    Independent,
}

impl std::fmt::Display for BounderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BounderKind::Knapsack => write!(f, "knapsack"),
            BounderKind::Independent => write!(f, "independent"),
        }
    }
}

/// Order in which entities are branched on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchingKind {
    #[default]
    Declaration,
    MostConstrained,
}

impl std::fmt::Display for BranchingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BranchingKind::Declaration => write!(f, "declaration"),
            BranchingKind::MostConstrained => write!(f, "most_constrained"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TerminationConfig {
    /// Wall-clock limit for the whole solve, in seconds.
    pub time_limit_secs: Option<f64>,
    /// Search nodes shared by all components.
    pub node_limit: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    pub bounder: BounderKind,
    pub branching: BranchingKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Split the instance into independent components before searching.
    pub decompose: bool,
    /// Solve components on several threads.
    pub parallel: bool,
    /// Worker threads; defaults to the available parallelism.
    pub threads: Option<usize>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            decompose: true,
            parallel: true,
            threads: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Interval between search progress events; `None` disables them.
    pub progress_interval_secs: Option<f64>,
}

/// Complete solver configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverConfig {
    pub termination: TerminationConfig,
    pub search: SearchConfig,
    pub execution: ExecutionConfig,
    pub logging: LoggingConfig,
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and validates configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the value ranges serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(secs) = self.termination.time_limit_secs {
            check_seconds("termination.time_limit_secs", secs)?;
        }
        if let Some(secs) = self.logging.progress_interval_secs {
            check_seconds("logging.progress_interval_secs", secs)?;
        }
        if self.execution.threads == Some(0) {
            return Err(ConfigError::Invalid(
                "execution.threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_time_limit_secs(mut self, seconds: f64) -> Self {
        self.termination.time_limit_secs = Some(seconds);
        self
    }

    pub fn with_node_limit(mut self, limit: u64) -> Self {
        self.termination.node_limit = Some(limit);
        self
    }

    pub fn with_bounder(mut self, bounder: BounderKind) -> Self {
        self.search.bounder = bounder;
        self
    }

    pub fn with_branching(mut self, branching: BranchingKind) -> Self {
        self.search.branching = branching;
        self
    }

    pub fn with_decompose(mut self, decompose: bool) -> Self {
        self.execution.decompose = decompose;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.execution.parallel = parallel;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.execution.threads = Some(threads);
        self
    }

    pub fn with_progress_interval_secs(mut self, seconds: f64) -> Self {
        self.logging.progress_interval_secs = Some(seconds);
        self
    }

    /// Returns the time limit as a `Duration`.
    pub fn time_limit(&self) -> Option<Duration> {
        self.termination
            .time_limit_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Returns the progress log interval as a `Duration`.
    pub fn progress_interval(&self) -> Option<Duration> {
        self.logging
            .progress_interval_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

fn check_seconds(field: &str, secs: f64) -> Result<(), ConfigError> {
    if secs.is_finite() && secs >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{} must be a non-negative number of seconds, got {}",
            field, secs
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = SolverConfig::from_toml_str("").unwrap();
        assert_eq!(config, SolverConfig::default());
        assert_eq!(config.search.bounder, BounderKind::Knapsack);
        assert_eq!(config.search.branching, BranchingKind::Declaration);
        assert!(config.execution.decompose);
        assert!(config.execution.parallel);
        assert_eq!(config.time_limit(), None);
        assert_eq!(config.progress_interval(), None);
    }

    #[test]
    fn test_toml_parsing() {
        let toml = r#"
            [termination]
            time_limit_secs = 2.5
            node_limit = 500

            [search]
            bounder = "independent"
            branching = "most_constrained"

            [execution]
            decompose = false
            parallel = false
            threads = 2

            [logging]
            progress_interval_secs = 1
        "#;

        let config = SolverConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.time_limit(), Some(Duration::from_millis(2500)));
        assert_eq!(config.termination.node_limit, Some(500));
        assert_eq!(config.search.bounder, BounderKind::Independent);
        assert_eq!(config.search.branching, BranchingKind::MostConstrained);
        assert!(!config.execution.decompose);
        assert!(!config.execution.parallel);
        assert_eq!(config.execution.threads, Some(2));
        assert_eq!(config.progress_interval(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_unknown_bounder_is_a_toml_error() {
        let err = SolverConfig::from_toml_str("[search]\nbounder = \"simplex\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_negative_time_limit_is_invalid() {
        let err =
            SolverConfig::from_toml_str("[termination]\ntime_limit_secs = -1.0\n").unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("termination.time_limit_secs")),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_threads_is_invalid() {
        let err = SolverConfig::from_toml_str("[execution]\nthreads = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_builder_methods() {
        let config = SolverConfig::new()
            .with_time_limit_secs(10.0)
            .with_node_limit(42)
            .with_bounder(BounderKind::Independent)
            .with_branching(BranchingKind::MostConstrained)
            .with_decompose(false)
            .with_parallel(false)
            .with_threads(3)
            .with_progress_interval_secs(0.5);

        assert_eq!(config.time_limit(), Some(Duration::from_secs(10)));
        assert_eq!(config.termination.node_limit, Some(42));
        assert_eq!(config.execution.threads, Some(3));
        assert_eq!(config.progress_interval(), Some(Duration::from_millis(500)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serializes_back_to_toml() {
        let config = SolverConfig::new().with_node_limit(7);
        let text = toml::to_string(&config).unwrap();
        let parsed = SolverConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(BounderKind::Knapsack.to_string(), "knapsack");
        assert_eq!(BranchingKind::MostConstrained.to_string(), "most_constrained");
    }
}
