//! Run configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration and a partial one overrides only what it names.
//!
//! # Example Config
//!
//! ```toml
//! time_budget_secs = 120
//! quota_tolerance = 1
//! allow_escape_path = true
//!
//! [weights]
//! fairness = 1.0
//! unmet_request = 5.0
//! escape_path = 1000.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, RosterError};

/// Settings of one rostering run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Wall-clock budget for the solve phase, in seconds.
    pub time_budget_secs: u64,
    /// Allowed deviation from each nurse's quota. 0 = exact.
    pub quota_tolerance: u32,
    /// Admit penalized off-cycle assignments for nurses whose cycle
    /// cannot reach their quota.
    pub allow_escape_path: bool,
    /// Soft-term weights.
    pub weights: ObjectiveWeights,
}

/// Weights of the soft objective terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveWeights {
    /// Per unit of deviation from the average shift count.
    pub fairness: f64,
    /// Per unmet work request or violated off request.
    pub unmet_request: f64,
    /// Per escape-path assignment.
    pub escape_path: f64,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            time_budget_secs: 60,
            quota_tolerance: 0,
            allow_escape_path: true,
            weights: ObjectiveWeights::default(),
        }
    }
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            fairness: 1.0,
            unmet_request: 5.0,
            escape_path: 1000.0,
        }
    }
}

impl RosterConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    /// [`RosterError::Config`] on malformed TOML or invalid values.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| RosterError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file.
    ///
    /// # Errors
    /// [`RosterError::Io`] if the file cannot be read, otherwise as
    /// [`RosterConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded roster config");
        Ok(config)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RosterError::Config(e.to_string()))
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.time_budget_secs == 0 {
            return Err(RosterError::Config("time_budget_secs must be positive".into()));
        }
        let w = &self.weights;
        for (name, value) in [
            ("fairness", w.fairness),
            ("unmet_request", w.unmet_request),
            ("escape_path", w.escape_path),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(RosterError::Config(format!(
                    "weights.{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Solve budget as a duration.
    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }

    /// Sets the time budget.
    pub fn with_time_budget_secs(mut self, secs: u64) -> Self {
        self.time_budget_secs = secs;
        self
    }

    /// Sets the quota tolerance.
    pub fn with_quota_tolerance(mut self, tolerance: u32) -> Self {
        self.quota_tolerance = tolerance;
        self
    }

    /// Enables or disables the escape path.
    pub fn with_escape_path(mut self, allow: bool) -> Self {
        self.allow_escape_path = allow;
        self
    }

    /// Replaces the objective weights.
    pub fn with_weights(mut self, weights: ObjectiveWeights) -> Self {
        self.weights = weights;
        self
    }
}
