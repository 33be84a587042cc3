//! Engine configuration.
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! yield_threshold_ms = 1
//! slice_budget_ms = 16
//! max_units_per_slice = 64
//! overlap = "reject"
//! transactional_commit = true
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// What to do with a render request that arrives mid-traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Keep the latest request and start it right after the current commit.
    #[default]
    Queue,
    /// Refuse the request with [`crate::Error::RenderInFlight`].
    Reject,
}

/// Tuning knobs for the work loop and the committer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Yield once the slice has less than this many milliseconds left.
    pub yield_threshold_ms: u64,
    /// Slice length granted by the bundled drivers.
    pub slice_budget_ms: u64,
    /// Hard cap on units per slice, independent of the deadline.
    pub max_units_per_slice: Option<usize>,
    /// Handling of overlapping render requests.
    pub overlap: OverlapPolicy,
    /// Validate the whole commit plan before touching the host tree.
    pub transactional_commit: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            yield_threshold_ms: 1,
            slice_budget_ms: 16,
            max_units_per_slice: None,
            overlap: OverlapPolicy::Queue,
            transactional_commit: true,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading engine config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn yield_threshold(&self) -> Duration {
        Duration::from_millis(self.yield_threshold_ms)
    }

    pub fn slice_budget(&self) -> Duration {
        Duration::from_millis(self.slice_budget_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.max_units_per_slice == Some(0) {
            return Err(crate::Error::Config(
                "max_units_per_slice must be at least 1".to_string(),
            ));
        }
        if self.slice_budget_ms < self.yield_threshold_ms {
            return Err(crate::Error::Config(format!(
                "slice_budget_ms ({}) is shorter than yield_threshold_ms ({})",
                self.slice_budget_ms, self.yield_threshold_ms
            )));
        }
        Ok(())
    }
}
