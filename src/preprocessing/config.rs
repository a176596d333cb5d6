//! Router configuration

use crate::error::{PrepError, Result};
use serde::{Deserialize, Serialize};

/// Fill literal for shared categorical columns
pub const SHARED_FILL: &str = "Non renseigné";
/// Fill literal for status-specific categorical columns in the global router
pub const SCOPED_FILL: &str = "Inconnu";
/// Fill literal for categorical columns in the segmented routers
pub const SEGMENT_FILL: &str = "Non concerné";

/// Parameters shared by the global and segmented routers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Neighbours averaged by the KNN imputer
    pub n_neighbors: usize,

    /// Constant used for missing shared categorical values
    pub shared_fill: String,

    /// Constant used for missing active-only / retired-only categorical values
    pub scoped_fill: String,

    /// Constant used for missing categorical values inside a status segment
    pub segment_fill: String,

    /// Constant used by zero-fill numeric cells
    pub zero_fill: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            shared_fill: SHARED_FILL.to_string(),
            scoped_fill: SCOPED_FILL.to_string(),
            segment_fill: SEGMENT_FILL.to_string(),
            zero_fill: 0.0,
        }
    }
}

impl RouterConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the KNN neighbour count
    pub fn with_n_neighbors(mut self, n_neighbors: usize) -> Self {
        self.n_neighbors = n_neighbors;
        self
    }

    /// Builder method to set the shared categorical fill
    pub fn with_shared_fill(mut self, value: impl Into<String>) -> Self {
        self.shared_fill = value.into();
        self
    }

    /// Builder method to set the scoped categorical fill
    pub fn with_scoped_fill(mut self, value: impl Into<String>) -> Self {
        self.scoped_fill = value.into();
        self
    }

    /// Builder method to set the segment categorical fill
    pub fn with_segment_fill(mut self, value: impl Into<String>) -> Self {
        self.segment_fill = value.into();
        self
    }

    /// Builder method to set the numeric zero-fill constant
    pub fn with_zero_fill(mut self, value: f64) -> Self {
        self.zero_fill = value;
        self
    }

    /// Reject configurations the routers cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.n_neighbors == 0 {
            return Err(PrepError::ConfigError(
                "n_neighbors must be at least 1".to_string(),
            ));
        }
        if !self.zero_fill.is_finite() {
            return Err(PrepError::ConfigError(format!(
                "zero_fill must be finite, got {}",
                self.zero_fill
            )));
        }
        Ok(())
    }
}
