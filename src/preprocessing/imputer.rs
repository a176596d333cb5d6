//! Simple imputation strategies (median, numeric constant, string constant)

use crate::error::{PrepError, Result};
use crate::preprocessing::{is_missing, Imputer};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Strategy for imputing missing numeric values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with the median of the observed training values
    Median,
    /// Replace with a constant value
    Constant(f64),
}

/// Column-wise imputer over a numeric matrix (NaN marks a missing value)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleImputer {
    strategy: ImputeStrategy,
    fill_values: Vec<f64>,
    is_fitted: bool,
}

impl SimpleImputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: Vec::new(),
            is_fitted: false,
        }
    }

    /// Learned fill value per column
    pub fn fill_values(&self) -> &[f64] {
        &self.fill_values
    }

    fn compute_fill_value(&self, observed: &mut [f64]) -> f64 {
        match self.strategy {
            ImputeStrategy::Median => median(observed).unwrap_or(0.0),
            ImputeStrategy::Constant(val) => val,
        }
    }
}

impl Imputer for SimpleImputer {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        self.fill_values = x
            .axis_iter(Axis(1))
            .map(|column| {
                let mut observed: Vec<f64> =
                    column.iter().copied().filter(|v| !is_missing(*v)).collect();
                self.compute_fill_value(&mut observed)
            })
            .collect();
        self.is_fitted = true;
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PrepError::ModelNotFitted);
        }
        if x.ncols() != self.fill_values.len() {
            return Err(PrepError::ShapeError {
                expected: format!("{} columns", self.fill_values.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut result = x.clone();
        for (mut column, &fill) in result.axis_iter_mut(Axis(1)).zip(&self.fill_values) {
            column.mapv_inplace(|v| if is_missing(v) { fill } else { v });
        }
        Ok(result)
    }
}

/// Fill missing entries of string columns with a constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantStringImputer {
    fill_value: String,
}

impl ConstantStringImputer {
    pub fn new(fill_value: impl Into<String>) -> Self {
        Self {
            fill_value: fill_value.into(),
        }
    }

    pub fn fill_value(&self) -> &str {
        &self.fill_value
    }

    /// Replace every `None` with the fill value
    pub fn transform(&self, columns: &[Vec<Option<String>>]) -> Vec<Vec<String>> {
        columns
            .iter()
            .map(|values| {
                values
                    .iter()
                    .map(|v| v.clone().unwrap_or_else(|| self.fill_value.clone()))
                    .collect()
            })
            .collect()
    }
}

/// Median of the values, `None` when empty
fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
