//! Column transforms used by the routers
//!
//! Provides the building blocks the routers compose per cell:
//! - Missing value imputation (median, constant, k-nearest neighbours)
//! - Standard scaling
//! - One-hot encoding with an all-zero fallback for unseen categories
//! - Value coercion from polars columns to numeric matrices and string columns

mod config;
mod encoder;
mod imputer;
mod knn;
mod scaler;

pub use config::{RouterConfig, SCOPED_FILL, SEGMENT_FILL, SHARED_FILL};
pub use encoder::OneHotEncoder;
pub use imputer::{ConstantStringImputer, ImputeStrategy, SimpleImputer};
pub use knn::KnnImputer;
pub use scaler::{ScalerParams, StandardScaler};

use crate::error::{PrepError, Result};
use crate::schema::is_numeric_dtype;
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Trait for numeric imputers
pub trait Imputer: Send + Sync {
    /// Fit the imputer on data with missing values
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;

    /// Transform data by imputing missing values
    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Fit and transform in one step
    fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

/// Check if value is missing (NaN)
#[inline]
pub fn is_missing(v: f64) -> bool {
    v.is_nan()
}

/// Numeric imputer chosen by a cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NumericImputer {
    Simple(SimpleImputer),
    Knn(KnnImputer),
}

impl Imputer for NumericImputer {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        match self {
            NumericImputer::Simple(imputer) => imputer.fit(x),
            NumericImputer::Knn(imputer) => imputer.fit(x),
        }
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        match self {
            NumericImputer::Simple(imputer) => imputer.transform(x),
            NumericImputer::Knn(imputer) => imputer.transform(x),
        }
    }
}

/// Read a column as optional floats.
///
/// Numeric columns are cast; string columns are parsed value by value. Values
/// that fail to parse, nulls, NaN and infinities all become `None`.
pub fn numeric_values(column: &Column) -> Result<Vec<Option<f64>>> {
    let series = column.as_materialized_series();

    let values: Vec<Option<f64>> = if let DataType::String = series.dtype() {
        series
            .str()?
            .into_iter()
            .map(|v| v.and_then(|s| s.trim().parse::<f64>().ok()))
            .collect()
    } else {
        let casted = series.cast(&DataType::Float64)?;
        casted.f64()?.into_iter().collect()
    };

    Ok(values
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

/// Read a column as optional strings, keeping nulls as `None`
pub fn string_values(column: &Column) -> Result<Vec<Option<String>>> {
    let series = column.as_materialized_series();
    let casted = if let DataType::String = series.dtype() {
        series.clone()
    } else {
        series.cast(&DataType::String)?
    };

    let mut values: Vec<Option<String>> = casted
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();

    // A NaN float renders as "NaN"; treat it as absent like any other gap
    if let DataType::Float32 | DataType::Float64 = series.dtype() {
        for (value, original) in values.iter_mut().zip(numeric_values(column)?) {
            if original.is_none() {
                *value = None;
            }
        }
    }

    Ok(values)
}

/// Whether each value of a column is absent (null, or NaN for floats)
pub fn missing_mask(column: &Column) -> Result<Vec<bool>> {
    let series = column.as_materialized_series();
    if is_numeric_dtype(series.dtype()) {
        let casted = series.cast(&DataType::Float64)?;
        Ok(casted
            .f64()?
            .into_iter()
            .map(|v| v.map_or(true, f64::is_nan))
            .collect())
    } else {
        Ok(series.is_null().into_iter().map(|v| v.unwrap_or(true)).collect())
    }
}

/// Gather named columns into a row-major matrix, NaN for missing values
pub fn numeric_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let mut matrix = Array2::from_elem((n_rows, columns.len()), f64::NAN);

    for (j, name) in columns.iter().enumerate() {
        let column = df
            .column(name)
            .map_err(|_| PrepError::FeatureNotFound(name.clone()))?;
        for (i, value) in numeric_values(column)?.into_iter().enumerate() {
            if let Some(v) = value {
                matrix[[i, j]] = v;
            }
        }
    }

    Ok(matrix)
}

/// Gather named columns as optional strings, one vector per column
pub fn string_columns(df: &DataFrame, columns: &[String]) -> Result<Vec<Vec<Option<String>>>> {
    columns
        .iter()
        .map(|name| {
            let column = df
                .column(name)
                .map_err(|_| PrepError::FeatureNotFound(name.clone()))?;
            string_values(column)
        })
        .collect()
}
