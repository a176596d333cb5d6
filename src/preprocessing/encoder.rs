//! One-hot encoding

use crate::error::{PrepError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// One-hot encoder over string columns.
///
/// Categories are learned per column and kept sorted. A value never seen
/// during fitting encodes as an all-zero block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    // One sorted vocabulary per input column
    categories: Vec<Vec<String>>,
    is_fitted: bool,
}

impl OneHotEncoder {
    /// Create a new encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn the vocabulary of each column
    pub fn fit(&mut self, columns: &[Vec<String>]) -> Result<&mut Self> {
        self.categories = columns
            .iter()
            .map(|values| {
                values
                    .iter()
                    .cloned()
                    .collect::<BTreeSet<String>>()
                    .into_iter()
                    .collect()
            })
            .collect();

        self.is_fitted = true;
        Ok(self)
    }

    /// Encode the columns into a dense 0/1 matrix
    pub fn transform(&self, columns: &[Vec<String>]) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PrepError::ModelNotFitted);
        }
        if columns.len() != self.categories.len() {
            return Err(PrepError::ShapeError {
                expected: format!("{} columns", self.categories.len()),
                actual: format!("{} columns", columns.len()),
            });
        }

        let n_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        let mut result = Array2::zeros((n_rows, self.n_outputs()));
        let mut offset = 0usize;
        let mut unknown = 0usize;

        for (values, vocabulary) in columns.iter().zip(&self.categories) {
            if values.len() != n_rows {
                return Err(PrepError::ShapeError {
                    expected: format!("{} rows", n_rows),
                    actual: format!("{} rows", values.len()),
                });
            }
            let index: HashMap<&str, usize> = vocabulary
                .iter()
                .enumerate()
                .map(|(i, c)| (c.as_str(), i))
                .collect();

            for (row, value) in values.iter().enumerate() {
                match index.get(value.as_str()) {
                    Some(&i) => result[[row, offset + i]] = 1.0,
                    None => unknown += 1,
                }
            }
            offset += vocabulary.len();
        }

        if unknown > 0 {
            warn!(unknown, "Unseen categories encoded as all-zero vectors");
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, columns: &[Vec<String>]) -> Result<Array2<f64>> {
        self.fit(columns)?;
        self.transform(columns)
    }

    /// Learned vocabularies, one per input column
    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories
    }

    /// Width of the encoded output
    pub fn n_outputs(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    /// Output names `<column>_<category>`
    pub fn feature_names(&self, input_names: &[String]) -> Vec<String> {
        input_names
            .iter()
            .zip(&self.categories)
            .flat_map(|(name, vocabulary)| {
                vocabulary.iter().map(move |category| format!("{}_{}", name, category))
            })
            .collect()
    }
}
