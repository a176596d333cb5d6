//! KNN-based imputation

use crate::error::{PrepError, Result};
use crate::preprocessing::{is_missing, Imputer};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Ordered (distance, row) pair for neighbour selection
#[derive(Debug, Clone, Copy)]
struct DistanceIdx(f64, usize);

impl PartialEq for DistanceIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DistanceIdx {}

impl PartialOrd for DistanceIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DistanceIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        // Ties broken by training row order so results are deterministic
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

/// KNN imputer.
///
/// Each missing value is replaced by the uniform mean of that feature over the
/// `n_neighbors` closest training rows that observed it. Distances use the
/// NaN-aware euclidean metric: only coordinates present in both rows count,
/// and the sum is reweighted by `n_features / n_present`. When no training row
/// shares a coordinate with the receiver, the training mean of the feature is
/// used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnImputer {
    /// Number of neighbors
    n_neighbors: usize,
    /// Training rows, row-major; `None` marks a missing value
    fit_data: Vec<Option<f64>>,
    n_features: usize,
    /// Feature means for fallback
    feature_means: Vec<f64>,
    is_fitted: bool,
}

impl KnnImputer {
    /// Create new KNN imputer
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1),
            fit_data: Vec::new(),
            n_features: 0,
            feature_means: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    fn n_train(&self) -> usize {
        if self.n_features == 0 {
            0
        } else {
            self.fit_data.len() / self.n_features
        }
    }

    fn train_row(&self, i: usize) -> &[Option<f64>] {
        &self.fit_data[i * self.n_features..(i + 1) * self.n_features]
    }

    /// NaN-aware euclidean distance; `None` when no coordinate is shared
    fn distance(&self, sample: &[f64], row: &[Option<f64>]) -> Option<f64> {
        let mut present = 0usize;
        let mut accum = 0.0f64;

        for (&a, b) in sample.iter().zip(row) {
            if let Some(b) = b {
                if !is_missing(a) {
                    let d = a - b;
                    accum += d * d;
                    present += 1;
                }
            }
        }

        if present == 0 {
            return None;
        }
        let weight = sample.len() as f64 / present as f64;
        Some((weight * accum).sqrt())
    }

    /// Impute one feature from the donors that observed it
    fn impute_value(&self, sample: &[f64], feature_idx: usize) -> f64 {
        let mut donors: Vec<DistanceIdx> = (0..self.n_train())
            .filter_map(|i| {
                let row = self.train_row(i);
                row[feature_idx]?;
                self.distance(sample, row).map(|d| DistanceIdx(d, i))
            })
            .collect();

        if donors.is_empty() {
            return self.feature_means[feature_idx];
        }

        donors.sort_unstable();
        let neighbours = &donors[..self.n_neighbors.min(donors.len())];
        let sum: f64 = neighbours
            .iter()
            .filter_map(|&DistanceIdx(_, i)| self.train_row(i)[feature_idx])
            .sum();
        sum / neighbours.len() as f64
    }
}

impl Default for KnnImputer {
    fn default() -> Self {
        Self::new(5)
    }
}

impl Imputer for KnnImputer {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        self.n_features = x.ncols();
        self.fit_data = x
            .iter()
            .map(|&v| if is_missing(v) { None } else { Some(v) })
            .collect();

        self.feature_means = (0..self.n_features)
            .map(|j| {
                let observed: Vec<f64> = x.column(j).iter().copied().filter(|v| !is_missing(*v)).collect();
                if observed.is_empty() {
                    0.0
                } else {
                    observed.iter().sum::<f64>() / observed.len() as f64
                }
            })
            .collect();

        self.is_fitted = true;
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PrepError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(PrepError::ShapeError {
                expected: format!("{} columns", self.n_features),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut result = x.clone();
        let mut row_buf: Vec<f64> = Vec::with_capacity(self.n_features);

        for (row_idx, row) in x.rows().into_iter().enumerate() {
            if !row.iter().any(|&v| is_missing(v)) {
                continue;
            }

            // No coordinate to measure a distance with
            if row.iter().all(|&v| is_missing(v)) {
                for (j, &mean) in self.feature_means.iter().enumerate() {
                    result[[row_idx, j]] = mean;
                }
                continue;
            }

            row_buf.clear();
            row_buf.extend(row.iter().copied());

            for j in 0..self.n_features {
                if is_missing(row_buf[j]) {
                    result[[row_idx, j]] = self.impute_value(&row_buf, j);
                }
            }
        }

        Ok(result)
    }
}
