//! Fitted router, its output matrix and persistence

use crate::error::{PrepError, Result};
use crate::prepare::harmonize;
use crate::preprocessing::{
    numeric_matrix, string_columns, ConstantStringImputer, Imputer, NumericImputer,
    OneHotEncoder, StandardScaler,
};
use crate::segmented::{segment_input, Status};
use chrono::{DateTime, Utc};
use ndarray::{concatenate, Array2, ArrayView1, ArrayView2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Learned statistics of one cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CellTransform {
    Numeric {
        imputer: NumericImputer,
        scaler: StandardScaler,
    },
    Categorical {
        imputer: ConstantStringImputer,
        encoder: OneHotEncoder,
    },
    Passthrough,
}

/// A fitted cell: its input columns, statistics and output names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedCell {
    name: String,
    columns: Vec<String>,
    transform: CellTransform,
    output_names: Vec<String>,
}

impl FittedCell {
    pub(crate) fn new(name: String, columns: Vec<String>, transform: CellTransform) -> Self {
        let local_names = match &transform {
            CellTransform::Categorical { encoder, .. } => encoder.feature_names(&columns),
            _ => columns.clone(),
        };
        let output_names = local_names
            .into_iter()
            .map(|n| format!("{}__{}", name, n))
            .collect();

        Self {
            name,
            columns,
            transform,
            output_names,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Input columns, in the order they were fitted
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn transform_kind(&self) -> &CellTransform {
        &self.transform
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        match &self.transform {
            CellTransform::Numeric { imputer, scaler } => {
                let x = numeric_matrix(df, &self.columns)?;
                scaler.transform(&imputer.transform(&x)?)
            }
            CellTransform::Categorical { imputer, encoder } => {
                let raw = string_columns(df, &self.columns)?;
                encoder.transform(&imputer.transform(&raw))
            }
            CellTransform::Passthrough => numeric_matrix(df, &self.columns),
        }
    }
}

/// Dense numeric output with one name per column
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    values: Array2<f64>,
    columns: Vec<String>,
}

impl FeatureMatrix {
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn into_values(self) -> Array2<f64> {
        self.values
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Values of a named output column
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|j| self.values.column(j))
    }

    /// Convert to a polars frame of Float64 columns
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .enumerate()
            .map(|(j, name)| Column::new(name.as_str().into(), self.values.column(j).to_vec()))
            .collect();
        Ok(DataFrame::new(columns)?)
    }
}

/// How raw rows were turned into the frame a router was fitted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InputPreparation {
    /// Feature preparation in harmonize mode
    #[default]
    Global,
    /// Rows of one status, segment exclusions dropped
    Segment(Status),
}

/// Router with learned statistics. Immutable: `transform` only reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedRouter {
    cells: Vec<FittedCell>,
    fitted_rows: usize,
    fitted_at: DateTime<Utc>,
    #[serde(default)]
    input: InputPreparation,
}

impl FittedRouter {
    pub(crate) fn new(cells: Vec<FittedCell>, fitted_rows: usize) -> Self {
        Self {
            cells,
            fitted_rows,
            fitted_at: Utc::now(),
            input: InputPreparation::Global,
        }
    }

    pub(crate) fn with_input(mut self, input: InputPreparation) -> Self {
        self.input = input;
        self
    }

    pub fn input(&self) -> InputPreparation {
        self.input
    }

    /// Turn raw rows into the frame this router expects.
    ///
    /// A segment router only keeps the rows of its own status.
    pub fn prepare_input(&self, df: &DataFrame) -> Result<DataFrame> {
        match self.input {
            InputPreparation::Global => harmonize(df),
            InputPreparation::Segment(status) => segment_input(status, df),
        }
    }

    pub fn cells(&self) -> &[FittedCell] {
        &self.cells
    }

    /// Look up a fitted cell by name
    pub fn cell(&self, name: &str) -> Option<&FittedCell> {
        self.cells.iter().find(|c| c.name == name)
    }

    /// Number of rows seen at fit time
    pub fn fitted_rows(&self) -> usize {
        self.fitted_rows
    }

    pub fn fitted_at(&self) -> DateTime<Utc> {
        self.fitted_at
    }

    /// Output column names, in output order
    pub fn feature_names(&self) -> Vec<String> {
        self.cells
            .iter()
            .flat_map(|c| c.output_names.iter().cloned())
            .collect()
    }

    pub fn n_features_out(&self) -> usize {
        self.cells.iter().map(|c| c.output_names.len()).sum()
    }

    /// Apply the learned statistics to a frame.
    ///
    /// Rows map 1:1 to the input. Every fitted column must be present;
    /// extra columns are ignored.
    pub fn transform(&self, df: &DataFrame) -> Result<FeatureMatrix> {
        let blocks = self
            .cells
            .iter()
            .map(|cell| cell.transform(df))
            .collect::<Result<Vec<_>>>()?;

        let values = if blocks.is_empty() {
            Array2::zeros((df.height(), 0))
        } else {
            let views: Vec<ArrayView2<'_, f64>> = blocks.iter().map(|b| b.view()).collect();
            concatenate(Axis(1), &views)?
        };

        Ok(FeatureMatrix {
            values,
            columns: self.feature_names(),
        })
    }

    /// Save the fitted router to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let artifact = PipelineArtifact {
            format_version: PipelineArtifact::FORMAT_VERSION,
            feature_names: self.feature_names(),
            router: self.clone(),
        };
        let json = serde_json::to_string_pretty(&artifact)?;
        std::fs::write(path.as_ref(), json)?;
        info!(path = %path.as_ref().display(), "Fitted router saved");
        Ok(())
    }

    /// Load a fitted router from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let artifact: PipelineArtifact = serde_json::from_str(&json)?;
        if artifact.format_version != PipelineArtifact::FORMAT_VERSION {
            return Err(PrepError::SerializationError(format!(
                "unsupported artifact version {} (expected {})",
                artifact.format_version,
                PipelineArtifact::FORMAT_VERSION
            )));
        }
        Ok(artifact.router)
    }
}

/// On-disk envelope of a fitted router
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineArtifact {
    pub format_version: u32,
    pub feature_names: Vec<String>,
    pub router: FittedRouter,
}

impl PipelineArtifact {
    pub const FORMAT_VERSION: u32 = 1;
}
