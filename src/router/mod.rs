//! Column router
//!
//! A [`ColumnRouter`] pairs a [`ColumnTable`] with an ordered list of cells.
//! At fit time the table is resolved against the training frame, every
//! resolved column lands in the first cell matching its `(kind, scope, fill)`,
//! and each cell fits its own imputer and scaler or encoder. Fitting returns a
//! [`FittedRouter`]; the router itself is never mutated, so refitting always
//! produces a fresh fitted instance.

mod fitted;

pub use fitted::{
    CellTransform, FeatureMatrix, FittedCell, FittedRouter, InputPreparation, PipelineArtifact,
};

use crate::error::Result;
use crate::preprocessing::{
    numeric_matrix, string_columns, ConstantStringImputer, ImputeStrategy, Imputer, KnnImputer,
    NumericImputer, OneHotEncoder, RouterConfig, SimpleImputer, StandardScaler,
};
use crate::schema::{has_column, ColumnKind, ColumnTable, NumericFill, ResolvedColumn, Scope};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// What a cell selects and how it transforms it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellKind {
    /// Impute with `fill`, then standardize
    Numeric { scope: Scope, fill: NumericFill },
    /// Coerce to string, fill gaps with `fill_value`, then one-hot encode
    Categorical { scope: Scope, fill_value: String },
    /// Copy the listed columns unchanged
    Passthrough { columns: Vec<String> },
}

impl CellKind {
    fn accepts(&self, column: &ResolvedColumn) -> bool {
        match self {
            CellKind::Numeric { scope, fill } => {
                column.kind == ColumnKind::Numeric && column.scope == *scope && column.fill == *fill
            }
            CellKind::Categorical { scope, .. } => {
                column.kind == ColumnKind::Categorical && column.scope == *scope
            }
            CellKind::Passthrough { .. } => false,
        }
    }
}

/// A named cell of the router layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSpec {
    pub name: String,
    pub kind: CellKind,
}

/// Columns a cell receives for a given frame
#[derive(Debug, Clone, PartialEq)]
pub struct CellPlan {
    pub name: String,
    pub kind: CellKind,
    pub columns: Vec<String>,
}

/// Unfitted column router
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnRouter {
    table: ColumnTable,
    cells: Vec<CellSpec>,
    config: RouterConfig,
}

impl ColumnRouter {
    /// Create a router with no cells
    pub fn new(table: ColumnTable, config: RouterConfig) -> Self {
        Self {
            table,
            cells: Vec::new(),
            config,
        }
    }

    /// Append a cell; output order follows insertion order
    pub fn with_cell(mut self, name: impl Into<String>, kind: CellKind) -> Self {
        self.cells.push(CellSpec {
            name: name.into(),
            kind,
        });
        self
    }

    pub fn table(&self) -> &ColumnTable {
        &self.table
    }

    pub fn cells(&self) -> &[CellSpec] {
        &self.cells
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Assign the columns of `df` to cells.
    ///
    /// Each resolved column goes to the first matching routed cell; a column
    /// matching no cell is left out. Passthrough cells keep the listed columns
    /// present in the frame.
    pub fn plan(&self, df: &DataFrame) -> Vec<CellPlan> {
        let resolved = self.table.resolve(df);
        let mut taken = vec![false; resolved.len()];
        let mut plans = Vec::with_capacity(self.cells.len());

        for cell in &self.cells {
            let mut columns = Vec::new();
            match &cell.kind {
                CellKind::Passthrough { columns: listed } => {
                    columns.extend(listed.iter().filter(|c| has_column(df, c)).cloned());
                }
                kind => {
                    for (i, column) in resolved.iter().enumerate() {
                        if !taken[i] && kind.accepts(column) {
                            taken[i] = true;
                            columns.push(column.name.clone());
                        }
                    }
                }
            }
            plans.push(CellPlan {
                name: cell.name.clone(),
                kind: cell.kind.clone(),
                columns,
            });
        }

        plans
    }

    /// Fit every non-empty cell on `df`
    pub fn fit(&self, df: &DataFrame) -> Result<FittedRouter> {
        let start = Instant::now();
        self.config.validate()?;

        let mut cells = Vec::new();
        for plan in self.plan(df) {
            if plan.columns.is_empty() {
                debug!(cell = %plan.name, "Cell has no columns, skipped");
                continue;
            }
            debug!(cell = %plan.name, columns = ?plan.columns, "Fitting cell");
            cells.push(self.fit_cell(df, plan)?);
        }

        let fitted = FittedRouter::new(cells, df.height());
        info!(
            rows = df.height(),
            cells = fitted.cells().len(),
            outputs = fitted.n_features_out(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Router fitted"
        );
        Ok(fitted)
    }

    /// Fit on `df` and transform it in one step
    pub fn fit_transform(&self, df: &DataFrame) -> Result<(FittedRouter, FeatureMatrix)> {
        let fitted = self.fit(df)?;
        let matrix = fitted.transform(df)?;
        Ok((fitted, matrix))
    }

    fn fit_cell(&self, df: &DataFrame, plan: CellPlan) -> Result<FittedCell> {
        let transform = match &plan.kind {
            CellKind::Numeric { fill, .. } => {
                let x = numeric_matrix(df, &plan.columns)?;
                let mut imputer = match fill {
                    NumericFill::Median => {
                        NumericImputer::Simple(SimpleImputer::new(ImputeStrategy::Median))
                    }
                    NumericFill::Zero => NumericImputer::Simple(SimpleImputer::new(
                        ImputeStrategy::Constant(self.config.zero_fill),
                    )),
                    NumericFill::Knn => {
                        NumericImputer::Knn(KnnImputer::new(self.config.n_neighbors))
                    }
                };
                let imputed = imputer.fit_transform(&x)?;
                let mut scaler = StandardScaler::new();
                scaler.fit(&imputed)?;
                CellTransform::Numeric { imputer, scaler }
            }
            CellKind::Categorical { fill_value, .. } => {
                let raw = string_columns(df, &plan.columns)?;
                let imputer = ConstantStringImputer::new(fill_value.clone());
                let mut encoder = OneHotEncoder::new();
                encoder.fit(&imputer.transform(&raw))?;
                CellTransform::Categorical { imputer, encoder }
            }
            CellKind::Passthrough { .. } => CellTransform::Passthrough,
        };

        Ok(FittedCell::new(plan.name, plan.columns, transform))
    }
}
