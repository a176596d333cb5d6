//! Global preprocessor
//!
//! One router over all rows. Columns that only make sense for one status are
//! imputed with fills that stay neutral for the other population; everything
//! else is shared. `Statut_encoded` and the numeric missingness flags are also
//! carried unchanged at the end of the output.
//!
//! Output is ordered cell by cell (shared numeric, shared categorical, then each
//! status's numeric and categorical cells), not all numeric blocks first.

use crate::error::Result;
use crate::preprocessing::RouterConfig;
use crate::router::{CellKind, ColumnRouter, FeatureMatrix, FittedRouter};
use crate::schema::{
    passthrough_flag_columns, ColumnRole, ColumnTable, NumericFill, Scope, STATUS_ENCODED_COLUMN,
};
use polars::prelude::*;

/// Columns meaningful only for active workers
pub const ACTIVE_ONLY_COLUMNS: [&str; 10] = [
    "Remuneration",
    "Emp_contract",
    "working_hours",
    "Job_dep",
    "COMPANY_CATEGORY",
    "Contract_type",
    "EMPLOYEE_COUNT",
    "JOB_CONDITION",
    "activity_sector",
    "distance_job_km",
];

/// Active-only numeric columns imputed from their nearest neighbours
pub const ACTIVE_KNN_COLUMNS: [&str; 3] = ["Remuneration", "working_hours", "distance_job_km"];

/// Columns meaningful only for retired workers
pub const RETIRED_ONLY_COLUMNS: [&str; 4] = [
    "retirement_pay",
    "Former_dep",
    "Former_emp_contract",
    "distance_former_km",
];

/// Retired-only numeric columns imputed from their nearest neighbours
pub const RETIRED_KNN_COLUMNS: [&str; 2] = ["retirement_pay", "distance_former_km"];

/// Cell names, in output order
pub mod cells {
    pub const SHARED_NUMERIC: &str = "shared_num";
    pub const SHARED_CATEGORICAL: &str = "shared_cat";
    pub const ACTIVE_KNN: &str = "active_num_knn";
    pub const ACTIVE_ZERO: &str = "active_num_zero";
    pub const ACTIVE_CATEGORICAL: &str = "active_cat";
    pub const RETIRED_KNN: &str = "retired_num_knn";
    pub const RETIRED_ZERO: &str = "retired_num_zero";
    pub const RETIRED_CATEGORICAL: &str = "retired_cat";
    pub const STATUS: &str = "status";
    pub const FLAGS: &str = "flags";
}

/// Classification of every column the global router knows about.
///
/// Kinds are left to detection, so a scoped column lands in the numeric or
/// categorical cell of its scope depending on its dtype.
pub fn global_table() -> ColumnTable {
    let mut table = ColumnTable::new();
    for (columns, knn, scope) in [
        (&ACTIVE_ONLY_COLUMNS[..], &ACTIVE_KNN_COLUMNS[..], Scope::Active),
        (&RETIRED_ONLY_COLUMNS[..], &RETIRED_KNN_COLUMNS[..], Scope::Retired),
    ] {
        for &name in columns {
            let fill = if knn.contains(&name) {
                NumericFill::Knn
            } else {
                NumericFill::Zero
            };
            table = table.with_column(name, ColumnRole::detected(scope, fill));
        }
    }

    table
        .with_unlisted_numeric(Scope::Shared, NumericFill::Median)
        .with_unlisted_categorical(Scope::Shared)
}

/// Build the unfitted global router
pub fn global_router(config: RouterConfig) -> ColumnRouter {
    let shared_fill = config.shared_fill.clone();
    let scoped_fill = config.scoped_fill.clone();

    ColumnRouter::new(global_table(), config)
        .with_cell(
            cells::SHARED_NUMERIC,
            CellKind::Numeric { scope: Scope::Shared, fill: NumericFill::Median },
        )
        .with_cell(
            cells::SHARED_CATEGORICAL,
            CellKind::Categorical { scope: Scope::Shared, fill_value: shared_fill },
        )
        .with_cell(
            cells::ACTIVE_KNN,
            CellKind::Numeric { scope: Scope::Active, fill: NumericFill::Knn },
        )
        .with_cell(
            cells::ACTIVE_ZERO,
            CellKind::Numeric { scope: Scope::Active, fill: NumericFill::Zero },
        )
        .with_cell(
            cells::ACTIVE_CATEGORICAL,
            CellKind::Categorical { scope: Scope::Active, fill_value: scoped_fill.clone() },
        )
        .with_cell(
            cells::RETIRED_KNN,
            CellKind::Numeric { scope: Scope::Retired, fill: NumericFill::Knn },
        )
        .with_cell(
            cells::RETIRED_ZERO,
            CellKind::Numeric { scope: Scope::Retired, fill: NumericFill::Zero },
        )
        .with_cell(
            cells::RETIRED_CATEGORICAL,
            CellKind::Categorical { scope: Scope::Retired, fill_value: scoped_fill },
        )
        .with_cell(
            cells::STATUS,
            CellKind::Passthrough { columns: vec![STATUS_ENCODED_COLUMN.to_string()] },
        )
        .with_cell(cells::FLAGS, CellKind::Passthrough { columns: passthrough_flag_columns() })
}

/// Global preprocessor over prepared features
#[derive(Debug, Clone)]
pub struct GlobalPreprocessor {
    router: ColumnRouter,
}

impl Default for GlobalPreprocessor {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl GlobalPreprocessor {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            router: global_router(config),
        }
    }

    pub fn router(&self) -> &ColumnRouter {
        &self.router
    }

    /// Fit on prepared features
    pub fn fit(&self, features: &DataFrame) -> Result<FittedRouter> {
        self.router.fit(features)
    }

    pub fn fit_transform(&self, features: &DataFrame) -> Result<(FittedRouter, FeatureMatrix)> {
        self.router.fit_transform(features)
    }
}
