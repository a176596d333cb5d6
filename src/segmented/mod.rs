//! Segmented preprocessor
//!
//! Rows are split by status and each population gets its own router, fitted
//! only on its own rows. The two fitted routers never share statistics and
//! their outputs are not merged.

use crate::error::{PrepError, Result};
use crate::prepare::{encode_target, Labels, UnknownTarget};
use crate::preprocessing::RouterConfig;
use crate::router::{CellKind, ColumnRouter, FeatureMatrix, FittedRouter, InputPreparation};
use crate::schema::{
    has_column, ColumnRole, ColumnTable, NumericFill, Scope, STATUS_ACTIVE,
    STATUS_COLUMN, STATUS_RETIRED, SEGMENT_EXCLUDED_COLUMNS, TARGET_COLUMN,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Cell names shared by both segment routers
pub mod cells {
    pub const KNN: &str = "knn_impute";
    pub const ZERO: &str = "zero_impute";
    pub const CATEGORICAL: &str = "cat";
}

/// Worker population
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Active,
    Retired,
}

impl Status {
    /// Value of the `Statut` column selecting this population
    pub fn label(&self) -> &'static str {
        match self {
            Status::Active => STATUS_ACTIVE,
            Status::Retired => STATUS_RETIRED,
        }
    }

    fn scope(&self) -> Scope {
        match self {
            Status::Active => Scope::Active,
            Status::Retired => Scope::Retired,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rows of each population; rows with any other status are in neither
#[derive(Debug, Clone)]
pub struct StatusSplit {
    pub active: DataFrame,
    pub retired: DataFrame,
}

/// Split rows by exact status match
pub fn split_by_status(df: &DataFrame) -> Result<StatusSplit> {
    let status = df
        .column(STATUS_COLUMN)
        .map_err(|_| PrepError::MissingColumn(STATUS_COLUMN.to_string()))?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let status = status.str()?;

    let active = df.filter(&status.equal(STATUS_ACTIVE))?;
    let retired = df.filter(&status.equal(STATUS_RETIRED))?;

    let dropped = df.height() - active.height() - retired.height();
    if dropped > 0 {
        debug!(dropped, "Rows with another status left out of both segments");
    }

    Ok(StatusSplit { active, retired })
}

/// Column table of one population
pub fn segment_table(status: Status) -> ColumnTable {
    let scope = status.scope();
    let (knn, zero, categorical): (&[&str], &[&str], &[&str]) = match status {
        Status::Active => (
            &["Remuneration", "working_hours"],
            &["distance_job_km"],
            &[
                "COMPANY_CATEGORY",
                "EMPLOYEE_COUNT",
                "JOB_CONDITION",
                "activity_sector",
                "Emp_contract",
            ],
        ),
        Status::Retired => (
            &["retirement_pay"],
            &["distance_former_km"],
            &["Former_emp_contract", "Former_job_42"],
        ),
    };

    ColumnTable::new()
        .with_columns(knn.iter().copied(), ColumnRole::numeric(scope, NumericFill::Knn))
        .with_columns(zero.iter().copied(), ColumnRole::numeric(scope, NumericFill::Zero))
        .with_columns(categorical.iter().copied(), ColumnRole::categorical(scope))
        .with_unlisted_categorical(scope)
}

/// Build the unfitted router of one population
pub fn segment_router(status: Status, config: RouterConfig) -> ColumnRouter {
    let scope = status.scope();
    let fill_value = config.segment_fill.clone();

    ColumnRouter::new(segment_table(status), config)
        .with_cell(cells::KNN, CellKind::Numeric { scope, fill: NumericFill::Knn })
        .with_cell(cells::ZERO, CellKind::Numeric { scope, fill: NumericFill::Zero })
        .with_cell(cells::CATEGORICAL, CellKind::Categorical { scope, fill_value })
}

/// Features, labels and router of one population
#[derive(Debug, Clone)]
pub struct Segment {
    pub status: Status,
    pub features: DataFrame,
    pub target: Option<Labels>,
    pub router: ColumnRouter,
}

impl Segment {
    pub fn fit(&self) -> Result<FittedRouter> {
        if self.features.height() == 0 {
            return Err(PrepError::EmptySegment(self.status.to_string()));
        }
        info!(segment = %self.status, rows = self.features.height(), "Fitting segment");
        let fitted = self.router.fit(&self.features)?;
        Ok(fitted.with_input(InputPreparation::Segment(self.status)))
    }

    pub fn fit_transform(&self) -> Result<(FittedRouter, FeatureMatrix)> {
        let fitted = self.fit()?;
        let matrix = fitted.transform(&self.features)?;
        Ok((fitted, matrix))
    }
}

/// Both population pipelines, unfitted
#[derive(Debug, Clone)]
pub struct SegmentedPipelines {
    pub active: Segment,
    pub retired: Segment,
}

/// Fitted routers of both populations
#[derive(Debug, Clone)]
pub struct FittedSegments {
    pub active: FittedRouter,
    pub retired: FittedRouter,
}

impl SegmentedPipelines {
    /// Split `df` and set up one pipeline per population
    pub fn build(df: &DataFrame, config: &RouterConfig) -> Result<Self> {
        let split = split_by_status(df)?;
        info!(
            active = split.active.height(),
            retired = split.retired.height(),
            "Rows split by status"
        );

        Ok(Self {
            active: build_segment(Status::Active, &split.active, config)?,
            retired: build_segment(Status::Retired, &split.retired, config)?,
        })
    }

    /// Fit each router on its own rows
    pub fn fit(&self) -> Result<FittedSegments> {
        Ok(FittedSegments {
            active: self.active.fit()?,
            retired: self.retired.fit()?,
        })
    }
}

fn build_segment(status: Status, rows: &DataFrame, config: &RouterConfig) -> Result<Segment> {
    let target = match rows.column(TARGET_COLUMN) {
        Ok(column) => Some(encode_target(column, UnknownTarget::Missing)?),
        Err(_) => None,
    };

    Ok(Segment {
        status,
        features: segment_features(rows)?,
        target,
        router: segment_router(status, config.clone()),
    })
}

/// Rows of one status from a raw frame, shaped like the segment's fit input
pub fn segment_input(status: Status, df: &DataFrame) -> Result<DataFrame> {
    let split = split_by_status(df)?;
    let rows = match status {
        Status::Active => split.active,
        Status::Retired => split.retired,
    };
    debug!(segment = %status, rows = rows.height(), "Segment rows selected");
    segment_features(&rows)
}

fn segment_features(rows: &DataFrame) -> Result<DataFrame> {
    let mut features = rows.clone();
    for name in SEGMENT_EXCLUDED_COLUMNS {
        if has_column(&features, name) {
            features.drop_in_place(name)?;
        }
    }
    stringify_categoricals(features)
}

/// Cast categorical columns to plain strings, nulls kept
fn stringify_categoricals(mut df: DataFrame) -> Result<DataFrame> {
    let categorical: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|c| matches!(c.dtype(), DataType::Categorical(_, _)))
        .map(|c| c.name().to_string())
        .collect();

    for name in categorical {
        let casted = df.column(&name)?.cast(&DataType::String)?;
        df.with_column(casted)?;
    }
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> DataFrame {
        df!(
            "Unique_id" => &[1i64, 2, 3, 4, 5],
            "Statut" => &["Actif", "Retraité", "Actif", "Autre", "Retraité"],
            "target" => &["L", "T", "T", "L", "L"],
            "Region" => &["a", "b", "c", "d", "e"],
            "Remuneration" => &[Some(1800.0), None, None, Some(1.0), None],
            "working_hours" => &[Some(35.0), None, Some(20.0), None, None],
            "distance_job_km" => &[None, None, Some(4.0), None, None],
            "Emp_contract" => &[Some("CDI"), None, None, None, None],
            "sex" => &["F", "M", "M", "F", "F"],
            "retirement_pay" => &[None, Some(900.0), None, None, Some(1200.0)],
            "distance_former_km" => &[None, Some(3.0), None, None, None],
            "Former_emp_contract" => &[None, Some("CDI"), None, None, Some("CDD")],
            "age" => &[40i64, 70, 30, 50, 65],
        )
        .unwrap()
    }

    #[test]
    fn test_split_is_disjoint() {
        let split = split_by_status(&raw()).unwrap();
        let ids = |df: &DataFrame| -> Vec<i64> {
            df.column("Unique_id").unwrap().i64().unwrap().into_no_null_iter().collect()
        };
        assert_eq!(ids(&split.active), vec![1, 3]);
        assert_eq!(ids(&split.retired), vec![2, 5]);
    }

    #[test]
    fn test_segment_layout() {
        let pipelines = SegmentedPipelines::build(&raw(), &RouterConfig::default()).unwrap();
        assert!(!has_column(&pipelines.active.features, "Region"));
        assert_eq!(pipelines.active.target.as_ref().unwrap().values(), &[Some(0), Some(1)]);

        let plans = pipelines.active.router.plan(&pipelines.active.features);
        assert_eq!(plans[0].columns, vec!["Remuneration", "working_hours"]);
        assert_eq!(plans[1].columns, vec!["distance_job_km"]);
        // unlisted numeric "age" is dropped; unlisted strings follow the listed ones
        assert_eq!(plans[2].columns, vec!["Emp_contract", "Statut", "sex", "Former_emp_contract"]);
    }

    #[test]
    fn test_segments_fit_independently() {
        let pipelines = SegmentedPipelines::build(&raw(), &RouterConfig::default()).unwrap();
        let fitted = pipelines.fit().unwrap();

        let retired_names = fitted.retired.feature_names();
        assert!(retired_names.contains(&"cat__Former_emp_contract_CDD".to_string()));
        assert!(!fitted
            .active
            .feature_names()
            .contains(&"cat__Former_emp_contract_CDD".to_string()));
        assert_eq!(fitted.active.fitted_rows(), 2);
        assert_eq!(fitted.retired.fitted_rows(), 2);
    }

    #[test]
    fn test_segment_router_prepares_raw_rows() {
        let pipelines = SegmentedPipelines::build(&raw(), &RouterConfig::default()).unwrap();
        let fitted = pipelines.fit().unwrap();
        assert_eq!(fitted.retired.input(), InputPreparation::Segment(Status::Retired));

        let input = fitted.retired.prepare_input(&raw()).unwrap();
        assert_eq!(input.height(), 2);
        assert!(!has_column(&input, "Unique_id"));

        let matrix = fitted.retired.transform(&input).unwrap();
        assert_eq!(matrix.nrows(), 2);
        assert_eq!(matrix.ncols(), fitted.retired.n_features_out());
    }

    #[test]
    fn test_empty_segment() {
        let df = raw().head(Some(1));
        let pipelines = SegmentedPipelines::build(&df, &RouterConfig::default()).unwrap();
        let err = pipelines.fit().unwrap_err();
        assert!(matches!(err, PrepError::EmptySegment(s) if s == "Retraité"));
    }
}
