//! Fixed dataset schema
//!
//! Column names, status and target literals, and the exclusion lists used by
//! feature preparation and segmentation. The routing policy itself lives in
//! [`ColumnTable`], a declarative mapping from column name to role.

mod table;

pub use table::{ColumnKind, ColumnRole, ColumnTable, NumericFill, ResolvedColumn, Scope};

use polars::prelude::*;

/// Row identifier
pub const ID_COLUMN: &str = "Unique_id";
/// Worker status, one of [`STATUS_ACTIVE`] or [`STATUS_RETIRED`]
pub const STATUS_COLUMN: &str = "Statut";
/// Binary label column
pub const TARGET_COLUMN: &str = "target";
/// Derived status flag
pub const STATUS_ENCODED_COLUMN: &str = "Statut_encoded";

pub const STATUS_ACTIVE: &str = "Actif";
pub const STATUS_RETIRED: &str = "Retraité";

/// Target label encoded as 0
pub const TARGET_NEGATIVE: &str = "L";
/// Target label encoded as 1
pub const TARGET_POSITIVE: &str = "T";

/// Suffix of derived missingness flags
pub const MISSING_SUFFIX: &str = "_missing";

/// Numeric columns known to have gaps; their flags are passed through by the
/// global router.
pub const NUMERIC_GAP_COLUMNS: [&str; 4] = [
    "Remuneration",
    "distance_job_km",
    "retirement_pay",
    "distance_former_km",
];

/// Categorical columns known to have gaps
pub const CATEGORICAL_GAP_COLUMNS: [&str; 9] = [
    "Emp_contract",
    "COMPANY_CATEGORY",
    "EMPLOYEE_COUNT",
    "Contract_type",
    "activity_sector",
    "JOB_CONDITION",
    "Job_dep",
    "Former_dep",
    "Former_emp_contract",
];

/// Columns forced to numeric during preparation
pub const COERCED_NUMERIC_COLUMNS: [&str; 2] = ["Remuneration", "retirement_pay"];

/// Non-feature columns removed by preparation
pub const PREPARE_EXCLUDED_COLUMNS: [&str; 9] = [
    ID_COLUMN,
    TARGET_COLUMN,
    "job_desc_n1",
    "job_desc_n2",
    "Activity_type",
    "Region",
    "Job_categor",
    "retirement_age",
    "former_job_42",
];

/// Non-feature columns removed from each status segment
pub const SEGMENT_EXCLUDED_COLUMNS: [&str; 8] = [
    ID_COLUMN,
    TARGET_COLUMN,
    "Job_categor",
    "Region",
    "job_42_regroupe",
    "job_desc_n2",
    "retirement_age",
    "former_job_42",
];

/// Name of the missingness flag derived from `column`
pub fn missing_flag_name(column: &str) -> String {
    format!("{}{}", column, MISSING_SUFFIX)
}

/// Flags carried unchanged by the global router
pub fn passthrough_flag_columns() -> Vec<String> {
    NUMERIC_GAP_COLUMNS.iter().map(|c| missing_flag_name(c)).collect()
}

/// Check whether the frame has a column
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Check if dtype is numeric
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if dtype holds categories (strings or polars categoricals)
pub fn is_categorical_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String | DataType::Categorical(_, _))
}

/// Detect the kind of a column from its actual dtype
pub fn detect_kind(dtype: &DataType) -> Option<ColumnKind> {
    if is_numeric_dtype(dtype) {
        Some(ColumnKind::Numeric)
    } else if is_categorical_dtype(dtype) {
        Some(ColumnKind::Categorical)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_flag_name() {
        assert_eq!(missing_flag_name("Remuneration"), "Remuneration_missing");
    }

    #[test]
    fn test_passthrough_flags() {
        let flags = passthrough_flag_columns();
        assert_eq!(
            flags,
            vec![
                "Remuneration_missing",
                "distance_job_km_missing",
                "retirement_pay_missing",
                "distance_former_km_missing",
            ]
        );
    }

    #[test]
    fn test_detect_kind() {
        assert_eq!(detect_kind(&DataType::Int64), Some(ColumnKind::Numeric));
        assert_eq!(detect_kind(&DataType::Float32), Some(ColumnKind::Numeric));
        assert_eq!(detect_kind(&DataType::String), Some(ColumnKind::Categorical));
        assert_eq!(detect_kind(&DataType::Boolean), None);
    }
}
