//! Feature preparation
//!
//! One routine covers both training data and unseen data. It derives the
//! missingness flags and the status encoding, coerces the numeric columns that
//! arrive as text, removes non-feature columns and extracts the target. What
//! differs between the two uses is captured by [`PrepareOptions`].

use crate::error::{PrepError, Result};
use crate::preprocessing::{missing_mask, numeric_values, string_values};
use crate::schema::{
    has_column, missing_flag_name, CATEGORICAL_GAP_COLUMNS, COERCED_NUMERIC_COLUMNS, ID_COLUMN,
    NUMERIC_GAP_COLUMNS, PREPARE_EXCLUDED_COLUMNS, STATUS_ACTIVE, STATUS_COLUMN,
    STATUS_ENCODED_COLUMN, TARGET_COLUMN, TARGET_NEGATIVE, TARGET_POSITIVE,
};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// What to do with a target label other than "L" or "T"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnknownTarget {
    /// Keep the row with a missing label
    #[default]
    Missing,
    /// Fail with [`PrepError::InvalidTarget`]
    Reject,
}

/// Preparation options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareOptions {
    /// Extract and encode the target column when present
    pub has_target: bool,
    /// Re-append the identifier column at the end of the features
    pub retain_identifier: bool,
    pub unknown_target: UnknownTarget,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self::training()
    }
}

impl PrepareOptions {
    /// Labelled training data
    pub fn training() -> Self {
        Self {
            has_target: true,
            retain_identifier: false,
            unknown_target: UnknownTarget::Missing,
        }
    }

    /// Unseen data: no label expected, identifier kept for joining predictions
    pub fn harmonize() -> Self {
        Self {
            has_target: false,
            retain_identifier: true,
            unknown_target: UnknownTarget::Missing,
        }
    }

    pub fn with_unknown_target(mut self, policy: UnknownTarget) -> Self {
        self.unknown_target = policy;
        self
    }
}

/// Encoded binary labels, `None` where the label is missing or unknown
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Labels(Vec<Option<u8>>);

impl Labels {
    pub fn new(values: Vec<Option<u8>>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Option<u8>] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of rows without a usable label
    pub fn missing_count(&self) -> usize {
        self.0.iter().filter(|v| v.is_none()).count()
    }

    /// Labels as floats, NaN where missing
    pub fn to_array(&self) -> Array1<f64> {
        self.0
            .iter()
            .map(|v| v.map(f64::from).unwrap_or(f64::NAN))
            .collect()
    }
}

/// Output of [`prepare`]
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// Input with derived and coerced columns, nothing removed
    pub enriched: DataFrame,
    /// Feature columns only
    pub features: DataFrame,
    /// Encoded target, when requested and present
    pub target: Option<Labels>,
}

/// Prepare a raw frame for routing.
///
/// Fails with [`PrepError::MissingColumn`] when `Statut` or any of the gap
/// columns is absent. Excluded columns that are already gone are ignored, so
/// running this on its own output succeeds.
pub fn prepare(df: &DataFrame, options: &PrepareOptions) -> Result<PreparedData> {
    require_columns(df)?;

    let mut enriched = df.clone();

    // Flags must see the values as they arrived
    for name in NUMERIC_GAP_COLUMNS.into_iter().chain(CATEGORICAL_GAP_COLUMNS) {
        let mask = missing_mask(df.column(name)?)?;
        let flags: Vec<i64> = mask.iter().map(|&m| i64::from(m)).collect();
        let missing = flags.iter().sum::<i64>();
        debug!(column = name, missing, "Missingness flag derived");
        enriched.with_column(Series::new(missing_flag_name(name).into(), flags))?;
    }

    let status = string_values(df.column(STATUS_COLUMN)?)?;
    let encoded: Vec<i64> = status
        .iter()
        .map(|v| i64::from(v.as_deref() == Some(STATUS_ACTIVE)))
        .collect();
    enriched.with_column(Series::new(STATUS_ENCODED_COLUMN.into(), encoded))?;

    for name in COERCED_NUMERIC_COLUMNS {
        let column = df.column(name)?;
        let before = missing_mask(column)?;
        let values = numeric_values(column)?;
        let unparsed = before
            .iter()
            .zip(&values)
            .filter(|(was_missing, v)| !**was_missing && v.is_none())
            .count();
        if unparsed > 0 {
            warn!(column = name, unparsed, "Unparseable values coerced to missing");
        }
        enriched.with_column(Series::new(name.into(), values))?;
    }

    let mut features = enriched.clone();
    for name in PREPARE_EXCLUDED_COLUMNS {
        if has_column(&features, name) {
            features.drop_in_place(name)?;
        }
    }

    let target = if options.has_target {
        match df.column(TARGET_COLUMN) {
            Ok(column) => Some(encode_target(column, options.unknown_target)?),
            Err(_) => {
                debug!("No target column, labels skipped");
                None
            }
        }
    } else {
        None
    };

    if options.retain_identifier {
        if let Ok(id) = df.column(ID_COLUMN) {
            features.with_column(id.clone())?;
        }
    }

    info!(
        rows = df.height(),
        features = features.width(),
        labelled = target.as_ref().map(|t| t.len() - t.missing_count()),
        "Features prepared"
    );

    Ok(PreparedData {
        enriched,
        features,
        target,
    })
}

/// Prepare unseen data: features only, identifier appended last
pub fn harmonize(df: &DataFrame) -> Result<DataFrame> {
    Ok(prepare(df, &PrepareOptions::harmonize())?.features)
}

fn require_columns(df: &DataFrame) -> Result<()> {
    let required = std::iter::once(STATUS_COLUMN)
        .chain(NUMERIC_GAP_COLUMNS)
        .chain(CATEGORICAL_GAP_COLUMNS);

    for name in required {
        if !has_column(df, name) {
            return Err(PrepError::MissingColumn(name.to_string()));
        }
    }
    Ok(())
}

/// Map "L" to 0 and "T" to 1
pub fn encode_target(column: &Column, policy: UnknownTarget) -> Result<Labels> {
    let raw = string_values(column)?;
    let mut labels = Vec::with_capacity(raw.len());
    let mut unknown = 0usize;

    for (row, value) in raw.into_iter().enumerate() {
        let label = match value.as_deref() {
            Some(TARGET_NEGATIVE) => Some(0),
            Some(TARGET_POSITIVE) => Some(1),
            other => {
                if policy == UnknownTarget::Reject {
                    return Err(PrepError::InvalidTarget {
                        row,
                        value: other.unwrap_or("null").to_string(),
                    });
                }
                unknown += 1;
                None
            }
        };
        labels.push(label);
    }

    if unknown > 0 {
        warn!(unknown, "Target labels outside {{L, T}} kept as missing");
    }

    Ok(Labels(labels))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> DataFrame {
        df!(
            "Unique_id" => &[1i64, 2, 3],
            "Statut" => &["Actif", "Retraité", "Autre"],
            "target" => &[Some("L"), Some("T"), Some("U")],
            "Remuneration" => &[None, Some("2100.5"), Some("n/a")],
            "distance_job_km" => &[Some(3.0), None, Some(1.0)],
            "retirement_pay" => &[None, Some("900"), None],
            "distance_former_km" => &[None, Some(12.0), None],
            "working_hours" => &[35.0, 0.0, 20.0],
            "Emp_contract" => &[Some("CDI"), None, Some("CDD")],
            "COMPANY_CATEGORY" => &[Some("PME"), None, None],
            "EMPLOYEE_COUNT" => &[Some("10-49"), None, None],
            "Contract_type" => &[Some("Temps plein"), None, None],
            "activity_sector" => &[Some("C"), None, None],
            "JOB_CONDITION" => &[Some("A"), None, None],
            "Job_dep" => &[Some("75"), None, Some("13")],
            "Former_dep" => &[None, Some("69"), None],
            "Former_emp_contract" => &[None, Some("CDI"), None],
            "Region" => &["IDF", "ARA", "PACA"],
        )
        .unwrap()
    }

    fn int_column(df: &DataFrame, name: &str) -> Vec<i64> {
        df.column(name)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap())
            .collect()
    }

    #[test]
    fn test_flags_follow_original_values() {
        let prepared = prepare(&raw(), &PrepareOptions::training()).unwrap();
        let f = &prepared.features;

        // "n/a" was present: not flagged, but coerced to missing
        assert_eq!(int_column(f, "Remuneration_missing"), vec![1, 0, 0]);
        assert_eq!(int_column(f, "distance_job_km_missing"), vec![0, 1, 0]);
        assert_eq!(int_column(f, "Former_dep_missing"), vec![1, 0, 1]);
        let remuneration: Vec<Option<f64>> =
            f.column("Remuneration").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(remuneration, vec![None, Some(2100.5), None]);
    }

    #[test]
    fn test_status_encoding_is_exact() {
        let prepared = prepare(&raw(), &PrepareOptions::training()).unwrap();
        assert_eq!(int_column(&prepared.features, "Statut_encoded"), vec![1, 0, 0]);
    }

    #[test]
    fn test_exclusions_and_target() {
        let prepared = prepare(&raw(), &PrepareOptions::training()).unwrap();
        for name in ["Unique_id", "target", "Region"] {
            assert!(!has_column(&prepared.features, name));
            assert!(has_column(&prepared.enriched, name));
        }
        let target = prepared.target.unwrap();
        assert_eq!(target.values(), &[Some(0), Some(1), None]);
        assert_eq!(target.missing_count(), 1);
    }

    #[test]
    fn test_reject_unknown_target() {
        let options = PrepareOptions::training().with_unknown_target(UnknownTarget::Reject);
        let err = prepare(&raw(), &options).unwrap_err();
        assert!(matches!(err, PrepError::InvalidTarget { row: 2, ref value } if value == "U"));
    }

    #[test]
    fn test_harmonize_appends_identifier() {
        let mut df = raw();
        df.drop_in_place("target").unwrap();
        let features = harmonize(&df).unwrap();
        let names = features.get_column_names();
        assert_eq!(names.last().unwrap().as_str(), "Unique_id");
    }

    #[test]
    fn test_missing_status_is_fatal() {
        let mut df = raw();
        df.drop_in_place("Statut").unwrap();
        let err = prepare(&df, &PrepareOptions::training()).unwrap_err();
        assert!(matches!(err, PrepError::MissingColumn(name) if name == "Statut"));
    }

    #[test]
    fn test_prepare_twice() {
        let first = prepare(&raw(), &PrepareOptions::training()).unwrap();
        let second = prepare(&first.features, &PrepareOptions::training()).unwrap();
        assert!(second.target.is_none());
        assert_eq!(first.features.width(), second.features.width());
    }
}
