//! Integration test: preparation, global routing and segmentation end-to-end

use polars::prelude::*;
use statut_prep::global::{cells, GlobalPreprocessor};
use statut_prep::prepare::{prepare, PrepareOptions, UnknownTarget};
use statut_prep::preprocessing::{
    numeric_matrix, Imputer, KnnImputer, NumericImputer, RouterConfig, StandardScaler,
};
use statut_prep::router::CellTransform;
use statut_prep::segmented::{split_by_status, SegmentedPipelines};
use statut_prep::PrepError;

fn raw_dataset() -> DataFrame {
    df!(
        "Unique_id" => &[1i64, 2, 3, 4, 5, 6, 7, 8],
        "Statut" => &["Actif", "Actif", "Actif", "Retraité", "Retraité", "Actif", "Retraité", "Chômeur"],
        "target" => &["L", "T", "L", "T", "L", "T", "L", "U"],
        "Remuneration" => &[Some("2100"), None, Some("1850.5"), None, None, Some("abc"), None, Some("1200")],
        "distance_job_km" => &[Some(5.0), Some(12.0), None, None, None, Some(3.0), None, Some(8.0)],
        "retirement_pay" => &[None, None, None, Some("1500"), Some("980"), None, None, None],
        "distance_former_km" => &[None, None, None, Some(20.0), None, None, Some(7.5), None],
        "working_hours" => &[Some(35.0), Some(20.0), Some(39.0), None, None, Some(28.0), None, Some(10.0)],
        "Emp_contract" => &[Some("CDI"), Some("CDD"), None, None, None, Some("CDI"), None, None],
        "COMPANY_CATEGORY" => &[Some("PME"), Some("GE"), Some("PME"), None, None, Some("ETI"), None, None],
        "EMPLOYEE_COUNT" => &[Some("10-49"), Some("500+"), None, None, None, Some("50-249"), None, None],
        "Contract_type" => &[Some("Plein"), Some("Partiel"), Some("Plein"), None, None, Some("Plein"), None, None],
        "activity_sector" => &[Some("C"), Some("G"), Some("C"), None, None, Some("M"), None, None],
        "JOB_CONDITION" => &[Some("A"), Some("B"), Some("A"), None, None, Some("A"), None, None],
        "Job_dep" => &[Some("75"), Some("13"), Some("69"), None, None, Some("2A"), None, None],
        "Former_dep" => &[None, None, None, Some("33"), Some("59"), None, Some("31"), None],
        "Former_emp_contract" => &[None, None, None, Some("CDI"), Some("CDD"), None, Some("CDI"), None],
        "Former_job_42" => &[None, None, None, Some("Cadre"), Some("Ouvrier"), None, Some("Employé"), None],
        "sex" => &["F", "M", "F", "M", "F", "M", "F", "M"],
        "age" => &[34i64, 45, 29, 67, 71, 52, 69, 40],
        "Region" => &["IDF", "PACA", "ARA", "IDF", "BRE", "COR", "OCC", "IDF"],
        "job_desc_n1" => &["a", "b", "c", "d", "e", "f", "g", "h"],
        "job_desc_n2" => &["a", "b", "c", "d", "e", "f", "g", "h"],
        "Activity_type" => &["x", "y", "x", "y", "x", "y", "x", "y"],
        "Job_categor" => &["p", "q", "p", "q", "p", "q", "p", "q"],
        "retirement_age" => &[None, None, None, Some(62i64), Some(64), None, Some(60), None],
        "former_job_42" => &["1", "2", "3", "4", "5", "6", "7", "8"],
        "job_42_regroupe" => &["i", "j", "i", "j", "i", "j", "i", "j"],
    )
    .unwrap()
}

fn ints(df: &DataFrame, name: &str) -> Vec<i64> {
    df.column(name).unwrap().i64().unwrap().into_no_null_iter().collect()
}

#[test]
fn test_flags_reflect_original_absence() {
    let raw = raw_dataset();
    let prepared = prepare(&raw, &PrepareOptions::training()).unwrap();

    for name in ["Remuneration", "distance_job_km", "retirement_pay", "distance_former_km"] {
        let expected: Vec<i64> = raw
            .column(name)
            .unwrap()
            .is_null()
            .into_no_null_iter()
            .map(i64::from)
            .collect();
        assert_eq!(ints(&prepared.features, &format!("{}_missing", name)), expected, "{}", name);
    }

    // "abc" was present, so it is not flagged even though coercion drops it
    assert_eq!(ints(&prepared.features, "Remuneration_missing")[5], 0);
    assert!(prepared.features.column("Remuneration").unwrap().f64().unwrap().get(5).is_none());
}

#[test]
fn test_status_encoded_exact_match() {
    let prepared = prepare(&raw_dataset(), &PrepareOptions::training()).unwrap();
    assert_eq!(
        ints(&prepared.features, "Statut_encoded"),
        vec![1, 1, 1, 0, 0, 1, 0, 0]
    );
}

#[test]
fn test_preparation_is_idempotent() {
    let first = prepare(&raw_dataset(), &PrepareOptions::training()).unwrap();
    let second = prepare(&first.features, &PrepareOptions::training()).unwrap();
    assert_eq!(
        first.features.get_column_names(),
        second.features.get_column_names()
    );
    assert_eq!(first.features.height(), second.features.height());
}

#[test]
fn test_unknown_target_policies() {
    let prepared = prepare(&raw_dataset(), &PrepareOptions::training()).unwrap();
    let target = prepared.target.unwrap();
    assert_eq!(&target.values()[..3], &[Some(0), Some(1), Some(0)]);
    assert_eq!(target.values()[7], None);
    assert!(target.to_array()[7].is_nan());

    let strict = PrepareOptions::training().with_unknown_target(UnknownTarget::Reject);
    match prepare(&raw_dataset(), &strict) {
        Err(PrepError::InvalidTarget { row, value }) => {
            assert_eq!(row, 7);
            assert_eq!(value, "U");
        }
        other => panic!("expected InvalidTarget, got {:?}", other.map(|p| p.features.width())),
    }
}

#[test]
fn test_global_transform_is_pure() {
    let prepared = prepare(&raw_dataset(), &PrepareOptions::training()).unwrap();
    let fitted = GlobalPreprocessor::default().fit(&prepared.features).unwrap();
    let snapshot = serde_json::to_string(&fitted).unwrap();

    let first = fitted.transform(&prepared.features).unwrap();
    let second = fitted.transform(&prepared.features).unwrap();

    assert_eq!(first, second);
    assert_eq!(snapshot, serde_json::to_string(&fitted).unwrap());
    assert_eq!(first.nrows(), 8);
    assert!(first.values().iter().all(|v| v.is_finite()));
}

#[test]
fn test_global_output_layout() {
    let prepared = prepare(&raw_dataset(), &PrepareOptions::training()).unwrap();
    let (fitted, matrix) = GlobalPreprocessor::default()
        .fit_transform(&prepared.features)
        .unwrap();

    let order: Vec<&str> = fitted.cells().iter().map(|c| c.name()).collect();
    assert_eq!(
        order,
        vec![
            cells::SHARED_NUMERIC,
            cells::SHARED_CATEGORICAL,
            cells::ACTIVE_KNN,
            cells::ACTIVE_CATEGORICAL,
            cells::RETIRED_KNN,
            cells::RETIRED_CATEGORICAL,
            cells::STATUS,
            cells::FLAGS,
        ]
    );

    let flags: Vec<&str> = matrix.columns()[matrix.ncols() - 4..]
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(
        flags,
        vec![
            "flags__Remuneration_missing",
            "flags__distance_job_km_missing",
            "flags__retirement_pay_missing",
            "flags__distance_former_km_missing",
        ]
    );

    // passthrough keeps raw values
    let status = matrix.column("status__Statut_encoded").unwrap().to_vec();
    assert_eq!(status, vec![1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
}

#[test]
fn test_unseen_category_maps_to_zero_block() {
    let prepared = prepare(&raw_dataset(), &PrepareOptions::training()).unwrap();
    let fitted = GlobalPreprocessor::default().fit(&prepared.features).unwrap();

    let mut unseen = prepared.features.clone();
    unseen
        .with_column(Series::new("sex".into(), vec!["X"; unseen.height()]))
        .unwrap();
    let matrix = fitted.transform(&unseen).unwrap();

    let sex_block: Vec<usize> = matrix
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, name)| name.starts_with("shared_cat__sex_"))
        .map(|(j, _)| j)
        .collect();
    assert_eq!(sex_block.len(), 2);
    for j in sex_block {
        assert!(matrix.values().column(j).iter().all(|&v| v == 0.0));
    }
}

#[test]
fn test_missing_active_remuneration_uses_knn() {
    let prepared = prepare(&raw_dataset(), &PrepareOptions::training()).unwrap();
    assert_eq!(ints(&prepared.features, "Remuneration_missing")[1], 1);
    assert_eq!(ints(&prepared.features, "Statut_encoded")[1], 1);

    let (fitted, matrix) = GlobalPreprocessor::default()
        .fit_transform(&prepared.features)
        .unwrap();

    let cell = fitted.cell(cells::ACTIVE_KNN).unwrap();
    assert!(cell.columns().iter().any(|c| c == "Remuneration"));
    assert!(matches!(
        cell.transform_kind(),
        CellTransform::Numeric { imputer: NumericImputer::Knn(_), .. }
    ));

    let x = numeric_matrix(&prepared.features, cell.columns()).unwrap();
    let mut knn = KnnImputer::new(5);
    let imputed = knn.fit_transform(&x).unwrap();
    let expected = StandardScaler::new().fit_transform(&imputed).unwrap();
    let j = cell.columns().iter().position(|c| c == "Remuneration").unwrap();

    let actual = matrix.column("active_num_knn__Remuneration").unwrap();
    assert!((actual[1] - expected[[1, j]]).abs() < 1e-12);
}

#[test]
fn test_split_covers_known_statuses_only() {
    let raw = raw_dataset();
    let split = split_by_status(&raw).unwrap();

    let mut ids = ints(&split.active, "Unique_id");
    let retired = ints(&split.retired, "Unique_id");
    assert!(ids.iter().all(|id| !retired.contains(id)));

    ids.extend(retired);
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn test_segmented_pipelines_fit() {
    let pipelines = SegmentedPipelines::build(&raw_dataset(), &RouterConfig::default()).unwrap();
    assert_eq!(pipelines.active.features.height(), 4);
    assert_eq!(pipelines.retired.features.height(), 3);

    let (active, active_matrix) = pipelines.active.fit_transform().unwrap();
    let (retired, retired_matrix) = pipelines.retired.fit_transform().unwrap();

    assert_eq!(active_matrix.nrows(), 4);
    assert_eq!(retired_matrix.nrows(), 3);
    assert!(active_matrix.values().iter().all(|v| v.is_finite()));
    assert!(retired_matrix.values().iter().all(|v| v.is_finite()));

    assert!(active.feature_names().contains(&"knn_impute__Remuneration".to_string()));
    assert!(retired.feature_names().contains(&"knn_impute__retirement_pay".to_string()));
    assert!(retired
        .feature_names()
        .contains(&"cat__Former_job_42_Employé".to_string()));
    assert!(!active
        .feature_names()
        .iter()
        .any(|name| name.starts_with("knn_impute__retirement_pay")));
}
