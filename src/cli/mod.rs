//! Command-line interface
//!
//! Loads the dataset, fits the global or segmented pipelines and saves them as
//! JSON artifacts; applies a saved pipeline to new data.

use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::global::GlobalPreprocessor;
use crate::loader::{write_csv, DataSource, DatasetSource, FileSource, LoadedData, SourceConfig};
use crate::prepare::{harmonize, prepare, PrepareOptions, UnknownTarget};
use crate::preprocessing::{missing_mask, RouterConfig};
use crate::router::FittedRouter;
use crate::schema::{
    CATEGORICAL_GAP_COLUMNS, NUMERIC_GAP_COLUMNS, STATUS_ACTIVE, STATUS_COLUMN, STATUS_RETIRED,
};
use crate::segmented::SegmentedPipelines;

/// File name of the saved global pipeline
pub const GLOBAL_ARTIFACT: &str = "pipeline_global.json";
/// File name of the saved active-segment pipeline
pub const ACTIVE_ARTIFACT: &str = "pipeline_actifs.json";
/// File name of the saved retired-segment pipeline
pub const RETIRED_ARTIFACT: &str = "pipeline_retraites.json";

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "statut-prep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Preprocessing pipelines for the worker status dataset")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fit the global pipeline on the training data
    FitGlobal {
        /// Input CSV; defaults to the configured dataset
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Directory receiving the pipeline artifact
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Neighbours used by KNN imputation
        #[arg(long, default_value = "5")]
        neighbors: usize,

        /// Fail on target labels other than L and T
        #[arg(long)]
        strict_target: bool,
    },

    /// Fit one pipeline per status segment
    FitSegmented {
        /// Input CSV; defaults to the configured dataset
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Directory receiving the pipeline artifacts
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Neighbours used by KNN imputation
        #[arg(long, default_value = "5")]
        neighbors: usize,
    },

    /// Prepare unseen data, keeping the identifier column
    Harmonize {
        /// Input CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Output CSV
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Apply a saved pipeline to a CSV
    Transform {
        /// Saved pipeline (JSON)
        #[arg(short, long)]
        pipeline: PathBuf,

        /// Input CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Output CSV
        #[arg(short, long)]
        output: PathBuf,

        /// Input is already prepared; skip the pipeline's input preparation
        #[arg(long)]
        prepared: bool,
    },

    /// Show dataset information
    Info {
        /// Input CSV; defaults to the configured dataset
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
}

/// Load an explicit file, or resolve the configured dataset
pub fn load_data(path: Option<&Path>) -> anyhow::Result<LoadedData> {
    let loaded = match path {
        Some(path) => FileSource::new(path).load()?,
        None => DatasetSource::new(SourceConfig::from_env()).load()?,
    };
    Ok(loaded)
}

fn load_step(path: Option<&Path>) -> anyhow::Result<DataFrame> {
    step_run("Loading data");
    let loaded = load_data(path)?;
    step_done(&format!(
        "{} rows × {} cols from {}",
        loaded.frame.height(),
        loaded.frame.width(),
        loaded.origin
    ));
    Ok(loaded.frame)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_fit_global(
    data_path: Option<&Path>,
    output_dir: &Path,
    neighbors: usize,
    strict_target: bool,
) -> anyhow::Result<()> {
    section("Fit global pipeline");
    let df = load_step(data_path)?;

    let mut options = PrepareOptions::training();
    if strict_target {
        options = options.with_unknown_target(UnknownTarget::Reject);
    }

    step_run("Preparing features");
    let prepared = prepare(&df, &options)?;
    let labelled = prepared
        .target
        .as_ref()
        .map(|t| t.len() - t.missing_count())
        .unwrap_or(0);
    step_done(&format!("{} features, {} labelled rows", prepared.features.width(), labelled));

    step_run("Fitting");
    let start = Instant::now();
    let config = RouterConfig::default().with_n_neighbors(neighbors);
    let fitted = GlobalPreprocessor::new(config).fit(&prepared.features)?;
    step_done(&format!("{} outputs in {:?}", fitted.n_features_out(), start.elapsed()));

    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(GLOBAL_ARTIFACT);
    fitted.save(&path)?;
    step_ok(&format!("Saved {}", path.display()));

    println!();
    Ok(())
}

pub fn cmd_fit_segmented(
    data_path: Option<&Path>,
    output_dir: &Path,
    neighbors: usize,
) -> anyhow::Result<()> {
    section("Fit segmented pipelines");
    let df = load_step(data_path)?;

    let config = RouterConfig::default().with_n_neighbors(neighbors);
    let pipelines = SegmentedPipelines::build(&df, &config)?;
    step_ok(&format!(
        "{} {} rows, {} {} rows",
        pipelines.active.features.height(),
        STATUS_ACTIVE,
        pipelines.retired.features.height(),
        STATUS_RETIRED
    ));

    step_run("Fitting");
    let start = Instant::now();
    let fitted = pipelines.fit()?;
    step_done(&format!(
        "{} + {} outputs in {:?}",
        fitted.active.n_features_out(),
        fitted.retired.n_features_out(),
        start.elapsed()
    ));

    std::fs::create_dir_all(output_dir)?;
    for (router, name) in [(&fitted.active, ACTIVE_ARTIFACT), (&fitted.retired, RETIRED_ARTIFACT)] {
        let path = output_dir.join(name);
        router.save(&path)?;
        step_ok(&format!("Saved {}", path.display()));
    }

    println!();
    Ok(())
}

pub fn cmd_harmonize(data_path: &Path, output_path: &Path) -> anyhow::Result<()> {
    section("Harmonize");
    let df = load_step(Some(data_path))?;

    step_run("Preparing features");
    let mut features = harmonize(&df)?;
    step_done(&format!("{} cols", features.width()));

    write_csv(&mut features, output_path)?;
    step_ok(&format!("Saved {}", output_path.display()));

    println!();
    Ok(())
}

pub fn cmd_transform(
    pipeline_path: &Path,
    data_path: &Path,
    output_path: &Path,
    prepared: bool,
) -> anyhow::Result<()> {
    section("Transform");

    step_run("Loading pipeline");
    let fitted = FittedRouter::load(pipeline_path)?;
    step_done(&format!(
        "{} outputs, fitted on {} rows at {}",
        fitted.n_features_out(),
        fitted.fitted_rows(),
        fitted.fitted_at().format("%Y-%m-%d %H:%M:%S")
    ));

    let df = load_step(Some(data_path))?;
    let features = if prepared { df } else { fitted.prepare_input(&df)? };

    step_run("Transforming");
    let start = Instant::now();
    let matrix = fitted.transform(&features)?;
    step_done(&format!("{} × {} in {:?}", matrix.nrows(), matrix.ncols(), start.elapsed()));

    let mut out = matrix.to_dataframe()?;
    write_csv(&mut out, output_path)?;
    step_ok(&format!("Saved {}", output_path.display()));

    println!();
    Ok(())
}

pub fn cmd_info(data_path: Option<&Path>) -> anyhow::Result<()> {
    section("Data Info");
    let loaded = load_data(data_path)?;
    let df = &loaded.frame;

    println!("  {:<12} {}", muted("Source"), loaded.origin);
    println!("  {:<12} {}", muted("Rows"), df.height());
    println!("  {:<12} {}", muted("Columns"), df.width());
    println!();

    if let Ok(status) = df.column(STATUS_COLUMN) {
        let status = status.as_materialized_series().cast(&DataType::String)?;
        let status = status.str()?;
        for label in [STATUS_ACTIVE, STATUS_RETIRED] {
            let count = status.into_iter().filter(|v| *v == Some(label)).count();
            println!("  {:<12} {}", muted(label), count);
        }
        println!();
    }

    println!("  {:<24} {:<12} {:>8}", muted("Gap column"), muted("Type"), muted("Missing"));
    println!("  {}", dim(&"─".repeat(46)));
    for name in NUMERIC_GAP_COLUMNS.into_iter().chain(CATEGORICAL_GAP_COLUMNS) {
        match df.column(name) {
            Ok(column) => {
                let missing = missing_mask(column)?.into_iter().filter(|&m| m).count();
                println!(
                    "  {:<24} {:<12} {:>8}",
                    name,
                    format!("{}", column.dtype()).truecolor(140, 140, 140),
                    missing
                );
            }
            Err(_) => println!("  {:<24} {}", name, "absent".red()),
        }
    }

    println!();
    Ok(())
}
