//! Statut Prep - preprocessing pipelines for the worker status dataset
//!
//! Turns the raw dataset (one row per person, status "Actif" or "Retraité",
//! label "L" or "T") into numeric feature matrices ready for a classifier.
//!
//! # Modules
//!
//! ## Core
//! - [`prepare`] - Missingness flags, status encoding, coercion, exclusion, target
//! - [`router`] - Generic column router with immutable fitted state
//! - [`global`] - One router over all rows with status-scoped cells
//! - [`segmented`] - One router per status population
//!
//! ## Building blocks
//! - [`schema`] - Fixed column names and the declarative column table
//! - [`preprocessing`] - Imputers, scaler, one-hot encoder, value coercion
//!
//! ## Services
//! - [`loader`] - Dataset resolution (local directories, remote fallback)
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Building blocks
pub mod schema;
pub mod preprocessing;

// Pipelines
pub mod prepare;
pub mod router;
pub mod global;
pub mod segmented;

// Services
pub mod loader;
pub mod cli;

pub use error::{PrepError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{PrepError, Result};

    // Schema
    pub use crate::schema::{ColumnKind, ColumnRole, ColumnTable, NumericFill, Scope};

    // Preparation
    pub use crate::prepare::{harmonize, prepare, Labels, PrepareOptions, PreparedData, UnknownTarget};

    // Preprocessing
    pub use crate::preprocessing::{
        ConstantStringImputer, Imputer, KnnImputer, OneHotEncoder, RouterConfig, SimpleImputer,
        StandardScaler,
    };

    // Routing
    pub use crate::router::{
        CellKind, ColumnRouter, FeatureMatrix, FittedRouter, InputPreparation, PipelineArtifact,
    };
    pub use crate::global::GlobalPreprocessor;
    pub use crate::segmented::{split_by_status, FittedSegments, SegmentedPipelines, Status};

    // Loading
    pub use crate::loader::{DataSource, DatasetSource, FileSource, SourceConfig};
}
