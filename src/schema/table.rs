//! Declarative column classification
//!
//! A [`ColumnTable`] maps column names to a [`ColumnRole`] (scope, numeric
//! fill strategy and optionally a forced kind). Resolving it against a frame
//! yields one [`ResolvedColumn`] per routed column; routers then pick columns
//! by `(kind, scope, fill)`.

use super::detect_kind;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Type axis of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Population a column is meaningful for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Applies to all rows
    Shared,
    /// Meaningful only for "Actif" rows
    Active,
    /// Meaningful only for "Retraité" rows
    Retired,
}

/// Imputation used when a column is routed as numeric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericFill {
    Median,
    Knn,
    Zero,
}

/// Routing role of a single column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRole {
    /// Forced kind; `None` means the kind is detected from the frame dtype
    pub kind: Option<ColumnKind>,
    pub scope: Scope,
    pub fill: NumericFill,
}

impl ColumnRole {
    /// Role whose kind is detected from the data
    pub fn detected(scope: Scope, fill: NumericFill) -> Self {
        Self { kind: None, scope, fill }
    }

    /// Role forced to numeric regardless of dtype
    pub fn numeric(scope: Scope, fill: NumericFill) -> Self {
        Self {
            kind: Some(ColumnKind::Numeric),
            scope,
            fill,
        }
    }

    /// Role forced to categorical regardless of dtype
    pub fn categorical(scope: Scope) -> Self {
        Self {
            kind: Some(ColumnKind::Categorical),
            scope,
            fill: NumericFill::Zero,
        }
    }
}

/// A column assigned to exactly one (kind, scope) cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub name: String,
    pub kind: ColumnKind,
    pub scope: Scope,
    pub fill: NumericFill,
}

/// Column name -> role mapping, plus the routing of columns it doesn't list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnTable {
    entries: Vec<(String, ColumnRole)>,
    unlisted_numeric: Option<(Scope, NumericFill)>,
    unlisted_categorical: Option<Scope>,
}

impl ColumnTable {
    /// Create an empty table; unlisted columns are dropped
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the role of a column
    pub fn with_column(mut self, name: impl Into<String>, role: ColumnRole) -> Self {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = role,
            None => self.entries.push((name, role)),
        }
        self
    }

    /// Add several columns sharing one role
    pub fn with_columns<I, S>(mut self, names: I, role: ColumnRole) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self = self.with_column(name, role);
        }
        self
    }

    /// Route numeric columns absent from the table
    pub fn with_unlisted_numeric(mut self, scope: Scope, fill: NumericFill) -> Self {
        self.unlisted_numeric = Some((scope, fill));
        self
    }

    /// Route categorical columns absent from the table
    pub fn with_unlisted_categorical(mut self, scope: Scope) -> Self {
        self.unlisted_categorical = Some(scope);
        self
    }

    /// Role of a listed column
    pub fn role(&self, name: &str) -> Option<&ColumnRole> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    /// Whether the column is listed
    pub fn contains(&self, name: &str) -> bool {
        self.role(name).is_some()
    }

    /// Listed column names, in declaration order
    pub fn listed(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Classify the columns of a frame.
    ///
    /// Listed columns come first in declaration order, then unlisted columns in
    /// frame order. Listed columns absent from the frame, and columns whose
    /// dtype is neither numeric nor categorical, are skipped.
    pub fn resolve(&self, df: &DataFrame) -> Vec<ResolvedColumn> {
        let mut resolved = Vec::new();

        for (name, role) in &self.entries {
            let Ok(column) = df.column(name) else {
                debug!(column = %name, "Listed column absent from frame, skipped");
                continue;
            };
            let kind = match role.kind.or_else(|| detect_kind(column.dtype())) {
                Some(kind) => kind,
                None => {
                    debug!(column = %name, dtype = %column.dtype(), "Unroutable dtype, skipped");
                    continue;
                }
            };
            resolved.push(ResolvedColumn {
                name: name.clone(),
                kind,
                scope: role.scope,
                fill: role.fill,
            });
        }

        for column in df.get_columns() {
            let name = column.name().as_str();
            if self.contains(name) {
                continue;
            }
            let routed = match detect_kind(column.dtype()) {
                Some(ColumnKind::Numeric) => self
                    .unlisted_numeric
                    .map(|(scope, fill)| (ColumnKind::Numeric, scope, fill)),
                Some(ColumnKind::Categorical) => self
                    .unlisted_categorical
                    .map(|scope| (ColumnKind::Categorical, scope, NumericFill::Zero)),
                None => None,
            };
            if let Some((kind, scope, fill)) = routed {
                resolved.push(ResolvedColumn {
                    name: name.to_string(),
                    kind,
                    scope,
                    fill,
                });
            }
        }

        resolved
    }
}
