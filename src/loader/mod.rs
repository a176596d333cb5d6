//! Dataset loading
//!
//! The raw table comes from a [`DataSource`]. [`DatasetSource`] looks for the
//! file in a list of local directories and, for the project dataset only,
//! falls back to downloading it. [`FileSource`] reads one explicit path.

use crate::error::{PrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default dataset file name
pub const DEFAULT_FILE_NAME: &str = "jeu_donnees_final.csv";

/// Default local directory, relative to the working directory
pub const DEFAULT_LOCAL_DIR: &str = "project-12-files";

/// Remote copy of the default dataset
pub const DEFAULT_REMOTE_URL: &str =
    "https://raw.githubusercontent.com/VinceflLH/donnees_projet_apprentissage_supervise/main/jeu_donnees_final.csv";

/// Environment variable adding a local directory in front of the defaults
pub const DATA_DIR_ENV: &str = "STATUT_PREP_DATA_DIR";
/// Environment variable overriding the remote URL
pub const DATA_URL_ENV: &str = "STATUT_PREP_DATA_URL";

/// Where a table was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataOrigin {
    Local(PathBuf),
    Remote(String),
}

impl fmt::Display for DataOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataOrigin::Local(path) => write!(f, "{}", path.display()),
            DataOrigin::Remote(url) => f.write_str(url),
        }
    }
}

/// A loaded table and its origin
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub frame: DataFrame,
    pub origin: DataOrigin,
}

/// Supplies the raw table
pub trait DataSource {
    fn load(&self) -> Result<LoadedData>;
}

/// Dataset resolution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub file_name: String,
    /// Candidate directories, tried in order
    pub local_dirs: Vec<PathBuf>,
    /// Fallback download, only used for [`DEFAULT_FILE_NAME`]
    pub remote_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_FILE_NAME.to_string(),
            local_dirs: vec![PathBuf::from(".").join(DEFAULT_LOCAL_DIR)],
            remote_url: Some(DEFAULT_REMOTE_URL.to_string()),
            timeout_secs: 30,
        }
    }
}

impl SourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            config.local_dirs.insert(0, PathBuf::from(dir));
        }
        if let Ok(url) = std::env::var(DATA_URL_ENV) {
            config.remote_url = Some(url);
        }
        config
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    /// Replace the candidate directories
    pub fn with_local_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.local_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_remote_url(mut self, url: Option<String>) -> Self {
        self.remote_url = url;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Local paths to try, in order
    pub fn candidates(&self) -> Vec<PathBuf> {
        self.local_dirs
            .iter()
            .map(|dir| dir.join(&self.file_name))
            .collect()
    }

    /// Remote URL to fall back on, if the file is eligible for it
    pub fn fallback_url(&self) -> Option<&str> {
        if self.file_name == DEFAULT_FILE_NAME {
            self.remote_url.as_deref()
        } else {
            None
        }
    }
}

/// Local directories first, then the remote copy
#[derive(Debug, Clone, Default)]
pub struct DatasetSource {
    config: SourceConfig,
}

impl DatasetSource {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn fetch(&self, url: &str) -> Result<DataFrame> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()?;
        let response = client.get(url).send()?.error_for_status()?;
        let bytes = response.bytes()?;
        debug!(url, bytes = bytes.len(), "Dataset downloaded");
        read_csv_bytes(bytes.to_vec())
    }
}

impl DataSource for DatasetSource {
    fn load(&self) -> Result<LoadedData> {
        let start = Instant::now();

        for path in self.config.candidates() {
            if path.is_file() {
                let frame = read_csv(&path)?;
                info!(
                    path = %path.display(),
                    rows = frame.height(),
                    columns = frame.width(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Dataset loaded from disk"
                );
                return Ok(LoadedData {
                    frame,
                    origin: DataOrigin::Local(path),
                });
            }
            debug!(path = %path.display(), "Dataset not found here");
        }

        let Some(url) = self.config.fallback_url() else {
            return Err(PrepError::SourceError(format!(
                "file not found: {}",
                self.config.file_name
            )));
        };

        info!(url, "Dataset not found locally, downloading");
        let frame = self.fetch(url).map_err(|e| {
            warn!(error = %e, "Download failed");
            PrepError::SourceError(format!(
                "unable to load {} locally or from {}: {}",
                self.config.file_name, url, e
            ))
        })?;
        info!(
            rows = frame.height(),
            columns = frame.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Dataset loaded from remote"
        );

        Ok(LoadedData {
            frame,
            origin: DataOrigin::Remote(url.to_string()),
        })
    }
}

/// One explicit CSV path
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataSource for FileSource {
    fn load(&self) -> Result<LoadedData> {
        if !self.path.is_file() {
            return Err(PrepError::SourceError(format!(
                "file not found: {}",
                self.path.display()
            )));
        }
        let frame = read_csv(&self.path)?;
        info!(path = %self.path.display(), rows = frame.height(), "Dataset loaded");
        Ok(LoadedData {
            frame,
            origin: DataOrigin::Local(self.path.clone()),
        })
    }
}

fn csv_options() -> CsvReadOptions {
    let parse = CsvParseOptions::default().with_null_values(Some(NullValues::AllColumns(vec![
        "NA".into(),
        "NaN".into(),
        "nan".into(),
    ])));

    // Full scan: codes such as "2A" can appear late in otherwise numeric columns
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(parse)
}

/// Read a CSV file with a header row
pub fn read_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let file = File::open(path.as_ref())?;
    Ok(csv_options().into_reader_with_file_handle(file).finish()?)
}

/// Read CSV content held in memory
pub fn read_csv_bytes(bytes: Vec<u8>) -> Result<DataFrame> {
    Ok(csv_options()
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?)
}

/// Write a frame as CSV with a header row
pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let mut file = File::create(path.as_ref())?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_candidates_in_order() {
        let config = SourceConfig::new()
            .with_file_name("data.csv")
            .with_local_dirs(["a", "b"]);
        assert_eq!(
            config.candidates(),
            vec![PathBuf::from("a/data.csv"), PathBuf::from("b/data.csv")]
        );
    }

    #[test]
    fn test_remote_only_for_default_file() {
        assert!(SourceConfig::new().fallback_url().is_some());
        assert!(SourceConfig::new().with_file_name("other.csv").fallback_url().is_none());
    }

    #[test]
    fn test_read_csv_bytes_nulls() {
        let df = read_csv_bytes(b"a,b\n1,x\nNA,\n3,y\n".to_vec()).unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.column("a").unwrap().null_count(), 1);
        assert_eq!(df.column("b").unwrap().null_count(), 1);
    }

    #[test]
    fn test_first_existing_directory_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let mut file = File::create(second.path().join("data.csv")).unwrap();
        writeln!(file, "x\n1\n2").unwrap();

        let source = DatasetSource::new(
            SourceConfig::new()
                .with_file_name("data.csv")
                .with_local_dirs([first.path(), second.path()]),
        );
        let loaded = source.load().unwrap();
        assert_eq!(loaded.frame.height(), 2);
        assert_eq!(loaded.origin, DataOrigin::Local(second.path().join("data.csv")));
    }

    #[test]
    fn test_missing_non_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = DatasetSource::new(
            SourceConfig::new()
                .with_file_name("absent.csv")
                .with_local_dirs([dir.path()]),
        );
        assert!(matches!(source.load(), Err(PrepError::SourceError(_))));
    }
}
