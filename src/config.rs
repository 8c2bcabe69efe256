use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Settings for one processing / reporting run.
///
/// Every field has a default, so a config file only needs the keys it changes:
///
/// ```json
/// { "root_dir": "/mbp", "consider_limit": 5, "warning_percentage": 10.0 }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Project root; `data/` and `extracted/` live below it unless overridden.
    pub root_dir: PathBuf,
    /// Directory scanned for report files. Defaults to `<root_dir>/data`.
    pub data_dir: Option<PathBuf>,
    /// Directory receiving run artifacts. Defaults to `<root_dir>/extracted`.
    pub extracted_dir: Option<PathBuf>,
    /// Report file extensions, compared case-insensitively.
    pub extensions: Vec<String>,
    pub follow_links: bool,
    /// Also write `records.parquet` next to `records.csv`.
    pub write_parquet: bool,
    /// Number of prior dates in the drift baseline.
    pub consider_limit: usize,
    /// Absolute percentage change above which a metric warns.
    pub warning_percentage: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            data_dir: None,
            extracted_dir: None,
            extensions: vec!["xls".to_string()],
            follow_links: false,
            write_parquet: false,
            consider_limit: 3,
            warning_percentage: 15.0,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file, or fall back to defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.consider_limit == 0 {
            bail!("consider_limit must be at least 1");
        }
        if !(self.warning_percentage.is_finite() && self.warning_percentage > 0.0) {
            bail!(
                "warning_percentage must be a positive number, got {}",
                self.warning_percentage
            );
        }
        if self.extensions.is_empty() {
            bail!("at least one report file extension is required");
        }
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| self.root_dir.join("data"))
    }

    pub fn extracted_dir(&self) -> PathBuf {
        self.extracted_dir
            .clone()
            .unwrap_or_else(|| self.root_dir.join("extracted"))
    }

    pub fn records_csv(&self) -> PathBuf {
        self.extracted_dir().join("records.csv")
    }

    pub fn records_parquet(&self) -> PathBuf {
        self.extracted_dir().join("records.parquet")
    }

    pub fn unprocessed_list(&self) -> PathBuf {
        self.extracted_dir().join("unprocessed.txt")
    }

    pub fn dataless_list(&self) -> PathBuf {
        self.extracted_dir().join("dataless.txt")
    }

    pub fn drift_report(&self) -> PathBuf {
        self.extracted_dir().join("drift_report.json")
    }
}
