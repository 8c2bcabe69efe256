use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Metric – one measurement channel
// ---------------------------------------------------------------------------

/// A measurement channel tracked for drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    FarRed,
    Red,
    Uv,
    Dual,
}

impl Metric {
    /// Column order used in the dataset artifact and in reports.
    pub const ALL: [Metric; 4] = [Metric::FarRed, Metric::Red, Metric::Uv, Metric::Dual];

    /// Column name in the persisted dataset.
    pub fn column(self) -> &'static str {
        match self {
            Metric::FarRed => "far_red",
            Metric::Red => "red",
            Metric::Uv => "uv",
            Metric::Dual => "dual",
        }
    }

    /// Value of this channel on a record, if measured.
    pub fn value(self, record: &Record) -> Option<f64> {
        match self {
            Metric::FarRed => record.far_red,
            Metric::Red => record.red,
            Metric::Uv => record.uv,
            Metric::Dual => record.dual,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the dataset
// ---------------------------------------------------------------------------

/// One successfully parsed report file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub date: NaiveDate,
    pub microscope: String,
    pub objective: String,
    pub test: String,
    pub bead_size: Option<String>,
    pub bead_number: Option<String>,
    pub far_red: Option<f64>,
    pub red: Option<f64>,
    pub uv: Option<f64>,
    pub dual: Option<f64>,
    /// Spatial FWHM values from axis-style PSF reports.
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub file_path: PathBuf,
}

/// Categorical columns that get a unique-value index.
pub const CATEGORICAL_COLUMNS: [&str; 5] =
    ["microscope", "objective", "test", "bead_size", "bead_number"];

impl Record {
    /// Categorical value by column name; `None` for missing or unknown.
    pub fn categorical(&self, column: &str) -> Option<&str> {
        match column {
            "microscope" => Some(&self.microscope),
            "objective" => Some(&self.objective),
            "test" => Some(&self.test),
            "bead_size" => self.bead_size.as_deref(),
            "bead_number" => self.bead_number.as_deref(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete set of records
// ---------------------------------------------------------------------------

/// All records of one processing run with pre-computed column indices.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// All records (rows), in discovery order.
    pub records: Vec<Record>,
    /// For each categorical column the sorted set of unique values.
    pub unique_values: BTreeMap<String, BTreeSet<String>>,
}

impl Dataset {
    /// Build column indices from the records.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut unique_values: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for rec in &records {
            for col in CATEGORICAL_COLUMNS {
                if let Some(val) = rec.categorical(col) {
                    unique_values
                        .entry(col.to_string())
                        .or_default()
                        .insert(val.to_string());
                }
            }
        }
        Dataset {
            records,
            unique_values,
        }
    }

    /// Sorted unique values of a categorical column.
    pub fn unique(&self, column: &str) -> Vec<&str> {
        self.unique_values
            .get(column)
            .map(|vals| vals.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Objectives recorded for one microscope, sorted.
    pub fn objectives_for(&self, microscope: &str) -> Vec<&str> {
        let set: BTreeSet<&str> = self
            .records
            .iter()
            .filter(|r| r.microscope == microscope)
            .map(|r| r.objective.as_str())
            .collect();
        set.into_iter().collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
