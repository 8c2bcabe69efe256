use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::info;
use parquet::arrow::ArrowWriter;

use super::builder::{BuildOutput, DatalessFile};
use super::metadata::NA;
use super::model::{Dataset, Record};
use crate::config::PipelineConfig;

/// Column order of the persisted dataset.
pub const DATASET_COLUMNS: [&str; 14] = [
    "date",
    "microscope",
    "objective",
    "test",
    "bead_size",
    "bead_number",
    "far_red",
    "red",
    "uv",
    "dual",
    "x",
    "y",
    "z",
    "file_path",
];

/// Date format used in every dataset artifact.
pub const DATE_FORMAT: &str = "%Y%m%d";

fn float_cell(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| NA.to_string())
}

fn text_cell(v: Option<&str>) -> String {
    v.unwrap_or(NA).to_string()
}

fn csv_row(rec: &Record) -> [String; 14] {
    [
        rec.date.format(DATE_FORMAT).to_string(),
        rec.microscope.clone(),
        rec.objective.clone(),
        rec.test.clone(),
        text_cell(rec.bead_size.as_deref()),
        text_cell(rec.bead_number.as_deref()),
        float_cell(rec.far_red),
        float_cell(rec.red),
        float_cell(rec.uv),
        float_cell(rec.dual),
        float_cell(rec.x),
        float_cell(rec.y),
        float_cell(rec.z),
        rec.file_path.to_string_lossy().into_owned(),
    ]
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Write the dataset as CSV; missing values are written as `NA`.
pub fn write_csv(dataset: &Dataset, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer
        .write_record(DATASET_COLUMNS)
        .context("writing CSV header")?;
    for (row_no, rec) in dataset.records.iter().enumerate() {
        writer
            .write_record(csv_row(rec))
            .with_context(|| format!("writing CSV row {row_no}"))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

fn dataset_schema() -> Schema {
    let text = |name: &str, nullable: bool| Field::new(name, DataType::Utf8, nullable);
    let float = |name: &str| Field::new(name, DataType::Float64, true);
    Schema::new(vec![
        text("date", false),
        text("microscope", false),
        text("objective", false),
        text("test", false),
        text("bead_size", true),
        text("bead_number", true),
        float("far_red"),
        float("red"),
        float("uv"),
        float("dual"),
        float("x"),
        float("y"),
        float("z"),
        text("file_path", false),
    ])
}

fn strings(recs: &[Record], f: impl Fn(&Record) -> Option<String>) -> ArrayRef {
    Arc::new(recs.iter().map(f).collect::<StringArray>())
}

fn floats(recs: &[Record], f: impl Fn(&Record) -> Option<f64>) -> ArrayRef {
    Arc::new(recs.iter().map(f).collect::<Float64Array>())
}

/// Write the dataset as a single-batch Parquet file with the CSV column set.
pub fn write_parquet(dataset: &Dataset, path: &Path) -> Result<()> {
    let recs = &dataset.records;
    let columns: Vec<ArrayRef> = vec![
        strings(recs, |r| Some(r.date.format(DATE_FORMAT).to_string())),
        strings(recs, |r| Some(r.microscope.clone())),
        strings(recs, |r| Some(r.objective.clone())),
        strings(recs, |r| Some(r.test.clone())),
        strings(recs, |r| r.bead_size.clone()),
        strings(recs, |r| r.bead_number.clone()),
        floats(recs, |r| r.far_red),
        floats(recs, |r| r.red),
        floats(recs, |r| r.uv),
        floats(recs, |r| r.dual),
        floats(recs, |r| r.x),
        floats(recs, |r| r.y),
        floats(recs, |r| r.z),
        strings(recs, |r| Some(r.file_path.to_string_lossy().into_owned())),
    ];

    let schema = Arc::new(dataset_schema());
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Side lists
// ---------------------------------------------------------------------------

/// Newline-delimited path list.
pub fn write_path_list<'a>(paths: impl IntoIterator<Item = &'a PathBuf>, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for p in paths {
        writeln!(out, "{}", p.display())?;
    }
    out.flush()?;
    Ok(())
}

fn dataless_paths(dataless: &[DatalessFile]) -> impl Iterator<Item = &PathBuf> {
    dataless.iter().map(|d| &d.path)
}

/// Replace every artifact of a processing run in the extracted directory.
pub fn write_artifacts(output: &BuildOutput, config: &PipelineConfig) -> Result<()> {
    let dir = config.extracted_dir();
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    write_csv(&output.dataset, &config.records_csv())?;
    write_path_list(&output.unprocessed, &config.unprocessed_list())?;
    write_path_list(dataless_paths(&output.dataless), &config.dataless_list())?;
    if config.write_parquet {
        write_parquet(&output.dataset, &config.records_parquet())?;
    }

    info!("wrote artifacts to {}", dir.display());
    Ok(())
}
