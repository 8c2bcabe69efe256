use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use arrow::array::{Array, Float64Array, StringArray};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::metadata::optional_field;
use super::model::{Dataset, Record};
use super::writer::DATE_FORMAT;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a persisted dataset.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – the `records.csv` artifact (`NA` or empty = missing)
/// * `.parquet` – the optional `records.parquet` artifact
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

fn parse_date(s: &str, row: usize) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .with_context(|| format!("Row {row}: '{s}' is not a YYYYMMDD date"))
}

fn parse_optional_f64(s: &str, row: usize, col: &str) -> Result<Option<f64>> {
    let s = s.trim();
    if s.is_empty() || s == "NA" {
        return Ok(None);
    }
    s.parse::<f64>()
        .map(Some)
        .with_context(|| format!("Row {row}, {col}: '{s}' is not a number"))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with the dataset columns. The spatial `x`, `y`, `z`
/// columns are optional so artifacts from older runs still load.
fn load_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let position = |name: &str| headers.iter().position(|h| h == name);
    let required = |name: &str| {
        position(name).with_context(|| format!("CSV missing '{name}' column"))
    };

    let date_idx = required("date")?;
    let microscope_idx = required("microscope")?;
    let objective_idx = required("objective")?;
    let test_idx = required("test")?;
    let bead_size_idx = required("bead_size")?;
    let bead_number_idx = required("bead_number")?;
    let far_red_idx = required("far_red")?;
    let red_idx = required("red")?;
    let uv_idx = required("uv")?;
    let dual_idx = required("dual")?;
    let path_idx = required("file_path")?;
    let spatial_idx = [position("x"), position("y"), position("z")];

    let mut records = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;
        let cell = |idx: usize| row.get(idx).unwrap_or("");
        let float = |idx: usize, col: &str| parse_optional_f64(cell(idx), row_no, col);
        let spatial = |axis: usize, col: &str| match spatial_idx[axis] {
            Some(idx) => float(idx, col),
            None => Ok(None),
        };

        records.push(Record {
            date: parse_date(cell(date_idx), row_no)?,
            microscope: cell(microscope_idx).to_string(),
            objective: cell(objective_idx).to_string(),
            test: cell(test_idx).to_string(),
            bead_size: optional_field(cell(bead_size_idx)),
            bead_number: optional_field(cell(bead_number_idx)),
            far_red: float(far_red_idx, "far_red")?,
            red: float(red_idx, "red")?,
            uv: float(uv_idx, "uv")?,
            dual: float(dual_idx, "dual")?,
            x: spatial(0, "x")?,
            y: spatial(1, "y")?,
            z: spatial(2, "z")?,
            file_path: PathBuf::from(cell(path_idx)),
        });
    }

    Ok(Dataset::from_records(records))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load the Parquet artifact written by [`super::writer::write_parquet`].
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;

        let date = string_column(&batch, "date")?;
        let microscope = string_column(&batch, "microscope")?;
        let objective = string_column(&batch, "objective")?;
        let test = string_column(&batch, "test")?;
        let bead_size = string_column(&batch, "bead_size")?;
        let bead_number = string_column(&batch, "bead_number")?;
        let far_red = float_column(&batch, "far_red")?;
        let red = float_column(&batch, "red")?;
        let uv = float_column(&batch, "uv")?;
        let dual = float_column(&batch, "dual")?;
        let x = float_column(&batch, "x").ok();
        let y = float_column(&batch, "y").ok();
        let z = float_column(&batch, "z").ok();
        let file_path = string_column(&batch, "file_path")?;

        for row in 0..batch.num_rows() {
            records.push(Record {
                date: parse_date(string_at(date, row).unwrap_or_default(), row)?,
                microscope: string_at(microscope, row).unwrap_or_default().to_string(),
                objective: string_at(objective, row).unwrap_or_default().to_string(),
                test: string_at(test, row).unwrap_or_default().to_string(),
                bead_size: string_at(bead_size, row).and_then(optional_field),
                bead_number: string_at(bead_number, row).and_then(optional_field),
                far_red: float_at(Some(far_red), row),
                red: float_at(Some(red), row),
                uv: float_at(Some(uv), row),
                dual: float_at(Some(dual), row),
                x: float_at(x, row),
                y: float_at(y, row),
                z: float_at(z, row),
                file_path: PathBuf::from(string_at(file_path, row).unwrap_or_default()),
            });
        }
    }

    Ok(Dataset::from_records(records))
}

// -- Arrow helpers --

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .with_context(|| format!("Parquet file missing '{name}' column"))?
        .as_any()
        .downcast_ref::<StringArray>()
        .with_context(|| format!("'{name}' is not a Utf8 column"))
}

fn float_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array> {
    batch
        .column_by_name(name)
        .with_context(|| format!("Parquet file missing '{name}' column"))?
        .as_any()
        .downcast_ref::<Float64Array>()
        .with_context(|| format!("'{name}' is not a Float64 column"))
}

fn string_at(col: &StringArray, row: usize) -> Option<&str> {
    (!col.is_null(row)).then(|| col.value(row))
}

fn float_at(col: Option<&Float64Array>, row: usize) -> Option<f64> {
    let col = col?;
    (!col.is_null(row)).then(|| col.value(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::writer::{write_csv, write_parquet};

    fn sample() -> Dataset {
        let rec = |day: u32, far_red: Option<f64>, dual: Option<f64>| Record {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            microscope: "LSM980".to_string(),
            objective: "63x".to_string(),
            test: if dual.is_some() { "ChromDual" } else { "PSFo" }.to_string(),
            bead_size: Some("100nm".to_string()),
            bead_number: None,
            far_red,
            red: far_red,
            uv: far_red,
            dual,
            x: None,
            y: None,
            z: None,
            file_path: PathBuf::from(format!("/data/r{day}.xls")),
        };
        Dataset::from_records(vec![rec(1, Some(0.25), None), rec(2, None, Some(0.05))])
    }

    #[test]
    fn csv_artifact_reloads_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.csv");
        let ds = sample();
        write_csv(&ds, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(
            "date,microscope,objective,test,bead_size,bead_number,far_red,red,uv,dual,x,y,z,file_path"
        ));
        assert!(text.contains("20240302,LSM980,63x,ChromDual,100nm,NA,NA,NA,NA,0.05,NA,NA,NA,/data/r2.xls"));

        let loaded = load_file(&path).unwrap();
        assert_eq!(loaded.records, ds.records);
    }

    #[test]
    fn parquet_artifact_reloads_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.parquet");
        let ds = sample();
        write_parquet(&ds, &path).unwrap();
        assert_eq!(load_file(&path).unwrap().records, ds.records);
    }

    #[test]
    fn csv_without_spatial_columns_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.csv");
        std::fs::write(
            &path,
            "date,microscope,objective,test,bead_size,bead_number,far_red,red,uv,dual,file_path\n\
             20240105,A,10x,PSFo,NA,3,0.3,0.4,0.5,NA,/d/a.xls\n",
        )
        .unwrap();
        let ds = load_file(&path).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records[0].red, Some(0.4));
        assert_eq!(ds.records[0].x, None);
        assert_eq!(ds.records[0].bead_number.as_deref(), Some("3"));
    }

    #[test]
    fn rejects_unknown_extension_and_missing_columns() {
        assert!(load_file(Path::new("records.txt")).is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "date,microscope\n20240101,A\n").unwrap();
        assert!(load_file(&path).is_err());
    }
}
