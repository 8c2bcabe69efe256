use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::NaiveDate;
use log::{debug, info, warn};
use regex::Regex;
use walkdir::WalkDir;

use super::extract::{Measurement, ReportKind, extract};
use super::metadata::{MetaFields, optional_field, parse_meta_token};
use super::model::{Dataset, Record};
use crate::config::PipelineConfig;
use crate::error::DatalessReason;

/// Paths that look like reports: `<8 digits>_M…_O…_T…_S…_B<digits>`.
static REPORT_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\d{8}_M.*_O.*_T.*_S.*_B\d+").ok());
/// Shortest token matching the same grammar.
static META_TOKEN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\d{8}_M.*?_O.*?_T.*?_S.*?_B\d+").ok());

// ---------------------------------------------------------------------------
// Build output
// ---------------------------------------------------------------------------

/// A recognised report that yielded no record, with the reason.
#[derive(Debug)]
pub struct DatalessFile {
    pub path: PathBuf,
    pub reason: DatalessReason,
}

/// Result of one full processing run.
#[derive(Debug, Default)]
pub struct BuildOutput {
    pub dataset: Dataset,
    /// Files whose path does not follow the naming grammar.
    pub unprocessed: Vec<PathBuf>,
    /// Files that follow the grammar but carry no usable measurement.
    pub dataless: Vec<DatalessFile>,
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// All files below `root` with one of `extensions`, sorted by path.
pub fn discover_reports(root: &Path, extensions: &[String], follow_links: bool) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(root);
    if follow_links {
        walker = walker.follow_links(true);
    }
    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_extension(path, extensions))
        .collect();
    files.sort();
    files
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}

/// Whether the path follows the report naming grammar.
pub fn is_report_name(path: &Path) -> bool {
    let text = path.to_string_lossy();
    REPORT_NAME.as_ref().is_some_and(|re| re.is_match(&text))
}

/// The last metadata token embedded in the path.
pub fn metadata_token(path: &Path) -> Option<String> {
    let text = path.to_string_lossy();
    let re = META_TOKEN.as_ref()?;
    re.find_iter(&text).last().map(|m| m.as_str().to_string())
}

// ---------------------------------------------------------------------------
// Per-file processing
// ---------------------------------------------------------------------------

/// Turn one recognised report into a record.
pub fn process_file(path: &Path) -> Result<Record, DatalessReason> {
    let token = metadata_token(path).ok_or(DatalessReason::NoToken)?;
    let meta = parse_meta_token(&token)?;
    let measurement = extract(ReportKind::for_test(&meta.test), path)?;
    to_record(meta, measurement, path)
}

fn to_record(meta: MetaFields, measurement: Measurement, path: &Path) -> Result<Record, DatalessReason> {
    let date = NaiveDate::parse_from_str(&meta.date, "%Y%m%d")
        .map_err(|_| DatalessReason::BadDate(meta.date.clone()))?;

    let mut record = Record {
        date,
        bead_size: optional_field(&meta.bead_size),
        bead_number: optional_field(&meta.bead_number),
        microscope: meta.microscope,
        objective: meta.objective,
        test: meta.test,
        far_red: None,
        red: None,
        uv: None,
        dual: None,
        x: None,
        y: None,
        z: None,
        file_path: path.to_path_buf(),
    };
    match measurement {
        Measurement::Channels { far_red, red, uv } => {
            record.far_red = Some(far_red);
            record.red = Some(red);
            record.uv = Some(uv);
        }
        Measurement::Dual(dual) => record.dual = Some(dual),
        Measurement::Spatial { x, y, z } => {
            record.x = Some(x);
            record.y = Some(y);
            record.z = Some(z);
        }
    }
    Ok(record)
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Classify and process the given files. A bad file never aborts the run.
pub fn build_from_paths(paths: impl IntoIterator<Item = PathBuf>) -> BuildOutput {
    let mut out = BuildOutput::default();
    let mut records = Vec::new();

    for path in paths {
        if !is_report_name(&path) {
            debug!("unprocessed: {}", path.display());
            out.unprocessed.push(path);
            continue;
        }
        match process_file(&path) {
            Ok(record) => records.push(record),
            Err(reason) => {
                warn!("dataless: {} ({reason})", path.display());
                out.dataless.push(DatalessFile { path, reason });
            }
        }
    }

    out.dataset = Dataset::from_records(records);
    info!(
        "processed {} records, {} dataless, {} unprocessed",
        out.dataset.len(),
        out.dataless.len(),
        out.unprocessed.len()
    );
    out
}

/// Rebuild the dataset from every report below the configured data directory.
pub fn build_dataset(config: &PipelineConfig) -> BuildOutput {
    let root = config.data_dir();
    let files = discover_reports(&root, &config.extensions, config.follow_links);
    info!("found {} report files under {}", files.len(), root.display());
    build_from_paths(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExtractError, MetadataError};

    #[test]
    fn naming_grammar_requires_all_markers() {
        assert!(is_report_name(Path::new(
            "/data/2024/20240131_MLSM980_O63x_TPSFo_S100nm_B3/report.xls"
        )));
        assert!(!is_report_name(Path::new("/data/20240131_MLSM980_O63x_TPSFo.xls")));
        assert!(!is_report_name(Path::new("/data/2024013_MA_OB_TC_SD_B1.xls")));
        assert!(!is_report_name(Path::new("/data/20240131_MA_OB_TC_SD_Bx.xls")));
    }

    #[test]
    fn token_is_last_match_in_path() {
        let path = Path::new(
            "/data/20230101_MOld_O10x_TPSFo_S1_B1/20240131_MNew_O63x_TChromDual_S2_B7_run.xls",
        );
        assert_eq!(
            metadata_token(path).as_deref(),
            Some("20240131_MNew_O63x_TChromDual_S2_B7")
        );
    }

    #[test]
    fn bad_calendar_date_is_dataless() {
        let meta = parse_meta_token("20241399_MA_O1_TPSFo_S1_B1").unwrap();
        let err = to_record(meta, Measurement::Dual(0.1), Path::new("x")).unwrap_err();
        assert!(matches!(err, DatalessReason::BadDate(d) if d == "20241399"));
    }

    #[test]
    fn measurement_lands_in_matching_columns() {
        let meta = parse_meta_token("20240131_MA_O63x_TChromDual_SNA_B2").unwrap();
        let rec = to_record(meta, Measurement::Dual(0.4), Path::new("r.xls")).unwrap();
        assert_eq!(rec.dual, Some(0.4));
        assert_eq!(rec.far_red, None);
        assert_eq!(rec.bead_size, None);
        assert_eq!(rec.bead_number.as_deref(), Some("2"));

        let meta = parse_meta_token("20240131_MA_O63x_TPSFo_S1_B2").unwrap();
        let spatial = Measurement::Spatial {
            x: 0.2,
            y: 0.3,
            z: 1.4,
        };
        let rec = to_record(meta, spatial, Path::new("r.xls")).unwrap();
        assert_eq!((rec.x, rec.y, rec.z), (Some(0.2), Some(0.3), Some(1.4)));
        assert_eq!(rec.far_red, None);
    }

    #[test]
    fn missing_file_routes_to_dataless() {
        let out = build_from_paths(vec![
            PathBuf::from("/nowhere/20240131_MA_O63x_TPSFo_S1_B2.xls"),
            PathBuf::from("/nowhere/notes.xls"),
        ]);
        assert!(out.dataset.is_empty());
        assert_eq!(out.unprocessed, vec![PathBuf::from("/nowhere/notes.xls")]);
        assert_eq!(out.dataless.len(), 1);
        assert!(matches!(
            out.dataless[0].reason,
            DatalessReason::Extract(ExtractError::FileMissing(_))
        ));
    }

    #[test]
    fn metadata_errors_convert_into_reasons() {
        let reason: DatalessReason = MetadataError::EmptyToken.into();
        assert!(matches!(reason, DatalessReason::Metadata(_)));
    }
}
