use std::path::Path;

use bead_qc::data::{loader, writer};
use bead_qc::drift::{sweep, write_reports};
use bead_qc::{
    DatalessReason, DriftError, DriftQuery, ExtractError, Metric, PipelineConfig, RecordFilter,
    analyze, build_dataset,
};

fn write_report(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn psf(values: [f64; 3]) -> String {
    format!(
        "Report\nMeasured FWHM\tX\t{}\t{}\t{}\n",
        values[0], values[1], values[2]
    )
}

fn chrom_dual(value: f64) -> String {
    format!("Uncalibrated distances\nChannel 1\t3.1 (px)\nCalibrated distances\nChannel 1\t{value} (um)\n")
}

fn config_for(root: &Path) -> PipelineConfig {
    PipelineConfig {
        root_dir: root.to_path_buf(),
        write_parquet: true,
        ..PipelineConfig::default()
    }
}

fn seed_tree(root: &Path) {
    let data = root.join("data");
    let dates = ["20240101", "20240108", "20240115", "20240122"];
    let far_red = [0.30, 0.30, 0.30, 0.60];
    for (date, fr) in dates.iter().zip(far_red) {
        write_report(
            &data,
            &format!("A/{date}_MA_O63x_TPSFo_S100nm_B1/report.xls"),
            &psf([fr, 0.25, 0.20]),
        );
        write_report(
            &data,
            &format!("A/{date}_MA_O63x_TChromDual_S500nm_B2/report.xls"),
            &chrom_dual(0.05),
        );
    }
    // Recognised but unusable.
    write_report(
        &data,
        "A/20240122_MA_O63x_TPSFo_S100nm_B3/report.xls",
        "Report\nno fwhm here\n",
    );
    write_report(
        &data,
        "A/20240122_MA_O63x_TChromTriple_S100nm_B4/report.xls",
        "Calibrated distances\nChannel 1\t0.1 (um)\t0.2 (um)\n",
    );
    write_report(
        &data,
        "A/20240122_MA_O63x_TPSFo_S100nm_B5/report.xls",
        &psf([0.3, 1.2, 0.2]),
    );
    // Not following the naming grammar, or not a report extension.
    write_report(&data, "A/notes.xls", "free text\n");
    write_report(&data, "A/20240122_MA_O63x_TPSFo_S100nm_B6/report.txt", &psf([0.3; 3]));
}

#[test]
fn process_classifies_every_file() {
    let temp = tempfile::tempdir().expect("failed creating tempdir");
    seed_tree(temp.path());
    let config = config_for(temp.path());

    let output = build_dataset(&config);
    assert_eq!(output.dataset.len(), 8);
    assert_eq!(output.unprocessed.len(), 1);
    assert!(output.unprocessed[0].ends_with("A/notes.xls"));
    assert_eq!(output.dataless.len(), 3);

    let reasons: Vec<&DatalessReason> = output.dataless.iter().map(|d| &d.reason).collect();
    assert!(reasons.iter().any(|r| matches!(
        r,
        DatalessReason::Extract(ExtractError::NotFound(_))
    )));
    assert!(reasons.iter().any(|r| matches!(
        r,
        DatalessReason::Extract(ExtractError::ArityMismatch { expected: 3, found: 2 })
    )));
    assert!(reasons.iter().any(|r| matches!(
        r,
        DatalessReason::Extract(ExtractError::OutOfRange(_))
    )));

    let dual_rows = output
        .dataset
        .records
        .iter()
        .filter(|r| r.test == "ChromDual")
        .count();
    assert_eq!(dual_rows, 4);
}

#[test]
fn artifacts_round_trip_and_feed_drift() {
    let temp = tempfile::tempdir().expect("failed creating tempdir");
    seed_tree(temp.path());
    let config = config_for(temp.path());

    let output = build_dataset(&config);
    writer::write_artifacts(&output, &config).unwrap();

    let unprocessed = std::fs::read_to_string(config.unprocessed_list()).unwrap();
    assert_eq!(unprocessed.lines().count(), 1);
    let dataless = std::fs::read_to_string(config.dataless_list()).unwrap();
    assert_eq!(dataless.lines().count(), 3);

    let from_csv = loader::load_file(&config.records_csv()).unwrap();
    let from_parquet = loader::load_file(&config.records_parquet()).unwrap();
    assert_eq!(from_csv.records, output.dataset.records);
    assert_eq!(from_parquet.records, output.dataset.records);

    let query = DriftQuery {
        filter: RecordFilter {
            test: Some("PSFo".into()),
            ..RecordFilter::instrument("A", "63x")
        },
        consider_limit: 3,
        warning_percentage: 15.0,
    };
    let report = analyze(&from_csv, &query).unwrap();
    assert_eq!(report.label, "FIG_A_63x_PSFo");
    assert!(report.warning);
    let far_red = report
        .changes
        .iter()
        .find(|c| c.metric == Metric::FarRed)
        .unwrap();
    assert!((far_red.percentage_change.unwrap() - 100.0).abs() < 1e-9);
    let active: Vec<Metric> = report.changes.iter().map(|c| c.metric).collect();
    assert_eq!(active, vec![Metric::FarRed, Metric::Red, Metric::Uv]);
}

#[test]
fn report_sweep_writes_json() {
    let temp = tempfile::tempdir().expect("failed creating tempdir");
    seed_tree(temp.path());
    let config = config_for(temp.path());
    let output = build_dataset(&config);
    writer::write_artifacts(&output, &config).unwrap();

    let reports = sweep(&output.dataset, &config);
    assert_eq!(reports.len(), 1);
    write_reports(&reports, &config.drift_report()).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(config.drift_report()).unwrap()).unwrap();
    assert_eq!(json[0]["label"], "FIG_A_63x");
    assert_eq!(json[0]["warning"], true);
    assert_eq!(json[0]["series"][0]["metric"], "far_red");
}

#[test]
fn unknown_instrument_is_no_data() {
    let temp = tempfile::tempdir().expect("failed creating tempdir");
    seed_tree(temp.path());
    let output = build_dataset(&config_for(temp.path()));
    let query = DriftQuery {
        filter: RecordFilter::instrument("B", "63x"),
        consider_limit: 3,
        warning_percentage: 15.0,
    };
    assert_eq!(analyze(&output.dataset, &query), Err(DriftError::NoData));
}
