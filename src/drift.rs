use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::Serialize;

use crate::color::{metric_color, to_hex};
use crate::config::PipelineConfig;
use crate::data::filter::{RecordFilter, filter_records};
use crate::data::model::{Dataset, Metric, Record};
use crate::error::DriftError;

// ---------------------------------------------------------------------------
// Query and result types
// ---------------------------------------------------------------------------

/// One drift query: which rows, how many prior dates, and the warning threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct DriftQuery {
    pub filter: RecordFilter,
    /// Maximum number of prior dates averaged into the baseline.
    pub consider_limit: usize,
    /// Percent; a metric warns when `|change| > warning_percentage`.
    pub warning_percentage: f64,
}

impl DriftQuery {
    pub fn new(filter: RecordFilter, config: &PipelineConfig) -> Self {
        Self {
            filter,
            consider_limit: config.consider_limit,
            warning_percentage: config.warning_percentage,
        }
    }

    fn validate(&self) -> Result<(), DriftError> {
        if self.consider_limit == 0 {
            return Err(DriftError::InvalidQuery(
                "consider_limit must be at least 1".into(),
            ));
        }
        if !(self.warning_percentage.is_finite() && self.warning_percentage > 0.0) {
            return Err(DriftError::InvalidQuery(format!(
                "warning_percentage must be positive, got {}",
                self.warning_percentage
            )));
        }
        Ok(())
    }
}

/// Mean and sample standard deviation of one metric on one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    /// `None` when the metric was not measured that day.
    pub mean: Option<f64>,
    /// `None` with fewer than two measurements.
    pub std: Option<f64>,
}

/// Chart series of one active metric, ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    pub metric: Metric,
    pub color: String,
    pub points: Vec<SeriesPoint>,
}

/// Baseline comparison of one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRow {
    pub metric: Metric,
    /// Mean of the per-date means over the comparison window.
    pub window_mean: Option<f64>,
    /// Per-date mean on the most recent date.
    pub latest_mean: Option<f64>,
    /// `None` when either side is missing or the baseline is zero.
    pub percentage_change: Option<f64>,
    pub warning: bool,
}

/// Everything a renderer needs for one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriftReport {
    pub label: String,
    pub title: String,
    pub warning: bool,
    pub consider_limit: usize,
    pub latest_date: NaiveDate,
    /// Prior dates used as the baseline, most recent first.
    pub window_dates: Vec<NaiveDate>,
    pub series: Vec<MetricSeries>,
    pub changes: Vec<ChangeRow>,
    /// The filtered rows the figures were computed from.
    pub considered: Vec<Record>,
}

// ---------------------------------------------------------------------------
// Statistics helpers
// ---------------------------------------------------------------------------

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Relative change in percent. Undefined for a missing or zero baseline.
pub fn percentage_change(baseline: Option<f64>, current: Option<f64>) -> Option<f64> {
    let (baseline, current) = (baseline?, current?);
    if baseline == 0.0 {
        return None;
    }
    Some((current - baseline) / baseline * 100.0)
}

fn status_title(label: &str, warning: bool) -> String {
    if warning {
        format!("🔴🔴🔴 {label} 🔴🔴🔴")
    } else {
        format!("🟢🟢🟢 {label} 🟢🟢🟢")
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Compare the most recent date of the filtered rows against the prior dates.
///
/// Metrics with no value in any filtered row are left out. The baseline is the
/// mean of the per-date means of up to `consider_limit` dates before the most
/// recent one; a metric without a defined percentage change never warns.
pub fn analyze(dataset: &Dataset, query: &DriftQuery) -> Result<DriftReport, DriftError> {
    let result = run_analysis(dataset, query);
    match &result {
        Ok(_) => {}
        Err(DriftError::NoData) => debug!("no rows for {}", query.filter.label()),
        Err(e) => warn!("drift analysis for {} failed: {e}", query.filter.label()),
    }
    result
}

fn run_analysis(dataset: &Dataset, query: &DriftQuery) -> Result<DriftReport, DriftError> {
    query.validate()?;

    let rows = filter_records(dataset, &query.filter);
    if rows.is_empty() {
        return Err(DriftError::NoData);
    }

    let active: Vec<Metric> = Metric::ALL
        .into_iter()
        .filter(|m| rows.iter().any(|r| m.value(r).is_some()))
        .collect();

    let mut by_date: BTreeMap<NaiveDate, Vec<&Record>> = BTreeMap::new();
    for &rec in &rows {
        by_date.entry(rec.date).or_default().push(rec);
    }

    let series: Vec<MetricSeries> = active
        .iter()
        .map(|&metric| daily_series(metric, &by_date))
        .collect::<Result<_, _>>()?;

    let mut dates_desc = by_date.keys().rev().copied();
    let latest_date = dates_desc
        .next()
        .ok_or_else(|| DriftError::Internal("no dates after grouping".into()))?;
    let window_dates: Vec<NaiveDate> = dates_desc.take(query.consider_limit).collect();

    let changes: Vec<ChangeRow> = series
        .iter()
        .map(|s| change_row(s, latest_date, &window_dates, query.warning_percentage))
        .collect();

    let warning = changes.iter().any(|c| c.warning);
    let label = query.filter.label();
    let title = status_title(&label, warning);
    debug!("{title}: {} rows, {} active metrics", rows.len(), active.len());

    Ok(DriftReport {
        label,
        title,
        warning,
        consider_limit: query.consider_limit,
        latest_date,
        window_dates,
        series,
        changes,
        considered: rows.into_iter().cloned().collect(),
    })
}

fn daily_series(
    metric: Metric,
    by_date: &BTreeMap<NaiveDate, Vec<&Record>>,
) -> Result<MetricSeries, DriftError> {
    let mut points = Vec::with_capacity(by_date.len());
    for (date, recs) in by_date {
        let values: Vec<f64> = recs.iter().filter_map(|r| metric.value(r)).collect();
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(DriftError::Internal(format!(
                "non-finite {metric} value {bad} on {date}"
            )));
        }
        points.push(SeriesPoint {
            date: *date,
            mean: mean(&values),
            std: sample_std(&values),
        });
    }
    Ok(MetricSeries {
        metric,
        color: to_hex(metric_color(metric)),
        points,
    })
}

fn change_row(
    series: &MetricSeries,
    latest_date: NaiveDate,
    window_dates: &[NaiveDate],
    warning_percentage: f64,
) -> ChangeRow {
    let mean_on = |date: NaiveDate| {
        series
            .points
            .iter()
            .find(|p| p.date == date)
            .and_then(|p| p.mean)
    };

    let window_means: Vec<f64> = window_dates.iter().filter_map(|d| mean_on(*d)).collect();
    let window_mean = mean(&window_means);
    let latest_mean = mean_on(latest_date);
    let change = percentage_change(window_mean, latest_mean);

    ChangeRow {
        metric: series.metric,
        window_mean,
        latest_mean,
        percentage_change: change,
        warning: change.is_some_and(|c| c.abs() > warning_percentage),
    }
}

// ---------------------------------------------------------------------------
// Report sweep
// ---------------------------------------------------------------------------

/// Run one query per microscope / objective pair found in the dataset.
/// Pairs without data or with a failed analysis are skipped.
pub fn sweep(dataset: &Dataset, config: &PipelineConfig) -> Vec<DriftReport> {
    let mut reports = Vec::new();
    for microscope in dataset.unique("microscope") {
        for objective in dataset.objectives_for(microscope) {
            let query = DriftQuery::new(RecordFilter::instrument(microscope, objective), config);
            if let Ok(report) = analyze(dataset, &query) {
                reports.push(report);
            }
        }
    }
    let flagged = reports.iter().filter(|r| r.warning).count();
    info!("{} drift reports, {flagged} with warnings", reports.len());
    reports
}

/// Write sweep results as pretty JSON.
pub fn write_reports(reports: &[DriftReport], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(reports).context("serializing drift reports")?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
