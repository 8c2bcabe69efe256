use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use super::model::{Dataset, Record};

// ---------------------------------------------------------------------------
// Filter predicate: which rows take part in a drift query
// ---------------------------------------------------------------------------

/// Exact-match filter on the categorical columns plus an optional date range.
/// A `None` field means "no filter" on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordFilter {
    pub microscope: Option<String>,
    pub objective: Option<String>,
    pub test: Option<String>,
    pub bead_size: Option<String>,
    pub bead_number: Option<String>,
    /// Inclusive start, `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive end, `YYYY-MM-DD`.
    pub end_date: Option<String>,
}

impl RecordFilter {
    /// Filter on one microscope / objective pair.
    pub fn instrument(microscope: &str, objective: &str) -> Self {
        Self {
            microscope: Some(microscope.to_string()),
            objective: Some(objective.to_string()),
            ..Self::default()
        }
    }

    /// The inclusive date range, only when both ends parse as calendar dates.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let parse = |s: &Option<String>| {
            s.as_deref()
                .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
        };
        match (parse(&self.start_date), parse(&self.end_date)) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    /// Chart/file label: `FIG` plus every given microscope, objective, test and date bound.
    pub fn label(&self) -> String {
        let mut label = String::from("FIG");
        for part in [
            &self.microscope,
            &self.objective,
            &self.test,
            &self.start_date,
            &self.end_date,
        ]
        .into_iter()
        .flatten()
        .filter(|p| !p.is_empty())
        {
            label.push('_');
            label.push_str(part);
        }
        label
    }

    fn matches_categories(&self, rec: &Record) -> bool {
        fn passes(want: &Option<String>, have: Option<&str>) -> bool {
            match want {
                None => true,
                Some(want) => have == Some(want.as_str()),
            }
        }
        passes(&self.microscope, Some(&rec.microscope))
            && passes(&self.objective, Some(&rec.objective))
            && passes(&self.test, Some(&rec.test))
            && passes(&self.bead_size, rec.bead_size.as_deref())
            && passes(&self.bead_number, rec.bead_number.as_deref())
    }
}

/// Return indices of records that pass every active filter.
///
/// A date range applies only when both bounds parse; otherwise dates are not
/// filtered at all.
pub fn filtered_indices(dataset: &Dataset, filter: &RecordFilter) -> Vec<usize> {
    let range = filter.date_range();
    if range.is_none() && (filter.start_date.is_some() || filter.end_date.is_some()) {
        debug!(
            "ignoring incomplete or unparseable date range {:?}..{:?}",
            filter.start_date, filter.end_date
        );
    }

    dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| {
            if let Some((start, end)) = range {
                if rec.date < start || rec.date > end {
                    return false;
                }
            }
            filter.matches_categories(rec)
        })
        .map(|(i, _)| i)
        .collect()
}

/// The records passing the filter, in dataset order.
pub fn filter_records<'a>(dataset: &'a Dataset, filter: &RecordFilter) -> Vec<&'a Record> {
    filtered_indices(dataset, filter)
        .into_iter()
        .map(|i| &dataset.records[i])
        .collect()
}
