//! Aggregate quality metrics over a table snapshot.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::cleaning::utility;
use crate::table::Table;

/// Earliest and latest observation timestamps in a table.
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Descriptive statistics for one numeric column.
#[derive(Debug, Serialize, PartialEq)]
pub struct ColumnSummary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Snapshot metrics computed from a table; never persisted as state, always
/// recomputed from the table it describes.
#[derive(Debug, Serialize)]
pub struct QualityReport {
    pub total_records: usize,
    pub total_columns: usize,
    pub date_range: DateRange,
    pub distinct_cities: usize,
    /// Null count per column.
    pub missing_values: BTreeMap<String, usize>,
    /// Null percentage per column, two decimal places.
    pub missing_percentage: BTreeMap<String, f64>,
    /// Mean of per-column non-null percentages, two decimal places.
    /// Defined as 0 for an empty table.
    pub completeness: f64,
    /// Columns with at least one numeric value; all-null columns are
    /// omitted rather than carrying non-finite statistics.
    pub numeric_summary: BTreeMap<String, ColumnSummary>,
}

/// Compute quality metrics for any table, raw or cleaned.
///
/// Pure read; safe at any pipeline stage. Percentage metrics on an empty
/// table are 0, never a division failure.
pub fn report(table: &Table) -> QualityReport {
    info!("generating data quality report");

    let total = table.len();

    let mut start = None;
    let mut end = None;
    for ts in table.rows.iter().filter_map(|r| r.timestamp) {
        start = Some(match start {
            None => ts,
            Some(s) if ts < s => ts,
            Some(s) => s,
        });
        end = Some(match end {
            None => ts,
            Some(e) if ts > e => ts,
            Some(e) => e,
        });
    }

    let distinct_cities = table
        .rows
        .iter()
        .filter_map(|r| r.city_key.as_deref())
        .collect::<HashSet<_>>()
        .len();

    let mut missing_values = BTreeMap::new();
    let mut missing_percentage = BTreeMap::new();
    let mut per_column_completeness = Vec::with_capacity(table.columns.len());
    for column in &table.columns {
        let missing = table.null_count(column);
        missing_values.insert(column.clone(), missing);
        missing_percentage.insert(
            column.clone(),
            utility::round2(utility::pct(missing, total)),
        );
        per_column_completeness.push(utility::round2(utility::pct(total - missing, total)));
    }
    let completeness = utility::round2(utility::mean(&per_column_completeness));

    let mut numeric_summary = BTreeMap::new();
    for column in &table.columns {
        let values = table.numeric_column(column);
        if values.is_empty() {
            continue;
        }
        let mean = utility::mean(&values);
        numeric_summary.insert(
            column.clone(),
            ColumnSummary {
                count: values.len(),
                mean,
                std: utility::stddev(&values, mean),
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            },
        );
    }

    QualityReport {
        total_records: total,
        total_columns: table.columns.len(),
        date_range: DateRange { start, end },
        distinct_cities,
        missing_values,
        missing_percentage,
        completeness,
        numeric_summary,
    }
}
