//! Statistical outlier detection over the analysis pollutants.

use tracing::info;

use crate::cleaning::utility;
use crate::error::{Error, Result};
use crate::table::{ANALYSIS_POLLUTANTS, Table, Value};

/// Tukey fences for one column's non-null values.
fn iqr_bounds(values: &[f64]) -> (f64, f64) {
    let q1 = utility::percentile(values, 0.25);
    let q3 = utility::percentile(values, 0.75);
    let iqr = q3 - q1;
    (q1 - 1.5 * iqr, q3 + 1.5 * iqr)
}

/// Flag values outside `[Q1 - 1.5*IQR, Q3 + 1.5*IQR]` per pollutant.
///
/// By default this only counts and logs: extreme pollution events are often
/// real, so nothing is discarded unless `mask` is set, in which case flagged
/// cells are nulled the same way range validation masks them. Quartiles are
/// computed over non-null values only. An unrecognized `method` is a
/// configuration error, not a silent fallback.
pub fn detect_outliers(mut table: Table, method: &str, mask: bool) -> Result<Table> {
    if method != "iqr" {
        return Err(Error::config(format!(
            "unknown outlier detection method: {method}"
        )));
    }

    info!(method, mask, "detecting outliers");

    for column in ANALYSIS_POLLUTANTS {
        if !table.has_column(column) {
            continue;
        }
        let values = table.numeric_column(column);
        if values.is_empty() {
            continue;
        }
        let (lower, upper) = iqr_bounds(&values);

        let mut outliers = 0usize;
        for row in &mut table.rows {
            if let Some(v) = row.get(column).as_f64() {
                if v < lower || v > upper {
                    outliers += 1;
                    if mask {
                        row.set(column, Value::Null);
                    }
                }
            }
        }

        if outliers > 0 {
            info!(column, count = outliers, lower, upper, "outliers detected");
        }
    }

    Ok(table)
}
