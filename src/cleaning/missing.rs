//! Gap repair: temporal carry-forward for pollutants, hard drop for rows
//! without the critical index value.

use std::collections::HashMap;

use tracing::info;

use crate::cleaning::utility;
use crate::table::{POLLUTANT_COLUMNS, Table, Value};

/// A gap longer than this many consecutive rows is left unfilled.
const FILL_LIMIT: usize = 3;

/// Repair missing values.
///
/// Rows are first sorted by timestamp (stable, missing timestamps last).
/// Each pollutant column is then forward-filled independently per city: the
/// last non-null value carries into at most [`FILL_LIMIT`] consecutive null
/// rows of the same city. Carry-forward never crosses a city boundary, and
/// rows without a city key are never filled. Finally every row whose `aqi`
/// is still null is dropped; `aqi` itself is never filled.
pub fn resolve_missing(mut table: Table) -> Table {
    info!("handling missing values");

    let total = table.len();
    for column in &table.columns {
        let missing = table.null_count(column);
        if missing > 0 {
            let pct = utility::round2(utility::pct(missing, total));
            info!(column = column.as_str(), missing_pct = pct, "missing values");
        }
    }

    table.sort_by_timestamp();

    for column in POLLUTANT_COLUMNS {
        if !table.has_column(column) {
            continue;
        }
        // Per-city fill state: last seen value and the length of the
        // current null run.
        let mut state: HashMap<String, (Option<f64>, usize)> = HashMap::new();
        for row in &mut table.rows {
            let Some(city) = row.city_key.clone() else {
                continue;
            };
            let entry = state.entry(city).or_insert((None, 0));
            match row.get(column).as_f64() {
                Some(v) => {
                    *entry = (Some(v), 0);
                }
                None => {
                    entry.1 += 1;
                    if entry.1 <= FILL_LIMIT {
                        if let Some(last) = entry.0 {
                            row.set(column, Value::Float(last));
                        }
                    }
                }
            }
        }
    }

    let before_drop = table.len();
    table.rows.retain(|r| r.aqi.is_some());
    let dropped = before_drop - table.len();
    if dropped > 0 {
        info!(dropped, "dropped rows with missing AQI");
    }

    table
}
