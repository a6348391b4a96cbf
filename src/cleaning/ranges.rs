//! Plausibility bounds for pollutant and index readings.

use tracing::{info, warn};

use crate::config::QualitySettings;
use crate::table::{Table, Value};

/// Null out every value strictly outside its configured `[min, max]` bound.
///
/// Columns without a configured bound, and configured bounds whose column is
/// not in the table, are skipped silently. Null cells are left alone. Never
/// fails; the worst case is an all-null column.
pub fn validate_ranges(mut table: Table, quality: &QualitySettings) -> Table {
    info!("validating data ranges");

    for (column, (min, max)) in &quality.ranges {
        if !table.has_column(column) {
            continue;
        }

        let mut out_of_range = 0usize;
        for row in &mut table.rows {
            if let Some(v) = row.get(column).as_f64() {
                if v < *min || v > *max {
                    row.set(column, Value::Null);
                    out_of_range += 1;
                }
            }
        }

        if out_of_range > 0 {
            warn!(
                column = column.as_str(),
                count = out_of_range,
                min,
                max,
                "values out of range"
            );
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Observation;

    fn quality() -> QualitySettings {
        QualitySettings::default()
    }

    fn row_with(pm2_5: Option<f64>, aqi: Option<f64>) -> Observation {
        let mut row = Observation::default();
        row.pm2_5 = pm2_5;
        row.aqi = aqi;
        row
    }

    #[test]
    fn test_below_bound_is_nulled() {
        let mut table = Table::raw();
        table.push(row_with(Some(-5.0), Some(2.0)));

        let table = validate_ranges(table, &quality());
        assert_eq!(table.rows[0].pm2_5, None);
        assert_eq!(table.rows[0].aqi, Some(2.0));
    }

    #[test]
    fn test_in_range_is_unchanged() {
        let mut table = Table::raw();
        table.push(row_with(Some(50.0), Some(2.0)));

        let table = validate_ranges(table, &quality());
        assert_eq!(table.rows[0].pm2_5, Some(50.0));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let mut table = Table::raw();
        table.push(row_with(Some(0.0), Some(5.0)));
        table.push(row_with(Some(500.0), Some(1.0)));
        table.push(row_with(Some(500.1), Some(6.0)));

        let table = validate_ranges(table, &quality());
        assert_eq!(table.rows[0].pm2_5, Some(0.0));
        assert_eq!(table.rows[0].aqi, Some(5.0));
        assert_eq!(table.rows[1].pm2_5, Some(500.0));
        assert_eq!(table.rows[1].aqi, Some(1.0));
        assert_eq!(table.rows[2].pm2_5, None);
        assert_eq!(table.rows[2].aqi, None);
    }

    #[test]
    fn test_null_cells_are_left_alone() {
        let mut table = Table::raw();
        table.push(row_with(None, Some(3.0)));

        let table = validate_ranges(table, &quality());
        assert_eq!(table.rows[0].pm2_5, None);
        assert_eq!(table.rows[0].aqi, Some(3.0));
    }

    #[test]
    fn test_column_absent_from_layout_is_skipped() {
        let mut table = Table::with_columns(&["timestamp", "city_key", "aqi"]);
        let mut row = Observation::default();
        // Out of range, but pm2_5 is not part of this table's layout.
        row.pm2_5 = Some(9999.0);
        row.aqi = Some(3.0);
        table.push(row);

        let table = validate_ranges(table, &quality());
        assert_eq!(table.rows[0].pm2_5, Some(9999.0));
    }
}
