//! Calendar and categorical features derived at the end of cleaning.

use chrono::{Datelike, Timelike};
use tracing::info;

use crate::table::{DERIVED_COLUMNS, Table};

/// Human-readable label for an air quality index value. Only the five
/// nominal index values map; anything else has no label.
fn aqi_category(aqi: f64) -> Option<&'static str> {
    if aqi.fract() != 0.0 {
        return None;
    }
    match aqi as i64 {
        1 => Some("Good"),
        2 => Some("Fair"),
        3 => Some("Moderate"),
        4 => Some("Poor"),
        5 => Some("Very Poor"),
        _ => None,
    }
}

/// Append derived columns and populate them on every row.
///
/// `hour`, `day_of_week` (Monday = 0), `month` and `year` come from the
/// timestamp and stay null when it is missing. `is_weekend` is true for
/// Saturday and Sunday. `aqi_category` labels the five nominal index
/// values; an unmapped `aqi` yields a null label, not an error.
/// `pm_total = pm2_5 + pm10`, null if either operand is null.
pub fn add_derived_features(mut table: Table) -> Table {
    info!("adding derived features");

    for column in DERIVED_COLUMNS {
        table.add_column(column);
    }

    for row in &mut table.rows {
        if let Some(ts) = row.timestamp {
            let day_of_week = i64::from(ts.weekday().num_days_from_monday());
            row.hour = Some(i64::from(ts.hour()));
            row.day_of_week = Some(day_of_week);
            row.month = Some(i64::from(ts.month()));
            row.year = Some(i64::from(ts.year()));
            row.is_weekend = Some(day_of_week >= 5);
        }
        row.aqi_category = row.aqi.and_then(aqi_category).map(str::to_string);
        row.pm_total = match (row.pm2_5, row.pm10) {
            (Some(fine), Some(coarse)) => Some(fine + coarse),
            _ => None,
        };
    }

    info!(added = DERIVED_COLUMNS.len(), "derived features added");

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Observation;
    use chrono::{TimeZone, Utc};

    fn row_at(y: i32, mo: u32, d: u32, h: u32) -> Observation {
        let mut row = Observation::default();
        row.timestamp = Some(Utc.with_ymd_and_hms(y, mo, d, h, 30, 0).unwrap());
        row.aqi = Some(3.0);
        row
    }

    #[test]
    fn test_calendar_fields_from_timestamp() {
        let mut table = Table::raw();
        // 2026-01-05 is a Monday.
        table.push(row_at(2026, 1, 5, 14));

        let table = add_derived_features(table);
        let row = &table.rows[0];
        assert_eq!(row.hour, Some(14));
        assert_eq!(row.day_of_week, Some(0));
        assert_eq!(row.month, Some(1));
        assert_eq!(row.year, Some(2026));
        assert_eq!(row.is_weekend, Some(false));
    }

    #[test]
    fn test_weekend_flag() {
        let mut table = Table::raw();
        // 2026-01-03 is a Saturday, 2026-01-04 a Sunday.
        table.push(row_at(2026, 1, 3, 8));
        table.push(row_at(2026, 1, 4, 8));
        table.push(row_at(2026, 1, 2, 8));

        let table = add_derived_features(table);
        assert_eq!(table.rows[0].day_of_week, Some(5));
        assert_eq!(table.rows[0].is_weekend, Some(true));
        assert_eq!(table.rows[1].day_of_week, Some(6));
        assert_eq!(table.rows[1].is_weekend, Some(true));
        assert_eq!(table.rows[2].is_weekend, Some(false));
    }

    #[test]
    fn test_aqi_category_labels() {
        assert_eq!(aqi_category(1.0), Some("Good"));
        assert_eq!(aqi_category(2.0), Some("Fair"));
        assert_eq!(aqi_category(3.0), Some("Moderate"));
        assert_eq!(aqi_category(4.0), Some("Poor"));
        assert_eq!(aqi_category(5.0), Some("Very Poor"));
        assert_eq!(aqi_category(7.0), None);
        assert_eq!(aqi_category(2.5), None);
    }

    #[test]
    fn test_unmapped_aqi_yields_null_category() {
        let mut table = Table::raw();
        let mut row = row_at(2026, 1, 5, 0);
        row.aqi = Some(9.0);
        table.push(row);

        let table = add_derived_features(table);
        assert_eq!(table.rows[0].aqi_category, None);
    }

    #[test]
    fn test_pm_total_propagates_null() {
        let mut table = Table::raw();
        let mut both = row_at(2026, 1, 5, 0);
        both.pm2_5 = Some(10.0);
        both.pm10 = Some(20.0);
        let mut half = row_at(2026, 1, 5, 1);
        half.pm10 = Some(20.0);
        table.push(both);
        table.push(half);

        let table = add_derived_features(table);
        assert_eq!(table.rows[0].pm_total, Some(30.0));
        assert_eq!(table.rows[1].pm_total, None);
    }

    #[test]
    fn test_missing_timestamp_leaves_calendar_fields_null() {
        let mut table = Table::raw();
        let mut row = Observation::default();
        row.aqi = Some(3.0);
        row.pm2_5 = Some(1.0);
        row.pm10 = Some(2.0);
        table.push(row);

        let table = add_derived_features(table);
        let row = &table.rows[0];
        assert_eq!(row.hour, None);
        assert_eq!(row.is_weekend, None);
        // Non-calendar derivations still apply.
        assert_eq!(row.aqi_category, Some("Moderate".to_string()));
        assert_eq!(row.pm_total, Some(3.0));
    }

    #[test]
    fn test_derived_columns_join_the_layout() {
        let table = add_derived_features(Table::raw());
        for column in DERIVED_COLUMNS {
            assert!(table.has_column(column));
        }
        assert_eq!(table.columns.len(), 21);
    }
}
