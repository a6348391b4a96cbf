//! In-memory tabular model for air-quality observations.
//!
//! A [`Table`] is an ordered list of column names plus a vector of
//! [`Observation`] rows. The column list is authoritative: schema checks,
//! null accounting, and CSV layout all follow it, so a raw table carries no
//! derived columns until the feature stage adds them.

use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};

/// Columns present in a raw collected batch, in CSV order.
pub const RAW_COLUMNS: [&str; 14] = [
    "timestamp",
    "city_key",
    "city_name",
    "country",
    "fetch_timestamp",
    "aqi",
    "co",
    "no",
    "no2",
    "o3",
    "so2",
    "pm2_5",
    "pm10",
    "nh3",
];

/// Columns appended by the feature-derivation stage, in CSV order.
pub const DERIVED_COLUMNS: [&str; 7] = [
    "hour",
    "day_of_week",
    "month",
    "year",
    "is_weekend",
    "aqi_category",
    "pm_total",
];

/// Columns the schema gate requires before cleaning may proceed.
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "timestamp",
    "city_key",
    "city_name",
    "country",
    "aqi",
    "pm2_5",
    "pm10",
    "no2",
    "o3",
    "co",
    "so2",
];

/// The eight pollutant concentration columns subject to forward-fill.
pub const POLLUTANT_COLUMNS: [&str; 8] = [
    "co", "no", "no2", "o3", "so2", "pm2_5", "pm10", "nh3",
];

/// The six pollutants examined by range masking and outlier detection.
pub const ANALYSIS_POLLUTANTS: [&str; 6] = ["pm2_5", "pm10", "no2", "o3", "co", "so2"];

/// A single cell value.
///
/// `Null` stands in for an absent measurement; it is what range masking
/// writes and what forward-fill repairs.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(String),
    Timestamp(DateTime<Utc>),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the cell. Integers widen to `f64`; everything
    /// non-numeric is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Render the cell as a CSV field. `Null` renders empty.
    pub fn to_field(&self) -> String {
        match self {
            Value::Float(v) => format!("{v}"),
            Value::Int(v) => format!("{v}"),
            Value::Bool(v) => format!("{v}"),
            Value::Text(v) => v.clone(),
            Value::Timestamp(v) => v.to_rfc3339_opts(SecondsFormat::Secs, true),
            Value::Null => String::new(),
        }
    }

    /// Parse a CSV field according to the column it belongs to. Empty or
    /// unparseable fields become `Null` rather than an error; a damaged
    /// cell reads back as a missing measurement.
    pub fn parse(column: &str, field: &str) -> Value {
        if field.is_empty() {
            return Value::Null;
        }
        match column {
            "timestamp" | "fetch_timestamp" => DateTime::parse_from_rfc3339(field)
                .map(|dt| Value::Timestamp(dt.with_timezone(&Utc)))
                .unwrap_or(Value::Null),
            "city_key" | "city_name" | "country" | "aqi_category" => {
                Value::Text(field.to_string())
            }
            "hour" | "day_of_week" | "month" | "year" => field
                .parse::<i64>()
                .map(Value::Int)
                .unwrap_or(Value::Null),
            "is_weekend" => field.parse::<bool>().map(Value::Bool).unwrap_or(Value::Null),
            _ => field.parse::<f64>().map(Value::Float).unwrap_or(Value::Null),
        }
    }
}

/// One air-quality reading for one city at one instant.
///
/// Every field is optional; a freshly parsed row may be missing anything,
/// and the cleaning stages narrow that down.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    pub timestamp: Option<DateTime<Utc>>,
    pub city_key: Option<String>,
    pub city_name: Option<String>,
    pub country: Option<String>,
    pub fetch_timestamp: Option<DateTime<Utc>>,
    pub aqi: Option<f64>,
    pub co: Option<f64>,
    pub no: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub nh3: Option<f64>,
    pub hour: Option<i64>,
    pub day_of_week: Option<i64>,
    pub month: Option<i64>,
    pub year: Option<i64>,
    pub is_weekend: Option<bool>,
    pub aqi_category: Option<String>,
    pub pm_total: Option<f64>,
}

impl Observation {
    /// Read the cell for `column`. Unknown columns read as `Null`.
    pub fn get(&self, column: &str) -> Value {
        fn float(v: Option<f64>) -> Value {
            v.map(Value::Float).unwrap_or(Value::Null)
        }
        fn int(v: Option<i64>) -> Value {
            v.map(Value::Int).unwrap_or(Value::Null)
        }
        fn text(v: &Option<String>) -> Value {
            v.clone().map(Value::Text).unwrap_or(Value::Null)
        }
        match column {
            "timestamp" => self
                .timestamp
                .map(Value::Timestamp)
                .unwrap_or(Value::Null),
            "city_key" => text(&self.city_key),
            "city_name" => text(&self.city_name),
            "country" => text(&self.country),
            "fetch_timestamp" => self
                .fetch_timestamp
                .map(Value::Timestamp)
                .unwrap_or(Value::Null),
            "aqi" => float(self.aqi),
            "co" => float(self.co),
            "no" => float(self.no),
            "no2" => float(self.no2),
            "o3" => float(self.o3),
            "so2" => float(self.so2),
            "pm2_5" => float(self.pm2_5),
            "pm10" => float(self.pm10),
            "nh3" => float(self.nh3),
            "hour" => int(self.hour),
            "day_of_week" => int(self.day_of_week),
            "month" => int(self.month),
            "year" => int(self.year),
            "is_weekend" => self.is_weekend.map(Value::Bool).unwrap_or(Value::Null),
            "aqi_category" => text(&self.aqi_category),
            "pm_total" => float(self.pm_total),
            _ => Value::Null,
        }
    }

    /// Write the cell for `column`, coercing where sensible (`Int` widens
    /// into float columns). A type mismatch or `Null` clears the cell;
    /// unknown columns are ignored.
    pub fn set(&mut self, column: &str, value: Value) {
        fn float(value: Value) -> Option<f64> {
            value.as_f64()
        }
        fn int(value: Value) -> Option<i64> {
            match value {
                Value::Int(v) => Some(v),
                _ => None,
            }
        }
        fn text(value: Value) -> Option<String> {
            match value {
                Value::Text(v) => Some(v),
                _ => None,
            }
        }
        fn stamp(value: Value) -> Option<DateTime<Utc>> {
            match value {
                Value::Timestamp(v) => Some(v),
                _ => None,
            }
        }
        match column {
            "timestamp" => self.timestamp = stamp(value),
            "city_key" => self.city_key = text(value),
            "city_name" => self.city_name = text(value),
            "country" => self.country = text(value),
            "fetch_timestamp" => self.fetch_timestamp = stamp(value),
            "aqi" => self.aqi = float(value),
            "co" => self.co = float(value),
            "no" => self.no = float(value),
            "no2" => self.no2 = float(value),
            "o3" => self.o3 = float(value),
            "so2" => self.so2 = float(value),
            "pm2_5" => self.pm2_5 = float(value),
            "pm10" => self.pm10 = float(value),
            "nh3" => self.nh3 = float(value),
            "hour" => self.hour = int(value),
            "day_of_week" => self.day_of_week = int(value),
            "month" => self.month = int(value),
            "year" => self.year = int(value),
            "is_weekend" => {
                self.is_weekend = match value {
                    Value::Bool(v) => Some(v),
                    _ => None,
                }
            }
            "aqi_category" => self.aqi_category = text(value),
            "pm_total" => self.pm_total = float(value),
            _ => {}
        }
    }
}

/// An ordered set of columns plus the rows that populate them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Observation>,
}

impl Table {
    /// An empty table with the raw collection columns.
    pub fn raw() -> Self {
        Self::with_columns(&RAW_COLUMNS)
    }

    /// An empty table with the given columns.
    pub fn with_columns(columns: &[&str]) -> Self {
        Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: Observation) {
        self.rows.push(row);
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Append a column to the layout if it is not already present.
    pub fn add_column(&mut self, name: &str) {
        if !self.has_column(name) {
            self.columns.push(name.to_string());
        }
    }

    /// Count null cells in one column.
    pub fn null_count(&self, column: &str) -> usize {
        self.rows.iter().filter(|r| r.get(column).is_null()).count()
    }

    /// Count null cells across every column in the layout.
    pub fn total_nulls(&self) -> usize {
        self.columns.iter().map(|c| self.null_count(c)).sum()
    }

    /// Non-null numeric values of one column, in row order.
    pub fn numeric_column(&self, column: &str) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|r| r.get(column).as_f64())
            .collect()
    }

    /// Sort rows by timestamp, oldest first. The sort is stable and rows
    /// without a timestamp sink to the end.
    pub fn sort_by_timestamp(&mut self) {
        self.rows.sort_by(|a, b| match (a.timestamp, b.timestamp) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
    }

    /// Drop rows whose `(timestamp, city_key)` pair has already been seen,
    /// keeping the first occurrence. Absent keys compare equal to each
    /// other, so two keyless rows are duplicates.
    pub fn dedup_first_wins(&mut self) {
        let mut seen: HashSet<(Option<DateTime<Utc>>, Option<String>)> = HashSet::new();
        self.rows
            .retain(|r| seen.insert((r.timestamp, r.city_key.clone())));
    }
}
