//! CSV persistence for raw batches and cleaned datasets.
//!
//! Raw batches are named `aqi_data_<stamp>.csv`, cleaned datasets
//! `aqi_cleaned_<stamp>.csv`. The column layout of a written file follows
//! the table's column list exactly.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::WriterBuilder;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::table::{Observation, Table, Value};

/// Prefix shared by every raw batch file.
const RAW_PREFIX: &str = "aqi_data_";

/// Reads and writes observation tables under the configured data
/// directories.
#[derive(Debug, Clone)]
pub struct Storage {
    raw_dir: PathBuf,
    processed_dir: PathBuf,
}

impl Storage {
    pub fn new(raw_dir: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
        Storage {
            raw_dir: raw_dir.into(),
            processed_dir: processed_dir.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Storage::new(&settings.raw_data_dir, &settings.processed_data_dir)
    }

    /// Write a raw batch. A missing filename gets a timestamped default;
    /// a `.csv` extension is appended when absent.
    pub fn store_raw(&self, table: &Table, filename: Option<&str>) -> Result<PathBuf> {
        let name = match filename {
            Some(name) => ensure_csv_extension(name),
            None => format!("{RAW_PREFIX}{}.csv", batch_stamp()),
        };
        let path = self.raw_dir.join(name);
        write_table(&path, table)?;
        info!(records = table.len(), path = %path.display(), "saved raw batch");
        Ok(path)
    }

    /// Load exactly one stored raw batch by filename.
    pub fn load_raw(&self, filename: &str) -> Result<Table> {
        let path = self.raw_dir.join(filename);
        if !path.exists() {
            return Err(Error::not_found(path));
        }
        info!(path = %path.display(), "loading raw data");
        let table = read_table(&path)?;
        info!(
            records = table.len(),
            columns = table.columns.len(),
            "loaded raw data"
        );
        Ok(table)
    }

    /// Filenames of every stored raw batch, sorted, so discovery order is
    /// stable across runs.
    pub fn list_raw_batches(&self) -> Result<Vec<String>> {
        if !self.raw_dir.exists() {
            return Ok(Vec::new());
        }
        let mut batches = Vec::new();
        for entry in fs::read_dir(&self.raw_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(RAW_PREFIX) && name.ends_with(".csv") {
                    batches.push(name.to_string());
                }
            }
        }
        batches.sort();
        Ok(batches)
    }

    /// Load every stored raw batch into one table.
    ///
    /// A batch that fails to parse is logged and skipped, not fatal. The
    /// combined table is deduplicated on `(timestamp, city_key)`, first
    /// occurrence in discovery order winning. No batches at all yields an
    /// empty table, not an error.
    pub fn load_all_raw(&self) -> Result<Table> {
        let batches = self.list_raw_batches()?;
        if batches.is_empty() {
            warn!("no raw data files found");
            return Ok(Table::raw());
        }
        info!(count = batches.len(), "found raw data files");

        let mut combined = Table::raw();
        for name in &batches {
            match read_table(&self.raw_dir.join(name)) {
                Ok(table) => {
                    debug!(file = name.as_str(), records = table.len(), "loaded batch");
                    combined.rows.extend(table.rows);
                }
                Err(e) => {
                    error!(file = name.as_str(), error = %e, "failed to load batch");
                }
            }
        }

        let before = combined.len();
        combined.dedup_first_wins();
        let removed = before - combined.len();
        if removed > 0 {
            info!(removed, "removed duplicate records");
        }
        info!(records = combined.len(), "combined dataset");
        Ok(combined)
    }

    /// Write a cleaned dataset. Naming mirrors [`Storage::store_raw`].
    pub fn store_processed(&self, table: &Table, filename: Option<&str>) -> Result<PathBuf> {
        let name = match filename {
            Some(name) => ensure_csv_extension(name),
            None => format!("aqi_cleaned_{}.csv", batch_stamp()),
        };
        let path = self.processed_dir.join(name);
        write_table(&path, table)?;
        info!(records = table.len(), path = %path.display(), "saved cleaned data");
        Ok(path)
    }
}

fn batch_stamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

fn ensure_csv_extension(name: &str) -> String {
    if name.ends_with(".csv") {
        name.to_string()
    } else {
        format!("{name}.csv")
    }
}

fn write_table(path: &Path, table: &Table) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = WriterBuilder::new().from_path(path)?;
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        let record: Vec<String> = table
            .columns
            .iter()
            .map(|column| row.get(column).to_field())
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn read_table(path: &Path) -> Result<Table> {
    let file = File::open(path)?;
    let mut rdr = csv::Reader::from_reader(file);

    let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let mut row = Observation::default();
        for (column, field) in columns.iter().zip(record.iter()) {
            row.set(column, Value::parse(column, field));
        }
        rows.push(row);
    }

    Ok(Table { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::env;

    fn temp_storage(name: &str) -> (Storage, PathBuf) {
        let base = env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&base); // clean up any prior run
        let storage = Storage::new(base.join("raw"), base.join("processed"));
        (storage, base)
    }

    fn sample_table() -> Table {
        let mut table = Table::raw();
        let mut row = Observation::default();
        row.timestamp = Some(Utc.timestamp_opt(1_770_000_000, 0).unwrap());
        row.city_key = Some("bangkok".to_string());
        row.city_name = Some("Bangkok".to_string());
        row.country = Some("Thailand".to_string());
        row.aqi = Some(3.0);
        row.pm2_5 = Some(12.5);
        row.pm10 = Some(40.0);
        table.push(row);
        let mut sparse = Observation::default();
        sparse.timestamp = Some(Utc.timestamp_opt(1_770_000_600, 0).unwrap());
        sparse.city_key = Some("oslo".to_string());
        sparse.aqi = Some(1.0);
        table.push(sparse);
        table
    }

    #[test]
    fn test_store_and_load_round_trip() {
        let (storage, base) = temp_storage("aqi_storage_round_trip");

        let table = sample_table();
        storage.store_raw(&table, Some("aqi_data_test.csv")).unwrap();
        let loaded = storage.load_raw("aqi_data_test.csv").unwrap();

        assert_eq!(loaded, table);
        fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_load_missing_batch_is_not_found() {
        let (storage, _base) = temp_storage("aqi_storage_missing");
        let err = storage.load_raw("aqi_data_nope.csv").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_csv_extension_is_appended() {
        let (storage, base) = temp_storage("aqi_storage_extension");

        let path = storage.store_raw(&sample_table(), Some("aqi_data_x")).unwrap();
        assert!(path.to_str().unwrap().ends_with("aqi_data_x.csv"));
        assert!(path.exists());

        fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_list_raw_batches_filters_and_sorts() {
        let (storage, base) = temp_storage("aqi_storage_list");

        let table = sample_table();
        storage.store_raw(&table, Some("aqi_data_b.csv")).unwrap();
        storage.store_raw(&table, Some("aqi_data_a.csv")).unwrap();
        // Files outside the naming convention are invisible.
        fs::write(base.join("raw").join("notes.csv"), "x\n").unwrap();

        let batches = storage.list_raw_batches().unwrap();
        assert_eq!(batches, vec!["aqi_data_a.csv", "aqi_data_b.csv"]);

        fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_list_raw_batches_without_directory() {
        let (storage, _base) = temp_storage("aqi_storage_no_dir");
        assert!(storage.list_raw_batches().unwrap().is_empty());
    }

    #[test]
    fn test_load_all_raw_dedups_first_wins() {
        let (storage, base) = temp_storage("aqi_storage_dedup");

        let first = sample_table();
        let mut second = sample_table();
        // Same (timestamp, city_key) pairs but a glitched reading.
        second.rows[0].pm2_5 = Some(999.0);
        storage.store_raw(&first, Some("aqi_data_001.csv")).unwrap();
        storage.store_raw(&second, Some("aqi_data_002.csv")).unwrap();

        let combined = storage.load_all_raw().unwrap();
        assert_eq!(combined.len(), 2);
        assert_eq!(combined.rows[0].pm2_5, Some(12.5));

        fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_load_all_raw_skips_unreadable_batch() {
        let (storage, base) = temp_storage("aqi_storage_corrupt");

        storage
            .store_raw(&sample_table(), Some("aqi_data_good.csv"))
            .unwrap();
        // Ragged row: field count disagrees with the header.
        fs::write(
            base.join("raw").join("aqi_data_bad.csv"),
            "timestamp,city_key\nonly-one-field\n1,2\n",
        )
        .unwrap();

        let combined = storage.load_all_raw().unwrap();
        assert_eq!(combined.len(), 2);

        fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_load_all_raw_empty_directory() {
        let (storage, base) = temp_storage("aqi_storage_empty");
        fs::create_dir_all(base.join("raw")).unwrap();

        let combined = storage.load_all_raw().unwrap();
        assert!(combined.is_empty());
        assert_eq!(combined.columns.len(), 14);

        fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_store_processed_uses_processed_dir() {
        let (storage, base) = temp_storage("aqi_storage_processed");

        let path = storage
            .store_processed(&sample_table(), Some("aqi_cleaned_test.csv"))
            .unwrap();
        assert!(path.starts_with(base.join("processed")));
        assert!(path.exists());

        fs::remove_dir_all(&base).unwrap();
    }
}
