//! Settings loaded once at startup and passed into each component.
//!
//! The settings file is JSON; the API key and data-directory overrides come
//! from the environment (a `.env` file is honored when present). There is no
//! global config object: construct [`Settings`] in `main` and hand it to
//! whoever needs it.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Coordinates and display metadata for one monitored city.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct City {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
}

/// HTTP retry and timeout knobs for the collector.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CollectionSettings {
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_seconds")]
    pub retry_delay_seconds: u64,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        CollectionSettings {
            retry_attempts: default_retry_attempts(),
            retry_delay_seconds: default_retry_delay_seconds(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Validation thresholds for the cleaning pipeline.
///
/// `ranges` maps a column name to its inclusive `[min, max]` plausibility
/// bound. `mask_outliers` keeps the IQR detector report-only unless a
/// deployment opts in to nulling flagged values.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct QualitySettings {
    #[serde(default = "default_ranges")]
    pub ranges: BTreeMap<String, (f64, f64)>,
    #[serde(default = "default_outlier_method")]
    pub outlier_method: String,
    #[serde(default)]
    pub mask_outliers: bool,
}

impl Default for QualitySettings {
    fn default() -> Self {
        QualitySettings {
            ranges: default_ranges(),
            outlier_method: default_outlier_method(),
            mask_outliers: false,
        }
    }
}

/// Top-level settings for collection and cleaning.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    /// Monitored cities keyed by stable identifier. Iteration order is the
    /// key order, so collection runs visit cities deterministically.
    #[serde(default)]
    pub cities: BTreeMap<String, City>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub collection: CollectionSettings,
    #[serde(default)]
    pub quality: QualitySettings,
    #[serde(default = "default_raw_dir")]
    pub raw_data_dir: PathBuf,
    #[serde(default = "default_processed_dir")]
    pub processed_data_dir: PathBuf,
    /// Populated from `OPENWEATHER_API_KEY`, never from the settings file.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            cities: BTreeMap::new(),
            base_url: default_base_url(),
            collection: CollectionSettings::default(),
            quality: QualitySettings::default(),
            raw_data_dir: default_raw_dir(),
            processed_data_dir: default_processed_dir(),
            api_key: None,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, then overlay environment values
    /// (`OPENWEATHER_API_KEY`, `RAW_DATA_DIR`, `PROCESSED_DATA_DIR`).
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read settings file {}: {e}", path.display()))
        })?;
        let mut settings: Settings = serde_json::from_str(&text).map_err(|e| {
            Error::config(format!("cannot parse settings file {}: {e}", path.display()))
        })?;
        settings.apply_env();
        Ok(settings)
    }

    fn apply_env(&mut self) {
        self.api_key = env::var("OPENWEATHER_API_KEY").ok().filter(|k| !k.is_empty());
        if let Ok(dir) = env::var("RAW_DATA_DIR") {
            self.raw_data_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var("PROCESSED_DATA_DIR") {
            self.processed_data_dir = PathBuf::from(dir);
        }
    }

    /// The API credential, or a configuration error when unset.
    pub fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            Error::config("OPENWEATHER_API_KEY not found in environment variables")
        })
    }

    pub fn get_city(&self, key: &str) -> Option<&City> {
        self.cities.get(key)
    }

    /// Inclusive plausibility bound for a column, when one is configured.
    pub fn get_range(&self, column: &str) -> Option<(f64, f64)> {
        self.quality.ranges.get(column).copied()
    }

    /// Check that everything collection needs is present. Errors are
    /// collected, not short-circuited, so one message names every gap.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.api_key.is_none() {
            errors.push("OPENWEATHER_API_KEY not found in environment variables".to_string());
        }
        if self.cities.is_empty() {
            errors.push("no cities configured".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::config(errors.join("; ")))
        }
    }
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_seconds() -> u64 {
    5
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_outlier_method() -> String {
    "iqr".to_string()
}

fn default_base_url() -> String {
    "http://api.openweathermap.org/data/2.5".to_string()
}

fn default_raw_dir() -> PathBuf {
    PathBuf::from("data/raw")
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("data/processed")
}

fn default_ranges() -> BTreeMap<String, (f64, f64)> {
    [
        ("aqi", (1.0, 5.0)),
        ("pm2_5", (0.0, 500.0)),
        ("pm10", (0.0, 1000.0)),
        ("no2", (0.0, 400.0)),
        ("o3", (0.0, 500.0)),
        ("co", (0.0, 50_000.0)),
        ("so2", (0.0, 1000.0)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn test_load_settings_file() {
        let path = env::temp_dir().join("aqi_settings_load.json");
        let mut file = File::create(&path).unwrap();
        file.write_all(
            br#"{
                "cities": {
                    "bangkok": {
                        "name": "Bangkok",
                        "latitude": 13.7563,
                        "longitude": 100.5018,
                        "country": "Thailand"
                    }
                },
                "collection": {"retry_attempts": 5}
            }"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        let city = settings.get_city("bangkok").unwrap();
        assert_eq!(city.name, "Bangkok");
        assert_eq!(city.country, "Thailand");
        assert_eq!(settings.collection.retry_attempts, 5);
        // Unspecified knobs keep their defaults.
        assert_eq!(settings.collection.timeout_seconds, 10);
        assert_eq!(settings.base_url, "http://api.openweathermap.org/data/2.5");
    }

    #[test]
    fn test_missing_settings_file_is_config_error() {
        let path = env::temp_dir().join("aqi_settings_does_not_exist.json");
        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("aqi_settings_does_not_exist.json"));
    }

    #[test]
    fn test_malformed_settings_file_is_config_error() {
        let path = env::temp_dir().join("aqi_settings_malformed.json");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"{not json").unwrap();

        let err = Settings::load(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_default_ranges_present() {
        let settings = Settings::default();
        assert_eq!(settings.get_range("pm2_5"), Some((0.0, 500.0)));
        assert_eq!(settings.get_range("aqi"), Some((1.0, 5.0)));
        assert_eq!(settings.get_range("humidity"), None);
    }

    #[test]
    fn test_validate_collects_every_gap() {
        let settings = Settings::default();
        let err = settings.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("OPENWEATHER_API_KEY"));
        assert!(msg.contains("no cities configured"));
    }

    #[test]
    fn test_validate_passes_with_key_and_cities() {
        let mut settings = Settings::default();
        settings.api_key = Some("abc123".to_string());
        settings.cities.insert(
            "bangkok".to_string(),
            City {
                name: "Bangkok".to_string(),
                latitude: 13.7563,
                longitude: 100.5018,
                country: "Thailand".to_string(),
            },
        );
        assert!(settings.validate().is_ok());
        assert_eq!(settings.api_key().unwrap(), "abc123");
    }

    #[test]
    fn test_api_key_error_when_unset() {
        let settings = Settings::default();
        let err = settings.api_key().unwrap_err();
        assert!(err.to_string().contains("OPENWEATHER_API_KEY"));
    }
}
