//! Collection of current air-quality readings from the upstream API.
//!
//! One request per configured city per run, with bounded retries for
//! transient faults and a daily call budget. Per-city failures never sink
//! a whole run.

mod response;

pub use response::{AirPollutionResponse, AqiMain, Components, PollutionReading};

use std::time::Duration;

use chrono::Utc;
use reqwest::{Method, Request, Url};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::cleaning::utility;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::fetch::HttpClient;
use crate::table::{Observation, Table};

/// Free-tier daily request allowance for the upstream API.
pub const MAX_CALLS_PER_DAY: u32 = 1000;

/// Pause between consecutive city requests within one run.
const INTER_REQUEST_DELAY: Duration = Duration::from_millis(500);

/// Usage counters for the daily call budget.
#[derive(Debug, Serialize)]
pub struct CallStats {
    pub calls_made_today: u32,
    pub max_calls_per_day: u32,
    pub remaining_calls: u32,
    pub usage_percentage: f64,
}

/// Fetches readings for the configured cities over any [`HttpClient`].
#[derive(Debug)]
pub struct AirQualityCollector<C> {
    client: C,
    settings: Settings,
    api_key: String,
    calls_today: u32,
}

impl<C: HttpClient> AirQualityCollector<C> {
    /// Build a collector. Fails when the API credential is missing.
    pub fn new(client: C, settings: Settings) -> Result<Self> {
        let api_key = settings.api_key()?.to_string();
        info!("air quality collector initialized");
        Ok(AirQualityCollector {
            client,
            settings,
            api_key,
            calls_today: 0,
        })
    }

    /// Fetch the current reading for one configured city.
    ///
    /// Timeouts, connection failures, and non-success statuses are retried
    /// up to the configured attempt count with a fixed delay in between.
    /// Budget exhaustion and structural payload defects fail immediately;
    /// neither consumes a retry.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_city(&mut self, city_key: &str) -> Result<Observation> {
        let city = self
            .settings
            .get_city(city_key)
            .ok_or_else(|| Error::config(format!("city '{city_key}' not found in configuration")))?
            .clone();
        info!(city = city.name.as_str(), "fetching air quality data");

        let url = Url::parse_with_params(
            &format!("{}/air_pollution", self.settings.base_url),
            &[
                ("lat", city.latitude.to_string()),
                ("lon", city.longitude.to_string()),
                ("appid", self.api_key.clone()),
            ],
        )
        .map_err(|e| Error::config(format!("invalid API base URL: {e}")))?;

        let attempts = self.settings.collection.retry_attempts.max(1);
        let retry_delay = Duration::from_secs(self.settings.collection.retry_delay_seconds);

        let mut last_cause: Option<reqwest::Error> = None;
        for attempt in 1..=attempts {
            if self.calls_today >= MAX_CALLS_PER_DAY {
                return Err(Error::api(format!(
                    "daily API call limit ({MAX_CALLS_PER_DAY}) reached"
                )));
            }

            debug!(attempt, attempts, "API call attempt");
            let req = Request::new(Method::GET, url.clone());
            match self.client.execute(req).await {
                Ok(resp) => {
                    // A response arrived, so the call counts against the
                    // budget whatever its status.
                    self.calls_today += 1;
                    match resp.error_for_status() {
                        Ok(resp) => match resp.json::<AirPollutionResponse>().await {
                            Ok(payload) => {
                                let row = payload.to_observation(city_key, &city, Utc::now())?;
                                info!(city = city.name.as_str(), "successfully fetched data");
                                return Ok(row);
                            }
                            Err(e) => {
                                // Undecodable body: structural, not transient.
                                return Err(Error::api_with(
                                    "invalid API response: undecodable payload",
                                    e,
                                ));
                            }
                        },
                        Err(e) => {
                            warn!(attempt, error = %e, "request failed");
                            last_cause = Some(e);
                        }
                    }
                }
                Err(e) if e.is_timeout() => {
                    warn!(attempt, "timeout, retrying");
                    last_cause = Some(e);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "request failed");
                    last_cause = Some(e);
                }
            }

            if attempt < attempts {
                tokio::time::sleep(retry_delay).await;
            }
        }

        let message = format!("failed to fetch data after {attempts} attempts");
        Err(match last_cause {
            Some(cause) => Error::api_with(message, cause),
            None => Error::api(message),
        })
    }

    /// Fetch every configured city in key order, sequentially.
    ///
    /// One city's failure is logged and skipped; the returned batch holds
    /// whatever subset succeeded, possibly nothing.
    pub async fn fetch_all(&mut self) -> Table {
        let city_keys: Vec<String> = self.settings.cities.keys().cloned().collect();
        info!(cities = city_keys.len(), "fetching data for all cities");

        let mut batch = Table::raw();
        for city_key in &city_keys {
            match self.fetch_city(city_key).await {
                Ok(row) => {
                    batch.push(row);
                    tokio::time::sleep(INTER_REQUEST_DELAY).await;
                }
                Err(e) => {
                    error!(city = city_key.as_str(), error = %e, "failed to fetch data");
                }
            }
        }

        info!(
            fetched = batch.len(),
            cities = city_keys.len(),
            "collection run complete"
        );
        batch
    }

    pub fn call_stats(&self) -> CallStats {
        CallStats {
            calls_made_today: self.calls_today,
            max_calls_per_day: MAX_CALLS_PER_DAY,
            remaining_calls: MAX_CALLS_PER_DAY.saturating_sub(self.calls_today),
            usage_percentage: utility::pct(self.calls_today as usize, MAX_CALLS_PER_DAY as usize),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::City;
    use crate::fetch::BasicClient;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.api_key = Some("test-key".to_string());
        // Unroutable on purpose; these tests must fail before any I/O.
        settings.base_url = "http://127.0.0.1:9".to_string();
        settings.collection.retry_attempts = 2;
        settings.collection.retry_delay_seconds = 0;
        settings.collection.timeout_seconds = 1;
        settings.cities.insert(
            "bangkok".to_string(),
            City {
                name: "Bangkok".to_string(),
                latitude: 13.7563,
                longitude: 100.5018,
                country: "Thailand".to_string(),
            },
        );
        settings
    }

    fn collector() -> AirQualityCollector<BasicClient> {
        let client = BasicClient::new(Duration::from_secs(1)).unwrap();
        AirQualityCollector::new(client, settings()).unwrap()
    }

    #[test]
    fn test_new_requires_api_key() {
        let mut settings = settings();
        settings.api_key = None;
        let client = BasicClient::new(Duration::from_secs(1)).unwrap();
        let err = AirQualityCollector::new(client, settings).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_unknown_city_is_config_error() {
        let mut collector = collector();
        let err = collector.fetch_city("atlantis").await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("atlantis"));
    }

    #[tokio::test]
    async fn test_exhausted_budget_fails_without_a_request() {
        let mut collector = collector();
        collector.calls_today = MAX_CALLS_PER_DAY;

        let err = collector.fetch_city("bangkok").await.unwrap_err();
        assert!(err.to_string().contains("limit"));
        // The attempt was refused outright, so nothing was consumed.
        assert_eq!(collector.call_stats().calls_made_today, MAX_CALLS_PER_DAY);
    }

    #[test]
    fn test_call_stats_arithmetic() {
        let mut collector = collector();
        collector.calls_today = 250;

        let stats = collector.call_stats();
        assert_eq!(stats.calls_made_today, 250);
        assert_eq!(stats.remaining_calls, 750);
        assert_eq!(stats.usage_percentage, 25.0);
    }
}
