//! Wire format of the upstream air-pollution endpoint.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::config::City;
use crate::error::{Error, Result};
use crate::table::Observation;

/// Top-level response payload. The provider returns readings newest-first;
/// only the first is used.
#[derive(Debug, Deserialize)]
pub struct AirPollutionResponse {
    pub list: Vec<PollutionReading>,
}

/// One reading: a unix timestamp, the index, and the concentrations.
#[derive(Debug, Deserialize)]
pub struct PollutionReading {
    pub dt: i64,
    pub main: Option<AqiMain>,
    pub components: Option<Components>,
}

#[derive(Debug, Deserialize)]
pub struct AqiMain {
    pub aqi: i64,
}

/// Pollutant concentrations in ug/m3. Any of them may be absent.
#[derive(Debug, Default, Deserialize)]
pub struct Components {
    pub co: Option<f64>,
    pub no: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub nh3: Option<f64>,
}

impl AirPollutionResponse {
    /// Validate the payload structure and flatten the most recent reading
    /// into an observation row.
    ///
    /// A failure here is a structural defect in the provider's payload and
    /// is never worth a retry.
    pub fn to_observation(
        &self,
        city_key: &str,
        city: &City,
        fetch_timestamp: DateTime<Utc>,
    ) -> Result<Observation> {
        let reading = self
            .list
            .first()
            .ok_or_else(|| Error::api("invalid API response: reading list is empty"))?;
        let main = reading
            .main
            .as_ref()
            .ok_or_else(|| Error::api("invalid API response: reading missing 'main'"))?;
        let components = reading
            .components
            .as_ref()
            .ok_or_else(|| Error::api("invalid API response: reading missing 'components'"))?;
        let timestamp = Utc
            .timestamp_opt(reading.dt, 0)
            .single()
            .ok_or_else(|| Error::api(format!("invalid reading timestamp: {}", reading.dt)))?;

        let mut row = Observation::default();
        row.timestamp = Some(timestamp);
        row.city_key = Some(city_key.to_string());
        row.city_name = Some(city.name.clone());
        row.country = Some(city.country.clone());
        row.fetch_timestamp = Some(fetch_timestamp);
        row.aqi = Some(main.aqi as f64);
        row.co = components.co;
        row.no = components.no;
        row.no2 = components.no2;
        row.o3 = components.o3;
        row.so2 = components.so2;
        row.pm2_5 = components.pm2_5;
        row.pm10 = components.pm10;
        row.nh3 = components.nh3;
        Ok(row)
    }
}
