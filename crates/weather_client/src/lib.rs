//! Open-Meteo current-conditions client.
//!
//! Fetches the current temperature, humidity, wind and WMO weather code for
//! the grove location and converts them to the shared `WeatherReading`
//! (Fahrenheit, mph, condition label, freeze/frost-warning flags).

use chrono::{DateTime, Utc};
use common::config::LocationConfig;
use common::{body_excerpt, Error, WeatherCondition, WeatherReading, WeatherSource};
use serde::Deserialize;
use tracing::debug;

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,wind_speed_10m,weather_code";

/// Freezing point; fruit on the tree starts icing here.
pub const FREEZE_THRESHOLD_F: f64 = 32.0;
/// Radiational frost can form on leaves at or below this air temperature.
pub const FROST_WARNING_THRESHOLD_F: f64 = 36.0;

/// Open-Meteo API client bound to a single location.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
    location: LocationConfig,
}

/// Response from `/v1/forecast?current=...`.
#[derive(Debug, Deserialize)]
pub struct CurrentResponse {
    #[serde(default)]
    pub current: Option<CurrentConditions>,
}

/// Raw metric readings as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentConditions {
    #[serde(rename = "temperature_2m", default)]
    pub temperature_c: Option<f64>,
    #[serde(rename = "relative_humidity_2m", default)]
    pub humidity_pct: Option<f64>,
    #[serde(rename = "wind_speed_10m", default)]
    pub wind_kph: Option<f64>,
    #[serde(default)]
    pub weather_code: Option<i64>,
}

impl OpenMeteoClient {
    pub fn new(location: LocationConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("frost-signal/0.1 (advisory dashboard)")
            .pool_max_idle_per_host(2)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("failed to build Open-Meteo HTTP client");

        Self { client, location }
    }

    /// Fetch current conditions as raw metric values.
    pub async fn fetch_current(&self) -> Result<CurrentConditions, Error> {
        let (lat, lon) = (self.location.lat, self.location.lon);
        let query = [
            ("latitude", lat.to_string()),
            ("longitude", lon.to_string()),
            ("current", CURRENT_FIELDS.to_string()),
            ("timezone", "America/New_York".to_string()),
        ];

        debug!(
            "Fetching Open-Meteo current conditions: {} lat={} lon={}",
            FORECAST_URL, lat, lon
        );

        let resp = self
            .client
            .get(FORECAST_URL)
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::Weather(format!("HTTP error for ({lat},{lon}): {e}")))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Weather(format!(
                "Open-Meteo returned {} for ({lat},{lon}): {}",
                status,
                body_excerpt(&body)
            )));
        }

        let payload: CurrentResponse = resp
            .json()
            .await
            .map_err(|e| Error::Weather(format!("JSON parse error for ({lat},{lon}): {e}")))?;

        payload
            .current
            .ok_or_else(|| Error::Weather(format!("No current block for ({lat},{lon})")))
    }
}

impl WeatherSource for OpenMeteoClient {
    async fn current_conditions(&self) -> Result<WeatherReading, Error> {
        let raw = self.fetch_current().await?;
        to_reading(&self.location.name, &raw, Utc::now())
    }
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

pub fn kph_to_mph(kph: f64) -> f64 {
    kph * 0.621_371
}

fn to_reading(
    location: &str,
    raw: &CurrentConditions,
    now: DateTime<Utc>,
) -> Result<WeatherReading, Error> {
    let temp_c = raw
        .temperature_c
        .filter(|t| t.is_finite())
        .ok_or_else(|| Error::Weather(format!("No temperature reported for {}", location)))?;

    let temperature_f = celsius_to_fahrenheit(temp_c);
    let weather_code = raw.weather_code.unwrap_or(-1);

    Ok(WeatherReading {
        temperature_f,
        humidity_pct: raw.humidity_pct.unwrap_or(0.0).clamp(0.0, 100.0),
        wind_mph: kph_to_mph(raw.wind_kph.unwrap_or(0.0).max(0.0)),
        weather_code,
        condition: WeatherCondition::from_wmo_code(weather_code),
        is_freezing: temperature_f <= FREEZE_THRESHOLD_F,
        frost_warning: temperature_f <= FROST_WARNING_THRESHOLD_F,
        fetched_at: now,
    })
}
