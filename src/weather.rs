//! Weather collection
//!
//! One forecast lookup per configured location. Weather is required context:
//! a single failed lookup aborts the whole run.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};

use crate::config::LocationConfig;
use crate::context::LocationRecord;
use crate::{Error, Result};

/// Forecast window requested for every location, in hours
pub const FORECAST_HOURS: u32 = 24;

/// Anything that can produce a raw forecast payload for a location
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Look up the forecast for one location
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or an unusable response
    async fn lookup(&self, location: &LocationConfig) -> Result<Map<String, Value>>;
}

/// Client for the hourly forecast lookup API
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl WeatherClient {
    /// Create a new weather client
    ///
    /// # Arguments
    ///
    /// * `base_url` - API base (e.g. <https://weather.googleapis.com>)
    /// * `api_key` - Weather API key
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl WeatherSource for WeatherClient {
    async fn lookup(&self, location: &LocationConfig) -> Result<Map<String, Value>> {
        let url = format!("{}/v1/forecast/hours:lookup", self.base_url);
        let hours = FORECAST_HOURS.to_string();
        let latitude = location.latitude.to_string();
        let longitude = location.longitude.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", self.api_key.expose_secret()),
                ("location.latitude", latitude.as_str()),
                ("location.longitude", longitude.as_str()),
                ("hours", hours.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Weather(format!("{}: request failed: {e}", location.name)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Weather(format!(
                "{}: weather API error {status}: {body}",
                location.name
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Weather(format!("{}: malformed response: {e}", location.name)))?;

        match body {
            Value::Object(map) => Ok(map),
            other => Err(Error::Weather(format!(
                "{}: expected a JSON object, got {}",
                location.name,
                json_kind(&other)
            ))),
        }
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Collect weather for every location, in configuration order
///
/// Lookups run one after another. The first failure is returned and no
/// records are produced.
///
/// # Errors
///
/// Returns the first lookup error
pub async fn collect_weather(
    source: &dyn WeatherSource,
    locations: &[LocationConfig],
) -> Result<Vec<LocationRecord>> {
    let mut records = Vec::with_capacity(locations.len());

    for location in locations {
        let weather_data = source.lookup(location).await?;
        tracing::debug!(location = %location.name, fields = weather_data.len(), "weather collected");

        records.push(LocationRecord {
            name: location.name.clone(),
            friendly_description: location.friendly_description.clone(),
            notes: location.notes.clone(),
            weather_data,
        });
    }

    Ok(records)
}
