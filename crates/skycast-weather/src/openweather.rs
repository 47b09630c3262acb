//! OpenWeatherMap implementation of the geocoding and weather clients.
//!
//! Endpoints: `geo/1.0/direct` for city search, `data/2.5/weather` by name
//! or by coordinates. Temperatures come back in Kelvin (no `units` param).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use crate::provider::{GeoSearchClient, WeatherClient};
use crate::types::{City, WeatherReport, WeatherSnapshot};
use skycast_core::{NetworkError, ReqwestErrorExt, WeatherError};

const USER_AGENT: &str = "SkyCast/0.1.0";

#[derive(Debug, Deserialize)]
struct GeoCityResponse {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    country: String,
    state: Option<String>,
}

impl From<GeoCityResponse> for City {
    fn from(r: GeoCityResponse) -> Self {
        City::new(r.name, r.country, r.state, r.lat, r.lon)
    }
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    #[serde(default)]
    name: String,
    main: MainBlock,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
    sys: Option<SysBlock>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct SysBlock {
    #[serde(default)]
    country: String,
}

impl From<WeatherResponse> for WeatherReport {
    fn from(r: WeatherResponse) -> Self {
        let condition = r.weather.into_iter().next();
        let (main, description, icon) = match condition {
            Some(c) => (c.main, c.description, c.icon),
            None => (String::new(), String::new(), String::new()),
        };

        WeatherReport {
            city_name: r.name,
            country: r.sys.map(|s| s.country).unwrap_or_default(),
            weather: WeatherSnapshot {
                temperature_k: r.main.temp,
                feels_like_k: r.main.feels_like,
                min_k: r.main.temp_min,
                max_k: r.main.temp_max,
                humidity_pct: r.main.humidity,
                condition_main: main,
                condition_description: description,
                icon_id: icon,
            },
        }
    }
}

/// OpenWeatherMap API client
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Arc<Client>,
    base_url: Url,
    api_key: String,
}

impl OpenWeatherClient {
    /// Create a client against `base_url` (e.g. `https://api.openweathermap.org`).
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        let mut base_url = Url::parse(base_url).context("Invalid weather API base URL")?;
        // `Url::join` replaces the last segment unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client: Arc::new(client),
            base_url,
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, WeatherError> {
        self.base_url
            .join(path)
            .map_err(|e| WeatherError::Parse(format!("invalid endpoint {}: {}", path, e)))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, WeatherError> {
        let url = self.endpoint(path)?;

        let response = self
            .client
            .get(url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("{} returned status {}", path, status);
            return Err(status_error(status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        parse_body(&body)
    }
}

/// Map a non-success HTTP status to the client error taxonomy.
fn status_error(status: StatusCode) -> WeatherError {
    match status {
        StatusCode::UNAUTHORIZED => WeatherError::InvalidApiKey,
        StatusCode::NOT_FOUND => WeatherError::NotFound,
        StatusCode::TOO_MANY_REQUESTS => WeatherError::RateLimited,
        other => WeatherError::Network(NetworkError::ServerError {
            status: other.as_u16(),
            message: other.canonical_reason().unwrap_or("unknown").to_string(),
        }),
    }
}

/// Decode a response body; an empty or `null` body is an empty response.
fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, WeatherError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(WeatherError::EmptyResponse);
    }

    let parsed: Option<T> =
        serde_json::from_str(trimmed).map_err(|e| WeatherError::Parse(e.to_string()))?;
    parsed.ok_or(WeatherError::EmptyResponse)
}

#[async_trait]
impl GeoSearchClient for OpenWeatherClient {
    #[instrument(skip(self), level = "debug")]
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<City>, WeatherError> {
        let cities: Vec<GeoCityResponse> = self
            .get_json(
                "geo/1.0/direct",
                &[("q", query.to_string()), ("limit", limit.to_string())],
            )
            .await?;

        tracing::debug!("City search for {:?} returned {} results", query, cities.len());
        Ok(cities.into_iter().map(City::from).collect())
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    #[instrument(skip(self), level = "debug")]
    async fn by_name(&self, name: &str) -> Result<WeatherReport, WeatherError> {
        let response: WeatherResponse = self
            .get_json("data/2.5/weather", &[("q", name.to_string())])
            .await?;
        Ok(response.into())
    }

    #[instrument(skip(self), level = "debug")]
    async fn by_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherReport, WeatherError> {
        let response: WeatherResponse = self
            .get_json(
                "data/2.5/weather",
                &[("lat", latitude.to_string()), ("lon", longitude.to_string())],
            )
            .await?;
        Ok(response.into())
    }
}
