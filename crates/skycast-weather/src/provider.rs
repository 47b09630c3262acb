//! Collaborator interfaces the search engine is written against.

use async_trait::async_trait;

use crate::types::{City, WeatherReport};
use skycast_core::WeatherError;

/// Geocoding: turns a free-text query into candidate cities.
#[async_trait]
pub trait GeoSearchClient: Send + Sync {
    /// Search for up to `limit` cities matching `query`.
    ///
    /// # Errors
    /// `Network` on transport failure, `InvalidApiKey` on bad credentials,
    /// `RateLimited` when throttled.
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<City>, WeatherError>;
}

/// Current-conditions lookup.
#[async_trait]
pub trait WeatherClient: Send + Sync {
    /// Look up weather by city name.
    async fn by_name(&self, name: &str) -> Result<WeatherReport, WeatherError>;

    /// Look up weather by coordinates.
    async fn by_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherReport, WeatherError>;
}
