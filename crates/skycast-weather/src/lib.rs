//! Weather and geocoding for SkyCast
//!
//! Domain values shared by every crate, the collaborator traits the search
//! engine is written against, and an OpenWeatherMap implementation of them.

pub mod openweather;
pub mod provider;
pub mod types;

pub use openweather::OpenWeatherClient;
pub use provider::{GeoSearchClient, WeatherClient};
pub use skycast_core::WeatherError;
pub use types::*;
