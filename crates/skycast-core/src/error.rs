//! Error types shared by the SkyCast crates.
//!
//! Each enum's `Display` output is the detailed form that goes to the log.
//! `user_message()` is the short sentence the session puts in front of the
//! user. Weather errors are the exception: their `Display` text is itself
//! shown on city cards, so it stays terse.

use std::path::PathBuf;

use thiserror::Error;

/// Any failure the binary can surface.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Favorites storage error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather lookup failed: {0}")]
    Weather(#[from] WeatherError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Recover the typed error behind an `anyhow` chain, looking through any
    /// context layers.
    pub fn classify(err: anyhow::Error) -> Self {
        let err = match err.downcast::<ConfigError>() {
            Ok(e) => return AppError::Config(e),
            Err(err) => err,
        };
        let err = match err.downcast::<WeatherError>() {
            Ok(e) => return AppError::Weather(e),
            Err(err) => err,
        };
        let err = match err.downcast::<DatabaseError>() {
            Ok(e) => return AppError::Database(e),
            Err(err) => err,
        };
        let err = match err.downcast::<NetworkError>() {
            Ok(e) => return AppError::Network(e),
            Err(err) => err,
        };
        match err.downcast::<std::io::Error>() {
            Ok(e) => AppError::Io(e),
            Err(err) => AppError::Other(err),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Database(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Validation(e) => e.user_message(),
            AppError::Io(_) => "Could not read or write a local file.",
            AppError::Other(_) => "Something went wrong. Try again.",
        }
    }
}

/// Transport-level failures talking to the weather service.
#[derive(Debug, Clone, Error)]
pub enum NetworkError {
    #[error("Could not reach host: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("Unreadable response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => "You appear to be offline.",
            NetworkError::Timeout => "The weather service is slow to answer. Try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The weather service is having trouble right now."
            }
            NetworkError::ServerError { .. } => "The weather service rejected the request.",
            NetworkError::InvalidResponse(_) => "The weather service sent something unexpected.",
        }
    }
}

/// Errors reported by the geocoding and weather collaborators.
///
/// The `Display` strings are the messages shown inline on a city card or in
/// the detail error banner.
#[derive(Debug, Clone, Error)]
pub enum WeatherError {
    #[error("City not found")]
    NotFound,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Too many requests")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Empty response body")]
    EmptyResponse,

    #[error("Malformed response: {0}")]
    Parse(String),
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::NotFound => "No weather for that city. Check the spelling.",
            WeatherError::InvalidApiKey => "The OpenWeatherMap API key was refused.",
            WeatherError::RateLimited => "Weather lookups are rate limited. Wait a moment.",
            WeatherError::Network(e) => e.user_message(),
            WeatherError::EmptyResponse | WeatherError::Parse(_) => {
                "The weather service sent no usable data."
            }
        }
    }
}

/// Input rejected before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a city name")]
    BlankCityName,
}

impl ValidationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::BlankCityName => "Please enter a city name",
        }
    }
}

/// Failures of the favorites store.
#[derive(Debug, Clone, Error)]
pub enum DatabaseError {
    #[error("Cannot open favorites database: {0}")]
    ConnectionFailed(String),

    #[error("Favorites statement failed: {0}")]
    QueryFailed(String),

    #[error("Favorites database is corrupt: {0}")]
    Corruption(String),
}

impl DatabaseError {
    pub fn user_message(&self) -> &'static str {
        match self {
            DatabaseError::ConnectionFailed(_) => "Favorites are unavailable this session.",
            DatabaseError::QueryFailed(_) => "Could not update favorites. Please try again.",
            DatabaseError::Corruption(_) => "The favorites file is damaged. Delete it to start over.",
        }
    }
}

/// Problems with `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{} is not valid TOML: {message}", path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("Rejected settings: {0}")]
    Rejected(String),

    #[error("No OpenWeatherMap API key: set api.api_key in config.toml or {}", crate::config::API_KEY_ENV)]
    MissingApiKey,
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Unreadable { .. } => "The config file could not be read.",
            ConfigError::Malformed { .. } => "The config file has a syntax error.",
            ConfigError::Rejected(_) => "Some settings in the config file are out of range.",
            ConfigError::MissingApiKey => {
                "Add your OpenWeatherMap API key to config.toml or OPENWEATHER_API_KEY."
            }
        }
    }
}

/// Classifies a `reqwest` failure.
///
/// The request URL is dropped first: it carries the API key in its query
/// string and the resulting text is shown to the user and logged.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        let err = self.without_url();
        if err.is_timeout() {
            return NetworkError::Timeout;
        }
        if err.is_decode() {
            return NetworkError::InvalidResponse(err.to_string());
        }
        match err.status() {
            Some(status) if !err.is_connect() => NetworkError::ServerError {
                status: status.as_u16(),
                message: err.to_string(),
            },
            _ => NetworkError::ConnectionFailed(err.to_string()),
        }
    }
}

/// Classifies a `rusqlite` failure.
pub trait RusqliteErrorExt {
    fn into_database_error(self) -> DatabaseError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_database_error(self) -> DatabaseError {
        let code = self.sqlite_error_code();
        let detail = self.to_string();
        match code {
            Some(rusqlite::ErrorCode::DatabaseCorrupt | rusqlite::ErrorCode::NotADatabase) => {
                DatabaseError::Corruption(detail)
            }
            Some(rusqlite::ErrorCode::CannotOpen) => DatabaseError::ConnectionFailed(detail),
            _ => DatabaseError::QueryFailed(detail),
        }
    }
}
