pub mod app;
pub mod config;
pub mod error;

pub use app::App;
pub use config::{ApiConfig, Config, FavoritesConfig, SearchConfig, ValidationResult};
pub use error::{
    AppError, ConfigError, DatabaseError, NetworkError, ReqwestErrorExt, RusqliteErrorExt,
    ValidationError, WeatherError,
};

use anyhow::Result;

/// Initialize logging for the process.
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    tracing::info!("SkyCast core initialized");
    Ok(())
}
