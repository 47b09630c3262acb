use anyhow::Result;
use std::sync::Arc;

use crate::{Config, ValidationResult};

/// Application configuration and lifecycle manager
pub struct App {
    config: Arc<Config>,
    validation: ValidationResult,
}

impl App {
    /// Create a new application instance from the on-disk configuration
    pub fn new() -> Result<Self> {
        let (config, validation) = Config::load_validated()?;
        Ok(Self::with_config(config, validation))
    }

    /// Create an application around an already loaded configuration
    pub fn with_config(config: Config, validation: ValidationResult) -> Self {
        Self {
            config: Arc::new(config),
            validation,
        }
    }

    /// Prepare the config directory so stores can be opened inside it
    pub fn initialize(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config.config_dir)?;
        tracing::info!(
            "Application initialized (config dir: {}, {} config warnings)",
            self.config.config_dir.display(),
            self.validation.warnings.len()
        );
        Ok(())
    }

    pub fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down application");
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle to the config for long-lived services
    pub fn shared_config(&self) -> Arc<Config> {
        self.config.clone()
    }

    pub fn validation(&self) -> &ValidationResult {
        &self.validation
    }
}
