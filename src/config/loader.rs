//! Layered configuration loading
//! An optional config file is read first, then `STANDUP_*` environment variables override it.

use std::path::Path;
use tracing::info;

use super::AppConfig;
use crate::error::MonitorError;

pub const ENV_PREFIX: &str = "STANDUP";

impl AppConfig {
    /// Load from `path` (if given) and the process environment, then validate.
    pub fn load(path: Option<&Path>) -> Result<Self, MonitorError> {
        Self::load_with_env(path, Some(ENV_PREFIX))
    }

    /// Same as [`AppConfig::load`], but with the environment source made optional
    /// so callers can load a file in isolation.
    pub fn load_with_env(path: Option<&Path>, env_prefix: Option<&str>) -> Result<Self, MonitorError> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(MonitorError::ConfigError(format!(
                    "Configuration file not found: {:?}",
                    path
                )));
            }
            info!("Loading configuration from: {:?}", path);
            builder = builder.add_source(::config::File::from(path));
        }

        if let Some(prefix) = env_prefix {
            builder = builder.add_source(::config::Environment::with_prefix(prefix).try_parsing(true));
        }

        let config: AppConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| MonitorError::ConfigError(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }
}
