//! Process configuration.
//!
//! Gathers the listen address, store settings and sweep cadence from the
//! environment. `main` loads `.env` first, so values there count too.

use std::env;

use crate::infrastructure::{ConfigurationError, RepositoryConfig};
use crate::service::SweeperConfig;

/// Default listen host.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Listen address settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host or IP to bind.
    pub host: String,
    /// TCP port to bind.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Reads `HOST` and `PORT` through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidPort` for a non-numeric or
    /// out-of-range port.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Result<String, env::VarError>,
    ) -> Result<Self, ConfigurationError> {
        let host = lookup("HOST")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup("PORT") {
            Ok(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigurationError::InvalidPort(value))?,
            Err(env::VarError::NotPresent) => DEFAULT_PORT,
            Err(env::VarError::NotUnicode(_)) => {
                return Err(ConfigurationError::InvalidPort(
                    "<non-UTF-8 value>".to_string(),
                ));
            }
        };

        Ok(Self { host, port })
    }

    /// Returns `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub repository: RepositoryConfig,
    pub sweeper: SweeperConfig,
}

impl AppConfig {
    /// Reads every setting from the process environment.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| env::var(key))
    }

    /// Reads every setting through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Result<String, env::VarError>,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            server: ServerConfig::from_lookup(&lookup)?,
            repository: RepositoryConfig::from_lookup(&lookup)?,
            sweeper: SweeperConfig::from_lookup(&lookup)?,
        })
    }
}
