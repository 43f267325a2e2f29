//! Store factory for runtime backend selection.
//!
//! # Environment Variables
//!
//! - `STORAGE_MODE`: `in_memory` (default) | `postgres`
//! - `DATABASE_URL`: `PostgreSQL` connection URL (required when `STORAGE_MODE=postgres`)
//! - `DATABASE_MAX_CONNECTIONS`: pool size (default 5)
//!
//! # Example
//!
//! ```ignore
//! let config = RepositoryConfig::from_env()?;
//! let store = RepositoryFactory::new(config).create().await?;
//! ```

use std::env;
use std::str::FromStr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use super::{InMemoryItemStore, ItemStore, PostgresItemStore};

/// Default size of the `PostgreSQL` connection pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

// =============================================================================
// Configuration Types
// =============================================================================

/// Storage backend for items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageMode {
    /// Process-local storage. Contents are lost on restart.
    #[default]
    InMemory,
    /// `PostgreSQL` storage.
    Postgres,
}

impl FromStr for StorageMode {
    type Err = ConfigurationError;

    /// Parses a storage mode from a string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidStorageMode` if the string is not recognized.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            _ => Err(ConfigurationError::InvalidStorageMode(value.to_string())),
        }
    }
}

/// Configuration for the store factory.
///
/// Use [`RepositoryConfigBuilder`] to construct one in code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Backend to create.
    pub storage_mode: StorageMode,
    /// `PostgreSQL` connection URL (required when `storage_mode` is `Postgres`).
    pub database_url: Option<String>,
    /// Maximum pool size for `PostgreSQL`.
    pub max_connections: u32,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            storage_mode: StorageMode::default(),
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl RepositoryConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RepositoryConfigBuilder {
        RepositoryConfigBuilder::default()
    }

    /// Creates a configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if a value is invalid or `DATABASE_URL`
    /// is missing when `STORAGE_MODE=postgres`.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| env::var(key))
    }

    /// Creates a configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`RepositoryConfig::from_env`].
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Result<String, env::VarError>,
    ) -> Result<Self, ConfigurationError> {
        let storage_mode = match lookup("STORAGE_MODE") {
            Ok(value) => value.parse()?,
            Err(env::VarError::NotPresent) => StorageMode::default(),
            Err(env::VarError::NotUnicode(_)) => {
                return Err(ConfigurationError::InvalidStorageMode(
                    "<non-UTF-8 value>".to_string(),
                ));
            }
        };

        // Empty or whitespace-only URLs count as unset
        let database_url = lookup("DATABASE_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Ok(value) => value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or(ConfigurationError::InvalidMaxConnections(value))?,
            Err(env::VarError::NotPresent) => DEFAULT_MAX_CONNECTIONS,
            Err(env::VarError::NotUnicode(_)) => {
                return Err(ConfigurationError::InvalidMaxConnections(
                    "<non-UTF-8 value>".to_string(),
                ));
            }
        };

        let config = Self {
            storage_mode,
            database_url,
            max_connections,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::MissingDatabaseUrl` if `PostgreSQL` is
    /// selected without a URL.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.storage_mode == StorageMode::Postgres && self.database_url.is_none() {
            return Err(ConfigurationError::MissingDatabaseUrl);
        }
        if self.max_connections == 0 {
            return Err(ConfigurationError::InvalidMaxConnections("0".to_string()));
        }
        Ok(())
    }
}

/// Builder for [`RepositoryConfig`].
///
/// ```ignore
/// let config = RepositoryConfig::builder()
///     .storage_mode(StorageMode::Postgres)
///     .database_url("postgres://localhost/todos")
///     .max_connections(10)
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct RepositoryConfigBuilder {
    storage_mode: StorageMode,
    database_url: Option<String>,
    max_connections: Option<u32>,
}

impl RepositoryConfigBuilder {
    /// Sets the storage mode.
    #[must_use]
    pub const fn storage_mode(mut self, mode: StorageMode) -> Self {
        self.storage_mode = mode;
        self
    }

    /// Sets the `PostgreSQL` database URL.
    #[must_use]
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Sets the pool size.
    #[must_use]
    pub const fn max_connections(mut self, size: u32) -> Self {
        self.max_connections = Some(size);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the configuration is invalid.
    pub fn build(self) -> Result<RepositoryConfig, ConfigurationError> {
        let config = RepositoryConfig {
            storage_mode: self.storage_mode,
            database_url: self.database_url,
            max_connections: self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
        };

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Error Types
// =============================================================================

/// Errors in start-up configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Invalid storage mode value.
    #[error("Invalid storage mode: '{0}'. Expected 'in_memory' or 'postgres'")]
    InvalidStorageMode(String),

    /// Missing `DATABASE_URL` when storage mode is Postgres.
    #[error("DATABASE_URL environment variable is required when STORAGE_MODE=postgres")]
    MissingDatabaseUrl,

    /// Pool size is not a positive integer.
    #[error("Invalid DATABASE_MAX_CONNECTIONS: '{0}'. Expected a positive integer")]
    InvalidMaxConnections(String),

    /// Listen port is not a valid port number.
    #[error("Invalid PORT: '{0}'. Expected an integer between 0 and 65535")]
    InvalidPort(String),

    /// Sweep interval is not a positive number of seconds.
    #[error("Invalid SWEEP_INTERVAL_SECS: '{0}'. Expected a positive integer")]
    InvalidSweepInterval(String),
}

/// Errors that can occur while creating the store.
#[derive(Debug, Error)]
pub enum FactoryError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    DatabaseConnection(String),

    /// Schema creation error.
    #[error("Schema initialization error: {0}")]
    Schema(String),
}

// =============================================================================
// Repository Factory
// =============================================================================

/// Creates the configured [`ItemStore`].
#[derive(Debug, Clone)]
pub struct RepositoryFactory {
    config: RepositoryConfig,
}

impl RepositoryFactory {
    /// Creates a new factory with the given configuration.
    #[must_use]
    pub const fn new(config: RepositoryConfig) -> Self {
        Self { config }
    }

    /// Creates the store.
    ///
    /// For `PostgreSQL` this connects the pool and makes sure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns `FactoryError` if the connection or the schema setup fails.
    pub async fn create(&self) -> Result<Arc<dyn ItemStore>, FactoryError> {
        match self.config.storage_mode {
            StorageMode::InMemory => Ok(Arc::new(InMemoryItemStore::new())),
            StorageMode::Postgres => {
                let store = self.create_postgres_store().await?;
                Ok(Arc::new(store))
            }
        }
    }

    async fn create_postgres_store(&self) -> Result<PostgresItemStore, FactoryError> {
        let database_url = self
            .config
            .database_url
            .as_ref()
            .ok_or(ConfigurationError::MissingDatabaseUrl)?;

        let pool = PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .connect(database_url)
            .await
            .map_err(|error| FactoryError::DatabaseConnection(error.to_string()))?;

        let store = PostgresItemStore::new(pool);
        store
            .ensure_schema()
            .await
            .map_err(|error| FactoryError::Schema(error.to_string()))?;
        Ok(store)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup_from(
        pairs: &[(&str, &str)],
    ) -> impl Fn(&str) -> Result<String, env::VarError> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| map.get(key).cloned().ok_or(env::VarError::NotPresent)
    }

    // -------------------------------------------------------------------------
    // StorageMode Tests
    // -------------------------------------------------------------------------

    #[rstest]
    #[case("in_memory", StorageMode::InMemory)]
    #[case("InMemory", StorageMode::InMemory)]
    #[case("memory", StorageMode::InMemory)]
    #[case("postgres", StorageMode::Postgres)]
    #[case("PostgreSQL", StorageMode::Postgres)]
    #[case("pg", StorageMode::Postgres)]
    fn test_storage_mode_from_str(#[case] input: &str, #[case] expected: StorageMode) {
        assert_eq!(input.parse::<StorageMode>().unwrap(), expected);
    }

    #[rstest]
    fn test_storage_mode_from_str_invalid() {
        let result = "mysql".parse::<StorageMode>();
        assert_eq!(
            result,
            Err(ConfigurationError::InvalidStorageMode("mysql".to_string()))
        );
    }

    // -------------------------------------------------------------------------
    // RepositoryConfig Tests
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_from_lookup_defaults() {
        let config = RepositoryConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, RepositoryConfig::default());
    }

    #[rstest]
    fn test_from_lookup_postgres() {
        let config = RepositoryConfig::from_lookup(lookup_from(&[
            ("STORAGE_MODE", "postgres"),
            ("DATABASE_URL", " postgres://localhost/todos "),
            ("DATABASE_MAX_CONNECTIONS", "12"),
        ]))
        .unwrap();

        assert_eq!(config.storage_mode, StorageMode::Postgres);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/todos")
        );
        assert_eq!(config.max_connections, 12);
    }

    #[rstest]
    #[case(&[("STORAGE_MODE", "postgres")], ConfigurationError::MissingDatabaseUrl)]
    #[case(
        &[("STORAGE_MODE", "postgres"), ("DATABASE_URL", "   ")],
        ConfigurationError::MissingDatabaseUrl
    )]
    #[case(
        &[("DATABASE_MAX_CONNECTIONS", "0")],
        ConfigurationError::InvalidMaxConnections("0".to_string())
    )]
    #[case(
        &[("DATABASE_MAX_CONNECTIONS", "many")],
        ConfigurationError::InvalidMaxConnections("many".to_string())
    )]
    fn test_from_lookup_errors(
        #[case] pairs: &[(&str, &str)],
        #[case] expected: ConfigurationError,
    ) {
        assert_eq!(
            RepositoryConfig::from_lookup(lookup_from(pairs)),
            Err(expected)
        );
    }

    #[rstest]
    fn test_builder_requires_url_for_postgres() {
        let result = RepositoryConfig::builder()
            .storage_mode(StorageMode::Postgres)
            .build();
        assert_eq!(result, Err(ConfigurationError::MissingDatabaseUrl));
    }

    #[rstest]
    fn test_builder_sets_fields() {
        let config = RepositoryConfig::builder()
            .storage_mode(StorageMode::Postgres)
            .database_url("postgres://localhost/todos")
            .max_connections(2)
            .build()
            .unwrap();
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.storage_mode, StorageMode::Postgres);
    }

    // -------------------------------------------------------------------------
    // RepositoryFactory Tests
    // -------------------------------------------------------------------------

    #[rstest]
    #[tokio::test]
    async fn test_factory_creates_in_memory_store() {
        let factory = RepositoryFactory::new(RepositoryConfig::default());
        let store = factory.create().await.unwrap();
        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn test_factory_rejects_postgres_without_url() {
        let factory = RepositoryFactory::new(RepositoryConfig {
            storage_mode: StorageMode::Postgres,
            ..RepositoryConfig::default()
        });
        let result = factory.create().await;
        assert!(matches!(
            result,
            Err(FactoryError::Configuration(
                ConfigurationError::MissingDatabaseUrl
            ))
        ));
    }
}
