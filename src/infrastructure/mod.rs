//! Infrastructure module for storage.
//!
//! This module contains the store contract, its in-memory and `PostgreSQL`
//! backends, and the factory that picks one at start-up.

pub mod factory;
pub mod in_memory;
pub mod postgres;
pub mod repository;

pub use factory::{
    ConfigurationError, FactoryError, RepositoryConfig, RepositoryConfigBuilder,
    RepositoryFactory, StorageMode,
};
pub use in_memory::InMemoryItemStore;
pub use postgres::PostgresItemStore;
pub use repository::{ItemStore, StoreError};
