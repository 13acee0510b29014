//! Configuration for CatalogStore
//!
//! Provides a builder pattern for configuring the catalog store.

use chrono::NaiveDate;

use crate::catalog::CatalogSchema;

/// Source of "today" for time-windowed queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    /// Local date of the machine running the store
    #[default]
    System,
    /// A fixed date, for reproducible runs
    Fixed(NaiveDate),
}

impl Clock {
    pub fn today(&self) -> NaiveDate {
        match self {
            Clock::System => chrono::Local::now().date_naive(),
            Clock::Fixed(date) => *date,
        }
    }
}

/// Configuration for the catalog store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// PostgreSQL database URL
    pub database_url: String,
    /// Maximum pooled connections (default: 5)
    pub max_connections: u32,
    /// Clock used by the subscription expiry listing
    pub clock: Clock,
    /// Length of the expiry window in days (default: 30)
    pub expiry_window_days: i64,
    /// Table whitelist for generic CRUD (default: the media catalog)
    pub catalog: CatalogSchema,
}

impl StoreConfig {
    /// Create a new configuration builder
    pub fn builder(database_url: impl Into<String>) -> StoreConfigBuilder {
        StoreConfigBuilder::new(database_url)
    }
}

/// Builder for StoreConfig
#[derive(Debug)]
pub struct StoreConfigBuilder {
    database_url: String,
    max_connections: u32,
    clock: Clock,
    expiry_window_days: i64,
    catalog: CatalogSchema,
}

impl StoreConfigBuilder {
    /// Create a new builder with the database URL
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 5,
            clock: Clock::System,
            expiry_window_days: 30,
            catalog: CatalogSchema::media_catalog(),
        }
    }

    /// Set the pool size (default: 5)
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the clock (default: system local date)
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Set the subscription expiry window (default: 30 days)
    pub fn expiry_window_days(mut self, days: i64) -> Self {
        self.expiry_window_days = days;
        self
    }

    /// Replace the table whitelist
    pub fn catalog(mut self, catalog: CatalogSchema) -> Self {
        self.catalog = catalog;
        self
    }

    /// Build the configuration
    pub fn build(self) -> StoreConfig {
        StoreConfig {
            database_url: self.database_url,
            max_connections: self.max_connections,
            clock: self.clock,
            expiry_window_days: self.expiry_window_days,
            catalog: self.catalog,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableDefinition;
    use crate::types::ColumnDefinition;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::builder("postgres://localhost/mediatek").build();

        assert_eq!(config.database_url, "postgres://localhost/mediatek");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.clock, Clock::System);
        assert_eq!(config.expiry_window_days, 30);
        assert!(config.catalog.table("livre").is_some());
    }

    #[test]
    fn test_builder_accepts_string() {
        let config = StoreConfig::builder(String::from("postgres://localhost/db")).build();
        assert_eq!(config.database_url, "postgres://localhost/db");
    }

    #[test]
    fn test_full_custom_config() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let mut catalog = CatalogSchema::empty();
        catalog
            .register(TableDefinition::new(
                "emprunt",
                vec![ColumnDefinition::text("id")],
            ))
            .unwrap();

        let config = StoreConfig::builder("postgres://localhost/test")
            .max_connections(12)
            .clock(Clock::Fixed(day))
            .expiry_window_days(7)
            .catalog(catalog)
            .build();

        assert_eq!(config.max_connections, 12);
        assert_eq!(config.clock.today(), day);
        assert_eq!(config.expiry_window_days, 7);
        assert!(config.catalog.table("livre").is_none());
        assert!(config.catalog.table("emprunt").is_some());
    }

    #[test]
    fn test_builder_debug() {
        let builder = StoreConfig::builder("postgres://localhost/test");
        let debug_str = format!("{:?}", builder);
        assert!(debug_str.contains("StoreConfigBuilder"));
    }
}
