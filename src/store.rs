//! CatalogStore - Main entry point for the media-lending catalog
//!
//! Owns the connection pool and a [`Dispatcher`] wired to a [`PgExecutor`].

use std::sync::Arc;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::StoreConfig;
use crate::dispatch::{Dispatcher, EntityKind};
use crate::error::{CatalogError, Result};
use crate::executor::PgExecutor;
use crate::handlers::EntityHandler;
use crate::types::{Fields, Request, Response, Row};

/// Request-driven PostgreSQL store for the media-lending catalog
pub struct CatalogStore {
    /// Database connection pool
    pool: PgPool,
    /// Store configuration
    config: StoreConfig,
    dispatcher: Dispatcher,
}

impl CatalogStore {
    /// Connect to the database and build the dispatcher
    pub async fn new(config: StoreConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .map_err(|e| CatalogError::Connection(format!("Database connection failed: {}", e)))?;

        Ok(Self::from_pool(pool, config))
    }

    /// Create a store over an existing pool
    ///
    /// Use this when the pool is shared with other parts of the application.
    pub fn from_pool(pool: PgPool, config: StoreConfig) -> Self {
        let executor = Arc::new(PgExecutor::new(pool.clone()));
        let dispatcher = Dispatcher::new(executor, &config);
        Self {
            pool,
            config,
            dispatcher,
        }
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Replace the handler serving `kind`
    pub fn register(&mut self, kind: EntityKind, handler: Arc<dyn EntityHandler>) {
        self.dispatcher.register(kind, handler);
    }

    // =========================================================================
    // Requests
    // =========================================================================

    pub async fn handle(&self, request: &Request) -> Result<Response> {
        self.dispatcher.handle(request).await
    }

    /// Rejections come back as `Ok(None)`
    pub async fn handle_compat(&self, request: &Request) -> Result<Option<Response>> {
        self.dispatcher.handle_compat(request).await
    }

    pub async fn select(&self, table: &str, fields: Fields) -> Result<Vec<Row>> {
        let request = Request::select(table).with_fields(fields);
        match self.handle(&request).await? {
            Response::Rows(rows) => Ok(rows),
            Response::Affected(_) => Ok(Vec::new()),
        }
    }

    pub async fn insert(&self, table: &str, fields: Fields) -> Result<u64> {
        let request = Request::insert(table).with_fields(fields);
        Ok(self.handle(&request).await?.affected().unwrap_or(0))
    }

    pub async fn update(&self, table: &str, id: &str, fields: Fields) -> Result<u64> {
        let request = Request::update(table, id).with_fields(fields);
        Ok(self.handle(&request).await?.affected().unwrap_or(0))
    }

    pub async fn delete(&self, table: &str, fields: Fields) -> Result<u64> {
        let request = Request::delete(table).with_fields(fields);
        Ok(self.handle(&request).await?.affected().unwrap_or(0))
    }
}
