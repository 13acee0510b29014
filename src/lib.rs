//! # mediatheque-store
//!
//! A request-driven PostgreSQL data-access layer for a media-lending catalog.
//!
//! Callers send generic `(operation, table, fields, id)` requests. The store
//! routes each one to a handler for its entity kind (books, DVDs,
//! periodicals, orders, subscriptions, copies, users, reference tables) or
//! to whitelisted single-table CRUD, and turns it into parameterized SQL.
//!
//! ## Features
//!
//! - **Composite Writes**: Document, order and subscription writes spanning several tables run in one transaction
//! - **Sequential Ids**: Book, DVD, periodical and order ids are allocated under a table lock
//! - **Referential Guard**: Documents with copies, order lines or subscriptions cannot be deleted
//! - **Column Whitelist**: Generic CRUD only accepts registered tables and columns
//! - **SQL Injection Prevention**: Values are always bound; identifiers are quoted and validated
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mediatheque_store::{CatalogStore, Request, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StoreConfig::builder("postgres://localhost/mediatek").build();
//!     let store = CatalogStore::new(config).await?;
//!
//!     // Create a book; its id is allocated by the store
//!     store
//!         .handle(
//!             &Request::insert("livre")
//!                 .field("Titre", "Les Misérables")
//!                 .field("IdRayon", "LV001")
//!                 .field("IdPublic", "00002")
//!                 .field("IdGenre", "10000")
//!                 .field("Auteur", "Victor Hugo"),
//!         )
//!         .await?;
//!
//!     // Subscriptions ending within the next 30 days
//!     let expiring = store
//!         .handle(&Request::select("abonnement").field("expiring", true))
//!         .await?;
//!     println!("{:?}", expiring.rows());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use mediatheque_store::{Clock, StoreConfig};
//!
//! let config = StoreConfig::builder("postgres://localhost/mediatek")
//!     .max_connections(10)      // Pool size (default 5)
//!     .clock(Clock::System)     // Source of "today" (default)
//!     .expiry_window_days(30)   // Subscription expiry window (default 30)
//!     .build();
//! ```

pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod guard;
pub mod handlers;
pub mod ids;
pub mod sql;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use catalog::{CatalogSchema, TableDefinition};
pub use config::{Clock, StoreConfig, StoreConfigBuilder};
pub use dispatch::{Dispatcher, EntityKind};
pub use error::{CatalogError, Result};
pub use executor::{Executor, PgExecutor, TransactionUnit, UnitOutcome};
pub use guard::{DocumentFamily, ReferentialGuard};
pub use handlers::{EntityHandler, HandlerContext};
pub use ids::{IdAllocator, IdSequence};
pub use store::CatalogStore;
pub use types::{ColumnDefinition, ColumnType, Fields, Operation, Request, Response, Row};

// Re-export SQL utilities for advanced users
pub use sql::builder::QueryBuilder;
pub use sql::named::Statement;
pub use sql::sanitize::{quote_identifier, validate_identifier};
