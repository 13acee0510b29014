//! SQL utilities for the catalog store
//!
//! Provides identifier sanitization, named-parameter statements, and the
//! generic single-table query builder.

pub mod builder;
pub mod named;
pub mod sanitize;

pub use builder::QueryBuilder;
pub use named::{CompiledStatement, Statement};
pub use sanitize::{POSTGRES_RESERVED_WORDS, quote_identifier, validate_identifier};
