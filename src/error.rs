//! Error types for catalog operations

use thiserror::Error;

/// Errors that can occur while serving a catalog request
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Field map is empty")]
    EmptyFields,

    #[error("Missing record id")]
    MissingId,

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Unknown column '{column}' for table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Invalid value for column '{column}': {reason}")]
    InvalidValue { column: String, reason: String },

    #[error("Table is read-only: {0}")]
    ReadOnly(String),

    #[error("Operation {operation} is not supported for '{table}'")]
    Unsupported { table: String, operation: String },

    #[error("Cannot delete '{id}': {count} dependent row(s) in {dependent}")]
    DeleteBlocked {
        id: String,
        dependent: String,
        count: i64,
    },

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CatalogError {
    pub fn missing_field(name: impl Into<String>) -> Self {
        Self::MissingField(name.into())
    }

    pub fn unknown_table(name: impl Into<String>) -> Self {
        Self::UnknownTable(name.into())
    }

    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn unsupported(table: impl Into<String>, operation: impl std::fmt::Display) -> Self {
        Self::Unsupported {
            table: table.into(),
            operation: operation.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True when the request was refused before any statement reached the
    /// database: malformed input or a delete vetoed by dependent rows.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            Self::Sql(_) | Self::Connection(_) | Self::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
