//! Core type definitions for the catalog store
//!
//! Includes column types used by the table whitelist, and the request and
//! response shapes exchanged with the front end.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered map of field name to scalar value, as sent by the caller
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// One result row, keyed by column name (or alias) in select order
pub type Row = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Column Definitions (for the table whitelist)
// ============================================================================

/// Column type, used to validate values and cast bound parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// VARCHAR / TEXT
    Text,
    /// INTEGER
    Integer,
    /// NUMERIC
    Decimal,
    /// DATE (`YYYY-MM-DD`)
    Date,
    /// BOOLEAN
    Boolean,
}

impl ColumnType {
    /// Cast appended to a placeholder so PostgreSQL accepts text-bound values
    pub fn cast_suffix(&self) -> &'static str {
        match self {
            ColumnType::Text => "",
            ColumnType::Integer => "::integer",
            ColumnType::Decimal => "::numeric",
            ColumnType::Date => "::date",
            ColumnType::Boolean => "::boolean",
        }
    }

    /// Normalize a value before binding; text columns take numbers as strings
    pub fn coerce(&self, value: &serde_json::Value) -> serde_json::Value {
        match (self, value) {
            (ColumnType::Text, serde_json::Value::Number(n)) => {
                serde_json::Value::String(n.to_string())
            }
            _ => value.clone(),
        }
    }

    /// Validate that a JSON value is compatible with this column type
    pub fn validate_value(&self, value: &serde_json::Value) -> Result<(), String> {
        if value.is_null() {
            return Ok(());
        }

        match (self, value) {
            (ColumnType::Text, serde_json::Value::String(_)) => Ok(()),
            (ColumnType::Text, serde_json::Value::Number(_)) => Ok(()),
            (ColumnType::Integer, serde_json::Value::Number(n)) if n.is_i64() => Ok(()),
            (ColumnType::Integer, serde_json::Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(|_| ())
                .map_err(|_| format!("Cannot convert '{}' to integer", s)),
            (ColumnType::Decimal, serde_json::Value::Number(_)) => Ok(()),
            (ColumnType::Decimal, serde_json::Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(|_| ())
                .map_err(|_| format!("Cannot convert '{}' to decimal", s)),
            (ColumnType::Date, serde_json::Value::String(s)) => {
                let date_part = s.get(..10).unwrap_or(s);
                chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
                    .map(|_| ())
                    .map_err(|e| format!("Invalid date '{}': {}", s, e))
            }
            (ColumnType::Boolean, serde_json::Value::Bool(_)) => Ok(()),
            (ColumnType::Boolean, serde_json::Value::String(s)) => {
                match s.to_lowercase().as_str() {
                    "true" | "false" | "1" | "0" => Ok(()),
                    _ => Err(format!("Cannot convert '{}' to boolean", s)),
                }
            }
            _ => Err(format!(
                "Type mismatch: expected {:?}, got {}",
                self, value
            )),
        }
    }
}

/// Column definition for a whitelisted table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// Column name (valid PostgreSQL identifier)
    pub name: String,
    /// Column type
    pub column_type: ColumnType,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }
}

// ============================================================================
// Requests and Responses
// ============================================================================

/// Kind of request operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Select => "select",
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// A generic (table, operation, fields, id) request from the front end
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub operation: Operation,
    pub table: String,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Request {
    pub fn new(operation: Operation, table: impl Into<String>) -> Self {
        Self {
            operation,
            table: table.into(),
            fields: Fields::new(),
            id: None,
        }
    }

    pub fn select(table: impl Into<String>) -> Self {
        Self::new(Operation::Select, table)
    }

    pub fn insert(table: impl Into<String>) -> Self {
        Self::new(Operation::Insert, table)
    }

    pub fn update(table: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(Operation::Update, table).with_id(id)
    }

    pub fn delete(table: impl Into<String>) -> Self {
        Self::new(Operation::Delete, table)
    }

    /// Add a field to the request
    pub fn field(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Replace all fields at once
    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Result of a dispatched request
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Response {
    /// Rows returned by a select
    Rows(Vec<Row>),
    /// Affected-row count of an insert, update or delete
    Affected(u64),
}

impl Response {
    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            Response::Rows(rows) => Some(rows),
            Response::Affected(_) => None,
        }
    }

    pub fn affected(&self) -> Option<u64> {
        match self {
            Response::Affected(n) => Some(*n),
            Response::Rows(_) => None,
        }
    }
}
