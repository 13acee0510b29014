//! Sequential id allocation
//!
//! Book, DVD, periodical and order ids are strings computed from the highest
//! stored id of their own table. Book and order ids are zero-padded to five
//! digits; DVD and periodical ids are plain decimals with their own seeds.
//!
//! The read-increment-insert sequence is only safe inside a transaction that
//! holds the sequence table lock (see [`IdSequence::lock_statement`]), which
//! is how [`crate::executor::Executor::run_unit`] uses it.

use crate::error::{CatalogError, Result};
use crate::executor::Executor;
use crate::sql::named::Statement;
use crate::sql::sanitize::quote_identifier;
use crate::types::Row;

/// Id formatting rule for one entity table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdSequence {
    /// Table whose maximum id drives the sequence
    pub table: &'static str,
    /// First id handed out when the table is empty
    pub seed: u64,
    /// Zero-padding width, `None` for plain decimal
    pub width: Option<usize>,
}

impl IdSequence {
    pub const BOOK: IdSequence = IdSequence {
        table: "livre",
        seed: 1,
        width: Some(5),
    };

    pub const DVD: IdSequence = IdSequence {
        table: "dvd",
        seed: 20001,
        width: None,
    };

    pub const PERIODICAL: IdSequence = IdSequence {
        table: "revue",
        seed: 10001,
        width: None,
    };

    /// Shared by document orders and subscriptions
    pub const ORDER: IdSequence = IdSequence {
        table: "commande",
        seed: 1,
        width: Some(5),
    };

    pub fn format(&self, value: u64) -> String {
        match self.width {
            Some(width) => format!("{:0width$}", value, width = width),
            None => value.to_string(),
        }
    }

    /// Next id after the current maximum (`None` when the table is empty)
    pub fn next_after(&self, max: Option<&str>) -> Result<String> {
        let Some(max) = max.map(str::trim).filter(|m| !m.is_empty()) else {
            return Ok(self.format(self.seed));
        };

        let current: u64 = max.parse().map_err(|_| {
            CatalogError::InvalidId(format!(
                "Stored id '{}' in '{}' is not numeric",
                max, self.table
            ))
        })?;
        let next = current.checked_add(1).ok_or_else(|| {
            CatalogError::InvalidId(format!("Id sequence for '{}' is exhausted", self.table))
        })?;
        Ok(self.format(next))
    }

    /// Highest stored id of the table, as `max_id`
    ///
    /// Ids are text, so the numeric maximum is the longest id with the
    /// greatest value among those of that length (`99999` < `100000`).
    pub fn max_id_statement(&self) -> Statement {
        Statement::new(format!(
            "SELECT id AS max_id FROM {} ORDER BY length(id) DESC, id DESC LIMIT 1",
            quote_identifier(self.table)
        ))
    }

    /// Serializes allocators on this table while still allowing reads
    pub fn lock_statement(&self) -> Statement {
        Statement::new(format!(
            "LOCK TABLE {} IN SHARE ROW EXCLUSIVE MODE",
            quote_identifier(self.table)
        ))
    }

    /// Next id from the rows of [`Self::max_id_statement`]
    pub fn next_from_rows(&self, rows: &[Row]) -> Result<String> {
        let max = rows.first().and_then(|row| row.get("max_id")).and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        self.next_after(max.as_deref())
    }
}

/// Read-only preview of the next id of a sequence
///
/// Writes never use this value directly: composite inserts allocate inside
/// their own transaction unit.
pub struct IdAllocator;

impl IdAllocator {
    pub async fn next_id(executor: &dyn Executor, sequence: IdSequence) -> Result<String> {
        let rows = executor.query(&sequence.max_id_statement()).await?;
        sequence.next_from_rows(&rows)
    }
}
