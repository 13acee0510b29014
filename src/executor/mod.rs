//! Statement execution
//!
//! The catalog core never talks to a connection directly. Reads go through
//! [`Executor::query`], single-table writes through [`Executor::execute`], and
//! every write that spans more than one table is handed over as one
//! [`TransactionUnit`], which the executor runs inside a single scoped
//! transaction.

use async_trait::async_trait;

use crate::error::Result;
use crate::ids::IdSequence;
use crate::sql::named::Statement;
use crate::types::Row;

pub mod postgres;
#[cfg(test)]
pub(crate) mod spy;

pub use postgres::PgExecutor;

/// Pre-write dependency check, run inside the unit before any write
///
/// `statement` must return a single row with an integer `count` column.
#[derive(Debug, Clone, PartialEq)]
pub struct Guard {
    /// Table holding the dependent rows, reported when the unit is vetoed
    pub dependent: String,
    pub statement: Statement,
}

/// Id drawn from a sequence inside the unit and bound to every statement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allocation {
    pub sequence: IdSequence,
    /// Parameter name the allocated id is bound to
    pub param: &'static str,
}

/// A group of statements that commits or rolls back as a whole
///
/// Execution order: `locks`, `guards`, `allocation`, then `statements`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionUnit {
    pub locks: Vec<Statement>,
    pub guards: Vec<Guard>,
    pub allocation: Option<Allocation>,
    pub statements: Vec<Statement>,
}

impl TransactionUnit {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self {
            statements,
            ..Self::default()
        }
    }

    /// Allocate an id from `sequence` and bind it as `param`
    pub fn allocate(mut self, sequence: IdSequence, param: &'static str) -> Self {
        self.allocation = Some(Allocation { sequence, param });
        self
    }

    pub fn lock(mut self, statement: Statement) -> Self {
        self.locks.push(statement);
        self
    }

    pub fn guard(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    /// Statements with the allocated id bound, ready to run
    pub fn bound_statements(&self, allocated_id: Option<&str>) -> Vec<Statement> {
        match (&self.allocation, allocated_id) {
            (Some(allocation), Some(id)) => self
                .statements
                .iter()
                .cloned()
                .map(|stmt| stmt.bind(allocation.param, id))
                .collect(),
            _ => self.statements.clone(),
        }
    }
}

/// What happened to a transaction unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    /// All statements ran and the transaction committed
    Committed {
        rows_affected: u64,
        allocated_id: Option<String>,
    },
    /// A guard found dependent rows; nothing was written
    Vetoed { dependent: String, count: i64 },
}

/// Executes statements against the relational store
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a read and return its rows
    async fn query(&self, statement: &Statement) -> Result<Vec<Row>>;

    /// Run a single write and return the affected-row count
    async fn execute(&self, statement: &Statement) -> Result<u64>;

    /// Run a unit in one transaction; any error rolls the whole unit back
    async fn run_unit(&self, unit: TransactionUnit) -> Result<UnitOutcome>;
}

/// Read the `count` column of a guard query result
pub fn guard_count(rows: &[Row]) -> i64 {
    rows.first()
        .and_then(|row| row.get("count"))
        .and_then(|value| {
            value
                .as_i64()
                .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        })
        .unwrap_or(0)
}
