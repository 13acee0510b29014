//! Recording executor for unit tests
//!
//! Records every call, answers reads with canned rows, highest-id reads with
//! canned maxima, and guard queries with canned dependent counts. Each write
//! statement reports one affected row.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Executor, TransactionUnit, UnitOutcome, guard_count};
use crate::error::Result;
use crate::sql::named::Statement;
use crate::types::Row;

#[derive(Debug, Clone, PartialEq)]
pub enum SpyCall {
    Query(Statement),
    Execute(Statement),
    Unit(TransactionUnit),
}

#[derive(Debug, Default)]
pub struct SpyExecutor {
    rows: Vec<Row>,
    max_ids: Mutex<HashMap<String, String>>,
    dependents: HashMap<String, i64>,
    calls: Mutex<Vec<SpyCall>>,
    written: Mutex<Vec<Statement>>,
}

impl SpyExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows returned by every ordinary read
    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_max_id(self, table: &str, max: &str) -> Self {
        self.max_ids
            .lock()
            .unwrap()
            .insert(table.to_string(), max.to_string());
        self
    }

    /// Dependent-row count reported by guards naming `table`
    pub fn with_dependents(mut self, table: &str, count: i64) -> Self {
        self.dependents.insert(table.to_string(), count);
        self
    }

    pub fn calls(&self) -> Vec<SpyCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<Statement> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SpyCall::Query(stmt) => Some(stmt),
                _ => None,
            })
            .collect()
    }

    pub fn units(&self) -> Vec<TransactionUnit> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SpyCall::Unit(unit) => Some(unit),
                _ => None,
            })
            .collect()
    }

    /// Write statements that actually ran (committed units and executes)
    pub fn written(&self) -> Vec<Statement> {
        self.written.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.written.lock().unwrap().len()
    }

    fn max_id_rows(&self, sql: &str) -> Option<Vec<Row>> {
        let table = sql
            .strip_prefix("SELECT id AS max_id FROM \"")?
            .split('"')
            .next()?;
        let mut row = Row::new();
        let max = self.max_ids.lock().unwrap().get(table).cloned();
        row.insert(
            "max_id".to_string(),
            max.map(serde_json::Value::String)
                .unwrap_or(serde_json::Value::Null),
        );
        Some(vec![row])
    }

    fn count_row(count: i64) -> Vec<Row> {
        let mut row = Row::new();
        row.insert("count".to_string(), serde_json::Value::from(count));
        vec![row]
    }
}

#[async_trait]
impl Executor for SpyExecutor {
    async fn query(&self, statement: &Statement) -> Result<Vec<Row>> {
        statement.compile()?;
        self.calls
            .lock()
            .unwrap()
            .push(SpyCall::Query(statement.clone()));
        Ok(self
            .max_id_rows(&statement.sql)
            .unwrap_or_else(|| self.rows.clone()))
    }

    async fn execute(&self, statement: &Statement) -> Result<u64> {
        statement.compile()?;
        self.calls
            .lock()
            .unwrap()
            .push(SpyCall::Execute(statement.clone()));
        self.written.lock().unwrap().push(statement.clone());
        Ok(1)
    }

    async fn run_unit(&self, unit: TransactionUnit) -> Result<UnitOutcome> {
        self.calls.lock().unwrap().push(SpyCall::Unit(unit.clone()));

        for guard in &unit.guards {
            guard.statement.compile()?;
            let count = guard_count(&Self::count_row(
                self.dependents.get(&guard.dependent).copied().unwrap_or(0),
            ));
            if count > 0 {
                return Ok(UnitOutcome::Vetoed {
                    dependent: guard.dependent.clone(),
                    count,
                });
            }
        }

        let allocated_id = match &unit.allocation {
            Some(allocation) => {
                let sequence = allocation.sequence;
                let rows = self
                    .max_id_rows(&sequence.max_id_statement().sql)
                    .unwrap_or_default();
                let id = sequence.next_from_rows(&rows)?;
                self.max_ids
                    .lock()
                    .unwrap()
                    .insert(sequence.table.to_string(), id.clone());
                Some(id)
            }
            None => None,
        };

        let statements = unit.bound_statements(allocated_id.as_deref());
        for stmt in &statements {
            stmt.compile()?;
        }
        let rows_affected = statements.len() as u64;
        self.written.lock().unwrap().extend(statements);

        Ok(UnitOutcome::Committed {
            rows_affected,
            allocated_id,
        })
    }
}
