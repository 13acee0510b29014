//! PostgreSQL executor backed by an sqlx connection pool

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row as _, TypeInfo};
use tracing::debug;

use super::{Executor, TransactionUnit, UnitOutcome, guard_count};
use crate::error::Result;
use crate::sql::named::Statement;
use crate::types::Row;

/// Executes catalog statements on a `PgPool`
///
/// Transaction units run on a scoped `sqlx::Transaction`: it commits only
/// after the last statement succeeds and rolls back when dropped on any
/// other path.
#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Executor for PgExecutor {
    async fn query(&self, statement: &Statement) -> Result<Vec<Row>> {
        fetch_rows(&self.pool, statement).await
    }

    async fn execute(&self, statement: &Statement) -> Result<u64> {
        execute_on(&self.pool, statement).await
    }

    async fn run_unit(&self, unit: TransactionUnit) -> Result<UnitOutcome> {
        let mut tx = self.pool.begin().await?;

        for lock in &unit.locks {
            fetch_rows(&mut *tx, lock).await?;
        }

        for guard in &unit.guards {
            let rows = fetch_rows(&mut *tx, &guard.statement).await?;
            let count = guard_count(&rows);
            if count > 0 {
                tx.rollback().await?;
                return Ok(UnitOutcome::Vetoed {
                    dependent: guard.dependent.clone(),
                    count,
                });
            }
        }

        let allocated_id = match &unit.allocation {
            Some(allocation) => {
                let sequence = allocation.sequence;
                execute_on(&mut *tx, &sequence.lock_statement()).await?;
                let rows = fetch_rows(&mut *tx, &sequence.max_id_statement()).await?;
                Some(sequence.next_from_rows(&rows)?)
            }
            None => None,
        };

        let mut rows_affected = 0;
        for statement in unit.bound_statements(allocated_id.as_deref()) {
            rows_affected += execute_on(&mut *tx, &statement).await?;
        }

        tx.commit().await?;

        Ok(UnitOutcome::Committed {
            rows_affected,
            allocated_id,
        })
    }
}

async fn fetch_rows<'c, E>(executor: E, statement: &Statement) -> Result<Vec<Row>>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let compiled = statement.compile()?;
    debug!(sql = %compiled.sql, params = compiled.values.len(), "query");

    let rows = bind_values(sqlx::query(&compiled.sql), &compiled.values)
        .fetch_all(executor)
        .await?;

    Ok(rows.iter().map(row_to_map).collect())
}

async fn execute_on<'c, E>(executor: E, statement: &Statement) -> Result<u64>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let compiled = statement.compile()?;
    debug!(sql = %compiled.sql, params = compiled.values.len(), "execute");

    let result = bind_values(sqlx::query(&compiled.sql), &compiled.values)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Bind values by JSON kind; the SQL text carries any cast the column needs
fn bind_values<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    values: &'q [serde_json::Value],
) -> Query<'q, Postgres, PgArguments> {
    for value in values {
        query = match value {
            serde_json::Value::Null => query.bind(None::<String>),
            serde_json::Value::Bool(b) => query.bind(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    query.bind(i)
                } else if let Some(f) = n.as_f64() {
                    query.bind(f)
                } else {
                    query.bind(n.to_string())
                }
            }
            serde_json::Value::String(s) => query.bind(s.as_str()),
            other => query.bind(other),
        };
    }
    query
}

fn row_to_map(row: &PgRow) -> Row {
    let mut map = Row::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.type_info().name());
        map.insert(column.name().to_string(), value);
    }
    map
}

fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> serde_json::Value {
    use serde_json::Value;

    match type_name {
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),
        "INT8" => row
            .try_get::<Option<i64>, _>(idx)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)
            .ok()
            .flatten()
            .and_then(|f| serde_json::Number::from_f64(f64::from(f)))
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)
            .ok()
            .flatten()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "NUMERIC" => {
            use rust_decimal::prelude::ToPrimitive;
            row.try_get::<Option<rust_decimal::Decimal>, _>(idx)
                .ok()
                .flatten()
                .and_then(|d| d.to_f64())
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }
        "BOOL" => row
            .try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(idx)
            .ok()
            .flatten()
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)
            .ok()
            .flatten()
            .map(|t| Value::String(t.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(Value::Null),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)
            .ok()
            .flatten()
            .map(|t| Value::String(t.to_rfc3339()))
            .unwrap_or(Value::Null),
        "JSON" | "JSONB" => row
            .try_get::<Option<Value>, _>(idx)
            .ok()
            .flatten()
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<Option<String>, _>(idx)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
