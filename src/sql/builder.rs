//! Generic single-table CRUD statements
//!
//! Builds SELECT/INSERT/UPDATE/DELETE for any whitelisted table from a field
//! map. Every key must be a registered column; values are checked against the
//! column type and bound as named parameters.
//!
//! Reads accept an empty filter (whole table). Writes never do: an empty
//! field map on update or delete is refused before any SQL is built.

use crate::catalog::TableDefinition;
use crate::error::{CatalogError, Result};
use crate::sql::named::Statement;
use crate::sql::sanitize::quote_identifier;
use crate::types::{ColumnDefinition, Fields};

/// Statement builder bound to one whitelisted table
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    table: &'a TableDefinition,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(table: &'a TableDefinition) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'a TableDefinition {
        self.table
    }

    /// `SELECT * FROM table`
    pub fn select_all(&self) -> Statement {
        Statement::new(format!("SELECT * FROM {}", quote_identifier(&self.table.name)))
    }

    /// Equality-AND over every field; an empty map selects the whole table
    pub fn select_filtered(&self, fields: &Fields) -> Result<Statement> {
        if fields.is_empty() {
            return Ok(self.select_all());
        }
        let (where_clause, params) = self.equality_clause(fields)?;
        Ok(Statement::with_params(
            format!(
                "SELECT * FROM {} WHERE {}",
                quote_identifier(&self.table.name),
                where_clause
            ),
            params,
        ))
    }

    /// `SELECT * FROM table ORDER BY label` for id + label reference tables
    pub fn select_ordered_by_label(&self) -> Result<Statement> {
        let label = self.table.label_column.as_deref().ok_or_else(|| {
            CatalogError::validation(format!("Table '{}' has no label column", self.table.name))
        })?;
        Ok(Statement::new(format!(
            "SELECT * FROM {} ORDER BY {}",
            quote_identifier(&self.table.name),
            quote_identifier(label)
        )))
    }

    /// Column list and placeholder list in field-map order
    pub fn insert(&self, fields: &Fields) -> Result<Statement> {
        if fields.is_empty() {
            return Err(CatalogError::EmptyFields);
        }

        let mut column_names = Vec::with_capacity(fields.len());
        let mut placeholders = Vec::with_capacity(fields.len());
        let mut params = Fields::new();

        for (name, value) in fields {
            let col = self.checked_column(name, value)?;
            column_names.push(quote_identifier(&col.name));
            placeholders.push(format!(":{}{}", col.name, col.column_type.cast_suffix()));
            params.insert(col.name.clone(), col.column_type.coerce(value));
        }

        Ok(Statement::with_params(
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_identifier(&self.table.name),
                column_names.join(", "),
                placeholders.join(", ")
            ),
            params,
        ))
    }

    /// Set every field on the row whose `id` matches
    ///
    /// The `id` argument always wins over an `id` key in the field map.
    pub fn update(&self, id: Option<&str>, fields: &Fields) -> Result<Statement> {
        if fields.is_empty() {
            return Err(CatalogError::EmptyFields);
        }
        let id = id.ok_or(CatalogError::MissingId)?;
        let id_column = self.table.require_column("id")?;

        let mut set_clauses = Vec::with_capacity(fields.len());
        let mut params = Fields::new();

        for (name, value) in fields {
            let col = self.checked_column(name, value)?;
            set_clauses.push(format!(
                "{} = :{}{}",
                quote_identifier(&col.name),
                col.name,
                col.column_type.cast_suffix()
            ));
            params.insert(col.name.clone(), col.column_type.coerce(value));
        }
        params.insert("id".to_string(), serde_json::Value::String(id.to_string()));

        Ok(Statement::with_params(
            format!(
                "UPDATE {} SET {} WHERE {} = :id{}",
                quote_identifier(&self.table.name),
                set_clauses.join(", "),
                quote_identifier(&id_column.name),
                id_column.column_type.cast_suffix()
            ),
            params,
        ))
    }

    /// Equality-AND delete; refuses an empty filter
    pub fn delete(&self, fields: &Fields) -> Result<Statement> {
        if fields.is_empty() {
            return Err(CatalogError::EmptyFields);
        }
        let (where_clause, params) = self.equality_clause(fields)?;
        Ok(Statement::with_params(
            format!(
                "DELETE FROM {} WHERE {}",
                quote_identifier(&self.table.name),
                where_clause
            ),
            params,
        ))
    }

    fn equality_clause(&self, fields: &Fields) -> Result<(String, Fields)> {
        let mut clauses = Vec::with_capacity(fields.len());
        let mut params = Fields::new();

        for (name, value) in fields {
            let col = self.checked_column(name, value)?;
            if value.is_null() {
                clauses.push(format!("{} IS NULL", quote_identifier(&col.name)));
            } else {
                clauses.push(format!(
                    "{} = :{}{}",
                    quote_identifier(&col.name),
                    col.name,
                    col.column_type.cast_suffix()
                ));
                params.insert(col.name.clone(), col.column_type.coerce(value));
            }
        }

        Ok((clauses.join(" AND "), params))
    }

    fn checked_column(
        &self,
        name: &str,
        value: &serde_json::Value,
    ) -> Result<&'a ColumnDefinition> {
        let col = self.table.require_column(name)?;
        col.column_type
            .validate_value(value)
            .map_err(|reason| CatalogError::InvalidValue {
                column: col.name.clone(),
                reason,
            })?;
        Ok(col)
    }
}
