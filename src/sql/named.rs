//! Named-parameter statements
//!
//! Statements are written with `:name` placeholders and carry their values in
//! an ordered map. Before execution they are compiled to PostgreSQL's
//! positional `$n` form.

use crate::error::{CatalogError, Result};
use crate::types::Fields;

/// A SQL statement with named parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Fields,
}

/// A statement rewritten to positional placeholders, ready to bind
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    pub sql: String,
    pub values: Vec<serde_json::Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Fields::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Fields) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Bind a named parameter
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&serde_json::Value> {
        self.params.get(name)
    }

    /// Rewrite `:name` placeholders to `$n`
    ///
    /// A name used twice reuses its position. `::type` casts and anything
    /// inside single-quoted literals or double-quoted identifiers is copied
    /// through untouched.
    pub fn compile(&self) -> Result<CompiledStatement> {
        let mut sql = String::with_capacity(self.sql.len());
        let mut names: Vec<String> = Vec::new();
        let mut values = Vec::new();
        let mut chars = self.sql.chars().peekable();
        let mut in_literal = false;
        let mut in_identifier = false;

        while let Some(c) = chars.next() {
            match c {
                '\'' if !in_identifier => {
                    in_literal = !in_literal;
                    sql.push(c);
                }
                '"' if !in_literal => {
                    in_identifier = !in_identifier;
                    sql.push(c);
                }
                ':' if !in_literal && !in_identifier => match chars.peek() {
                    Some(':') => {
                        chars.next();
                        sql.push_str("::");
                    }
                    Some(next) if next.is_ascii_alphabetic() || *next == '_' => {
                        let mut name = String::new();
                        while let Some(&n) = chars.peek() {
                            if n.is_ascii_alphanumeric() || n == '_' {
                                name.push(n);
                                chars.next();
                            } else {
                                break;
                            }
                        }

                        let position = match names.iter().position(|known| *known == name) {
                            Some(idx) => idx + 1,
                            None => {
                                let value = self.params.get(&name).cloned().ok_or_else(|| {
                                    CatalogError::validation(format!(
                                        "No value bound for parameter ':{}'",
                                        name
                                    ))
                                })?;
                                names.push(name);
                                values.push(value);
                                names.len()
                            }
                        };
                        sql.push('$');
                        sql.push_str(&position.to_string());
                    }
                    _ => sql.push(c),
                },
                _ => sql.push(c),
            }
        }

        Ok(CompiledStatement { sql, values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compile_positions_follow_first_use() {
        let stmt = Statement::new("UPDATE livre SET auteur = :auteur WHERE id = :id")
            .bind("id", "00001")
            .bind("auteur", "Hugo");

        let compiled = stmt.compile().unwrap();
        assert_eq!(compiled.sql, "UPDATE livre SET auteur = $1 WHERE id = $2");
        assert_eq!(compiled.values, vec![json!("Hugo"), json!("00001")]);
    }

    #[test]
    fn test_compile_reuses_repeated_names() {
        let stmt = Statement::new("DELETE FROM livre WHERE id = :id OR id = :id").bind("id", "7");

        let compiled = stmt.compile().unwrap();
        assert_eq!(compiled.sql, "DELETE FROM livre WHERE id = $1 OR id = $1");
        assert_eq!(compiled.values.len(), 1);
    }

    #[test]
    fn test_compile_keeps_casts() {
        let stmt = Statement::new("SELECT * FROM abonnement WHERE date_fin_abonnement >= :today::date")
            .bind("today", "2024-05-01");

        let compiled = stmt.compile().unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT * FROM abonnement WHERE date_fin_abonnement >= $1::date"
        );
    }

    #[test]
    fn test_compile_ignores_literals_and_quoted_identifiers() {
        let stmt = Statement::new("SELECT ':nope' AS \"a:b\", :yes AS v").bind("yes", 1);

        let compiled = stmt.compile().unwrap();
        assert_eq!(compiled.sql, "SELECT ':nope' AS \"a:b\", $1 AS v");
        assert_eq!(compiled.values, vec![json!(1)]);
    }

    #[test]
    fn test_compile_missing_param_fails() {
        let stmt = Statement::new("SELECT * FROM dvd WHERE id = :id");
        let err = stmt.compile().unwrap_err();
        assert!(err.to_string().contains(":id"));
    }

    #[test]
    fn test_compile_without_placeholders() {
        let compiled = Statement::new("SELECT * FROM genre").compile().unwrap();
        assert_eq!(compiled.sql, "SELECT * FROM genre");
        assert!(compiled.values.is_empty());
    }
}
