//! Credential lookup on `utilisateur`
//!
//! The stored password is compared as-is. No hashing happens at this layer.

use async_trait::async_trait;

use super::{EntityHandler, HandlerContext, keys, require_fields, typed_value};
use crate::error::Result;
use crate::sql::named::Statement;
use crate::types::{ColumnType, Request, Row};

#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialHandler;

impl CredentialHandler {
    pub fn new() -> Self {
        Self
    }

    /// The matching user joined to its service; the password is never returned
    pub fn lookup_statement(login: serde_json::Value, pwd: serde_json::Value) -> Statement {
        Statement::new(
            "SELECT u.id, u.login, u.id_service, s.libelle AS service \
             FROM utilisateur u \
             JOIN service s ON s.id = u.id_service \
             WHERE u.login = :login AND u.pwd = :pwd",
        )
        .bind("login", login)
        .bind("pwd", pwd)
    }
}

#[async_trait]
impl EntityHandler for CredentialHandler {
    async fn select(&self, ctx: &HandlerContext<'_>, request: &Request) -> Result<Vec<Row>> {
        let fields = &request.fields;
        require_fields(fields, &[keys::LOGIN, keys::PWD])?;

        let statement = Self::lookup_statement(
            typed_value(fields, keys::LOGIN, ColumnType::Text)?,
            typed_value(fields, keys::PWD, ColumnType::Text)?,
        );
        ctx.executor.query(&statement).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogSchema;
    use crate::config::Clock;
    use crate::error::CatalogError;
    use crate::executor::spy::SpyExecutor;
    use serde_json::json;

    fn ctx<'a>(spy: &'a SpyExecutor, catalog: &'a CatalogSchema) -> HandlerContext<'a> {
        HandlerContext {
            executor: spy,
            catalog,
            clock: Clock::System,
            expiry_window_days: 30,
        }
    }

    #[tokio::test]
    async fn test_lookup_binds_both_values() {
        let spy = SpyExecutor::new();
        let catalog = CatalogSchema::media_catalog();
        let request = Request::select("utilisateur")
            .field("Login", "amartin")
            .field("Pwd", "secret");

        let rows = CredentialHandler
            .select(&ctx(&spy, &catalog), &request)
            .await
            .unwrap();
        assert!(rows.is_empty());

        let query = &spy.queries()[0];
        assert!(!query.sql.contains("u.pwd,"));
        assert_eq!(query.param("login"), Some(&json!("amartin")));
        assert_eq!(query.param("pwd"), Some(&json!("secret")));
    }

    #[tokio::test]
    async fn test_lookup_requires_password() {
        let spy = SpyExecutor::new();
        let catalog = CatalogSchema::media_catalog();
        let request = Request::select("utilisateur").field("Login", "amartin");

        let result = CredentialHandler.select(&ctx(&spy, &catalog), &request).await;
        assert!(matches!(result, Err(CatalogError::MissingField(k)) if k == "Pwd"));
        assert!(spy.calls().is_empty());
    }

    #[tokio::test]
    async fn test_mutations_are_unsupported() {
        let spy = SpyExecutor::new();
        let catalog = CatalogSchema::media_catalog();
        let request = Request::delete("utilisateur").field("id", "1");

        let result = CredentialHandler.delete(&ctx(&spy, &catalog), &request).await;
        assert!(matches!(result, Err(CatalogError::Unsupported { .. })));
    }
}
