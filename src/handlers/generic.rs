//! Fallback handler: single-table CRUD over any whitelisted table

use async_trait::async_trait;

use super::{EntityHandler, HandlerContext};
use crate::error::Result;
use crate::sql::builder::QueryBuilder;
use crate::types::{Request, Row};

#[derive(Debug, Clone, Copy, Default)]
pub struct GenericHandler;

impl GenericHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EntityHandler for GenericHandler {
    async fn select(&self, ctx: &HandlerContext<'_>, request: &Request) -> Result<Vec<Row>> {
        let table = ctx.catalog.require_table(&request.table)?;
        let statement = QueryBuilder::new(table).select_filtered(&request.fields)?;
        ctx.executor.query(&statement).await
    }

    async fn insert(&self, ctx: &HandlerContext<'_>, request: &Request) -> Result<u64> {
        let table = ctx.catalog.require_table(&request.table)?;
        let statement = QueryBuilder::new(table).insert(&request.fields)?;
        ctx.executor.execute(&statement).await
    }

    async fn update(&self, ctx: &HandlerContext<'_>, request: &Request) -> Result<u64> {
        let table = ctx.catalog.require_table(&request.table)?;
        let statement = QueryBuilder::new(table).update(request.id.as_deref(), &request.fields)?;
        ctx.executor.execute(&statement).await
    }

    async fn delete(&self, ctx: &HandlerContext<'_>, request: &Request) -> Result<u64> {
        let table = ctx.catalog.require_table(&request.table)?;
        let statement = QueryBuilder::new(table).delete(&request.fields)?;
        ctx.executor.execute(&statement).await
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
    async fn test_update_uses_request_id() {
        let spy = SpyExecutor::new();
        let catalog = CatalogSchema::media_catalog();
        let request = Request::update("document", "00003").field("titre", "Germinal");

        GenericHandler.update(&ctx(&spy, &catalog), &request).await.unwrap();

        let written = &spy.written()[0];
        assert_eq!(
            written.sql,
            "UPDATE \"document\" SET \"titre\" = :titre WHERE \"id\" = :id"
        );
        assert_eq!(written.param("id"), Some(&json!("00003")));
    }

    #[tokio::test]
    async fn test_unknown_table_is_rejected() {
        let spy = SpyExecutor::new();
        let catalog = CatalogSchema::media_catalog();

        let result = GenericHandler
            .select(&ctx(&spy, &catalog), &Request::select("emprunt"))
            .await;
        assert!(matches!(result, Err(CatalogError::UnknownTable(t)) if t == "emprunt"));
        assert!(spy.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_filter_reads_but_never_writes() {
        let spy = SpyExecutor::new();
        let catalog = CatalogSchema::media_catalog();
        let c = ctx(&spy, &catalog);

        GenericHandler
            .select(&c, &Request::select("commandedocument"))
            .await
            .unwrap();
        assert!(matches!(
            GenericHandler.delete(&c, &Request::delete("commandedocument")).await,
            Err(CatalogError::EmptyFields)
        ));
        assert!(matches!(
            GenericHandler
                .update(&c, &Request::update("commandedocument", "00001"))
                .await,
            Err(CatalogError::EmptyFields)
        ));

        assert_eq!(spy.queries()[0].sql, "SELECT * FROM \"commandedocument\"");
        assert_eq!(spy.write_count(), 0);
    }

    #[tokio::test]
    async fn test_update_without_id_is_rejected() {
        let spy = SpyExecutor::new();
        let catalog = CatalogSchema::media_catalog();
        let request = Request::new(crate::types::Operation::Update, "document")
            .field("titre", "Germinal");

        let result = GenericHandler.update(&ctx(&spy, &catalog), &request).await;
        assert!(matches!(result, Err(CatalogError::MissingId)));
        assert_eq!(spy.write_count(), 0);
    }
}
