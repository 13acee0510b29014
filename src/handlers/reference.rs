//! Read-only id + label lookup tables

use async_trait::async_trait;

use super::{EntityHandler, HandlerContext};
use crate::error::{CatalogError, Result};
use crate::sql::builder::QueryBuilder;
use crate::types::{Request, Row};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceHandler;

impl ReferenceHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EntityHandler for ReferenceHandler {
    async fn select(&self, ctx: &HandlerContext<'_>, request: &Request) -> Result<Vec<Row>> {
        let builder = QueryBuilder::new(ctx.catalog.require_table(&request.table)?);
        let statement = if request.fields.is_empty() {
            builder.select_ordered_by_label()?
        } else {
            builder.select_filtered(&request.fields)?
        };
        ctx.executor.query(&statement).await
    }

    async fn insert(&self, _ctx: &HandlerContext<'_>, request: &Request) -> Result<u64> {
        Err(CatalogError::ReadOnly(request.table.clone()))
    }

    async fn update(&self, _ctx: &HandlerContext<'_>, request: &Request) -> Result<u64> {
        Err(CatalogError::ReadOnly(request.table.clone()))
    }

    async fn delete(&self, _ctx: &HandlerContext<'_>, request: &Request) -> Result<u64> {
        Err(CatalogError::ReadOnly(request.table.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogSchema;
    use crate::config::Clock;
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
    async fn test_listing_is_ordered_by_label() {
        let spy = SpyExecutor::new();
        let catalog = CatalogSchema::media_catalog();

        ReferenceHandler
            .select(&ctx(&spy, &catalog), &Request::select("suivi"))
            .await
            .unwrap();
        ReferenceHandler
            .select(&ctx(&spy, &catalog), &Request::select("etat").field("id", "00002"))
            .await
            .unwrap();

        let queries = spy.queries();
        assert_eq!(queries[0].sql, "SELECT * FROM \"suivi\" ORDER BY \"libelle\"");
        assert_eq!(queries[1].sql, "SELECT * FROM \"etat\" WHERE \"id\" = :id");
        assert_eq!(queries[1].param("id"), Some(&json!("00002")));
    }

    #[tokio::test]
    async fn test_mutations_are_read_only() {
        let spy = SpyExecutor::new();
        let catalog = CatalogSchema::media_catalog();
        let c = ctx(&spy, &catalog);
        let request = Request::insert("genre").field("libelle", "Polar");

        assert!(matches!(
            ReferenceHandler.insert(&c, &request).await,
            Err(CatalogError::ReadOnly(t)) if t == "genre"
        ));
        assert!(matches!(
            ReferenceHandler.update(&c, &request).await,
            Err(CatalogError::ReadOnly(_))
        ));
        assert!(matches!(
            ReferenceHandler.delete(&c, &request).await,
            Err(CatalogError::ReadOnly(_))
        ));
        assert!(spy.calls().is_empty());
    }
}
