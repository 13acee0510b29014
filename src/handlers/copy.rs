//! Physical copies (`exemplaire`), keyed by (document id, copy number)

use async_trait::async_trait;

use super::{
    EntityHandler, HandlerContext, keys, present_key, record_id, require_fields, text_field,
    typed_value,
};
use crate::error::{CatalogError, Result};
use crate::sql::builder::QueryBuilder;
use crate::sql::named::Statement;
use crate::types::{ColumnType, Request, Row};

const TABLE: &str = "exemplaire";

const COPIES: &str = "SELECT e.id, e.numero, e.date_achat, e.photo, e.id_etat, \
     et.libelle AS etat, d.titre \
     FROM exemplaire e \
     JOIN document d ON e.id = d.id \
     LEFT JOIN etat et ON et.id = e.id_etat";

#[derive(Debug, Clone, Copy, Default)]
pub struct CopyHandler;

impl CopyHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn select_all_statement() -> Statement {
        Statement::new(format!("{} ORDER BY e.date_achat DESC", COPIES))
    }

    /// Copies of one document, most recently bought first
    pub fn select_by_document_statement(id: &str) -> Statement {
        Statement::new(format!("{} WHERE e.id = :id ORDER BY e.date_achat DESC", COPIES))
            .bind("id", id)
    }
}

#[async_trait]
impl EntityHandler for CopyHandler {
    async fn select(&self, ctx: &HandlerContext<'_>, request: &Request) -> Result<Vec<Row>> {
        let statement = if request.fields.is_empty() {
            Self::select_all_statement()
        } else {
            let id = text_field(&request.fields, keys::SELECT_ID)
                .ok_or_else(|| CatalogError::missing_field(keys::SELECT_ID))?;
            Self::select_by_document_statement(&id)
        };
        ctx.executor.query(&statement).await
    }

    /// Column-keyed insert through the whitelist
    async fn insert(&self, ctx: &HandlerContext<'_>, request: &Request) -> Result<u64> {
        let table = ctx.catalog.require_table(TABLE)?;
        let statement = QueryBuilder::new(table).insert(&request.fields)?;
        ctx.executor.execute(&statement).await
    }

    /// Only the state of a copy is mutable
    ///
    /// Keys are accepted as `Id`/`Numero`/`IdEtat` or as the column names
    /// the insert takes.
    async fn update(&self, ctx: &HandlerContext<'_>, request: &Request) -> Result<u64> {
        let id = record_id(request, keys::ANY_ID)?;
        let numero = present_key(&request.fields, keys::ANY_NUMERO);
        let id_etat = present_key(&request.fields, keys::ANY_ID_ETAT);
        require_fields(&request.fields, &[numero, id_etat])?;

        let statement = Statement::new(
            "UPDATE exemplaire SET id_etat = :id_etat WHERE id = :id AND numero = :numero::integer",
        )
        .bind(
            "id_etat",
            typed_value(&request.fields, id_etat, ColumnType::Text)?,
        )
        .bind("id", id)
        .bind(
            "numero",
            typed_value(&request.fields, numero, ColumnType::Integer)?,
        );
        ctx.executor.execute(&statement).await
    }

    async fn delete(&self, ctx: &HandlerContext<'_>, request: &Request) -> Result<u64> {
        let id = record_id(request, keys::ANY_ID)?;
        let numero = present_key(&request.fields, keys::ANY_NUMERO);
        require_fields(&request.fields, &[numero])?;

        let statement =
            Statement::new("DELETE FROM exemplaire WHERE id = :id AND numero = :numero::integer")
                .bind("id", id)
                .bind(
                    "numero",
                    typed_value(&request.fields, numero, ColumnType::Integer)?,
                );
        ctx.executor.execute(&statement).await
    }
}
