//! Document orders (`commande` + `commandedocument`)

use async_trait::async_trait;

use super::{
    EntityHandler, HandlerContext, keys, record_id, require_fields, text_field, typed_value,
    unit_result,
};
use crate::error::{CatalogError, Result};
use crate::executor::TransactionUnit;
use crate::ids::IdSequence;
use crate::sql::named::Statement;
use crate::types::{ColumnType, Fields, Request, Row};

const REQUIRED: &[&str] = &[
    keys::ID_LIVRE_DVD,
    keys::ID_SUIVI,
    keys::NB_EXEMPLAIRE,
    keys::DATE_COMMANDE,
    keys::MONTANT,
];

const ORDER_LINES: &str = "SELECT cd.id, cd.nb_exemplaire, cd.id_livre_dvd, cd.id_suivi, \
     s.libelle AS suivi, c.date_commande, c.montant \
     FROM commandedocument cd \
     JOIN commande c ON cd.id = c.id \
     JOIN suivi s ON cd.id_suivi = s.id";

/// Leading character of the ids belonging to a logical document type
///
/// Book ids are zero-padded from `00001`, DVD ids start at `20001`. Any type
/// other than a book is treated as a DVD.
pub fn order_target_prefix(document_type: &str) -> &'static str {
    match document_type {
        "livre" | "book" => "0",
        _ => "2",
    }
}

/// Parent `commande` row shared by document orders and subscriptions
pub(crate) fn insert_commande(params: &Fields) -> Statement {
    Statement::with_params(
        "INSERT INTO commande (id, date_commande, montant) \
         VALUES (:id, :date_commande::date, :montant::numeric)",
        params.clone(),
    )
}

/// Order date and amount, validated
pub(crate) fn commande_params(fields: &Fields) -> Result<Fields> {
    let mut params = Fields::new();
    params.insert(
        "date_commande".to_string(),
        typed_value(fields, keys::DATE_COMMANDE, ColumnType::Date)?,
    );
    params.insert(
        "montant".to_string(),
        typed_value(fields, keys::MONTANT, ColumnType::Decimal)?,
    );
    Ok(params)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderHandler;

impl OrderHandler {
    pub fn new() -> Self {
        Self
    }

    /// Every order line, newest first
    pub fn select_all_statement() -> Statement {
        Statement::new(format!("{} ORDER BY c.date_commande DESC", ORDER_LINES))
    }

    /// Order lines for one book or DVD, newest first
    pub fn select_by_target_statement(target: &str) -> Statement {
        Statement::new(format!(
            "{} WHERE cd.id_livre_dvd = :id ORDER BY c.date_commande DESC",
            ORDER_LINES
        ))
        .bind("id", target)
    }

    /// Order lines whose target id carries the prefix of `document_type`
    pub fn select_by_type_statement(document_type: &str) -> Statement {
        Statement::new(format!(
            "{} WHERE cd.id_livre_dvd LIKE :pattern ORDER BY c.date_commande DESC",
            ORDER_LINES
        ))
        .bind("pattern", format!("{}%", order_target_prefix(document_type)))
    }
}

#[async_trait]
impl EntityHandler for OrderHandler {
    async fn select(&self, ctx: &HandlerContext<'_>, request: &Request) -> Result<Vec<Row>> {
        let fields = &request.fields;
        let statement = if fields.is_empty() {
            Self::select_all_statement()
        } else if let Some(target) = text_field(fields, keys::SELECT_ID) {
            Self::select_by_target_statement(&target)
        } else if let Some(document_type) = text_field(fields, keys::TYPE) {
            Self::select_by_type_statement(&document_type)
        } else {
            return Err(CatalogError::missing_field(keys::SELECT_ID));
        };
        ctx.executor.query(&statement).await
    }

    async fn insert(&self, ctx: &HandlerContext<'_>, request: &Request) -> Result<u64> {
        let fields = &request.fields;
        require_fields(fields, REQUIRED)?;

        let mut params = commande_params(fields)?;
        params.insert(
            "nb_exemplaire".to_string(),
            typed_value(fields, keys::NB_EXEMPLAIRE, ColumnType::Integer)?,
        );
        params.insert(
            "id_livre_dvd".to_string(),
            typed_value(fields, keys::ID_LIVRE_DVD, ColumnType::Text)?,
        );
        params.insert(
            "id_suivi".to_string(),
            typed_value(fields, keys::ID_SUIVI, ColumnType::Text)?,
        );

        let unit = TransactionUnit::new(vec![
            insert_commande(&params),
            Statement::with_params(
                "INSERT INTO commandedocument (id, nb_exemplaire, id_livre_dvd, id_suivi) \
                 VALUES (:id, :nb_exemplaire::integer, :id_livre_dvd, :id_suivi)",
                params,
            ),
        ])
        .allocate(IdSequence::ORDER, "id");

        let outcome = ctx.executor.run_unit(unit).await?;
        unit_result("commandedocument", "", outcome)
    }

    async fn update(&self, ctx: &HandlerContext<'_>, request: &Request) -> Result<u64> {
        let id = record_id(request, keys::ANY_ID)?;
        require_fields(&request.fields, &[keys::ID_SUIVI])?;
        let suivi = typed_value(&request.fields, keys::ID_SUIVI, ColumnType::Text)?;

        let statement =
            Statement::new("UPDATE commandedocument SET id_suivi = :id_suivi WHERE id = :id")
                .bind("id_suivi", suivi)
                .bind("id", id);
        ctx.executor.execute(&statement).await
    }

    async fn delete(&self, ctx: &HandlerContext<'_>, request: &Request) -> Result<u64> {
        let id = record_id(request, keys::ANY_ID)?;

        let unit = TransactionUnit::new(vec![
            Statement::new("DELETE FROM commandedocument WHERE id = :id").bind("id", id.as_str()),
            Statement::new("DELETE FROM commande WHERE id = :id").bind("id", id.as_str()),
        ]);
        let outcome = ctx.executor.run_unit(unit).await?;
        unit_result("commandedocument", &id, outcome)
    }
}
