//! Periodical subscriptions (`commande` + `abonnement`)
//!
//! Subscriptions share the order id sequence with document orders. The
//! expiring-soon listing is the one query that depends on the current date,
//! which always comes from the store's [`Clock`](crate::config::Clock).

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use super::order::{commande_params, insert_commande};
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
    keys::DATE_COMMANDE,
    keys::DATE_FIN_ABONNEMENT,
    keys::ID_REVUE,
    keys::MONTANT,
];

const SUBSCRIPTIONS: &str = "SELECT a.id, a.date_fin_abonnement, a.id_revue, d.titre, \
     c.date_commande, c.montant \
     FROM abonnement a \
     JOIN commande c ON a.id = c.id \
     JOIN document d ON d.id = a.id_revue";

#[derive(Debug, Clone, Copy, Default)]
pub struct SubscriptionHandler;

impl SubscriptionHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn select_all_statement() -> Statement {
        Statement::new(format!("{} ORDER BY c.date_commande DESC", SUBSCRIPTIONS))
    }

    pub fn select_by_periodical_statement(id_revue: &str) -> Statement {
        Statement::new(format!(
            "{} WHERE a.id_revue = :id ORDER BY c.date_commande DESC",
            SUBSCRIPTIONS
        ))
        .bind("id", id_revue)
    }

    /// Subscriptions ending in `[today, today + window_days)`, soonest first
    pub fn select_expiring_statement(today: NaiveDate, window_days: i64) -> Result<Statement> {
        let window_end = Duration::try_days(window_days)
            .and_then(|window| today.checked_add_signed(window))
            .ok_or_else(|| {
                CatalogError::validation(format!("Invalid expiry window of {} days", window_days))
            })?;

        Ok(Statement::new(format!(
            "{} WHERE a.date_fin_abonnement >= :today::date \
             AND a.date_fin_abonnement < :window_end::date \
             ORDER BY a.date_fin_abonnement ASC",
            SUBSCRIPTIONS
        ))
        .bind("today", today.format("%Y-%m-%d").to_string())
        .bind("window_end", window_end.format("%Y-%m-%d").to_string()))
    }
}

fn expiring_requested(fields: &Fields) -> bool {
    fields
        .get(keys::EXPIRING)
        .is_some_and(|v| !matches!(v, serde_json::Value::Null | serde_json::Value::Bool(false)))
}

#[async_trait]
impl EntityHandler for SubscriptionHandler {
    /// `expiring` set to anything but `false` or `null` selects the window
    /// ending [`HandlerContext::expiry_window_days`] after the store's today;
    /// its value is never read as a date.
    async fn select(&self, ctx: &HandlerContext<'_>, request: &Request) -> Result<Vec<Row>> {
        let fields = &request.fields;
        let statement = if expiring_requested(fields) {
            Self::select_expiring_statement(ctx.clock.today(), ctx.expiry_window_days)?
        } else if let Some(id_revue) = text_field(fields, keys::SELECT_ID) {
            Self::select_by_periodical_statement(&id_revue)
        } else if fields.keys().all(|k| k == keys::EXPIRING) {
            Self::select_all_statement()
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
            "date_fin_abonnement".to_string(),
            typed_value(fields, keys::DATE_FIN_ABONNEMENT, ColumnType::Date)?,
        );
        params.insert(
            "id_revue".to_string(),
            typed_value(fields, keys::ID_REVUE, ColumnType::Text)?,
        );

        let unit = TransactionUnit::new(vec![
            insert_commande(&params),
            Statement::with_params(
                "INSERT INTO abonnement (id, date_fin_abonnement, id_revue) \
                 VALUES (:id, :date_fin_abonnement::date, :id_revue)",
                params,
            ),
        ])
        .allocate(IdSequence::ORDER, "id");

        let outcome = ctx.executor.run_unit(unit).await?;
        unit_result("abonnement", "", outcome)
    }

    async fn delete(&self, ctx: &HandlerContext<'_>, request: &Request) -> Result<u64> {
        let id = record_id(request, keys::ANY_ID)?;

        let unit = TransactionUnit::new(vec![
            Statement::new("DELETE FROM abonnement WHERE id = :id").bind("id", id.as_str()),
            Statement::new("DELETE FROM commande WHERE id = :id").bind("id", id.as_str()),
        ]);
        let outcome = ctx.executor.run_unit(unit).await?;
        unit_result("abonnement", &id, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogSchema;
    use crate::config::Clock;
    use crate::executor::spy::SpyExecutor;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ctx<'a>(spy: &'a SpyExecutor, catalog: &'a CatalogSchema) -> HandlerContext<'a> {
        HandlerContext {
            executor: spy,
            catalog,
            clock: Clock::Fixed(day(2024, 3, 15)),
            expiry_window_days: 30,
        }
    }

    // =========================================================================
    // Select Tests
    // =========================================================================

    #[test]
    fn test_expiring_window_is_half_open() {
        let stmt = SubscriptionHandler::select_expiring_statement(day(2024, 3, 15), 30).unwrap();

        assert!(stmt.sql.contains("a.date_fin_abonnement >= :today::date"));
        assert!(stmt.sql.contains("a.date_fin_abonnement < :window_end::date"));
        assert!(stmt.sql.ends_with("ORDER BY a.date_fin_abonnement ASC"));
        assert_eq!(stmt.param("today"), Some(&json!("2024-03-15")));
        assert_eq!(stmt.param("window_end"), Some(&json!("2024-04-14")));
    }

    #[test]
    fn test_expiring_window_crosses_year_end() {
        let stmt = SubscriptionHandler::select_expiring_statement(day(2024, 12, 20), 30).unwrap();
        assert_eq!(stmt.param("window_end"), Some(&json!("2025-01-19")));
    }

    #[test]
    fn test_expiring_window_rejects_overflow() {
        let result = SubscriptionHandler::select_expiring_statement(day(2024, 1, 1), i64::MAX);
        assert!(matches!(result, Err(CatalogError::Validation(_))));
    }

    #[tokio::test]
    async fn test_expiring_uses_store_clock_not_request() {
        let spy = SpyExecutor::new();
        let catalog = CatalogSchema::media_catalog();
        let request = Request::select("abonnement").field("expiring", "2001-01-01");

        SubscriptionHandler
            .select(&ctx(&spy, &catalog), &request)
            .await
            .unwrap();

        let query = &spy.queries()[0];
        assert_eq!(query.param("today"), Some(&json!("2024-03-15")));
        assert_eq!(query.param("window_end"), Some(&json!("2024-04-14")));
    }

    #[tokio::test]
    async fn test_select_by_periodical_and_all() {
        let spy = SpyExecutor::new();
        let catalog = CatalogSchema::media_catalog();
        let c = ctx(&spy, &catalog);

        SubscriptionHandler
            .select(&c, &Request::select("abonnement").field("id", "10002"))
            .await
            .unwrap();
        SubscriptionHandler
            .select(&c, &Request::select("abonnement"))
            .await
            .unwrap();

        let queries = spy.queries();
        assert!(queries[0].sql.contains("WHERE a.id_revue = :id"));
        assert_eq!(queries[0].param("id"), Some(&json!("10002")));
        assert!(!queries[1].sql.contains("WHERE"));
    }

    // =========================================================================
    // Write Tests
    // =========================================================================

    #[tokio::test]
    async fn test_insert_shares_order_sequence() {
        let spy = SpyExecutor::new().with_max_id("commande", "00009");
        let catalog = CatalogSchema::media_catalog();
        let request = Request::insert("abonnement")
            .field("DateCommande", "2024-03-01")
            .field("DateFinAbonnement", "2025-03-01")
            .field("IdRevue", "10001")
            .field("Montant", "120.00");

        let affected = SubscriptionHandler
            .insert(&ctx(&spy, &catalog), &request)
            .await
            .unwrap();
        assert_eq!(affected, 2);

        let written = spy.written();
        assert!(written[0].sql.starts_with("INSERT INTO commande"));
        assert!(written[1].sql.starts_with("INSERT INTO abonnement"));
        assert_eq!(written[1].param("id"), Some(&json!("00010")));
        assert_eq!(written[1].param("id_revue"), Some(&json!("10001")));
    }

    #[tokio::test]
    async fn test_insert_missing_required_field_writes_nothing() {
        for key in REQUIRED {
            let spy = SpyExecutor::new();
            let catalog = CatalogSchema::media_catalog();
            let mut request = Request::insert("abonnement")
                .field("DateCommande", "2024-03-01")
                .field("DateFinAbonnement", "2025-03-01")
                .field("IdRevue", "10001")
                .field("Montant", 120);
            request.fields.remove(*key);

            let result = SubscriptionHandler.insert(&ctx(&spy, &catalog), &request).await;
            assert!(matches!(&result, Err(CatalogError::MissingField(k)) if k == key));
            assert!(spy.calls().is_empty());
        }
    }

    #[tokio::test]
    async fn test_expiring_false_is_not_the_window() {
        let spy = SpyExecutor::new();
        let catalog = CatalogSchema::media_catalog();
        let c = ctx(&spy, &catalog);

        SubscriptionHandler
            .select(&c, &Request::select("abonnement").field("expiring", false))
            .await
            .unwrap();
        SubscriptionHandler
            .select(
                &c,
                &Request::select("abonnement")
                    .field("expiring", serde_json::Value::Null)
                    .field("id", "10001"),
            )
            .await
            .unwrap();

        let queries = spy.queries();
        assert!(!queries[0].sql.contains("WHERE"));
        assert!(queries[1].sql.contains("WHERE a.id_revue = :id"));
        assert!(queries.iter().all(|q| q.param("today").is_none()));
    }

    #[tokio::test]
    async fn test_update_is_unsupported() {
        let spy = SpyExecutor::new();
        let catalog = CatalogSchema::media_catalog();
        let request = Request::update("abonnement", "00003").field("Montant", 1);

        let result = SubscriptionHandler.update(&ctx(&spy, &catalog), &request).await;
        assert!(matches!(result, Err(CatalogError::Unsupported { .. })));
        assert!(spy.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_subscription_then_order() {
        let spy = SpyExecutor::new();
        let catalog = CatalogSchema::media_catalog();

        SubscriptionHandler
            .delete(&ctx(&spy, &catalog), &Request::delete("abonnement").field("Id", "00003"))
            .await
            .unwrap();

        let sql: Vec<String> = spy.written().iter().map(|s| s.sql.clone()).collect();
        assert_eq!(
            sql,
            vec![
                "DELETE FROM abonnement WHERE id = :id",
                "DELETE FROM commande WHERE id = :id",
            ]
        );
    }
}
