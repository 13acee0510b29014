//! Per-entity request handlers
//!
//! Each handler implements the same select/insert/update/delete capability.
//! Operations a handler does not override are refused with `Unsupported`.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::catalog::CatalogSchema;
use crate::config::Clock;
use crate::error::{CatalogError, Result};
use crate::executor::{Executor, UnitOutcome};
use crate::types::{ColumnType, Fields, Operation, Request, Row};

pub mod copy;
pub mod credential;
pub mod document;
pub mod generic;
pub mod order;
pub mod reference;
pub mod subscription;

pub use copy::CopyHandler;
pub use credential::CredentialHandler;
pub use document::{DocumentHandler, DocumentKind};
pub use generic::GenericHandler;
pub use order::{OrderHandler, order_target_prefix};
pub use reference::ReferenceHandler;
pub use subscription::SubscriptionHandler;

/// Request field keys understood by the specialized handlers
pub mod keys {
    pub const ID: &str = "Id";
    pub const SELECT_ID: &str = "id";
    pub const TYPE: &str = "type";
    pub const EXPIRING: &str = "expiring";

    pub const TITRE: &str = "Titre";
    pub const IMAGE: &str = "Image";
    pub const ID_RAYON: &str = "IdRayon";
    pub const ID_PUBLIC: &str = "IdPublic";
    pub const ID_GENRE: &str = "IdGenre";
    pub const ISBN: &str = "Isbn";
    pub const AUTEUR: &str = "Auteur";
    pub const COLLECTION: &str = "Collection";
    pub const SYNOPSIS: &str = "Synopsis";
    pub const REALISATEUR: &str = "Realisateur";
    pub const DUREE: &str = "Duree";
    pub const PERIODICITE: &str = "Periodicite";
    pub const DELAI_MISE_A_DISPO: &str = "DelaiMiseADispo";

    pub const ID_LIVRE_DVD: &str = "IdLivreDvd";
    pub const ID_SUIVI: &str = "IdSuivi";
    pub const NB_EXEMPLAIRE: &str = "NbExemplaire";
    pub const DATE_COMMANDE: &str = "DateCommande";
    pub const MONTANT: &str = "Montant";
    pub const DATE_FIN_ABONNEMENT: &str = "DateFinAbonnement";
    pub const ID_REVUE: &str = "IdRevue";

    pub const NUMERO: &str = "Numero";
    pub const ID_ETAT: &str = "IdEtat";

    /// Record id of an order, subscription or copy: `Id` or the column key
    pub const ANY_ID: &[&str] = &[ID, SELECT_ID];
    pub const ANY_NUMERO: &[&str] = &[NUMERO, "numero"];
    pub const ANY_ID_ETAT: &[&str] = &[ID_ETAT, "id_etat"];

    pub const LOGIN: &str = "Login";
    pub const PWD: &str = "Pwd";
}

/// Everything a handler needs besides the request itself
#[derive(Clone, Copy)]
pub struct HandlerContext<'a> {
    pub executor: &'a dyn Executor,
    pub catalog: &'a CatalogSchema,
    pub clock: Clock,
    pub expiry_window_days: i64,
}

/// Select/insert/update/delete capability of one entity kind
#[async_trait]
pub trait EntityHandler: Send + Sync {
    async fn select(&self, _ctx: &HandlerContext<'_>, request: &Request) -> Result<Vec<Row>> {
        Err(CatalogError::unsupported(&request.table, Operation::Select))
    }

    async fn insert(&self, _ctx: &HandlerContext<'_>, request: &Request) -> Result<u64> {
        Err(CatalogError::unsupported(&request.table, Operation::Insert))
    }

    async fn update(&self, _ctx: &HandlerContext<'_>, request: &Request) -> Result<u64> {
        Err(CatalogError::unsupported(&request.table, Operation::Update))
    }

    async fn delete(&self, _ctx: &HandlerContext<'_>, request: &Request) -> Result<u64> {
        Err(CatalogError::unsupported(&request.table, Operation::Delete))
    }
}

// =========================================================================
// Field helpers
// =========================================================================

/// Fail with `EmptyFields`, or `MissingField` for the first absent key
///
/// A key bound to `null` counts as absent.
pub(crate) fn require_fields(fields: &Fields, required: &[&str]) -> Result<()> {
    if fields.is_empty() {
        return Err(CatalogError::EmptyFields);
    }
    for key in required {
        if fields.get(*key).is_none_or(serde_json::Value::is_null) {
            return Err(CatalogError::missing_field(*key));
        }
    }
    Ok(())
}

/// Field value checked against `column_type`; absent keys bind `null`
pub(crate) fn typed_value(
    fields: &Fields,
    key: &str,
    column_type: ColumnType,
) -> Result<serde_json::Value> {
    let value = fields.get(key).cloned().unwrap_or(serde_json::Value::Null);
    column_type
        .validate_value(&value)
        .map_err(|reason| CatalogError::InvalidValue {
            column: key.to_string(),
            reason,
        })?;
    Ok(column_type.coerce(&value))
}

/// Non-empty text form of a scalar field
pub(crate) fn text_field(fields: &Fields, key: &str) -> Option<String> {
    match fields.get(key)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First of `aliases` carrying a non-null value, else the first alias
///
/// Lets a field be sent under either its request key or its column name.
pub(crate) fn present_key<'k>(fields: &Fields, aliases: &[&'k str]) -> &'k str {
    aliases
        .iter()
        .copied()
        .find(|key| fields.get(*key).is_some_and(|v| !v.is_null()))
        .or_else(|| aliases.first().copied())
        .unwrap_or_default()
}

/// Record id from the field map, falling back to the request id
pub(crate) fn record_id(request: &Request, aliases: &[&str]) -> Result<String> {
    if request.fields.is_empty() && request.id.is_none() {
        return Err(CatalogError::EmptyFields);
    }
    let key = present_key(&request.fields, aliases);
    text_field(&request.fields, key)
        .or_else(|| request.id.clone().filter(|id| !id.is_empty()))
        .ok_or_else(|| CatalogError::missing_field(key))
}

/// Map a unit outcome to an affected-row count
pub(crate) fn unit_result(table: &str, id: &str, outcome: UnitOutcome) -> Result<u64> {
    match outcome {
        UnitOutcome::Committed {
            rows_affected,
            allocated_id,
        } => {
            info!(
                table,
                id = allocated_id.as_deref().unwrap_or(id),
                rows_affected,
                "composite write committed"
            );
            Ok(rows_affected)
        }
        UnitOutcome::Vetoed { dependent, count } => {
            warn!(table, id, dependent = %dependent, count, "delete vetoed by dependent rows");
            Err(CatalogError::DeleteBlocked {
                id: id.to_string(),
                dependent,
                count,
            })
        }
    }
}
