//! Referential guard for document deletes
//!
//! A document may not disappear while copies reference it, nor while order
//! lines (books and DVDs) or subscriptions (periodicals) point at it. The
//! guard queries run inside the delete's own transaction unit, after the
//! document row is locked, so nothing can attach a dependent between the
//! check and the delete.

use crate::error::{CatalogError, Result};
use crate::executor::{Executor, Guard, guard_count};
use crate::sql::named::Statement;

/// Which dependent table, besides copies, protects a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFamily {
    /// Books and DVDs: protected by order lines
    BookOrDvd,
    /// Periodicals: protected by subscriptions
    Periodical,
}

impl DocumentFamily {
    /// `(table, referencing column)` checked in addition to copies
    fn dependent(&self) -> (&'static str, &'static str) {
        match self {
            DocumentFamily::BookOrDvd => ("commandedocument", "id_livre_dvd"),
            DocumentFamily::Periodical => ("abonnement", "id_revue"),
        }
    }
}

pub struct ReferentialGuard;

impl ReferentialGuard {
    /// Count queries that must all return zero before `id` can be deleted
    pub fn guards(id: &str, family: DocumentFamily) -> Vec<Guard> {
        let (table, column) = family.dependent();
        vec![
            Self::count_guard("exemplaire", "id", id),
            Self::count_guard(table, column, id),
        ]
    }

    /// Row lock on the document, taken before the guards run
    pub fn lock_document(id: &str) -> Statement {
        Statement::new("SELECT id FROM document WHERE id = :id FOR UPDATE").bind("id", id)
    }

    /// Standalone check outside a unit; `DeleteBlocked` on the first
    /// nonzero count
    pub async fn check(executor: &dyn Executor, id: &str, family: DocumentFamily) -> Result<()> {
        for guard in Self::guards(id, family) {
            let count = guard_count(&executor.query(&guard.statement).await?);
            if count > 0 {
                return Err(CatalogError::DeleteBlocked {
                    id: id.to_string(),
                    dependent: guard.dependent,
                    count,
                });
            }
        }
        Ok(())
    }

    fn count_guard(table: &str, column: &str, id: &str) -> Guard {
        Guard {
            dependent: table.to_string(),
            statement: Statement::new(format!(
                "SELECT COUNT(*) AS count FROM {} WHERE {} = :id",
                table, column
            ))
            .bind("id", id),
        }
    }
}
