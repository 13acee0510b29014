//! Books, DVDs and periodicals
//!
//! Each catalog item is one `document` row plus one row in its subtype table
//! (and, for books and DVDs, a `livres_dvd` marker row). The three kinds share
//! one handler driven by a [`DocumentKind`] descriptor.

use async_trait::async_trait;

use super::{
    EntityHandler, HandlerContext, keys, record_id, require_fields, text_field, typed_value,
    unit_result,
};
use crate::error::Result;
use crate::executor::TransactionUnit;
use crate::guard::{DocumentFamily, ReferentialGuard};
use crate::ids::IdSequence;
use crate::sql::named::Statement;
use crate::types::{ColumnType, Fields, Request, Row};

/// Request key, column and type of one writable column
#[derive(Debug, Clone, Copy)]
struct Mapping {
    key: &'static str,
    column: &'static str,
    column_type: ColumnType,
}

const fn text(key: &'static str, column: &'static str) -> Mapping {
    Mapping {
        key,
        column,
        column_type: ColumnType::Text,
    }
}

const fn integer(key: &'static str, column: &'static str) -> Mapping {
    Mapping {
        key,
        column,
        column_type: ColumnType::Integer,
    }
}

const DOCUMENT_COLUMNS: &[Mapping] = &[
    text(keys::TITRE, "titre"),
    text(keys::IMAGE, "image"),
    text(keys::ID_RAYON, "id_rayon"),
    text(keys::ID_PUBLIC, "id_public"),
    text(keys::ID_GENRE, "id_genre"),
];

const REQUIRED: &[&str] = &[keys::ID_RAYON, keys::ID_PUBLIC, keys::ID_GENRE, keys::TITRE];

const BOOK_COLUMNS: &[Mapping] = &[
    text(keys::ISBN, "isbn"),
    text(keys::AUTEUR, "auteur"),
    text(keys::COLLECTION, "collection"),
];

const DVD_COLUMNS: &[Mapping] = &[
    text(keys::SYNOPSIS, "synopsis"),
    text(keys::REALISATEUR, "realisateur"),
    integer(keys::DUREE, "duree"),
];

const PERIODICAL_COLUMNS: &[Mapping] = &[
    text(keys::PERIODICITE, "periodicite"),
    integer(keys::DELAI_MISE_A_DISPO, "delai_mise_a_dispo"),
];

/// Subtype tables removed on every document delete
const SUBTYPE_TABLES: &[&str] = &["livre", "dvd", "revue"];

/// Which document subtype a handler serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Book,
    Dvd,
    Periodical,
}

impl DocumentKind {
    pub fn table(&self) -> &'static str {
        match self {
            DocumentKind::Book => "livre",
            DocumentKind::Dvd => "dvd",
            DocumentKind::Periodical => "revue",
        }
    }

    pub fn sequence(&self) -> IdSequence {
        match self {
            DocumentKind::Book => IdSequence::BOOK,
            DocumentKind::Dvd => IdSequence::DVD,
            DocumentKind::Periodical => IdSequence::PERIODICAL,
        }
    }

    pub fn family(&self) -> DocumentFamily {
        match self {
            DocumentKind::Book | DocumentKind::Dvd => DocumentFamily::BookOrDvd,
            DocumentKind::Periodical => DocumentFamily::Periodical,
        }
    }

    fn columns(&self) -> &'static [Mapping] {
        match self {
            DocumentKind::Book => BOOK_COLUMNS,
            DocumentKind::Dvd => DVD_COLUMNS,
            DocumentKind::Periodical => PERIODICAL_COLUMNS,
        }
    }
}

/// Handler for one document subtype
#[derive(Debug, Clone, Copy)]
pub struct DocumentHandler {
    kind: DocumentKind,
}

impl DocumentHandler {
    pub fn new(kind: DocumentKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Joined listing of the subtype with its document and reference labels
    pub fn select_statement(&self, id: Option<&str>) -> Statement {
        let subtype_columns = self
            .kind
            .columns()
            .iter()
            .map(|m| format!("s.{}", m.column))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "SELECT s.id, {}, d.titre, d.image, d.id_rayon, d.id_public, d.id_genre, \
             g.libelle AS genre, p.libelle AS le_public, r.libelle AS rayon \
             FROM {} s \
             JOIN document d ON s.id = d.id \
             JOIN genre g ON g.id = d.id_genre \
             JOIN \"public\" p ON p.id = d.id_public \
             JOIN rayon r ON r.id = d.id_rayon",
            subtype_columns,
            self.kind.table()
        );

        match id {
            Some(id) => {
                sql.push_str(" WHERE s.id = :id ORDER BY d.titre");
                Statement::new(sql).bind("id", id)
            }
            None => {
                sql.push_str(" ORDER BY d.titre");
                Statement::new(sql)
            }
        }
    }

    /// Named parameters shared by every statement of an insert or update
    fn params(&self, fields: &Fields) -> Result<Fields> {
        let mut params = Fields::new();
        for m in DOCUMENT_COLUMNS.iter().chain(self.kind.columns()) {
            params.insert(m.column.to_string(), typed_value(fields, m.key, m.column_type)?);
        }
        Ok(params)
    }

    fn placeholder(m: &Mapping) -> String {
        format!(":{}{}", m.column, m.column_type.cast_suffix())
    }

    fn insert_statements(&self, params: &Fields) -> Vec<Statement> {
        let insert = |table: &str, mappings: &[Mapping]| {
            let columns = mappings.iter().map(|m| m.column).collect::<Vec<_>>();
            let values = mappings.iter().map(Self::placeholder).collect::<Vec<_>>();
            Statement::with_params(
                format!(
                    "INSERT INTO {} (id, {}) VALUES (:id, {})",
                    table,
                    columns.join(", "),
                    values.join(", ")
                ),
                params.clone(),
            )
        };

        let mut statements = vec![insert("document", DOCUMENT_COLUMNS)];
        if self.kind.family() == DocumentFamily::BookOrDvd {
            statements.push(Statement::with_params(
                "INSERT INTO livres_dvd (id) VALUES (:id)",
                params.clone(),
            ));
        }
        statements.push(insert(self.kind.table(), self.kind.columns()));
        statements
    }

    fn update_statements(&self, params: &Fields) -> Vec<Statement> {
        let update = |table: &str, mappings: &[Mapping]| {
            let assignments = mappings
                .iter()
                .map(|m| format!("{} = {}", m.column, Self::placeholder(m)))
                .collect::<Vec<_>>();
            Statement::with_params(
                format!("UPDATE {} SET {} WHERE id = :id", table, assignments.join(", ")),
                params.clone(),
            )
        };

        vec![
            update("document", DOCUMENT_COLUMNS),
            update(self.kind.table(), self.kind.columns()),
        ]
    }

    fn delete_statements(id: &str) -> Vec<Statement> {
        SUBTYPE_TABLES
            .iter()
            .chain(["livres_dvd", "document"].iter())
            .map(|table| {
                Statement::new(format!("DELETE FROM {} WHERE id = :id", table)).bind("id", id)
            })
            .collect()
    }
}

#[async_trait]
impl EntityHandler for DocumentHandler {
    async fn select(&self, ctx: &HandlerContext<'_>, request: &Request) -> Result<Vec<Row>> {
        let id = text_field(&request.fields, keys::SELECT_ID);
        ctx.executor
            .query(&self.select_statement(id.as_deref()))
            .await
    }

    async fn insert(&self, ctx: &HandlerContext<'_>, request: &Request) -> Result<u64> {
        require_fields(&request.fields, REQUIRED)?;
        let params = self.params(&request.fields)?;

        let unit = TransactionUnit::new(self.insert_statements(&params))
            .allocate(self.kind.sequence(), "id");
        let outcome = ctx.executor.run_unit(unit).await?;
        unit_result(self.kind.table(), "", outcome)
    }

    async fn update(&self, ctx: &HandlerContext<'_>, request: &Request) -> Result<u64> {
        let id = record_id(request, &[keys::ID])?;
        require_fields(&request.fields, REQUIRED)?;
        let mut params = self.params(&request.fields)?;
        params.insert("id".to_string(), serde_json::Value::String(id.clone()));

        let outcome = ctx
            .executor
            .run_unit(TransactionUnit::new(self.update_statements(&params)))
            .await?;
        unit_result(self.kind.table(), &id, outcome)
    }

    async fn delete(&self, ctx: &HandlerContext<'_>, request: &Request) -> Result<u64> {
        let id = record_id(request, &[keys::ID])?;

        let mut unit = TransactionUnit::new(Self::delete_statements(&id))
            .lock(ReferentialGuard::lock_document(&id));
        for guard in ReferentialGuard::guards(&id, self.kind.family()) {
            unit = unit.guard(guard);
        }

        let outcome = ctx.executor.run_unit(unit).await?;
        unit_result(self.kind.table(), &id, outcome)
    }
}
