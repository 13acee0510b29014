//! Table whitelist for the media-lending catalog
//!
//! Every table the generic query builder may touch is registered here with
//! its permitted columns. Request keys that are not registered columns never
//! reach SQL.

use std::collections::BTreeMap;

use crate::error::{CatalogError, Result};
use crate::sql::sanitize::validate_identifier;
use crate::types::{ColumnDefinition, ColumnType};

/// Label column shared by the id + label reference tables
pub const LABEL_COLUMN: &str = "libelle";

/// Reference tables: read-only id + label lookups
pub const REFERENCE_TABLES: &[&str] = &["genre", "public", "rayon", "etat", "suivi", "service"];

/// A whitelisted table
#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    /// Column to order by when listing a reference table
    pub label_column: Option<String>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        Self {
            name: name.into(),
            columns,
            label_column: None,
        }
    }

    /// An `(id, libelle)` reference table
    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: vec![
                ColumnDefinition::text("id"),
                ColumnDefinition::text(LABEL_COLUMN),
            ],
            label_column: Some(LABEL_COLUMN.to_string()),
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column, failing with `UnknownColumn` when not whitelisted
    pub fn require_column(&self, name: &str) -> Result<&ColumnDefinition> {
        self.column(name)
            .ok_or_else(|| CatalogError::unknown_column(&self.name, name))
    }

    fn validate(&self) -> Result<()> {
        validate_identifier(&self.name).map_err(CatalogError::Validation)?;
        if self.columns.is_empty() {
            return Err(CatalogError::validation(format!(
                "Table '{}' has no columns",
                self.name
            )));
        }
        for col in &self.columns {
            validate_identifier(&col.name).map_err(CatalogError::Validation)?;
        }
        if let Some(label) = &self.label_column {
            self.require_column(label)?;
        }
        Ok(())
    }
}

/// Registry of whitelisted tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSchema {
    tables: BTreeMap<String, TableDefinition>,
}

impl CatalogSchema {
    /// An empty registry
    pub fn empty() -> Self {
        Self::default()
    }

    /// The media-lending catalog: documents and their subtypes, copies,
    /// orders, subscriptions, users and reference tables
    pub fn media_catalog() -> Self {
        use ColumnType::*;
        let col = ColumnDefinition::new;

        let mut schema = Self::empty();
        let tables = vec![
            TableDefinition::new(
                "document",
                vec![
                    col("id", Text),
                    col("titre", Text),
                    col("image", Text),
                    col("id_rayon", Text),
                    col("id_public", Text),
                    col("id_genre", Text),
                ],
            ),
            TableDefinition::new(
                "livre",
                vec![
                    col("id", Text),
                    col("isbn", Text),
                    col("auteur", Text),
                    col("collection", Text),
                ],
            ),
            TableDefinition::new(
                "dvd",
                vec![
                    col("id", Text),
                    col("synopsis", Text),
                    col("realisateur", Text),
                    col("duree", Integer),
                ],
            ),
            TableDefinition::new(
                "revue",
                vec![
                    col("id", Text),
                    col("periodicite", Text),
                    col("delai_mise_a_dispo", Integer),
                ],
            ),
            TableDefinition::new("livres_dvd", vec![col("id", Text)]),
            TableDefinition::new(
                "exemplaire",
                vec![
                    col("id", Text),
                    col("numero", Integer),
                    col("date_achat", Date),
                    col("photo", Text),
                    col("id_etat", Text),
                ],
            ),
            TableDefinition::new(
                "commande",
                vec![
                    col("id", Text),
                    col("date_commande", Date),
                    col("montant", Decimal),
                ],
            ),
            TableDefinition::new(
                "commandedocument",
                vec![
                    col("id", Text),
                    col("nb_exemplaire", Integer),
                    col("id_livre_dvd", Text),
                    col("id_suivi", Text),
                ],
            ),
            TableDefinition::new(
                "abonnement",
                vec![
                    col("id", Text),
                    col("date_fin_abonnement", Date),
                    col("id_revue", Text),
                ],
            ),
            TableDefinition::new(
                "utilisateur",
                vec![
                    col("id", Text),
                    col("login", Text),
                    col("pwd", Text),
                    col("id_service", Text),
                ],
            ),
        ];

        for table in tables
            .into_iter()
            .chain(REFERENCE_TABLES.iter().map(|t| TableDefinition::reference(*t)))
        {
            schema.tables.insert(table.name.clone(), table);
        }
        schema
    }

    /// Register (or replace) a table after validating its identifiers
    pub fn register(&mut self, table: TableDefinition) -> Result<()> {
        table.validate()?;
        self.tables.insert(table.name.clone(), table);
        Ok(())
    }

    pub fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.get(name)
    }

    /// Look up a table, failing with `UnknownTable` when not whitelisted
    pub fn require_table(&self, name: &str) -> Result<&TableDefinition> {
        self.table(name)
            .ok_or_else(|| CatalogError::unknown_table(name))
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_catalog_tables_pass_validation() {
        let schema = CatalogSchema::media_catalog();
        for name in schema.table_names() {
            let table = schema.table(name).unwrap();
            assert!(table.validate().is_ok(), "{} should validate", name);
        }
        assert_eq!(schema.table_names().count(), 16);
    }

    #[test]
    fn test_reference_tables_have_label() {
        let schema = CatalogSchema::media_catalog();
        for name in REFERENCE_TABLES {
            let table = schema.require_table(name).unwrap();
            assert_eq!(table.label_column.as_deref(), Some(LABEL_COLUMN));
        }
        assert!(schema.table("livre").unwrap().label_column.is_none());
    }

    #[test]
    fn test_require_column() {
        let schema = CatalogSchema::media_catalog();
        let exemplaire = schema.require_table("exemplaire").unwrap();

        assert_eq!(
            exemplaire.require_column("numero").unwrap().column_type,
            ColumnType::Integer
        );
        assert!(matches!(
            exemplaire.require_column("prix"),
            Err(CatalogError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_unknown_table() {
        let schema = CatalogSchema::media_catalog();
        assert!(matches!(
            schema.require_table("emprunt"),
            Err(CatalogError::UnknownTable(name)) if name == "emprunt"
        ));
    }

    #[test]
    fn test_register_validates_identifiers() {
        let mut schema = CatalogSchema::empty();

        let bad = TableDefinition::new("Emprunt", vec![ColumnDefinition::text("id")]);
        assert!(schema.register(bad).is_err());

        let bad_column = TableDefinition::new("emprunt", vec![ColumnDefinition::text("idLivre")]);
        assert!(schema.register(bad_column).is_err());

        let no_columns = TableDefinition::new("emprunt", vec![]);
        assert!(schema.register(no_columns).is_err());

        let good = TableDefinition::new(
            "emprunt",
            vec![
                ColumnDefinition::text("id"),
                ColumnDefinition::new("date_retour", ColumnType::Date),
            ],
        );
        assert!(schema.register(good).is_ok());
        assert!(schema.table("emprunt").is_some());
    }
}
