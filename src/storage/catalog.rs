use super::{Table, TableSchema};
use crate::core::{DbError, Result};
use im::OrdMap;

/// The set of tables of one database.
///
/// Keys are lower-cased table names (unquoted SQL identifiers are
/// case-insensitive). Backed by `im::OrdMap`, so `clone()` is the
/// copy-on-write snapshot a transaction works against.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: OrdMap<String, Table>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(&mut self, schema: TableSchema) -> Result<()> {
        let key = table_key(schema.name());
        if self.tables.contains_key(&key) {
            return Err(DbError::TableExists(schema.name().to_string()));
        }
        self.tables.insert(key, Table::new(schema));
        Ok(())
    }

    pub fn drop_table(&mut self, name: &str) -> Result<Table> {
        self.tables
            .remove(&table_key(name))
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn get_table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(&table_key(name))
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn get_table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(&table_key(name))
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(&table_key(name))
    }

    /// Table names as declared, in key order.
    pub fn list_tables(&self) -> Vec<&str> {
        self.tables.values().map(|t| t.name()).collect()
    }
}

fn table_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType};

    fn schema(name: &str) -> TableSchema {
        TableSchema::new(name, vec![Column::new("id", DataType::Integer)])
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let mut catalog = Catalog::new();
        catalog.create_table(schema("Person")).unwrap();

        assert!(catalog.table_exists("PERSON"));
        assert!(catalog.get_table("person").is_ok());
        assert!(matches!(
            catalog.create_table(schema("person")),
            Err(DbError::TableExists(_))
        ));
        assert_eq!(catalog.list_tables(), vec!["Person"]);
    }

    #[test]
    fn test_drop_missing_table() {
        let mut catalog = Catalog::new();
        assert!(matches!(catalog.drop_table("nope"), Err(DbError::TableNotFound(_))));
    }

    #[test]
    fn test_clone_is_a_snapshot() {
        let mut catalog = Catalog::new();
        catalog.create_table(schema("a")).unwrap();

        let snapshot = catalog.clone();
        catalog.create_table(schema("b")).unwrap();
        catalog.drop_table("a").unwrap();

        assert!(snapshot.table_exists("a"));
        assert!(!snapshot.table_exists("b"));
    }
}
