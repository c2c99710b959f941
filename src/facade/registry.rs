use super::InMemoryDB;
use crate::core::{DbError, Result};
use log::info;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Named in-memory databases that outlive the connections opened on them.
///
/// Every session factory built from clones of the same registry sees the
/// same databases, so a table created by one bootstrap operation is there
/// for the next one even though each operation gets a fresh factory.
#[derive(Clone, Default)]
pub struct DatabaseRegistry {
    databases: Arc<RwLock<HashMap<String, Arc<RwLock<InMemoryDB>>>>>,
}

impl DatabaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `name`, creating an empty database on first use.
    pub fn open_or_create(&self, name: &str) -> Result<Arc<RwLock<InMemoryDB>>> {
        if let Some(db) = self.databases.read()?.get(name) {
            return Ok(Arc::clone(db));
        }

        let mut databases = self.databases.write()?;
        let db = databases.entry(name.to_string()).or_insert_with(|| {
            info!("Creating in-memory database '{}'", name);
            Arc::new(RwLock::new(InMemoryDB::new(name)))
        });
        Ok(Arc::clone(db))
    }

    pub fn get(&self, name: &str) -> Result<Arc<RwLock<InMemoryDB>>> {
        self.databases
            .read()?
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::DatabaseNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.databases
            .read()
            .map(|dbs| dbs.contains_key(name))
            .unwrap_or(false)
    }

    pub fn names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.databases.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub fn drop_database(&self, name: &str) -> Result<()> {
        self.databases
            .write()?
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| DbError::DatabaseNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_or_create_shares_instance() {
        let registry = DatabaseRegistry::new();
        let a = registry.open_or_create("test").unwrap();
        let b = registry.clone().open_or_create("test").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_get_missing() {
        let registry = DatabaseRegistry::new();
        assert!(matches!(registry.get("nope"), Err(DbError::DatabaseNotFound(_))));
        assert!(!registry.contains("nope"));
    }

    #[test]
    fn test_names_and_drop() {
        let registry = DatabaseRegistry::new();
        registry.open_or_create("b").unwrap();
        registry.open_or_create("a").unwrap();
        assert_eq!(registry.names().unwrap(), vec!["a", "b"]);

        registry.drop_database("a").unwrap();
        assert!(registry.drop_database("a").is_err());
        assert_eq!(registry.names().unwrap(), vec!["b"]);
    }
}
