use crate::core::{DbError, Result};
use crate::executor::ExecutorPipeline;
use crate::parser::SqlParserAdapter;
use crate::result::QueryResult;
use crate::storage::Catalog;
use log::debug;

/// One named in-memory database.
///
/// The committed state is a `Catalog` plus a version counter that is bumped
/// on every published change. Transactions work on a cloned catalog and
/// publish it back through [`InMemoryDB::publish`], which refuses the
/// write if another writer got there first.
pub struct InMemoryDB {
    name: String,
    catalog: Catalog,
    version: u64,
    parser: SqlParserAdapter,
    executor_pipeline: ExecutorPipeline,
}

impl InMemoryDB {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            catalog: Catalog::new(),
            version: 0,
            parser: SqlParserAdapter::new(),
            executor_pipeline: ExecutorPipeline::with_default_executors(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Execute in auto-commit mode. A multi-statement script is applied
    /// atomically: if any statement fails nothing is published.
    pub fn execute(&mut self, sql: &str) -> Result<QueryResult> {
        let mut working = self.catalog.clone();
        let (result, mutated) = self.run(&mut working, sql)?;
        if mutated {
            self.catalog = working;
            self.version += 1;
        }
        Ok(result)
    }

    /// Execute `sql` against `catalog` (a transaction's working copy).
    ///
    /// Returns the result of the last statement and whether any statement
    /// changed the catalog.
    pub fn run(&self, catalog: &mut Catalog, sql: &str) -> Result<(QueryResult, bool)> {
        let statements = self.parser.parse(sql)?;
        if statements.is_empty() {
            return Err(DbError::ParseError("No statement found".into()));
        }

        let mut mutated = false;
        let mut last = QueryResult::empty();
        for stmt in &statements {
            let executor = self.executor_pipeline.find(stmt)?;
            debug!("[{}] executing {} via {}", self.name, stmt.kind(), executor.name());
            last = executor.execute(stmt, catalog)?;
            mutated |= executor.is_mutating();
        }
        Ok((last, mutated))
    }

    /// Copy-on-write snapshot of the committed state.
    pub fn snapshot(&self) -> (Catalog, u64) {
        (self.catalog.clone(), self.version)
    }

    /// Publish a transaction's catalog taken at `base_version`.
    pub fn publish(&mut self, catalog: Catalog, base_version: u64) -> Result<()> {
        if self.version != base_version {
            return Err(DbError::WriteConflict(self.name.clone()));
        }
        self.catalog = catalog;
        self.version += 1;
        Ok(())
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.catalog.table_exists(name)
    }

    pub fn list_tables(&self) -> Vec<String> {
        self.catalog
            .list_tables()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_auto_commits() {
        let mut db = InMemoryDB::new("test");
        db.execute("CREATE TABLE person (PersonId INT, Firstname TEXT)").unwrap();
        db.execute("INSERT INTO person VALUES (1, 'John')").unwrap();

        let result = db.execute("SELECT * FROM person").unwrap();
        assert_eq!(result.row_count(), 1);
        assert_eq!(db.version(), 2);
    }

    #[test]
    fn test_failed_script_publishes_nothing() {
        let mut db = InMemoryDB::new("test");
        let result = db.execute("CREATE TABLE person (PersonId INT); INSERT INTO nope VALUES (1)");

        assert!(matches!(result, Err(DbError::TableNotFound(_))));
        assert!(!db.table_exists("person"));
        assert_eq!(db.version(), 0);
    }

    #[test]
    fn test_queries_do_not_bump_version() {
        let mut db = InMemoryDB::new("test");
        db.execute("CREATE TABLE t (id INT)").unwrap();
        db.execute("SELECT * FROM t").unwrap();
        assert_eq!(db.version(), 1);
    }

    #[test]
    fn test_publish_detects_conflict() {
        let mut db = InMemoryDB::new("test");
        let (mut working, base) = db.snapshot();
        db.run(&mut working, "CREATE TABLE a (id INT)").unwrap();

        db.execute("CREATE TABLE b (id INT)").unwrap();

        assert!(matches!(
            db.publish(working, base),
            Err(DbError::WriteConflict(_))
        ));
        assert!(!db.table_exists("a"));
    }
}
