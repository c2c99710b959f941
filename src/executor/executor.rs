use crate::core::{DbError, Result};
use crate::parser::ast::Statement;
use crate::result::QueryResult;
use crate::storage::Catalog;

use super::ddl::{AlterTableExecutor, CreateTableExecutor, DropTableExecutor};
use super::dml::{DeleteExecutor, InsertExecutor, UpdateExecutor};
use super::query::QueryExecutor;

pub trait Executor: Send + Sync {
    fn name(&self) -> &'static str;

    fn can_handle(&self, stmt: &Statement) -> bool;

    fn execute(&self, stmt: &Statement, catalog: &mut Catalog) -> Result<QueryResult>;

    /// Whether a successful execution changes the catalog.
    fn is_mutating(&self) -> bool {
        true
    }
}

pub struct ExecutorPipeline {
    executors: Vec<Box<dyn Executor>>,
}

impl ExecutorPipeline {
    pub fn new() -> Self {
        Self {
            executors: Vec::new(),
        }
    }

    /// Pipeline with every built-in executor registered.
    pub fn with_default_executors() -> Self {
        let mut pipeline = Self::new();

        pipeline.register(Box::new(CreateTableExecutor));
        pipeline.register(Box::new(DropTableExecutor));
        pipeline.register(Box::new(AlterTableExecutor));

        pipeline.register(Box::new(InsertExecutor));
        pipeline.register(Box::new(UpdateExecutor));
        pipeline.register(Box::new(DeleteExecutor));

        pipeline.register(Box::new(QueryExecutor));

        pipeline
    }

    pub fn register(&mut self, executor: Box<dyn Executor>) {
        self.executors.push(executor);
    }

    pub fn find(&self, stmt: &Statement) -> Result<&dyn Executor> {
        self.executors
            .iter()
            .find(|executor| executor.can_handle(stmt))
            .map(|boxed| &**boxed)
            .ok_or_else(|| {
                DbError::UnsupportedOperation(format!("No executor found for {}", stmt.kind()))
            })
    }
}

impl Default for ExecutorPipeline {
    fn default() -> Self {
        Self::with_default_executors()
    }
}
